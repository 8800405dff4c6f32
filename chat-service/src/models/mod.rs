//! Request and response models for the chat endpoint.

pub mod chat;

pub use chat::{ChatReply, ChatRequest, HistoryEntry, Temperature, WeatherContext};
