//! Chat request/response bodies.
//!
//! The request is parsed from a raw JSON value rather than derived directly so
//! that each validation failure maps to its own client-facing message, and so
//! that malformed optional context is dropped instead of failing the request.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::error::ChatError;

/// A validated chat request.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    /// The user's question. Never empty.
    pub message: String,

    /// Weather the client is currently showing, if any.
    pub weather_context: Option<WeatherContext>,

    /// Prior turns, oldest first.
    pub conversation_history: Vec<HistoryEntry>,
}

/// Current conditions supplied by the client.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct WeatherContext {
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub temperature: Option<Temperature>,
    #[serde(default)]
    pub condition: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// Temperature in °C, as a number or pre-formatted text.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Temperature {
    Number(serde_json::Number),
    Text(String),
}

impl fmt::Display for Temperature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Temperature::Number(n) => write!(f, "{}", n),
            Temperature::Text(s) => f.write_str(s.trim()),
        }
    }
}

/// One prior turn of the conversation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HistoryEntry {
    /// Speaker tag, e.g. `user` or `bot`.
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
}

/// Successful response body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatReply {
    pub response: String,
}

impl ChatRequest {
    /// Parse and validate a raw request body.
    pub fn from_body(body: &[u8]) -> Result<Self, ChatError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Err(ChatError::MissingBody);
        }

        let value: Value = serde_json::from_slice(body).map_err(ChatError::MalformedBody)?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, ChatError> {
        if is_empty_body(&value) {
            return Err(ChatError::MissingBody);
        }

        let message = match value.get("message").and_then(Value::as_str) {
            Some(message) if !message.is_empty() => message.to_string(),
            _ => return Err(ChatError::InvalidMessage),
        };

        let weather_context = value
            .get("weatherContext")
            .filter(|v| v.is_object())
            .and_then(|v| WeatherContext::deserialize(v).ok());

        let conversation_history = value
            .get("conversationHistory")
            .and_then(Value::as_array)
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|entry| HistoryEntry::deserialize(entry).ok())
                    .collect()
            })
            .unwrap_or_default();

        Ok(ChatRequest {
            message,
            weather_context,
            conversation_history,
        })
    }
}

/// `null`, `false`, `0` and `""` count as no body at all.
fn is_empty_body(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

impl WeatherContext {
    /// Location, if present and non-blank. The weather block is only rendered when this is set.
    pub fn location(&self) -> Option<&str> {
        self.location
            .as_deref()
            .map(str::trim)
            .filter(|location| !location.is_empty())
    }

    /// Timestamp rendered as `YYYY-MM-DD HH:MM UTC` when it is RFC 3339, else verbatim.
    pub fn observed_at(&self) -> Option<String> {
        let raw = self.timestamp.as_deref()?.trim();
        if raw.is_empty() {
            return None;
        }

        Some(match DateTime::parse_from_rfc3339(raw) {
            Ok(parsed) => parsed
                .with_timezone(&Utc)
                .format("%Y-%m-%d %H:%M UTC")
                .to_string(),
            Err(_) => raw.to_string(),
        })
    }
}
