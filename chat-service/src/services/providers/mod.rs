//! AI provider abstractions and implementations.
//!
//! The chat handler only depends on [`TextProvider`], so the Gemini backend
//! can be swapped for the mock in tests.

pub mod gemini;
pub mod mock;

use async_trait::async_trait;
use thiserror::Error;

/// Closed set of ways a provider call can fail.
///
/// The networking layer classifies failures when they happen; callers match
/// on the variant and never inspect message text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("DNS resolution failed: {0}")]
    DnsFailure(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Upstream returned status {status}")]
    UpstreamStatus { status: u16, body: String },

    #[error("Request failed: {0}")]
    Request(String),
}

impl ProviderError {
    /// Short label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ProviderError::ConnectionFailed(_) => "connection_failed",
            ProviderError::DnsFailure(_) => "dns_failure",
            ProviderError::Timeout(_) => "timeout",
            ProviderError::InvalidResponse(_) => "invalid_response",
            ProviderError::UpstreamStatus { .. } => "upstream_status",
            ProviderError::Request(_) => "request",
        }
    }
}

/// Reason why generation stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinishReason {
    Complete,
    Length,
    ContentFilter,
    Other(String),
}

impl FinishReason {
    pub fn from_api(reason: &str) -> Self {
        match reason {
            "STOP" => FinishReason::Complete,
            "MAX_TOKENS" => FinishReason::Length,
            "SAFETY" | "PROHIBITED_CONTENT" | "BLOCKLIST" | "SPII" => FinishReason::ContentFilter,
            other => FinishReason::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            FinishReason::Complete => "complete",
            FinishReason::Length => "length",
            FinishReason::ContentFilter => "content_filter",
            FinishReason::Other(reason) => reason,
        }
    }
}

/// The first candidate of a generation, if the provider returned one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderResponse {
    /// `None` when there was no candidate or it carried no finish reason.
    pub finish_reason: Option<FinishReason>,

    /// Text of the candidate's first part, untrimmed.
    pub text: Option<String>,
}

impl ProviderResponse {
    pub fn is_safety_blocked(&self) -> bool {
        self.finish_reason == Some(FinishReason::ContentFilter)
    }
}

/// Trait for single-shot text generation providers (e.g., Gemini).
#[async_trait]
pub trait TextProvider: Send + Sync {
    /// Send one prompt and return the first candidate.
    async fn generate(&self, prompt: &str) -> Result<ProviderResponse, ProviderError>;

    /// Model identifier, for logs and metrics.
    fn model(&self) -> &str;
}
