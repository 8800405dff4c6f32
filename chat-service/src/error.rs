//! Chat handler failures and their translation to HTTP responses.

use axum::http::StatusCode;
use service_core::error::AppError;
use thiserror::Error;

use crate::services::providers::ProviderError;

pub const MSG_BODY_REQUIRED: &str = "Request body is required";
pub const MSG_BODY_MALFORMED: &str = "Request body must be valid JSON";
pub const MSG_MESSAGE_REQUIRED: &str = "Message is required and must be a string";
pub const MSG_API_KEY_MISSING: &str = "API key not configured";
pub const MSG_METHOD_NOT_ALLOWED: &str = "Only POST requests allowed";

pub const MSG_UPSTREAM_BAD_REQUEST: &str =
    "Invalid request to AI service - check your API key format";
pub const MSG_UPSTREAM_UNAUTHORIZED: &str = "Invalid API key - please check your GEMINI_API_KEY";
pub const MSG_UPSTREAM_FORBIDDEN: &str =
    "API access forbidden - check your API key permissions and billing";
pub const MSG_UPSTREAM_RATE_LIMITED: &str = "Too many requests - please try again later";
pub const MSG_UPSTREAM_UNAVAILABLE: &str = "AI service temporarily unavailable";
pub const MSG_UPSTREAM_OTHER: &str = "Failed to get response from AI service";

pub const MSG_CONNECTION_FAILED: &str =
    "Failed to connect to AI service - check internet connection";
pub const MSG_DNS_FAILED: &str = "DNS resolution failed - check internet connection";
pub const MSG_INVALID_RESPONSE: &str = "Invalid response from AI service";
pub const MSG_TIMEOUT: &str = "AI service request timed out";
pub const MSG_INTERNAL: &str = "Internal server error";

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("request body is missing")]
    MissingBody,

    #[error("request body is not valid JSON: {0}")]
    MalformedBody(#[source] serde_json::Error),

    #[error("message is missing or not a string")]
    InvalidMessage,

    #[error("GEMINI_API_KEY is not configured")]
    MissingApiKey,

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Client-facing message for a non-success upstream status.
pub fn upstream_status_message(status: u16) -> &'static str {
    match status {
        400 => MSG_UPSTREAM_BAD_REQUEST,
        401 => MSG_UPSTREAM_UNAUTHORIZED,
        403 => MSG_UPSTREAM_FORBIDDEN,
        429 => MSG_UPSTREAM_RATE_LIMITED,
        s if s >= 500 => MSG_UPSTREAM_UNAVAILABLE,
        _ => MSG_UPSTREAM_OTHER,
    }
}

impl ChatError {
    /// Translate into the boundary error. `details` is attached only when `dev_mode` is set.
    pub fn into_app_error(self, dev_mode: bool) -> AppError {
        let gate = |details: String| dev_mode.then_some(details);

        match self {
            ChatError::MissingBody => AppError::bad_request(MSG_BODY_REQUIRED),
            ChatError::MalformedBody(err) => AppError::BadRequest {
                message: MSG_BODY_MALFORMED.to_string(),
                details: gate(err.to_string()),
            },
            ChatError::InvalidMessage => AppError::bad_request(MSG_MESSAGE_REQUIRED),
            ChatError::MissingApiKey => AppError::Upstream {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: MSG_API_KEY_MISSING.to_string(),
                details: None,
            },
            ChatError::Provider(err) => {
                let (status, message, details) = match err {
                    ProviderError::UpstreamStatus { status, body } => (
                        StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY),
                        upstream_status_message(status),
                        body,
                    ),
                    ProviderError::ConnectionFailed(msg) => {
                        (StatusCode::SERVICE_UNAVAILABLE, MSG_CONNECTION_FAILED, msg)
                    }
                    ProviderError::DnsFailure(msg) => {
                        (StatusCode::SERVICE_UNAVAILABLE, MSG_DNS_FAILED, msg)
                    }
                    ProviderError::InvalidResponse(msg) => {
                        (StatusCode::BAD_GATEWAY, MSG_INVALID_RESPONSE, msg)
                    }
                    ProviderError::Timeout(msg) => (StatusCode::GATEWAY_TIMEOUT, MSG_TIMEOUT, msg),
                    ProviderError::Request(msg) => {
                        (StatusCode::INTERNAL_SERVER_ERROR, MSG_INTERNAL, msg)
                    }
                };

                AppError::Upstream {
                    status,
                    message: message.to_string(),
                    details: gate(details),
                }
            }
        }
    }
}
