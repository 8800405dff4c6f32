//! The chat endpoint.
//!
//! `POST` runs the full pipeline, `OPTIONS` answers the CORS preflight and any
//! other method is rejected. CORS headers are added by middleware.

use axum::{body::Bytes, extract::State, http::StatusCode, Json};
use service_core::error::AppError;

use crate::error::{ChatError, MSG_METHOD_NOT_ALLOWED};
use crate::models::{ChatReply, ChatRequest};
use crate::services::chat as chat_service;
use crate::services::providers::ProviderError;
use crate::startup::AppState;

/// Answer a chat message.
pub async fn chat(State(state): State<AppState>, body: Bytes) -> Result<Json<ChatReply>, AppError> {
    match handle_chat(&state, &body).await {
        Ok(reply) => Ok(Json(reply)),
        Err(err) => {
            log_failure(&err);
            Err(err.into_app_error(state.config.dev_mode))
        }
    }
}

async fn handle_chat(state: &AppState, body: &[u8]) -> Result<ChatReply, ChatError> {
    let request = ChatRequest::from_body(body)?;

    let provider = state
        .text_provider
        .as_deref()
        .ok_or(ChatError::MissingApiKey)?;

    tracing::info!(
        message_len = request.message.len(),
        history_len = request.conversation_history.len(),
        has_weather = request.weather_context.is_some(),
        "Processing chat request"
    );

    let response = chat_service::answer(provider, &request).await?;
    Ok(ChatReply { response })
}

fn log_failure(err: &ChatError) {
    match err {
        ChatError::MissingBody | ChatError::MalformedBody(_) | ChatError::InvalidMessage => {
            tracing::debug!(error = %err, "Rejected chat request");
        }
        ChatError::MissingApiKey => {
            tracing::error!("GEMINI_API_KEY is not configured; chat requests cannot be served");
        }
        ChatError::Provider(ProviderError::UpstreamStatus { status, body }) => {
            tracing::warn!(status = *status, body = %body, "Gemini API returned an error");
        }
        ChatError::Provider(provider_err) => {
            tracing::error!(
                error = %provider_err,
                kind = provider_err.kind(),
                "Gemini API call failed"
            );
        }
    }
}

/// CORS preflight: 200 with an empty body.
pub async fn preflight() -> StatusCode {
    StatusCode::OK
}

/// Fallback for any method other than POST and OPTIONS.
pub async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed(MSG_METHOD_NOT_ALLOWED.to_string())
}
