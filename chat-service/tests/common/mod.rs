#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use chat_service::config::{ChatConfig, GeminiSettings};
use chat_service::services::providers::TextProvider;
use chat_service::startup::{build_router, AppState, CHAT_PATH};
use secrecy::Secret;
use serde_json::Value;
use service_core::config::Config;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

pub const TEST_API_KEY: &str = "test-gemini-key";
pub const TEST_MODEL: &str = "gemini-test";

pub fn test_config(api_base_url: Option<&str>, dev_mode: bool) -> ChatConfig {
    ChatConfig {
        common: Config {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 0,
        },
        gemini: GeminiSettings {
            api_key: api_base_url.map(|_| Secret::new(TEST_API_KEY.to_string())),
            model: TEST_MODEL.to_string(),
            api_base_url: api_base_url.unwrap_or_default().to_string(),
            request_timeout: Duration::from_secs(2),
        },
        dev_mode,
        otlp_endpoint: None,
    }
}

/// Router backed by the real Gemini provider pointed at `api_base_url`.
pub fn gemini_router(api_base_url: &str, dev_mode: bool) -> Router {
    let state = AppState::from_config(test_config(Some(api_base_url), dev_mode))
        .expect("Failed to build app state");
    build_router(state)
}

/// Router with no API key configured.
pub fn keyless_router() -> Router {
    let state = AppState::from_config(test_config(None, false)).expect("Failed to build app state");
    build_router(state)
}

/// Router backed by an arbitrary provider.
pub fn provider_router(provider: Arc<dyn TextProvider>, dev_mode: bool) -> Router {
    let state = AppState::with_provider(test_config(None, dev_mode), Some(provider));
    build_router(state)
}

pub async fn post_chat(router: Router, body: &str) -> Response {
    router
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri(CHAT_PATH)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .expect("Failed to build request"),
        )
        .await
        .expect("Failed to execute request")
}

/// POST to the chat endpoint and decode the JSON reply.
pub async fn chat_json(router: Router, body: &str) -> (StatusCode, Value) {
    json_body(post_chat(router, body).await).await
}

pub async fn send(router: Router, method: Method, uri: &str) -> Response {
    router
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .expect("Failed to build request"),
        )
        .await
        .expect("Failed to execute request")
}

pub async fn body_bytes(response: Response) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body")
        .to_vec()
}

pub async fn json_body(response: Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = body_bytes(response).await;
    let json = serde_json::from_slice(&bytes).expect("Response body is not JSON");
    (status, json)
}

pub fn gemini_text_response(text: &str) -> Value {
    serde_json::json!({
        "candidates": [{
            "content": { "parts": [{ "text": text }], "role": "model" },
            "finishReason": "STOP"
        }],
        "usageMetadata": { "promptTokenCount": 42, "candidatesTokenCount": 7 }
    })
}

pub fn gemini_path() -> String {
    format!("/models/{}:generateContent", TEST_MODEL)
}
