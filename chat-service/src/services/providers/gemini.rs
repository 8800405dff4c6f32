//! Gemini AI provider implementation.
//!
//! Implements single-shot text generation against Google's Gemini
//! `generateContent` REST method.

use super::{FinishReason, ProviderError, ProviderResponse, TextProvider};
use crate::config::GeminiSettings;
use async_trait::async_trait;
use reqwest::dns::{Addrs, Name, Resolve, Resolving};
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::error::Error as StdError;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

type BoxError = Box<dyn StdError + Send + Sync>;

/// Harm categories sent with every request.
pub const SAFETY_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

/// Threshold applied to every category in [`SAFETY_CATEGORIES`].
pub const SAFETY_THRESHOLD: &str = "BLOCK_MEDIUM_AND_ABOVE";

/// Gemini provider configuration.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: Secret<String>,
    pub model: String,
    pub api_base_url: String,
    pub request_timeout: Duration,
}

impl GeminiConfig {
    /// `None` when no API key is configured.
    pub fn from_settings(settings: &GeminiSettings) -> Option<Self> {
        let api_key = settings.api_key.clone()?;
        Some(Self {
            api_key,
            model: settings.model.clone(),
            api_base_url: settings.api_base_url.clone(),
            request_timeout: settings.request_timeout,
        })
    }
}

/// Fixed sampling parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
    pub max_output_tokens: u32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_k: 40,
            top_p: 0.95,
            max_output_tokens: 1024,
        }
    }
}

/// Gemini text provider.
pub struct GeminiTextProvider {
    config: GeminiConfig,
    params: GenerationParams,
    client: Client,
}

impl GeminiTextProvider {
    pub fn new(config: GeminiConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .dns_resolver(Arc::new(SystemResolver))
            .build()
            .map_err(classify_transport_error)?;

        Ok(Self {
            config,
            params: GenerationParams::default(),
            client,
        })
    }

    /// Build the API URL for the given method. The key is attached as a query parameter.
    fn api_url(&self, method: &str) -> String {
        format!(
            "{}/models/{}:{}",
            self.config.api_base_url, self.config.model, method
        )
    }
}

#[async_trait]
impl TextProvider for GeminiTextProvider {
    async fn generate(&self, prompt: &str) -> Result<ProviderResponse, ProviderError> {
        let request = GenerateContentRequest::new(prompt, &self.params);

        tracing::debug!(
            model = %self.config.model,
            prompt_len = prompt.len(),
            "Sending request to Gemini API"
        );

        let response = self
            .client
            .post(self.api_url("generateContent"))
            .query(&[("key", self.config.api_key.expose_secret().as_str())])
            .json(&request)
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(classify_transport_error)?;

        if !status.is_success() {
            return Err(ProviderError::UpstreamStatus {
                status: status.as_u16(),
                body,
            });
        }

        let api_response = GenerateContentResponse::parse(&body)?;

        if let Some(usage) = &api_response.usage_metadata {
            tracing::debug!(
                model = %self.config.model,
                input_tokens = usage.prompt_token_count.unwrap_or(0),
                output_tokens = usage.candidates_token_count.unwrap_or(0),
                "Gemini usage"
            );
        }

        Ok(api_response.into_provider_response())
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}

// ============================================================================
// Transport error classification
// ============================================================================

/// Raised by [`SystemResolver`] so DNS failures can be told apart from other connect errors.
#[derive(Debug, Error)]
#[error("failed to resolve host '{host}'")]
pub struct DnsLookupError {
    host: String,
    #[source]
    source: std::io::Error,
}

/// System resolver that tags its failures with [`DnsLookupError`].
#[derive(Debug, Default)]
struct SystemResolver;

impl Resolve for SystemResolver {
    fn resolve(&self, name: Name) -> Resolving {
        Box::pin(async move {
            match tokio::net::lookup_host((name.as_str(), 0)).await {
                Ok(addrs) => {
                    let addrs: Addrs = Box::new(addrs.collect::<Vec<SocketAddr>>().into_iter());
                    Ok(addrs)
                }
                Err(source) => {
                    let host = name.as_str().to_string();
                    Err(Box::new(DnsLookupError { host, source }) as BoxError)
                }
            }
        })
    }
}

/// Map a `reqwest` failure onto a [`ProviderError`] variant.
///
/// The URL is stripped first since it carries the API key.
pub(crate) fn classify_transport_error(err: reqwest::Error) -> ProviderError {
    let err = err.without_url();
    let message = error_chain(&err);

    if is_dns_failure(&err) {
        ProviderError::DnsFailure(message)
    } else if err.is_timeout() {
        ProviderError::Timeout(message)
    } else if err.is_connect() || err.is_request() || err.is_body() {
        ProviderError::ConnectionFailed(message)
    } else if err.is_decode() {
        ProviderError::InvalidResponse(message)
    } else {
        ProviderError::Request(message)
    }
}

fn is_dns_failure(err: &(dyn StdError + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(e) = current {
        if e.is::<DnsLookupError>() {
            return true;
        }
        current = e.source();
    }
    false
}

fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut message = err.to_string();
    let mut current = err.source();
    while let Some(e) = current {
        message.push_str(": ");
        message.push_str(&e.to_string());
        current = e.source();
    }
    message
}

// ============================================================================
// Gemini API Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
    safety_settings: Vec<SafetySetting>,
}

impl GenerateContentRequest {
    fn new(prompt: &str, params: &GenerationParams) -> Self {
        Self {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: Some(prompt.to_string()),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: params.temperature,
                top_k: params.top_k,
                top_p: params.top_p,
                max_output_tokens: params.max_output_tokens,
                candidate_count: 1,
            },
            safety_settings: SAFETY_CATEGORIES
                .iter()
                .map(|category| SafetySetting {
                    category: category.to_string(),
                    threshold: SAFETY_THRESHOLD.to_string(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

/// A content part. Non-text parts (inline data, function calls) deserialize with `text: None`.
#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_k: u32,
    top_p: f32,
    max_output_tokens: u32,
    candidate_count: u32,
}

#[derive(Debug, Serialize)]
struct SafetySetting {
    category: String,
    threshold: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
}

impl GenerateContentResponse {
    /// Validate a raw body against the response schema.
    fn parse(body: &str) -> Result<Self, ProviderError> {
        serde_json::from_str(body).map_err(|e| ProviderError::InvalidResponse(e.to_string()))
    }

    fn into_provider_response(self) -> ProviderResponse {
        let Some(candidate) = self.candidates.into_iter().next() else {
            return ProviderResponse::default();
        };

        ProviderResponse {
            finish_reason: candidate
                .finish_reason
                .as_deref()
                .map(FinishReason::from_api),
            text: candidate
                .content
                .and_then(|content| content.parts.into_iter().next())
                .and_then(|part| part.text),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    /// Omitted by the API when the candidate was blocked.
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    prompt_token_count: Option<i32>,
    candidates_token_count: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_payload_shape() {
        let request = GenerateContentRequest::new("hello", &GenerationParams::default());
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(value["contents"][0]["role"], "user");
        assert_eq!(value["contents"][0]["parts"][0]["text"], "hello");

        let config = &value["generationConfig"];
        assert_eq!(config["topK"], 40);
        assert_eq!(config["maxOutputTokens"], 1024);
        assert_eq!(config["candidateCount"], 1);
        assert!((config["temperature"].as_f64().unwrap() - 0.7).abs() < 1e-6);
        assert!((config["topP"].as_f64().unwrap() - 0.95).abs() < 1e-6);

        let settings = value["safetySettings"].as_array().unwrap();
        assert_eq!(settings.len(), 4);
        assert!(settings
            .iter()
            .all(|s| s["threshold"] == "BLOCK_MEDIUM_AND_ABOVE"));
        assert_eq!(settings[3]["category"], "HARM_CATEGORY_DANGEROUS_CONTENT");
    }

    #[test]
    fn first_candidate_text_and_reason() {
        let body = json!({
            "candidates": [
                {
                    "content": {"role": "model", "parts": [{"text": "  Sunny.  "}]},
                    "finishReason": "STOP"
                },
                {"content": {"parts": [{"text": "ignored"}]}}
            ],
            "usageMetadata": {"promptTokenCount": 12, "candidatesTokenCount": 3}
        })
        .to_string();

        let response = GenerateContentResponse::parse(&body)
            .unwrap()
            .into_provider_response();
        assert_eq!(response.text.as_deref(), Some("  Sunny.  "));
        assert_eq!(response.finish_reason, Some(FinishReason::Complete));
        assert!(!response.is_safety_blocked());
    }

    #[test]
    fn blocked_candidate_without_content() {
        let body = json!({"candidates": [{"finishReason": "SAFETY"}]}).to_string();
        let response = GenerateContentResponse::parse(&body)
            .unwrap()
            .into_provider_response();
        assert!(response.is_safety_blocked());
        assert!(response.text.is_none());
    }

    #[test]
    fn missing_candidates_is_empty_response() {
        let response = GenerateContentResponse::parse("{}")
            .unwrap()
            .into_provider_response();
        assert_eq!(response, ProviderResponse::default());
    }

    #[test]
    fn schema_violations_are_invalid_responses() {
        for body in ["<html>oops</html>", r#"{"candidates": "none"}"#, ""] {
            assert!(matches!(
                GenerateContentResponse::parse(body),
                Err(ProviderError::InvalidResponse(_))
            ));
        }
    }

    #[test]
    fn finish_reason_mapping() {
        assert_eq!(FinishReason::from_api("MAX_TOKENS"), FinishReason::Length);
        assert_eq!(
            FinishReason::from_api("PROHIBITED_CONTENT"),
            FinishReason::ContentFilter
        );
        assert_eq!(
            FinishReason::from_api("RECITATION"),
            FinishReason::Other("RECITATION".to_string())
        );
    }

    #[derive(Debug, Error)]
    #[error("connect error")]
    struct Wrapper(#[source] DnsLookupError);

    #[test]
    fn dns_failure_found_in_source_chain() {
        let err = Wrapper(DnsLookupError {
            host: "gemini.invalid".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such host"),
        });
        assert!(is_dns_failure(&err));
        assert_eq!(
            error_chain(&err),
            "connect error: failed to resolve host 'gemini.invalid': no such host"
        );

        let other = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        assert!(!is_dns_failure(&other));
    }

    #[tokio::test]
    async fn resolver_tags_lookup_failures() {
        let name: Name = "gemini.invalid".parse().unwrap();
        match SystemResolver.resolve(name).await {
            Ok(_) => panic!("gemini.invalid must not resolve"),
            Err(err) => {
                assert!(is_dns_failure(&*err));
                assert!(err.to_string().contains("gemini.invalid"));
            }
        }
    }

    #[tokio::test]
    async fn resolver_returns_addresses_for_localhost() {
        let name: Name = "localhost".parse().unwrap();
        let addrs: Vec<SocketAddr> = match SystemResolver.resolve(name).await {
            Ok(addrs) => addrs.collect(),
            Err(err) => panic!("localhost lookup failed: {err}"),
        };
        assert!(addrs.iter().any(|addr| addr.ip().is_loopback()));
    }

    #[test]
    fn config_requires_api_key() {
        let settings = GeminiSettings::default();
        assert!(GeminiConfig::from_settings(&settings).is_none());

        let settings = GeminiSettings {
            api_key: Some(Secret::new("k".to_string())),
            ..GeminiSettings::default()
        };
        let config = GeminiConfig::from_settings(&settings).unwrap();
        assert_eq!(config.model, settings.model);
    }
}
