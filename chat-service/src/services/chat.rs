//! Chat orchestration: compose, call the provider once, pick the reply text.

use std::time::Instant;

use super::metrics;
use super::prompt::compose_prompt;
use super::providers::{ProviderError, ProviderResponse, TextProvider};
use crate::models::ChatRequest;

/// Reply used when the provider returned no usable text.
pub const DEFAULT_REPLY: &str =
    "I'm sorry, I couldn't generate a response right now. Please try asking again.";

/// Reply used when the provider blocked the candidate on safety grounds.
pub const SAFETY_REPLY: &str = "I'm sorry, but I can't respond to that request. \
Please try rephrasing your question about the weather.";

/// Choose the reply text for a successful provider call.
///
/// A safety block wins over any text; otherwise non-blank text is used trimmed.
pub fn reply_text(response: &ProviderResponse) -> String {
    if response.is_safety_blocked() {
        return SAFETY_REPLY.to_string();
    }

    response
        .text
        .as_deref()
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .unwrap_or(DEFAULT_REPLY)
        .to_string()
}

/// Answer one chat request with a single provider call.
pub async fn answer(
    provider: &dyn TextProvider,
    request: &ChatRequest,
) -> Result<String, ProviderError> {
    let prompt = compose_prompt(request);

    let start = Instant::now();
    let result = provider.generate(&prompt).await;
    let elapsed = start.elapsed().as_secs_f64();

    match &result {
        Ok(response) => {
            let finish_reason = response
                .finish_reason
                .as_ref()
                .map(|r| r.as_str())
                .unwrap_or("none");
            metrics::record_upstream_call(provider.model(), "success", elapsed);
            tracing::info!(
                model = %provider.model(),
                finish_reason = %finish_reason,
                latency_secs = elapsed,
                "Provider call completed"
            );
        }
        Err(err) => {
            metrics::record_upstream_call(provider.model(), err.kind(), elapsed);
        }
    }

    result.map(|response| reply_text(&response))
}
