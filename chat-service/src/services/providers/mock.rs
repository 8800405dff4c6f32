//! Mock provider implementation for testing.

use super::{ProviderError, ProviderResponse, TextProvider};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Mock text provider that replays a scripted outcome and records every prompt.
pub struct MockTextProvider {
    outcome: Result<ProviderResponse, ProviderError>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl MockTextProvider {
    pub fn new(outcome: Result<ProviderResponse, ProviderError>) -> Self {
        Self {
            outcome,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Provider that always answers with the given text.
    pub fn replying(text: &str) -> Self {
        Self::new(Ok(ProviderResponse {
            finish_reason: Some(super::FinishReason::Complete),
            text: Some(text.to_string()),
        }))
    }

    pub fn failing(error: ProviderError) -> Self {
        Self::new(Err(error))
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .map(|prompts| prompts.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl TextProvider for MockTextProvider {
    async fn generate(&self, prompt: &str) -> Result<ProviderResponse, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        self.outcome.clone()
    }

    fn model(&self) -> &str {
        "mock"
    }
}
