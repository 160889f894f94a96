//! Timed calls into the shared completion engine.

use crate::error::{Error, Result};
use crewrelay_llm::{CompletionRequest, LlmProvider, Message};
use std::time::Duration;
use tracing::debug;

/// Model parameters applied to every request
#[derive(Debug, Clone)]
pub struct CompletionSettings {
    /// Model name (empty = provider default)
    pub model: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Maximum tokens to generate
    pub max_tokens: Option<u32>,
    /// Upper bound on one engine call
    pub request_timeout: Duration,
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            model: crewrelay_llm::openai::DEFAULT_MODEL.to_string(),
            temperature: 0.7,
            max_tokens: None,
            request_timeout: Duration::from_secs(60),
        }
    }
}

impl CompletionSettings {
    /// Build a request carrying these settings
    #[must_use]
    pub fn request(&self, messages: Vec<Message>) -> CompletionRequest {
        CompletionRequest::new(&self.model)
            .with_messages(messages)
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens)
    }

    /// Set the request timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// Run one completion, mapping engine errors to `Upstream` and an elapsed
/// deadline to `Timeout`.
pub async fn complete(
    provider: &dyn LlmProvider,
    settings: &CompletionSettings,
    messages: Vec<Message>,
) -> Result<String> {
    let request = settings.request(messages);
    let timeout = settings.request_timeout;

    match tokio::time::timeout(timeout, provider.complete(request)).await {
        Ok(Ok(response)) => {
            debug!(
                model = %response.model,
                chars = response.content.len(),
                "Completion received"
            );
            Ok(response.content)
        }
        Ok(Err(e)) => Err(Error::Upstream(e)),
        Err(_) => Err(Error::Timeout(timeout.as_millis() as u64)),
    }
}
