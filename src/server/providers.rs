//! Completion engine resolution

use super::config::LlmConfig;
use anyhow::{Context, Result};
use crewrelay_llm::{LlmProvider, OpenAiConfig, OpenAiProvider};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Build the OpenAI provider from `OPENAI_API_KEY` plus `[llm]` settings.
///
/// Fails when the key is missing so the server never binds without one.
pub fn resolve_llm_provider(llm_config: &LlmConfig) -> Result<Arc<dyn LlmProvider>> {
    let mut config = OpenAiConfig::from_env()
        .context("OpenAI credentials not configured (set OPENAI_API_KEY)")?
        .with_model(&llm_config.model)
        .with_timeout(Duration::from_secs(llm_config.request_timeout_secs));

    if let Some(base_url) = &llm_config.base_url {
        config = config.with_base_url(base_url);
    }

    info!(
        model = %llm_config.model,
        base_url = config.base_url.as_deref().unwrap_or("default"),
        "Registered OpenAI provider"
    );
    Ok(Arc::new(OpenAiProvider::new(config)))
}
