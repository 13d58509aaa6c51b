//! Generative language model client.
//!
//! [`LanguageModel`] is the single operation the pipeline needs: prompt in, text
//! out. [`create_model`] builds the configured provider and wraps it in
//! [`throttle::Throttled`] so consecutive calls are spaced by
//! `[llm] min_interval_ms`.

pub mod gemini;
pub mod throttle;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::config::LlmConfig;
use crate::error::GenerationError;

#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Generate a completion for a single prompt.
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;

    /// Model identifier, for logs.
    fn model_name(&self) -> &str;
}

#[async_trait]
impl<M: LanguageModel + ?Sized> LanguageModel for Arc<M> {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        (**self).generate(prompt).await
    }

    fn model_name(&self) -> &str {
        (**self).model_name()
    }
}

/// Build the configured model client behind a minimum-interval gate.
pub fn create_model(config: &LlmConfig) -> anyhow::Result<Arc<dyn LanguageModel>> {
    let interval = Duration::from_millis(config.min_interval_ms);
    match config.provider.as_str() {
        "gemini" => {
            let api_key = config
                .api_key
                .clone()
                .ok_or_else(|| anyhow::anyhow!("gemini model requires an API key"))?;
            let client = gemini::GeminiClient::new(
                &config.base_url,
                &config.model,
                &api_key,
                Duration::from_secs(config.timeout_secs),
            )?;
            tracing::info!(model = %config.model, min_interval_ms = config.min_interval_ms, "language model ready");
            Ok(Arc::new(throttle::Throttled::new(client, interval)))
        }
        other => anyhow::bail!("unknown llm provider: {other}. Supported: gemini"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gemini_requires_api_key() {
        let config = LlmConfig::default();
        let err = create_model(&config).err().expect("should fail");
        assert!(err.to_string().contains("API key"));
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let config = LlmConfig {
            provider: "palm".into(),
            ..Default::default()
        };
        let err = create_model(&config).err().expect("should fail");
        assert!(err.to_string().contains("unknown llm provider"));
    }

    #[test]
    fn gemini_with_key_builds() {
        let config = LlmConfig {
            api_key: Some("test-key".into()),
            ..Default::default()
        };
        let model = create_model(&config).unwrap();
        assert_eq!(model.model_name(), "gemini-pro");
    }
}
