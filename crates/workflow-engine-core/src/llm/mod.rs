//! LLM provider abstraction for `ai.*` actions and dynamic prompt
//! reinterpretation.

pub mod config;
pub mod providers;

use async_trait::async_trait;

use crate::error::Result;

pub use config::LlmConfig;
pub use providers::{AnthropicProvider, OpenAiProvider};

/// Grounded on the teacher's `ModelInstance` trait in
/// `nodes/agent.rs`, collapsed to the single `generate` entry point
/// `ai.generate`/`ai.interpret`/`ai.summarize` all funnel through (see
/// `executor::actions::ai`).
#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
        system: Option<&str>,
        temperature: Option<f32>,
        max_tokens: Option<u32>,
    ) -> Result<String>;
}

/// Builds the configured provider, or `None` if no provider config was
/// found — `ai.*` actions fail with `ProviderError` in that case, per
/// spec.md §4.7.
pub fn build_provider(config: &LlmConfig) -> Box<dyn LlmProvider> {
    match config.provider {
        config::ProviderKind::Claude => Box::new(AnthropicProvider::new(
            config.api_key.clone(),
            config.model.clone().unwrap_or_else(|| "claude-3-5-sonnet-20241022".to_string()),
        )),
        config::ProviderKind::OpenAi | config::ProviderKind::Custom => Box::new(OpenAiProvider::new(
            config.api_key.clone(),
            config.model.clone().unwrap_or_else(|| "gpt-4o-mini".to_string()),
        )),
    }
}
