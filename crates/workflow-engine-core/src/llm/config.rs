//! LLM provider configuration loading (spec.md §4.11/§6).
//!
//! Priority order, matching the teacher's layered configuration pattern:
//! environment variables, then a `.env` file (via `dotenvy`), then a JSON
//! config at `<config-home>/config.json`.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Result, WorkflowError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    Claude,
    OpenAi,
    Custom,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub provider: ProviderKind,
    pub api_key: String,
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct FileConfig {
    provider: Option<ProviderKind>,
    api_key: Option<String>,
    model: Option<String>,
}

/// Resolves the LLM provider config following spec.md §6's priority order.
/// Returns `Ok(None)` rather than an error when nothing is configured — the
/// caller decides whether that's fatal (it only is once an `ai.*` action is
/// actually dispatched).
pub fn load(config_home: &Path) -> Result<Option<LlmConfig>> {
    dotenvy::dotenv().ok();

    if let Some(cfg) = from_env() {
        return Ok(Some(cfg));
    }

    let config_path = config_home.join("config.json");
    if config_path.is_file() {
        let text = std::fs::read_to_string(&config_path).map_err(|e| WorkflowError::StorageError {
            message: format!("could not read {}: {}", config_path.display(), e),
        })?;
        let file: FileConfig = serde_json::from_str(&text).map_err(|e| WorkflowError::ValidationError {
            violations: vec![format!("invalid config.json: {}", e)],
        })?;
        if let (Some(provider), Some(api_key)) = (file.provider, file.api_key) {
            return Ok(Some(LlmConfig {
                provider,
                api_key,
                model: file.model,
            }));
        }
    }

    Ok(None)
}

fn from_env() -> Option<LlmConfig> {
    if let Ok(api_key) = std::env::var("ANTHROPIC_API_KEY") {
        return Some(LlmConfig {
            provider: ProviderKind::Claude,
            api_key,
            model: std::env::var("ANTHROPIC_MODEL").ok(),
        });
    }
    if let Ok(api_key) = std::env::var("OPENAI_API_KEY") {
        return Some(LlmConfig {
            provider: ProviderKind::OpenAi,
            api_key,
            model: std::env::var("OPENAI_MODEL").ok(),
        });
    }
    None
}
