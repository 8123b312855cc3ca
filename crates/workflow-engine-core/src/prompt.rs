//! Prompt Handler: asking a human (or an automated responder) for a value
//! (spec.md §4.5).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::llm::LlmProvider;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptKind {
    Text,
    Confirm,
    Select,
}

#[derive(Debug, Clone, Default)]
pub struct AskRequest {
    pub message: String,
    pub kind: Option<PromptKind>,
    pub default: Option<String>,
    pub options: Option<Vec<String>>,
    pub dynamic: bool,
}

/// Result of a `text` prompt with `dynamic: true`: both the raw input and
/// the LLM's reinterpretation are surfaced, per spec.md §4.5.
#[derive(Debug, Clone)]
pub struct AskResponse {
    pub raw: String,
    pub interpreted: Option<String>,
}

#[async_trait]
pub trait PromptHandler: Send + Sync {
    async fn ask(&self, request: AskRequest) -> Result<AskResponse>;
    async fn confirm(&self, message: &str, default: Option<bool>) -> Result<bool>;
    async fn select(&self, message: &str, options: &[String]) -> Result<String>;
}

/// Shared reinterpretation logic `ask` uses when `dynamic` is requested and
/// an LLM provider is configured. Kept as a free function so both the real
/// prompt handler and tests can exercise it without an I/O dependency.
pub async fn reinterpret(provider: &dyn LlmProvider, raw: &str) -> Result<String> {
    let prompt = format!(
        "Reinterpret the following answer concisely, keeping its meaning intact:\n\n{}",
        raw
    );
    provider.generate(&prompt, None, None, None).await
}

/// Applies spec.md §4.5's default-when-empty rule for `text` prompts:
/// "Empty text input with a default returns the default."
pub fn apply_default(raw: &str, default: Option<&str>) -> String {
    if raw.trim().is_empty() {
        default.unwrap_or(raw).to_string()
    } else {
        raw.to_string()
    }
}

/// Validates a `select` answer is one of the offered options, per spec.md
/// §4.5: "Select input is validated to be within the offered options."
pub fn validate_select<'a>(answer: &str, options: &'a [String]) -> Option<&'a str> {
    options.iter().find(|o| o.as_str() == answer).map(|s| s.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_falls_back_to_default() {
        assert_eq!(apply_default("", Some("fallback")), "fallback");
        assert_eq!(apply_default("  ", Some("fallback")), "fallback");
        assert_eq!(apply_default("typed", Some("fallback")), "typed");
    }

    #[test]
    fn select_validates_membership() {
        let options = vec!["a".to_string(), "b".to_string()];
        assert_eq!(validate_select("a", &options), Some("a"));
        assert_eq!(validate_select("c", &options), None);
    }
}
