//! A terminal-backed [`PromptHandler`]: reads answers from stdin, optionally
//! reinterpreting them with an LLM provider when a prompt asks for it.

use std::io::Write;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};

use workflow_engine_core::error::Result;
use workflow_engine_core::llm::LlmProvider;
use workflow_engine_core::prompt::{
    apply_default, reinterpret, validate_select, AskRequest, AskResponse, PromptHandler,
};

pub struct StdinPromptHandler {
    llm_provider: Option<Arc<dyn LlmProvider>>,
}

impl StdinPromptHandler {
    pub fn new(llm_provider: Option<Arc<dyn LlmProvider>>) -> Self {
        Self { llm_provider }
    }

    async fn read_line(&self, message: &str) -> Result<String> {
        print!("{} ", message);
        std::io::stdout().flush().ok();
        let mut line = String::new();
        BufReader::new(tokio::io::stdin())
            .read_line(&mut line)
            .await
            .ok();
        Ok(line.trim_end_matches(['\n', '\r']).to_string())
    }
}

#[async_trait]
impl PromptHandler for StdinPromptHandler {
    async fn ask(&self, request: AskRequest) -> Result<AskResponse> {
        let raw = self.read_line(&request.message).await?;
        let raw = apply_default(&raw, request.default.as_deref());

        let interpreted = if request.dynamic {
            match &self.llm_provider {
                Some(provider) => Some(reinterpret(provider.as_ref(), &raw).await?),
                None => None,
            }
        } else {
            None
        };

        Ok(AskResponse { raw, interpreted })
    }

    async fn confirm(&self, message: &str, default: Option<bool>) -> Result<bool> {
        let suffix = match default {
            Some(true) => " [Y/n]",
            Some(false) => " [y/N]",
            None => " [y/n]",
        };
        let raw = self.read_line(&format!("{}{}", message, suffix)).await?;
        let answer = raw.trim().to_lowercase();
        Ok(match answer.as_str() {
            "" => default.unwrap_or(false),
            "y" | "yes" => true,
            "n" | "no" => false,
            _ => default.unwrap_or(false),
        })
    }

    async fn select(&self, message: &str, options: &[String]) -> Result<String> {
        let listed = format!("{} ({})", message, options.join(", "));
        loop {
            let raw = self.read_line(&listed).await?;
            if let Some(valid) = validate_select(raw.trim(), options) {
                return Ok(valid.to_string());
            }
            println!("'{}' is not one of the offered options.", raw.trim());
        }
    }
}
