//! Concrete `LlmProvider` implementations.
//!
//! Grounded on `OpenAIModelInstance`/`AnthropicModelInstance` in the
//! teacher's `nodes/agent.rs`: a `reqwest::Client`, a bearer/`x-api-key`
//! header, and a JSON body shaped for each vendor's chat-completions
//! endpoint.

use async_trait::async_trait;
use serde_json::json;

use crate::error::{Result, WorkflowError};
use crate::llm::LlmProvider;

pub struct AnthropicProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl AnthropicProvider {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model,
        }
    }
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    async fn generate(
        &self,
        prompt: &str,
        system: Option<&str>,
        temperature: Option<f32>,
        max_tokens: Option<u32>,
    ) -> Result<String> {
        let mut body = json!({
            "model": self.model,
            "max_tokens": max_tokens.unwrap_or(1024),
            "messages": [{"role": "user", "content": prompt}],
        });
        if let Some(system) = system {
            body["system"] = json!(system);
        }
        if let Some(temperature) = temperature {
            body["temperature"] = json!(temperature);
        }

        let response = self
            .client
            .post("https://api.anthropic.com/v1/messages")
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&body)
            .send()
            .await
            .map_err(|e| WorkflowError::ProviderError {
                message: format!("Anthropic request failed: {}", e),
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(WorkflowError::ProviderError {
                message: format!("Anthropic API error {}: {}", status, text),
            });
        }

        let value: serde_json::Value = response.json().await.map_err(|e| WorkflowError::ProviderError {
            message: format!("could not parse Anthropic response: {}", e),
        })?;

        value["content"][0]["text"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| WorkflowError::ProviderError {
                message: "unexpected Anthropic response shape".to_string(),
            })
    }
}

pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl OpenAiProvider {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model,
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn generate(
        &self,
        prompt: &str,
        system: Option<&str>,
        temperature: Option<f32>,
        max_tokens: Option<u32>,
    ) -> Result<String> {
        let mut messages = Vec::new();
        if let Some(system) = system {
            messages.push(json!({"role": "system", "content": system}));
        }
        messages.push(json!({"role": "user", "content": prompt}));

        let mut body = json!({
            "model": self.model,
            "messages": messages,
        });
        if let Some(temperature) = temperature {
            body["temperature"] = json!(temperature);
        }
        if let Some(max_tokens) = max_tokens {
            body["max_tokens"] = json!(max_tokens);
        }

        let response = self
            .client
            .post("https://api.openai.com/v1/chat/completions")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| WorkflowError::ProviderError {
                message: format!("OpenAI request failed: {}", e),
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(WorkflowError::ProviderError {
                message: format!("OpenAI API error {}: {}", status, text),
            });
        }

        let value: serde_json::Value = response.json().await.map_err(|e| WorkflowError::ProviderError {
            message: format!("could not parse OpenAI response: {}", e),
        })?;

        value["choices"][0]["message"]["content"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| WorkflowError::ProviderError {
                message: "unexpected OpenAI response shape".to_string(),
            })
    }
}
