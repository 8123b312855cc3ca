//! The workflow document model (spec §3).
//!
//! Grounded on the source's `src/workflows/schema.rs` `WorkflowDefinition`/
//! `StepDefinition`, collapsed from that file's node-graph step kinds down to
//! the single `namespace.name` action shape this engine dispatches on.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

fn default_version() -> String {
    "1.0.0".to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptMode {
    Static,
    Dynamic,
    Both,
}

impl Default for PromptMode {
    fn default() -> Self {
        PromptMode::Both
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamType {
    String,
    Number,
    Boolean,
    Array,
    Enum,
}

/// An entry in `config_schema`: declares a parameter the workflow accepts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigParam {
    #[serde(rename = "type")]
    pub param_type: ParamType,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub default: Option<Value>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub enum_values: Option<Vec<Value>>,
}

/// `step.retry`: number of extra attempts and the delay between them.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub attempts: u32,
    #[serde(default)]
    pub delay: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    #[serde(default)]
    pub id: Option<String>,
    pub action: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub params: Option<Map<String, Value>>,
    #[serde(rename = "if", default)]
    pub condition: Option<String>,
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default)]
    pub retry: Option<RetryPolicy>,
}

impl Step {
    /// `id` if set, else the synthesized `step-<index>` spec.md §3 calls for.
    pub fn resolved_id(&self, index: usize) -> String {
        self.id.clone().unwrap_or_else(|| format!("step-{}", index))
    }

    /// Splits `action` into its `namespace.name` halves. A malformed action
    /// without a dot is treated as belonging to the empty namespace, which
    /// never matches a built-in or tool server and so fails at dispatch.
    pub fn namespace_and_name(&self) -> (&str, &str) {
        match self.action.split_once('.') {
            Some((ns, name)) => (ns, name),
            None => ("", self.action.as_str()),
        }
    }

    pub fn params_value(&self) -> Value {
        match &self.params {
            Some(map) => Value::Object(map.clone()),
            None => Value::Object(Map::new()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub mcps_required: Vec<String>,
    #[serde(default)]
    pub config_schema: HashMap<String, ConfigParam>,
    pub steps: Vec<Step>,
    #[serde(default)]
    pub timeout: Option<u64>,
    #[serde(default)]
    pub prompt_mode: PromptMode,

    /// Top-level keys not recognized above. spec.md §4.2: "Unknown top-level
    /// keys are preserved", so a load→save round trip doesn't drop them.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
