//! Tool Protocol wire types (spec.md §4.4).
//!
//! Collapsed from the teacher's `MCPRequest`/`MCPResponse`/`ToolContent`
//! enums in `workflow-engine-mcp/src/protocol.rs` down to the two calls the
//! spec actually names — `list_tools` and `call_tool` — dropping the
//! `initialize`/capability-negotiation handshake, which has no counterpart
//! in the spec's Tool Protocol description.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "method")]
pub enum ToolRequest {
    #[serde(rename = "tools/list")]
    ListTools { id: String },
    #[serde(rename = "tools/call")]
    CallTool {
        id: String,
        name: String,
        arguments: HashMap<String, Value>,
    },
}

impl ToolRequest {
    pub fn id(&self) -> &str {
        match self {
            ToolRequest::ListTools { id } => id,
            ToolRequest::CallTool { id, .. } => id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ToolResponse {
    #[serde(rename = "result")]
    Result { id: String, result: ResponseResult },
    #[serde(rename = "error")]
    Error { id: String, error: ToolRpcError },
}

impl ToolResponse {
    pub fn id(&self) -> &str {
        match self {
            ToolResponse::Result { id, .. } => id,
            ToolResponse::Error { id, .. } => id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseResult {
    ListTools(ListToolsResult),
    CallTool(CallToolResult),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListToolsResult {
    pub tools: Vec<ToolDefinition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub input_schema: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallToolResult {
    pub content: Vec<ToolContent>,
    #[serde(default)]
    pub is_error: Option<bool>,
}

/// spec.md §4.4: "Unknown content types are passed through unchanged" —
/// modeled with a catch-all `Other` variant carrying the raw JSON. A plain
/// `#[serde(tag = "type")] ... #[serde(other)] Other` enum can't satisfy
/// this: serde's `other` marker on an internally-tagged enum only records
/// that the tag didn't match a known variant, it has nowhere to stash the
/// sibling fields. `Deserialize` is hand-written below so `Other` keeps the
/// full JSON object it was built from.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ToolContent {
    Text {
        #[serde(rename = "type")]
        kind: String,
        text: String,
    },
    Other(Value),
}

impl ToolContent {
    pub fn text(text: impl Into<String>) -> Self {
        ToolContent::Text {
            kind: "text".to_string(),
            text: text.into(),
        }
    }
}

impl<'de> Deserialize<'de> for ToolContent {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        if value.get("type").and_then(Value::as_str) == Some("text") {
            if let Some(text) = value.get("text").and_then(Value::as_str) {
                return Ok(ToolContent::text(text));
            }
        }
        Ok(ToolContent::Other(value))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolRpcError {
    pub code: i32,
    pub message: String,
    #[serde(default)]
    pub data: Option<Value>,
}

/// spec.md §4.4: "When the tool content is a single text block that parses
/// as JSON, the client returns the parsed object; otherwise it returns
/// `{result: text}`. Unknown content types are passed through unchanged."
pub fn extract_call_result(result: &CallToolResult) -> Value {
    if let [ToolContent::Text { text, .. }] = result.content.as_slice() {
        if let Ok(parsed) = serde_json::from_str::<Value>(text) {
            return parsed;
        }
        return serde_json::json!({"result": text});
    }
    serde_json::to_value(&result.content).unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_parsed_json_from_single_text_block() {
        let result = CallToolResult {
            content: vec![ToolContent::text(r#"{"branch": "main"}"#)],
            is_error: None,
        };
        assert_eq!(extract_call_result(&result), json!({"branch": "main"}));
    }

    #[test]
    fn wraps_plain_text_under_result_key() {
        let result = CallToolResult {
            content: vec![ToolContent::text("just text")],
            is_error: None,
        };
        assert_eq!(extract_call_result(&result), json!({"result": "just text"}));
    }

    #[test]
    fn unknown_content_type_round_trips_its_raw_json() {
        let raw = json!({"type": "image", "mime_type": "image/png", "data": "base64=="});
        let content: ToolContent = serde_json::from_value(raw.clone()).unwrap();
        assert!(matches!(content, ToolContent::Other(_)));
        assert_eq!(serde_json::to_value(&content).unwrap(), raw);
    }

    #[test]
    fn unknown_content_passes_through_extract_call_result_unchanged() {
        let raw = json!({"type": "resource", "uri": "file:///tmp/x"});
        let result = CallToolResult {
            content: vec![serde_json::from_value(raw.clone()).unwrap()],
            is_error: None,
        };
        assert_eq!(extract_call_result(&result), json!([raw]));
    }

    #[test]
    fn call_tool_request_serializes_with_method_tag() {
        let mut arguments = HashMap::new();
        arguments.insert("repo_path".to_string(), json!("."));
        let request = ToolRequest::CallTool {
            id: "1".to_string(),
            name: "git_status".to_string(),
            arguments,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["method"], "tools/call");
    }
}
