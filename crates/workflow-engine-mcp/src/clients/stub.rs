//! The in-process deterministic stub used when a tool server has no entry
//! in the config file (spec.md §4.4's hybrid-policy fallback).
//!
//! spec.md §9: "The stub set is deliberately minimal; do not expand it in a
//! rewrite" — version-control, repo-hosting, and filesystem, matching the
//! three families the spec calls out.

use serde_json::{json, Value};

use workflow_engine_core::error::{Result, WorkflowError};
use workflow_engine_core::tool_client::ToolDescriptor;

pub const STUB_SERVERS: [&str; 3] = ["git", "github", "filesystem"];

pub fn is_stubbed(server_name: &str) -> bool {
    STUB_SERVERS.contains(&server_name)
}

pub fn list_tools(server_name: &str) -> Vec<ToolDescriptor> {
    match server_name {
        "git" => vec![
            ToolDescriptor {
                name: "git_status".to_string(),
                description: Some("Report working tree status".to_string()),
                input_schema: json!({"type": "object", "properties": {"repo_path": {"type": "string"}}}),
            },
            ToolDescriptor {
                name: "git_log".to_string(),
                description: Some("List recent commits".to_string()),
                input_schema: json!({"type": "object", "properties": {"repo_path": {"type": "string"}}}),
            },
        ],
        "github" => vec![ToolDescriptor {
            name: "get_repository".to_string(),
            description: Some("Fetch repository metadata".to_string()),
            input_schema: json!({"type": "object", "properties": {"owner": {"type": "string"}, "repo": {"type": "string"}}}),
        }],
        "filesystem" => vec![ToolDescriptor {
            name: "read_file".to_string(),
            description: Some("Read a file from the local filesystem".to_string()),
            input_schema: json!({"type": "object", "properties": {"path": {"type": "string"}}}),
        }],
        _ => Vec::new(),
    }
}

/// Returns a deterministic fixture for `tool_name`, or a `ToolError` if the
/// stub doesn't recognize it.
pub fn call_tool(server_name: &str, tool_name: &str, params: &Value) -> Result<Value> {
    match (server_name, tool_name) {
        ("git", "git_status") => Ok(json!({
            "branch": "main",
            "clean": true,
            "repo_path": params.get("repo_path").cloned().unwrap_or(json!(".")),
        })),
        ("git", "git_log") => Ok(json!({
            "commits": [{"hash": "0000000", "message": "stub commit", "author": "stub"}],
        })),
        ("github", "get_repository") => Ok(json!({
            "owner": params.get("owner").cloned().unwrap_or(Value::Null),
            "repo": params.get("repo").cloned().unwrap_or(Value::Null),
            "default_branch": "main",
            "private": false,
        })),
        ("filesystem", "read_file") => {
            let path = params.get("path").and_then(Value::as_str).unwrap_or_default();
            match std::fs::read_to_string(path) {
                Ok(contents) => Ok(json!({"contents": contents})),
                Err(e) => Err(WorkflowError::ToolError {
                    server: server_name.to_string(),
                    tool: tool_name.to_string(),
                    message: format!("could not read '{}': {}", path, e),
                }),
            }
        }
        _ => Err(WorkflowError::ToolError {
            server: server_name.to_string(),
            tool: tool_name.to_string(),
            message: format!("stub server '{}' has no tool '{}'", server_name, tool_name),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn git_status_returns_deterministic_fixture() {
        let result = call_tool("git", "git_status", &json!({"repo_path": "."})).unwrap();
        assert_eq!(result["branch"], "main");
        assert_eq!(result["clean"], true);
    }

    #[test]
    fn unknown_tool_on_a_stubbed_server_fails() {
        let err = call_tool("git", "git_push", &json!({})).unwrap_err();
        assert!(matches!(err, WorkflowError::ToolError { .. }));
    }

    #[test]
    fn only_the_minimal_stub_set_is_recognized() {
        assert!(is_stubbed("git"));
        assert!(!is_stubbed("slack"));
    }
}
