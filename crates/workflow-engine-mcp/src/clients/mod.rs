//! The Tool Client: hybrid real/stub dispatch (spec.md §4.4).
//!
//! On first use of a server, a config entry means a real subprocess; no
//! entry but a recognized name means the deterministic stub; neither means
//! `Connect` fails. Grounded on the teacher's `MCPClient` trait
//! (`clients/mod.rs`) and `StdioMcpClient` (`clients/stdio.rs`), but unified
//! under the spec's own vocabulary rather than the source's inconsistent
//! `MCPClient`/`McpClient` capitalization.

pub mod stdio;
pub mod stub;

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::sync::RwLock;

use workflow_engine_core::error::{Result, WorkflowError};
use workflow_engine_core::tool_client::{ToolClient, ToolDescriptor};

use crate::clients::stdio::StdioServerConnection;
use crate::config::ToolServerConfig;

enum Connection {
    Real(StdioServerConnection),
    Stub,
}

/// Implements [`ToolClient`] with the hybrid policy spec.md §4.4 describes.
pub struct HybridToolClient {
    config: ToolServerConfig,
    connections: RwLock<HashMap<String, Connection>>,
}

impl HybridToolClient {
    pub fn new(config: ToolServerConfig) -> Self {
        Self {
            config,
            connections: RwLock::new(HashMap::new()),
        }
    }

    pub fn from_config_path(path: PathBuf) -> Result<Self> {
        Ok(Self::new(ToolServerConfig::load(&path)?))
    }
}

#[async_trait]
impl ToolClient for HybridToolClient {
    async fn connect(&self, server_name: &str) -> Result<()> {
        if self.is_connected(server_name).await {
            return Ok(());
        }

        if let Some(server_config) = self.config.get(server_name) {
            let connection = StdioServerConnection::spawn(server_name, server_config).await?;
            self.connections
                .write()
                .await
                .insert(server_name.to_string(), Connection::Real(connection));
            return Ok(());
        }

        if stub::is_stubbed(server_name) {
            self.connections
                .write()
                .await
                .insert(server_name.to_string(), Connection::Stub);
            return Ok(());
        }

        Err(WorkflowError::ToolError {
            server: server_name.to_string(),
            tool: String::new(),
            message: format!(
                "no config entry and no stub for tool server '{}'",
                server_name
            ),
        })
    }

    async fn disconnect(&self, server_name: &str) -> Result<()> {
        if let Some(connection) = self.connections.write().await.remove(server_name) {
            if let Connection::Real(conn) = connection {
                conn.shutdown().await;
            }
        }
        Ok(())
    }

    async fn call_tool(&self, server_name: &str, tool_name: &str, params: serde_json::Value) -> Result<serde_json::Value> {
        // A dead subprocess is observed here rather than respawned, per
        // spec.md §4.4: "the client marks the server disconnected and does
        // not silently respawn."
        let dead = {
            let guard = self.connections.read().await;
            match guard.get(server_name) {
                Some(Connection::Real(conn)) => !conn.is_connected().await,
                Some(Connection::Stub) => false,
                None => {
                    return Err(WorkflowError::ToolError {
                        server: server_name.to_string(),
                        tool: tool_name.to_string(),
                        message: "tool server is not connected".to_string(),
                    })
                }
            }
        };
        if dead {
            self.connections.write().await.remove(server_name);
            return Err(WorkflowError::ToolError {
                server: server_name.to_string(),
                tool: tool_name.to_string(),
                message: "tool server process exited".to_string(),
            });
        }

        let guard = self.connections.read().await;
        match guard.get(server_name) {
            Some(Connection::Real(conn)) => {
                let arguments = params
                    .as_object()
                    .cloned()
                    .map(|m| m.into_iter().collect::<HashMap<_, _>>())
                    .unwrap_or_default();
                conn.call_tool(tool_name, arguments).await
            }
            Some(Connection::Stub) => stub::call_tool(server_name, tool_name, &params),
            None => unreachable!("checked above"),
        }
    }

    async fn list_tools(&self, server_name: &str) -> Result<Vec<ToolDescriptor>> {
        let guard = self.connections.read().await;
        match guard.get(server_name) {
            Some(Connection::Real(conn)) => conn.list_tools().await,
            Some(Connection::Stub) => Ok(stub::list_tools(server_name)),
            None => Err(WorkflowError::ToolError {
                server: server_name.to_string(),
                tool: String::new(),
                message: "tool server is not connected".to_string(),
            }),
        }
    }

    async fn is_connected(&self, server_name: &str) -> bool {
        self.connections.read().await.contains_key(server_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unconfigured_unknown_server_fails_to_connect() {
        let client = HybridToolClient::new(ToolServerConfig::default());
        let err = client.connect("not-a-real-server").await.unwrap_err();
        assert!(matches!(err, WorkflowError::ToolError { .. }));
    }

    #[tokio::test]
    async fn falls_back_to_stub_for_well_known_server() {
        let client = HybridToolClient::new(ToolServerConfig::default());
        client.connect("git").await.unwrap();
        assert!(client.is_connected("git").await);
        let result = client
            .call_tool("git", "git_status", serde_json::json!({"repo_path": "."}))
            .await
            .unwrap();
        assert_eq!(result["branch"], "main");
    }

    #[tokio::test]
    async fn call_tool_on_disconnected_server_fails() {
        let client = HybridToolClient::new(ToolServerConfig::default());
        let err = client.call_tool("git", "git_status", serde_json::json!({})).await.unwrap_err();
        assert!(matches!(err, WorkflowError::ToolError { .. }));
    }

    #[tokio::test]
    async fn connect_is_idempotent() {
        let client = HybridToolClient::new(ToolServerConfig::default());
        client.connect("git").await.unwrap();
        client.connect("git").await.unwrap();
        assert!(client.is_connected("git").await);
    }
}
