//! The Tool Client contract (spec.md §4.4).
//!
//! Declared here, alongside [`crate::storage::StorageAdapter`], so the
//! executor can dispatch `ns.name` actions to a tool server without the
//! core crate depending on the concrete subprocess/stub machinery that
//! lives in the protocol crate — mirroring the trait/impl split the teacher
//! draws between its `workflow-engine-mcp` client traits and their stdio
//! transport.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub input_schema: Value,
}

#[async_trait]
pub trait ToolClient: Send + Sync {
    async fn connect(&self, server_name: &str) -> Result<()>;
    async fn disconnect(&self, server_name: &str) -> Result<()>;
    async fn call_tool(&self, server_name: &str, tool_name: &str, params: Value) -> Result<Value>;
    async fn list_tools(&self, server_name: &str) -> Result<Vec<ToolDescriptor>>;
    async fn is_connected(&self, server_name: &str) -> bool;

    /// Connects every name in `server_names` that isn't already connected,
    /// ignoring names already up. Failures propagate spec.md §4.4's
    /// "Connect is idempotent per server."
    async fn auto_connect(&self, server_names: &[String]) -> Result<()> {
        for name in server_names {
            if !self.is_connected(name).await {
                self.connect(name).await?;
            }
        }
        Ok(())
    }
}
