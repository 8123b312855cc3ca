//! A real tool-server connection: spawns the configured command and speaks
//! the Tool Protocol over its stdio.

use std::collections::HashMap;

use uuid::Uuid;
use workflow_engine_core::error::{Result, WorkflowError};
use workflow_engine_core::tool_client::ToolDescriptor;

use crate::config::{interpolate_env, ServerConfig};
use crate::protocol::{extract_call_result, ResponseResult, ToolRequest, ToolResponse};
use crate::transport::StdioTransport;

pub struct StdioServerConnection {
    server_name: String,
    transport: StdioTransport,
}

impl StdioServerConnection {
    pub async fn spawn(server_name: &str, config: &ServerConfig) -> Result<Self> {
        let env = interpolate_env(&config.env);
        let transport = StdioTransport::spawn(server_name, &config.command, &config.args, &env).await?;
        Ok(StdioServerConnection {
            server_name: server_name.to_string(),
            transport,
        })
    }

    pub async fn is_connected(&self) -> bool {
        self.transport.is_alive().await
    }

    pub async fn shutdown(&self) {
        self.transport.shutdown().await;
    }

    pub async fn list_tools(&self) -> Result<Vec<ToolDescriptor>> {
        let id = Uuid::new_v4().to_string();
        let request = ToolRequest::ListTools { id: id.clone() };
        let response = self.roundtrip(request, &id).await?;
        match response {
            ToolResponse::Result {
                result: ResponseResult::ListTools(list),
                ..
            } => Ok(list
                .tools
                .into_iter()
                .map(|t| ToolDescriptor {
                    name: t.name,
                    description: t.description,
                    input_schema: t.input_schema,
                })
                .collect()),
            ToolResponse::Error { error, .. } => Err(WorkflowError::ProtocolError {
                server: self.server_name.clone(),
                message: error.message,
            }),
            _ => Err(WorkflowError::ProtocolError {
                server: self.server_name.clone(),
                message: "unexpected response to tools/list".to_string(),
            }),
        }
    }

    pub async fn call_tool(&self, tool_name: &str, arguments: HashMap<String, serde_json::Value>) -> Result<serde_json::Value> {
        let id = Uuid::new_v4().to_string();
        let request = ToolRequest::CallTool {
            id: id.clone(),
            name: tool_name.to_string(),
            arguments,
        };
        let response = self.roundtrip(request, &id).await?;
        match response {
            ToolResponse::Result {
                result: ResponseResult::CallTool(result),
                ..
            } => Ok(extract_call_result(&result)),
            ToolResponse::Error { error, .. } => Err(WorkflowError::ToolError {
                server: self.server_name.clone(),
                tool: tool_name.to_string(),
                message: error.message,
            }),
            _ => Err(WorkflowError::ProtocolError {
                server: self.server_name.clone(),
                message: "unexpected response to tools/call".to_string(),
            }),
        }
    }

    async fn roundtrip(&self, request: ToolRequest, id: &str) -> Result<ToolResponse> {
        let json = serde_json::to_string(&request).map_err(|e| WorkflowError::ProtocolError {
            server: self.server_name.clone(),
            message: format!("could not encode request: {}", e),
        })?;
        self.transport.send(json, id.to_string()).await
    }
}
