//! Stdio transport with correlation-id multiplexing.
//!
//! spec.md §9 (pinned-down open question): "requests are multiplexed over
//! the single stdio stream using the JSON-RPC `id` field for correlation,
//! with a per-connection map of in-flight request channels." Grounded on
//! the process-supervision shape of the teacher's `clients/stdio.rs`
//! (`StdioMcpClient` spawning a child and owning its stdin/stdout), but
//! replacing that file's one-request-at-a-time lock with this map.

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin};
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;

use workflow_engine_core::error::{Result, WorkflowError};

use crate::protocol::ToolResponse;

type PendingMap = Arc<Mutex<HashMap<String, oneshot::Sender<ToolResponse>>>>;

/// One subprocess tool server speaking newline-delimited JSON over stdio.
pub struct StdioTransport {
    server_name: String,
    child: Mutex<Child>,
    stdin: Mutex<ChildStdin>,
    pending: PendingMap,
    reader_task: JoinHandle<()>,
}

impl StdioTransport {
    /// Spawns `command` with `args`/`env` and starts the background reader
    /// loop that demultiplexes responses by `id`.
    pub async fn spawn(
        server_name: &str,
        command: &str,
        args: &[String],
        env: &HashMap<String, String>,
    ) -> Result<Self> {
        let mut cmd = tokio::process::Command::new(command);
        cmd.args(args)
            .envs(env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd.spawn().map_err(|e| WorkflowError::ProtocolError {
            server: server_name.to_string(),
            message: format!("failed to spawn '{}': {}", command, e),
        })?;

        let stdin = child.stdin.take().ok_or_else(|| WorkflowError::ProtocolError {
            server: server_name.to_string(),
            message: "child process has no stdin".to_string(),
        })?;
        let stdout = child.stdout.take().ok_or_else(|| WorkflowError::ProtocolError {
            server: server_name.to_string(),
            message: "child process has no stdout".to_string(),
        })?;

        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let reader_pending = pending.clone();
        let reader_server_name = server_name.to_string();
        let reader_task = tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        if line.trim().is_empty() {
                            continue;
                        }
                        match serde_json::from_str::<ToolResponse>(&line) {
                            Ok(response) => {
                                let mut guard = reader_pending.lock().await;
                                if let Some(sender) = guard.remove(response.id()) {
                                    let _ = sender.send(response);
                                }
                            }
                            Err(e) => {
                                tracing::warn!(
                                    server = %reader_server_name,
                                    "unparseable tool-server response: {}",
                                    e
                                );
                            }
                        }
                    }
                    Ok(None) => break,
                    Err(_) => break,
                }
            }
        });

        Ok(StdioTransport {
            server_name: server_name.to_string(),
            child: Mutex::new(child),
            stdin: Mutex::new(stdin),
            pending,
            reader_task,
        })
    }

    /// Sends `request` and awaits the correlated response. Multiple
    /// in-flight requests on the same transport are safe: each registers
    /// its own oneshot channel keyed by request id before writing, so a
    /// slow tool never blocks a faster one behind it (spec.md §5, §9).
    pub async fn send(&self, request_json: String, request_id: String) -> Result<ToolResponse> {
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(request_id.clone(), tx);

        {
            let mut stdin = self.stdin.lock().await;
            let mut line = request_json;
            line.push('\n');
            stdin
                .write_all(line.as_bytes())
                .await
                .map_err(|e| WorkflowError::ProtocolError {
                    server: self.server_name.clone(),
                    message: format!("failed to write request: {}", e),
                })?;
        }

        rx.await.map_err(|_| WorkflowError::ToolError {
            server: self.server_name.clone(),
            tool: String::new(),
            message: "tool server connection closed before responding".to_string(),
        })
    }

    pub async fn is_alive(&self) -> bool {
        matches!(self.child.lock().await.try_wait(), Ok(None))
    }

    pub async fn shutdown(&self) {
        self.reader_task.abort();
        let _ = self.child.lock().await.kill().await;
    }
}
