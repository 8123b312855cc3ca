//! Error taxonomy for the workflow engine.
//!
//! Every kind named in the persistence/execution design (`ValidationError`,
//! `TemplateError`, `ToolError`, `ProtocolError`, `ProviderError`,
//! `CompositionError`, `TimeoutError`, `CancelledError`, `StorageError`) is a
//! variant here so the executor's step loop can match on category rather than
//! string-sniff messages.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Broad classification used to decide retry behavior without matching on
/// every individual variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCategory {
    /// May succeed if retried (tool disconnects, transient provider errors).
    Transient,
    /// Will not succeed on retry (bad template, malformed workflow, cycle).
    Permanent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorSeverity {
    Warning,
    Error,
    Critical,
}

#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("workflow validation failed: {violations:?}")]
    ValidationError { violations: Vec<String> },

    #[error("template error in '{template}': {message}")]
    TemplateError { template: String, message: String },

    #[error("tool error calling {server}.{tool}: {message}")]
    ToolError {
        server: String,
        tool: String,
        message: String,
    },

    #[error("protocol error from tool server '{server}': {message}")]
    ProtocolError { server: String, message: String },

    #[error("provider error: {message}")]
    ProviderError { message: String },

    #[error("composition error: {message}")]
    CompositionError { message: String },

    #[error("workflow '{workflow}' timed out after {elapsed_ms}ms (limit {limit_ms}ms)")]
    TimeoutError {
        workflow: String,
        elapsed_ms: u64,
        limit_ms: u64,
    },

    #[error("execution {execution_id} was cancelled")]
    CancelledError { execution_id: uuid::Uuid },

    #[error("storage error: {message}")]
    StorageError { message: String },

    #[error("workflow '{name}' not found in registry")]
    WorkflowNotFound { name: String },

    #[error("step '{step_id}' in workflow '{workflow}' failed: {message}")]
    StepFailed {
        workflow: String,
        step_id: String,
        message: String,
    },
}

impl WorkflowError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            WorkflowError::ToolError { .. } | WorkflowError::ProviderError { .. } => {
                ErrorCategory::Transient
            }
            _ => ErrorCategory::Permanent,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            WorkflowError::ValidationError { .. } | WorkflowError::TemplateError { .. } => {
                ErrorSeverity::Error
            }
            WorkflowError::StorageError { .. } | WorkflowError::CompositionError { .. } => {
                ErrorSeverity::Critical
            }
            _ => ErrorSeverity::Warning,
        }
    }

    /// Whether the step loop should honor `step.retry` for this error kind.
    /// Matches spec.md §7: only `ToolError` and `ProviderError` are retried;
    /// `CompositionError` is explicitly never retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            WorkflowError::ToolError { .. } | WorkflowError::ProviderError { .. }
        )
    }

    /// A short message suitable for the `error` column on `executions`/`steps`.
    pub fn short_message(&self) -> String {
        self.to_string()
    }

    /// A best-effort stack-like trace string. Rust has no catchable stack
    /// traces by default; we synthesize a single-frame trace from the error
    /// chain, matching the "when the host runtime offers one" qualifier in
    /// spec.md §7.
    pub fn error_stack(&self) -> String {
        format!("{:?}", self)
    }
}

pub type Result<T> = std::result::Result<T, WorkflowError>;
