//! The Storage Adapter contract (spec.md §4.3).
//!
//! Defined in `workflow-engine-core` rather than the storage crate so the
//! executor can depend on the trait without depending on Diesel/SQLite — the
//! same split the teacher draws between `workflow-engine-core` (traits,
//! domain types) and its `db`/storage-backed crates.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::context::Trigger;
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Pending,
    Running,
    Paused,
    Completed,
    Failed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub id: Uuid,
    pub workflow_name: String,
    pub status: ExecutionStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<i64>,
    pub current_step: Option<i64>,
    pub total_steps: Option<i64>,
    pub error: Option<String>,
    pub error_stack: Option<String>,
    pub parent_execution_id: Option<Uuid>,
    pub parent_step_index: Option<i64>,
    pub depth: i32,
    pub trigger: Trigger,
    pub metadata: Value,
}

/// A sparse patch applied by `UpdateExecution`; `None` fields are untouched.
/// spec.md §4.3: "partial patch, only supplied fields change."
#[derive(Debug, Clone, Default)]
pub struct ExecutionPatch {
    pub status: Option<ExecutionStatus>,
    pub completed_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<i64>,
    pub current_step: Option<i64>,
    pub error: Option<String>,
    pub error_stack: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    pub execution_id: Uuid,
    pub step_index: i64,
    pub step_name: String,
    pub action: String,
    pub description: Option<String>,
    pub status: StepStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<i64>,
    pub input: Option<Value>,
    pub output: Option<Value>,
    pub error: Option<String>,
    pub error_stack: Option<String>,
    pub child_execution_id: Option<Uuid>,
    pub retry_attempt: i32,
    pub skip_reason: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ExecutionFilter {
    pub workflow_name: Option<String>,
    pub status: Option<ExecutionStatus>,
    pub started_after: Option<DateTime<Utc>>,
    pub started_before: Option<DateTime<Utc>>,
    pub parent_id: Option<Uuid>,
    pub root_only: bool,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionTree {
    pub execution: ExecutionRecord,
    pub steps: Vec<StepRecord>,
    pub children: Vec<ExecutionTree>,
}

/// The persistence contract: append/update of executions, steps, and
/// context, plus the parent/child tree queries spec.md §4.3 names.
///
/// Every method is `&self` — implementations are expected to internally pool
/// connections (r2d2, as the teacher does) so the adapter can be shared
/// across concurrently running executions without an external lock;
/// spec.md §5 only requires that writes from the *same* execution are
/// serialized, which holds naturally since one execution drives its writes
/// from one task.
#[async_trait]
pub trait StorageAdapter: Send + Sync {
    async fn save_execution(&self, execution: &ExecutionRecord) -> Result<()>;
    async fn get_execution(&self, id: Uuid) -> Result<Option<ExecutionRecord>>;
    async fn update_execution(&self, id: Uuid, patch: ExecutionPatch) -> Result<()>;

    async fn save_step_result(&self, step: &StepRecord) -> Result<()>;

    async fn save_context(&self, execution_id: Uuid, variables: &Map<String, Value>) -> Result<()>;
    async fn get_context(&self, execution_id: Uuid) -> Result<Option<Map<String, Value>>>;

    async fn query_executions(&self, filter: ExecutionFilter) -> Result<Vec<ExecutionRecord>>;
    async fn get_child_executions(&self, parent_id: Uuid) -> Result<Vec<ExecutionRecord>>;
    async fn get_execution_tree(&self, id: Uuid) -> Result<Option<ExecutionTree>>;

    async fn cleanup(&self, before: DateTime<Utc>) -> Result<u64>;
}
