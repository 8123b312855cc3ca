//! Row types mapping the `Text`-encoded SQLite schema to and from the core
//! crate's [`ExecutionRecord`]/[`StepRecord`], the way the teacher's
//! `db/event.rs` wraps a `Json`-typed column around `TaskContext`.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use workflow_engine_core::context::Trigger;
use workflow_engine_core::error::{Result, WorkflowError};
use workflow_engine_core::storage::{ExecutionRecord, ExecutionStatus, StepRecord, StepStatus};

use crate::schema::{contexts, executions, steps};

fn ser<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| WorkflowError::StorageError {
        message: format!("could not serialize row field: {}", e),
    })
}

fn de<T: for<'de> serde::Deserialize<'de>>(text: &str) -> Result<T> {
    serde_json::from_str(text).map_err(|e| WorkflowError::StorageError {
        message: format!("could not deserialize row field: {}", e),
    })
}

pub fn status_to_text(status: ExecutionStatus) -> &'static str {
    match status {
        ExecutionStatus::Pending => "pending",
        ExecutionStatus::Running => "running",
        ExecutionStatus::Paused => "paused",
        ExecutionStatus::Completed => "completed",
        ExecutionStatus::Failed => "failed",
        ExecutionStatus::Cancelled => "cancelled",
    }
}

fn status_from_text(text: &str) -> Result<ExecutionStatus> {
    match text {
        "pending" => Ok(ExecutionStatus::Pending),
        "running" => Ok(ExecutionStatus::Running),
        "paused" => Ok(ExecutionStatus::Paused),
        "completed" => Ok(ExecutionStatus::Completed),
        "failed" => Ok(ExecutionStatus::Failed),
        "cancelled" => Ok(ExecutionStatus::Cancelled),
        other => Err(WorkflowError::StorageError {
            message: format!("unknown execution status '{}' in row", other),
        }),
    }
}

fn step_status_to_text(status: StepStatus) -> &'static str {
    match status {
        StepStatus::Pending => "pending",
        StepStatus::Running => "running",
        StepStatus::Completed => "completed",
        StepStatus::Failed => "failed",
        StepStatus::Skipped => "skipped",
    }
}

fn step_status_from_text(text: &str) -> Result<StepStatus> {
    match text {
        "pending" => Ok(StepStatus::Pending),
        "running" => Ok(StepStatus::Running),
        "completed" => Ok(StepStatus::Completed),
        "failed" => Ok(StepStatus::Failed),
        "skipped" => Ok(StepStatus::Skipped),
        other => Err(WorkflowError::StorageError {
            message: format!("unknown step status '{}' in row", other),
        }),
    }
}

#[derive(Debug, Clone, Queryable, Insertable, AsChangeset)]
#[diesel(table_name = executions)]
pub struct ExecutionRow {
    pub id: String,
    pub workflow_name: String,
    pub status: String,
    pub started_at: String,
    pub completed_at: Option<String>,
    pub duration_ms: Option<i64>,
    pub current_step: Option<i64>,
    pub total_steps: Option<i64>,
    pub error: Option<String>,
    pub error_stack: Option<String>,
    pub parent_execution_id: Option<String>,
    pub parent_step_index: Option<i64>,
    pub depth: i32,
    pub trigger: String,
    pub metadata: String,
}

impl ExecutionRow {
    pub fn from_record(record: &ExecutionRecord) -> Result<Self> {
        Ok(ExecutionRow {
            id: record.id.to_string(),
            workflow_name: record.workflow_name.clone(),
            status: status_to_text(record.status).to_string(),
            started_at: record.started_at.to_rfc3339(),
            completed_at: record.completed_at.map(|t| t.to_rfc3339()),
            duration_ms: record.duration_ms,
            current_step: record.current_step,
            total_steps: record.total_steps,
            error: record.error.clone(),
            error_stack: record.error_stack.clone(),
            parent_execution_id: record.parent_execution_id.map(|id| id.to_string()),
            parent_step_index: record.parent_step_index,
            depth: record.depth,
            trigger: ser(&record.trigger)?,
            metadata: ser(&record.metadata)?,
        })
    }

    pub fn into_record(self) -> Result<ExecutionRecord> {
        Ok(ExecutionRecord {
            id: parse_uuid(&self.id)?,
            workflow_name: self.workflow_name,
            status: status_from_text(&self.status)?,
            started_at: parse_timestamp(&self.started_at)?,
            completed_at: self.completed_at.as_deref().map(parse_timestamp).transpose()?,
            duration_ms: self.duration_ms,
            current_step: self.current_step,
            total_steps: self.total_steps,
            error: self.error,
            error_stack: self.error_stack,
            parent_execution_id: self
                .parent_execution_id
                .as_deref()
                .map(parse_uuid)
                .transpose()?,
            parent_step_index: self.parent_step_index,
            depth: self.depth,
            trigger: de::<Trigger>(&self.trigger)?,
            metadata: de(&self.metadata)?,
        })
    }
}

#[derive(Debug, Clone, Queryable, Insertable, AsChangeset)]
#[diesel(table_name = steps)]
pub struct StepRow {
    pub execution_id: String,
    pub step_index: i64,
    pub step_name: String,
    pub action: String,
    pub description: Option<String>,
    pub status: String,
    pub started_at: String,
    pub completed_at: Option<String>,
    pub duration_ms: Option<i64>,
    pub input: Option<String>,
    pub output: Option<String>,
    pub error: Option<String>,
    pub error_stack: Option<String>,
    pub child_execution_id: Option<String>,
    pub retry_attempt: i32,
    pub skip_reason: Option<String>,
}

impl StepRow {
    pub fn from_record(record: &StepRecord) -> Result<Self> {
        Ok(StepRow {
            execution_id: record.execution_id.to_string(),
            step_index: record.step_index,
            step_name: record.step_name.clone(),
            action: record.action.clone(),
            description: record.description.clone(),
            status: step_status_to_text(record.status).to_string(),
            started_at: record.started_at.to_rfc3339(),
            completed_at: record.completed_at.map(|t| t.to_rfc3339()),
            duration_ms: record.duration_ms,
            input: record.input.as_ref().map(ser).transpose()?,
            output: record.output.as_ref().map(ser).transpose()?,
            error: record.error.clone(),
            error_stack: record.error_stack.clone(),
            child_execution_id: record.child_execution_id.map(|id| id.to_string()),
            retry_attempt: record.retry_attempt,
            skip_reason: record.skip_reason.clone(),
        })
    }

    pub fn into_record(self) -> Result<StepRecord> {
        Ok(StepRecord {
            execution_id: parse_uuid(&self.execution_id)?,
            step_index: self.step_index,
            step_name: self.step_name,
            action: self.action,
            description: self.description,
            status: step_status_from_text(&self.status)?,
            started_at: parse_timestamp(&self.started_at)?,
            completed_at: self.completed_at.as_deref().map(parse_timestamp).transpose()?,
            duration_ms: self.duration_ms,
            input: self.input.as_deref().map(de).transpose()?,
            output: self.output.as_deref().map(de).transpose()?,
            error: self.error,
            error_stack: self.error_stack,
            child_execution_id: self.child_execution_id.as_deref().map(parse_uuid).transpose()?,
            retry_attempt: self.retry_attempt,
            skip_reason: self.skip_reason,
        })
    }
}

#[derive(Debug, Clone, Queryable, Insertable, AsChangeset)]
#[diesel(table_name = contexts)]
pub struct ContextRow {
    pub execution_id: String,
    pub variables: String,
    pub updated_at: String,
}

pub fn parse_uuid(text: &str) -> Result<Uuid> {
    Uuid::parse_str(text).map_err(|e| WorkflowError::StorageError {
        message: format!("invalid uuid '{}' in row: {}", text, e),
    })
}

pub fn parse_timestamp(text: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| WorkflowError::StorageError {
            message: format!("invalid timestamp '{}' in row: {}", text, e),
        })
}
