//! The concrete [`StorageAdapter`] backed by SQLite.
//!
//! Diesel is synchronous; every query runs inside `spawn_blocking`, the same
//! boundary the teacher draws around its Postgres repositories when called
//! from async handlers (`db/repository.rs`'s `Repository::create_record`
//! blocks its calling thread, relying on the caller to have already hopped
//! off the async runtime).

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use uuid::Uuid;

use workflow_engine_core::error::{Result, WorkflowError};
use workflow_engine_core::storage::{
    ExecutionFilter, ExecutionPatch, ExecutionRecord, ExecutionTree, StepRecord, StorageAdapter,
};

use crate::models::{status_to_text, ContextRow, ExecutionRow, StepRow};
use crate::pool::DbPool;
use crate::schema::{contexts, executions, steps};

pub struct SqliteStorageAdapter {
    pool: DbPool,
}

impl SqliteStorageAdapter {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> Result<crate::pool::PooledConn> {
        self.pool.get().map_err(|e| WorkflowError::StorageError {
            message: format!("failed to obtain pooled connection: {}", e),
        })
    }

    async fn run_blocking<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut SqliteConnection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let mut conn = self.conn()?;
        tokio::task::spawn_blocking(move || f(&mut conn))
            .await
            .map_err(|e| WorkflowError::StorageError {
                message: format!("blocking storage task panicked: {}", e),
            })?
    }
}

#[async_trait]
impl StorageAdapter for SqliteStorageAdapter {
    async fn save_execution(&self, execution: &ExecutionRecord) -> Result<()> {
        let row = ExecutionRow::from_record(execution)?;
        self.run_blocking(move |conn| {
            diesel::insert_into(executions::table)
                .values(&row)
                .execute(conn)
                .map_err(|e| WorkflowError::StorageError {
                    message: format!("failed to insert execution: {}", e),
                })?;
            Ok(())
        })
        .await
    }

    async fn get_execution(&self, id: Uuid) -> Result<Option<ExecutionRecord>> {
        let id_text = id.to_string();
        self.run_blocking(move |conn| {
            let row: Option<ExecutionRow> = executions::table
                .find(id_text)
                .first(conn)
                .optional()
                .map_err(|e| WorkflowError::StorageError {
                    message: format!("failed to query execution: {}", e),
                })?;
            row.map(ExecutionRow::into_record).transpose()
        })
        .await
    }

    async fn update_execution(&self, id: Uuid, patch: ExecutionPatch) -> Result<()> {
        let id_text = id.to_string();
        self.run_blocking(move |conn| {
            conn.transaction::<(), diesel::result::Error, _>(|conn| {
                let mut row: ExecutionRow = executions::table.find(&id_text).first(conn)?;

                if let Some(status) = patch.status {
                    row.status = status_to_text(status).to_string();
                }
                if let Some(completed_at) = patch.completed_at {
                    row.completed_at = Some(completed_at.to_rfc3339());
                }
                if let Some(duration_ms) = patch.duration_ms {
                    row.duration_ms = Some(duration_ms);
                }
                if let Some(current_step) = patch.current_step {
                    row.current_step = Some(current_step);
                }
                if let Some(error) = patch.error {
                    row.error = Some(error);
                }
                if let Some(error_stack) = patch.error_stack {
                    row.error_stack = Some(error_stack);
                }

                diesel::update(executions::table.find(&id_text))
                    .set(&row)
                    .execute(conn)?;
                Ok(())
            })
            .map_err(|e| WorkflowError::StorageError {
                message: format!("failed to update execution: {}", e),
            })
        })
        .await
    }

    async fn save_step_result(&self, step: &StepRecord) -> Result<()> {
        let row = StepRow::from_record(step)?;
        self.run_blocking(move |conn| {
            diesel::insert_into(steps::table)
                .values(&row)
                .on_conflict((steps::execution_id, steps::step_index))
                .do_update()
                .set(&row)
                .execute(conn)
                .map_err(|e| WorkflowError::StorageError {
                    message: format!("failed to upsert step: {}", e),
                })?;
            Ok(())
        })
        .await
    }

    async fn save_context(&self, execution_id: Uuid, variables: &serde_json::Map<String, serde_json::Value>) -> Result<()> {
        let row = ContextRow {
            execution_id: execution_id.to_string(),
            variables: serde_json::to_string(variables).map_err(|e| WorkflowError::StorageError {
                message: format!("failed to serialize context: {}", e),
            })?,
            updated_at: Utc::now().to_rfc3339(),
        };
        self.run_blocking(move |conn| {
            diesel::insert_into(contexts::table)
                .values(&row)
                .on_conflict(contexts::execution_id)
                .do_update()
                .set(&row)
                .execute(conn)
                .map_err(|e| WorkflowError::StorageError {
                    message: format!("failed to upsert context: {}", e),
                })?;
            Ok(())
        })
        .await
    }

    async fn get_context(&self, execution_id: Uuid) -> Result<Option<serde_json::Map<String, serde_json::Value>>> {
        let id_text = execution_id.to_string();
        self.run_blocking(move |conn| {
            let row: Option<ContextRow> = contexts::table
                .find(id_text)
                .first(conn)
                .optional()
                .map_err(|e| WorkflowError::StorageError {
                    message: format!("failed to query context: {}", e),
                })?;
            row.map(|r| {
                serde_json::from_str(&r.variables).map_err(|e| WorkflowError::StorageError {
                    message: format!("failed to deserialize context: {}", e),
                })
            })
            .transpose()
        })
        .await
    }

    async fn query_executions(&self, filter: ExecutionFilter) -> Result<Vec<ExecutionRecord>> {
        self.run_blocking(move |conn| {
            let mut query = executions::table.into_boxed();
            if let Some(name) = &filter.workflow_name {
                query = query.filter(executions::workflow_name.eq(name.clone()));
            }
            if let Some(status) = filter.status {
                query = query.filter(executions::status.eq(status_to_text(status).to_string()));
            }
            if let Some(after) = filter.started_after {
                query = query.filter(executions::started_at.ge(after.to_rfc3339()));
            }
            if let Some(before) = filter.started_before {
                query = query.filter(executions::started_at.le(before.to_rfc3339()));
            }
            if let Some(parent_id) = filter.parent_id {
                query = query.filter(executions::parent_execution_id.eq(parent_id.to_string()));
            }
            if filter.root_only {
                query = query.filter(executions::parent_execution_id.is_null());
            }
            query = query.order(executions::started_at.desc());
            if let Some(limit) = filter.limit {
                query = query.limit(limit);
            }

            let rows: Vec<ExecutionRow> = query.load(conn).map_err(|e| WorkflowError::StorageError {
                message: format!("failed to query executions: {}", e),
            })?;
            rows.into_iter().map(ExecutionRow::into_record).collect()
        })
        .await
    }

    async fn get_child_executions(&self, parent_id: Uuid) -> Result<Vec<ExecutionRecord>> {
        self.query_executions(ExecutionFilter {
            parent_id: Some(parent_id),
            ..Default::default()
        })
        .await
    }

    async fn get_execution_tree(&self, id: Uuid) -> Result<Option<ExecutionTree>> {
        let execution = match self.get_execution(id).await? {
            Some(e) => e,
            None => return Ok(None),
        };
        let steps = self.steps_for(id).await?;
        let children = self.get_child_executions(id).await?;
        let mut child_trees = Vec::with_capacity(children.len());
        for child in children {
            if let Some(tree) = Box::pin(self.get_execution_tree(child.id)).await? {
                child_trees.push(tree);
            }
        }
        Ok(Some(ExecutionTree {
            execution,
            steps,
            children: child_trees,
        }))
    }

    async fn cleanup(&self, before: chrono::DateTime<Utc>) -> Result<u64> {
        let cutoff = before.to_rfc3339();
        self.run_blocking(move |conn| {
            conn.transaction::<u64, diesel::result::Error, _>(|conn| {
                let ids: Vec<String> = executions::table
                    .filter(executions::started_at.lt(&cutoff))
                    .select(executions::id)
                    .load(conn)?;

                if ids.is_empty() {
                    return Ok(0);
                }

                diesel::delete(steps::table.filter(steps::execution_id.eq_any(ids.clone()))).execute(conn)?;
                diesel::delete(contexts::table.filter(contexts::execution_id.eq_any(ids.clone())))
                    .execute(conn)?;
                let deleted = diesel::delete(executions::table.filter(executions::id.eq_any(ids)))
                    .execute(conn)?;
                Ok(deleted as u64)
            })
            .map_err(|e| WorkflowError::StorageError {
                message: format!("failed to clean up executions: {}", e),
            })
        })
        .await
    }
}

impl SqliteStorageAdapter {
    async fn steps_for(&self, execution_id: Uuid) -> Result<Vec<StepRecord>> {
        let id_text = execution_id.to_string();
        self.run_blocking(move |conn| {
            let rows: Vec<StepRow> = steps::table
                .filter(steps::execution_id.eq(id_text))
                .order(steps::step_index.asc())
                .load(conn)
                .map_err(|e| WorkflowError::StorageError {
                    message: format!("failed to query steps: {}", e),
                })?;
            rows.into_iter().map(StepRow::into_record).collect()
        })
        .await
    }
}

pub type SharedStorageAdapter = Arc<dyn StorageAdapter>;

#[cfg(test)]
mod tests {
    use super::*;
    use workflow_engine_core::context::{Trigger, TriggerType};
    use workflow_engine_core::storage::{ExecutionStatus, StepStatus};

    fn adapter() -> SqliteStorageAdapter {
        let pool = crate::pool::init_pool(":memory:").unwrap();
        SqliteStorageAdapter::new(pool)
    }

    fn sample_execution(id: Uuid, parent: Option<Uuid>) -> ExecutionRecord {
        ExecutionRecord {
            id,
            workflow_name: "deploy".to_string(),
            status: ExecutionStatus::Running,
            started_at: Utc::now(),
            completed_at: None,
            duration_ms: None,
            current_step: Some(0),
            total_steps: Some(2),
            error: None,
            error_stack: None,
            parent_execution_id: parent,
            parent_step_index: None,
            depth: if parent.is_some() { 1 } else { 0 },
            trigger: Trigger {
                trigger_type: TriggerType::Cli,
                source: None,
            },
            metadata: serde_json::json!({}),
        }
    }

    #[tokio::test]
    async fn round_trips_an_execution_record() {
        let adapter = adapter();
        let id = Uuid::new_v4();
        let record = sample_execution(id, None);
        adapter.save_execution(&record).await.unwrap();

        let fetched = adapter.get_execution(id).await.unwrap().unwrap();
        assert_eq!(fetched.workflow_name, "deploy");
        assert_eq!(fetched.status, ExecutionStatus::Running);
    }

    #[tokio::test]
    async fn update_execution_patches_only_supplied_fields() {
        let adapter = adapter();
        let id = Uuid::new_v4();
        adapter.save_execution(&sample_execution(id, None)).await.unwrap();

        adapter
            .update_execution(
                id,
                ExecutionPatch {
                    status: Some(ExecutionStatus::Completed),
                    duration_ms: Some(42),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let fetched = adapter.get_execution(id).await.unwrap().unwrap();
        assert_eq!(fetched.status, ExecutionStatus::Completed);
        assert_eq!(fetched.duration_ms, Some(42));
        assert_eq!(fetched.total_steps, Some(2));
    }

    #[tokio::test]
    async fn query_executions_filters_to_root_only() {
        let adapter = adapter();
        let parent_id = Uuid::new_v4();
        let child_id = Uuid::new_v4();
        adapter.save_execution(&sample_execution(parent_id, None)).await.unwrap();
        adapter
            .save_execution(&sample_execution(child_id, Some(parent_id)))
            .await
            .unwrap();

        let roots = adapter
            .query_executions(ExecutionFilter {
                root_only: true,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].id, parent_id);
    }

    #[tokio::test]
    async fn execution_tree_nests_children_and_steps() {
        let adapter = adapter();
        let parent_id = Uuid::new_v4();
        let child_id = Uuid::new_v4();
        adapter.save_execution(&sample_execution(parent_id, None)).await.unwrap();
        adapter
            .save_execution(&sample_execution(child_id, Some(parent_id)))
            .await
            .unwrap();

        adapter
            .save_step_result(&StepRecord {
                execution_id: parent_id,
                step_index: 0,
                step_name: "step-0".to_string(),
                action: "workflow.run".to_string(),
                description: None,
                status: StepStatus::Completed,
                started_at: Utc::now(),
                completed_at: Some(Utc::now()),
                duration_ms: Some(10),
                input: None,
                output: None,
                error: None,
                error_stack: None,
                child_execution_id: Some(child_id),
                retry_attempt: 0,
                skip_reason: None,
            })
            .await
            .unwrap();

        let tree = adapter.get_execution_tree(parent_id).await.unwrap().unwrap();
        assert_eq!(tree.steps.len(), 1);
        assert_eq!(tree.children.len(), 1);
        assert_eq!(tree.children[0].execution.id, child_id);
    }

    #[tokio::test]
    async fn context_round_trips_variables() {
        let adapter = adapter();
        let id = Uuid::new_v4();
        adapter.save_execution(&sample_execution(id, None)).await.unwrap();

        let mut vars = serde_json::Map::new();
        vars.insert("branch".to_string(), serde_json::json!("main"));
        adapter.save_context(id, &vars).await.unwrap();

        let fetched = adapter.get_context(id).await.unwrap().unwrap();
        assert_eq!(fetched.get("branch").unwrap(), "main");
    }

    #[tokio::test]
    async fn cleanup_cascades_to_steps_and_contexts() {
        let adapter = adapter();
        let old_id = Uuid::new_v4();
        let child_id = Uuid::new_v4();
        let recent_id = Uuid::new_v4();

        let mut old_record = sample_execution(old_id, None);
        old_record.started_at = Utc::now() - chrono::Duration::days(30);
        adapter.save_execution(&old_record).await.unwrap();

        let mut old_child = sample_execution(child_id, Some(old_id));
        old_child.started_at = Utc::now() - chrono::Duration::days(30);
        adapter.save_execution(&old_child).await.unwrap();

        adapter.save_execution(&sample_execution(recent_id, None)).await.unwrap();

        adapter
            .save_step_result(&StepRecord {
                execution_id: old_id,
                step_index: 0,
                step_name: "step-0".to_string(),
                action: "workflow.run".to_string(),
                description: None,
                status: StepStatus::Completed,
                started_at: Utc::now(),
                completed_at: Some(Utc::now()),
                duration_ms: Some(10),
                input: None,
                output: None,
                error: None,
                error_stack: None,
                child_execution_id: Some(child_id),
                retry_attempt: 0,
                skip_reason: None,
            })
            .await
            .unwrap();

        let mut vars = serde_json::Map::new();
        vars.insert("branch".to_string(), serde_json::json!("main"));
        adapter.save_context(old_id, &vars).await.unwrap();

        let cutoff = Utc::now() - chrono::Duration::days(1);
        let deleted = adapter.cleanup(cutoff).await.unwrap();

        assert_eq!(deleted, 2);
        assert!(adapter.get_execution(old_id).await.unwrap().is_none());
        assert!(adapter.get_execution(child_id).await.unwrap().is_none());
        assert!(adapter.get_execution(recent_id).await.unwrap().is_some());
        assert!(adapter.steps_for(old_id).await.unwrap().is_empty());
        assert!(adapter.get_context(old_id).await.unwrap().is_none());
    }
}
