//! The recursion context threaded through [`crate::executor`] calls.
//!
//! Grounded on the shape of the teacher's `WorkflowContext` in
//! `workflow-engine-api/src/workflows/executor.rs`, generalized per the
//! design note in spec.md §9: "pass a context value by reference carrying
//! the variable map, call stack, parent ids, and depth; avoid shared-mutable
//! executor state across sub-workflows." Each recursive `Execute` call gets
//! its own owned `ExecutionContext`; nothing here is shared across sibling
//! executions.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerType {
    Cli,
    Workflow,
    Api,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trigger {
    #[serde(rename = "type")]
    pub trigger_type: TriggerType,
    #[serde(default)]
    pub source: Option<String>,
}

impl Default for Trigger {
    fn default() -> Self {
        Trigger {
            trigger_type: TriggerType::Cli,
            source: None,
        }
    }
}

/// Carries everything `Executor::execute` needs that is not the workflow
/// document or the per-call config values: recursion bookkeeping for
/// sub-workflows (spec.md §4.8) plus run-mode flags.
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    /// Inherited variable map. Empty for a fresh top-level execution; for a
    /// sub-workflow this holds only the explicitly interpolated `vars` (see
    /// the context isolation invariant in spec.md §4.8).
    pub variables: Map<String, Value>,
    pub parent_execution_id: Option<Uuid>,
    pub parent_step_index: Option<usize>,
    pub depth: u32,
    /// Workflow names in the current recursion chain, for cycle detection.
    pub call_stack: Vec<String>,
    pub trigger: Option<Trigger>,
    /// Resume execution at this step index instead of 0 (spec.md §9: pause
    /// is boundary-only, so resume re-enters the step loop here).
    pub resume_from_step: Option<usize>,
    pub dry_run: bool,
    pub cancellation: Option<CancellationToken>,
}

impl ExecutionContext {
    pub fn root() -> Self {
        ExecutionContext::default()
    }

    /// Builds the child context for a `workflow.run` recursion, per the five
    /// field assignments in spec.md §4.8 step 4.
    pub fn for_child(
        &self,
        parent_execution_id: Uuid,
        parent_step_index: usize,
        parent_workflow_name: &str,
        vars: Map<String, Value>,
    ) -> ExecutionContext {
        let mut call_stack = self.call_stack.clone();
        call_stack.push(parent_workflow_name.to_string());

        ExecutionContext {
            variables: vars,
            parent_execution_id: Some(parent_execution_id),
            parent_step_index: Some(parent_step_index),
            depth: self.depth + 1,
            call_stack,
            trigger: Some(Trigger {
                trigger_type: TriggerType::Workflow,
                source: Some(parent_workflow_name.to_string()),
            }),
            resume_from_step: None,
            dry_run: self.dry_run,
            cancellation: self.cancellation.clone(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .map(|t| t.is_cancelled())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn child_context_has_isolated_variables_and_incremented_depth() {
        let mut parent = ExecutionContext::root();
        parent
            .variables
            .insert("secret".to_string(), json!("do-not-leak"));
        parent.call_stack.push("root".to_string());

        let parent_exec = Uuid::new_v4();
        let mut vars = Map::new();
        vars.insert("input".to_string(), json!("v"));
        let child = parent.for_child(parent_exec, 0, "root", vars);

        assert_eq!(child.depth, 1);
        assert_eq!(child.parent_execution_id, Some(parent_exec));
        assert!(!child.variables.contains_key("secret"));
        assert_eq!(child.variables.get("input"), Some(&json!("v")));
        assert_eq!(child.call_stack, vec!["root".to_string(), "root".to_string()]);
    }
}
