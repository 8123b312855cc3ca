//! End-to-end scenarios from spec.md §8, run against a real SQLite-backed
//! executor with the tool client in stub-only mode (none of these
//! scenarios dispatch to a tool server).

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Map};

use workflow_engine_core::context::ExecutionContext;
use workflow_engine_core::error::{Result, WorkflowError};
use workflow_engine_core::executor::Executor;
use workflow_engine_core::progress::ProgressBus;
use workflow_engine_core::prompt::{AskRequest, AskResponse, PromptHandler};
use workflow_engine_core::registry::WorkflowRegistry;
use workflow_engine_core::storage::ExecutionStatus;
use workflow_engine_core::workflow::load;
use workflow_engine_mcp::config::ToolServerConfig;
use workflow_engine_mcp::HybridToolClient;
use workflow_engine_storage::{init_pool, SqliteStorageAdapter};

struct NoopPromptHandler;

#[async_trait]
impl PromptHandler for NoopPromptHandler {
    async fn ask(&self, _request: AskRequest) -> Result<AskResponse> {
        Err(WorkflowError::CompositionError {
            message: "no prompt handler configured for this test".to_string(),
        })
    }
    async fn confirm(&self, _message: &str, _default: Option<bool>) -> Result<bool> {
        Ok(false)
    }
    async fn select(&self, _message: &str, options: &[String]) -> Result<String> {
        Ok(options.first().cloned().unwrap_or_default())
    }
}

fn executor() -> Executor {
    let pool = init_pool(":memory:").unwrap();
    let storage = Arc::new(SqliteStorageAdapter::new(pool));
    let tool_client = Arc::new(HybridToolClient::new(ToolServerConfig::default()));
    let prompt_handler = Arc::new(NoopPromptHandler);
    Executor::new(
        WorkflowRegistry::new(),
        storage,
        tool_client,
        prompt_handler,
        None,
        ProgressBus::new(),
    )
}

#[tokio::test]
async fn s1_linear_workflow_passes_a_variable_forward() {
    let executor = executor();
    let workflow = load(include_str!("../../../workflows/s1-linear.yaml")).unwrap();

    let outcome = executor.execute(&workflow, Map::new(), ExecutionContext::root()).await.unwrap();

    assert_eq!(outcome.status, ExecutionStatus::Completed);
    assert_eq!(outcome.steps.len(), 2);
    assert_eq!(outcome.context.get("greeting"), Some(&json!("hello")));
    assert_eq!(outcome.context.get("out"), Some(&json!("hello, world")));
}

#[tokio::test]
async fn s2_sub_workflow_isolates_context() {
    let executor = executor();
    let child = load(include_str!("../../../workflows/child-s2.yaml")).unwrap();
    let parent = load(include_str!("../../../workflows/s2-parent.yaml")).unwrap();
    executor.registry.register(child);

    let outcome = executor.execute(&parent, Map::new(), ExecutionContext::root()).await.unwrap();

    let r = outcome.context.get("r").unwrap();
    assert_eq!(r.get("doubled"), Some(&json!("v")));

    let child_executions = executor
        .query_executions(Default::default())
        .await
        .unwrap()
        .into_iter()
        .filter(|e| e.workflow_name == "child-s2")
        .collect::<Vec<_>>();
    assert_eq!(child_executions.len(), 1);
    assert_eq!(child_executions[0].depth, 1);
    assert_eq!(child_executions[0].parent_execution_id, Some(outcome.execution_id));
}

#[tokio::test]
async fn s3_direct_cycle_fails_naming_both_workflows() {
    let executor = executor();
    let a = load(include_str!("../../../workflows/s3-a.yaml")).unwrap();
    let b = load(include_str!("../../../workflows/s3-b.yaml")).unwrap();
    executor.registry.register(a.clone());
    executor.registry.register(b);

    let err = executor
        .execute(&a, Map::new(), ExecutionContext::root())
        .await
        .unwrap_err();
    let message = err.short_message();
    assert!(message.contains("A"));
    assert!(message.contains("B"));
}

#[tokio::test]
async fn s5_conditional_skip_records_skip_reason() {
    let executor = executor();
    let workflow = load(include_str!("../../../workflows/s5-conditional-skip.yaml")).unwrap();

    let outcome = executor.execute(&workflow, Map::new(), ExecutionContext::root()).await.unwrap();

    assert_eq!(outcome.steps.len(), 2);
    let skipped = &outcome.steps[1];
    assert_eq!(skipped.status, workflow_engine_core::storage::StepStatus::Skipped);
    assert!(skipped.skip_reason.as_deref().unwrap().contains("ok"));
}

#[tokio::test]
async fn s6_deep_nesting_reaches_ten_levels() {
    let executor = executor();
    for i in 1..=10 {
        let path = format!("../../workflows/level-{}.yaml", i);
        let text = std::fs::read_to_string(
            std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join(&path),
        )
        .unwrap();
        executor.registry.register(load(&text).unwrap());
    }

    let root = executor.registry.resolve("level-1").unwrap();
    let outcome = executor.execute(&root, Map::new(), ExecutionContext::root()).await.unwrap();

    assert_eq!(outcome.context.get("level"), Some(&json!(1)));
    let mut cursor = outcome.context.clone();
    for expected_next_level in 2..=9 {
        let child = cursor.get("child_result").unwrap().as_object().unwrap().clone();
        assert_eq!(child.get("level"), Some(&json!(expected_next_level)));
        cursor = child;
    }

    let all = executor.query_executions(Default::default()).await.unwrap();
    assert_eq!(all.len(), 10);
    let mut depths: Vec<i32> = all.iter().map(|e| e.depth).collect();
    depths.sort();
    assert_eq!(depths, (0..10).collect::<Vec<_>>());
}
