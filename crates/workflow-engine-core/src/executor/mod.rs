//! The Workflow Executor: the central recursive step interpreter
//! (spec.md §4.7/§4.8).
//!
//! Grounded on the teacher's `WorkflowExecutor`/`execute` method in
//! `workflow-engine-api/src/workflows/executor.rs` — the `#[instrument]` +
//! `tracing::{info,warn,error}` shape of its step loop, generalized from
//! that file's fixed `StepType` enum to the `namespace.name` action
//! dispatch this engine uses (see [`actions`]).

pub mod actions;

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use serde_json::{Map, Value};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::context::{ExecutionContext, Trigger, TriggerType};
use crate::error::{Result, WorkflowError};
use crate::llm::LlmProvider;
use crate::progress::{ProgressBus, ProgressEvent, ProgressEventData, ProgressEventType};
use crate::prompt::PromptHandler;
use crate::registry::WorkflowRegistry;
use crate::storage::{
    ExecutionFilter, ExecutionPatch, ExecutionRecord, ExecutionStatus, StepRecord, StepStatus,
    StorageAdapter,
};
use crate::template;
use crate::tool_client::ToolClient;
use crate::workflow::{Step, Workflow};

/// What `Executor::execute` returns: spec.md §4.7 step 4's
/// `{execution_id, status, steps, duration, context: variables}`.
#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    pub execution_id: Uuid,
    pub status: ExecutionStatus,
    pub steps: Vec<StepRecord>,
    pub duration_ms: i64,
    pub context: Map<String, Value>,
}

pub struct Executor {
    pub registry: WorkflowRegistry,
    pub storage: Arc<dyn StorageAdapter>,
    pub tool_client: Arc<dyn ToolClient>,
    pub prompt_handler: Arc<dyn PromptHandler>,
    pub llm_provider: Option<Arc<dyn LlmProvider>>,
    pub progress: ProgressBus,
}

impl Executor {
    pub fn new(
        registry: WorkflowRegistry,
        storage: Arc<dyn StorageAdapter>,
        tool_client: Arc<dyn ToolClient>,
        prompt_handler: Arc<dyn PromptHandler>,
        llm_provider: Option<Arc<dyn LlmProvider>>,
        progress: ProgressBus,
    ) -> Self {
        Self {
            registry,
            storage,
            tool_client,
            prompt_handler,
            llm_provider,
            progress,
        }
    }

    /// `Execute(workflow, config, context?) → ExecutionResult` (spec.md §4.7).
    #[instrument(skip_all, fields(workflow_name = %workflow.name, depth = context.depth))]
    pub async fn execute(
        &self,
        workflow: &Workflow,
        config_values: Map<String, Value>,
        context: ExecutionContext,
    ) -> Result<ExecutionOutcome> {
        if !workflow.mcps_required.is_empty() {
            self.tool_client.auto_connect(&workflow.mcps_required).await?;
        }

        // Step 1: initialize variable map — schema defaults, then config
        // values, then inherited context variables.
        let metadata = Value::Object(config_values.clone());

        let mut variables = Map::new();
        for (name, param) in &workflow.config_schema {
            if let Some(default) = &param.default {
                variables.insert(name.clone(), default.clone());
            }
        }
        for (k, v) in config_values {
            variables.insert(k, v);
        }
        for (k, v) in &context.variables {
            variables.insert(k.clone(), v.clone());
        }

        // Step 2: create the execution record.
        let execution_id = Uuid::new_v4();
        let started_at = Utc::now();
        let start_instant = Instant::now();
        let trigger = context.trigger.clone().unwrap_or(Trigger {
            trigger_type: TriggerType::Cli,
            source: None,
        });

        let mut record = ExecutionRecord {
            id: execution_id,
            workflow_name: workflow.name.clone(),
            status: ExecutionStatus::Running,
            started_at,
            completed_at: None,
            duration_ms: None,
            current_step: Some(0),
            total_steps: Some(workflow.steps.len() as i64),
            error: None,
            error_stack: None,
            parent_execution_id: context.parent_execution_id,
            parent_step_index: context.parent_step_index.map(|i| i as i64),
            depth: context.depth as i32,
            trigger,
            metadata,
        };
        self.storage.save_execution(&record).await?;
        self.storage.save_context(execution_id, &variables).await?;

        info!(execution_id = %execution_id, "execution:start");
        self.emit(
            ProgressEventType::ExecutionStart,
            execution_id,
            &workflow.name,
            context.depth,
            None,
        );

        let mut steps_persisted = Vec::with_capacity(workflow.steps.len());
        let run = self
            .run_steps(
                workflow,
                &mut variables,
                &context,
                execution_id,
                start_instant,
                &mut steps_persisted,
            )
            .await;

        let duration_ms = start_instant.elapsed().as_millis() as i64;
        let completed_at = Utc::now();

        match run {
            Ok(()) => {
                record.status = ExecutionStatus::Completed;
                record.completed_at = Some(completed_at);
                record.duration_ms = Some(duration_ms);
                self.storage
                    .update_execution(
                        execution_id,
                        ExecutionPatch {
                            status: Some(ExecutionStatus::Completed),
                            completed_at: Some(completed_at),
                            duration_ms: Some(duration_ms),
                            ..Default::default()
                        },
                    )
                    .await?;
                info!(execution_id = %execution_id, duration_ms, "execution:complete");
                self.emit(
                    ProgressEventType::ExecutionComplete,
                    execution_id,
                    &workflow.name,
                    context.depth,
                    Some(ProgressEventData {
                        duration: Some(duration_ms),
                        ..Default::default()
                    }),
                );
                Ok(ExecutionOutcome {
                    execution_id,
                    status: ExecutionStatus::Completed,
                    steps: steps_persisted,
                    duration_ms,
                    context: variables,
                })
            }
            Err(e) => {
                let short = e.short_message();
                let stack = e.error_stack();
                self.storage
                    .update_execution(
                        execution_id,
                        ExecutionPatch {
                            status: Some(ExecutionStatus::Failed),
                            completed_at: Some(completed_at),
                            duration_ms: Some(duration_ms),
                            error: Some(short.clone()),
                            error_stack: Some(stack),
                            ..Default::default()
                        },
                    )
                    .await?;
                error!(execution_id = %execution_id, error = %short, "execution:failed");
                self.emit(
                    ProgressEventType::ExecutionFailed,
                    execution_id,
                    &workflow.name,
                    context.depth,
                    Some(ProgressEventData {
                        error: Some(short),
                        duration: Some(duration_ms),
                        ..Default::default()
                    }),
                );
                Err(e)
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn run_steps(
        &self,
        workflow: &Workflow,
        variables: &mut Map<String, Value>,
        context: &ExecutionContext,
        execution_id: Uuid,
        start_instant: Instant,
        steps_persisted: &mut Vec<StepRecord>,
    ) -> Result<()> {
        let total_steps = workflow.steps.len();
        let start_index = context.resume_from_step.unwrap_or(0);

        for i in start_index..total_steps {
            if context.is_cancelled() {
                return Err(WorkflowError::CancelledError { execution_id });
            }

            let step = &workflow.steps[i];
            let step_id = step.resolved_id(i);

            self.storage
                .update_execution(
                    execution_id,
                    ExecutionPatch {
                        current_step: Some(i as i64),
                        ..Default::default()
                    },
                )
                .await?;

            self.emit(
                ProgressEventType::StepStart,
                execution_id,
                &workflow.name,
                context.depth,
                Some(ProgressEventData {
                    step_index: Some(i),
                    step_name: Some(step_id.clone()),
                    action: Some(step.action.clone()),
                    description: step.description.clone(),
                    ..Default::default()
                }),
            );

            let vars_snapshot = Value::Object(variables.clone());

            if let Some(condition) = &step.condition {
                if !template::evaluate(condition, &vars_snapshot)? {
                    let record = StepRecord {
                        execution_id,
                        step_index: i as i64,
                        step_name: step_id.clone(),
                        action: step.action.clone(),
                        description: step.description.clone(),
                        status: StepStatus::Skipped,
                        started_at: Utc::now(),
                        completed_at: Some(Utc::now()),
                        duration_ms: Some(0),
                        input: None,
                        output: None,
                        error: None,
                        error_stack: None,
                        child_execution_id: None,
                        retry_attempt: 0,
                        skip_reason: Some(condition.clone()),
                    };
                    self.storage.save_step_result(&record).await?;
                    steps_persisted.push(record);
                    self.emit(
                        ProgressEventType::StepSkipped,
                        execution_id,
                        &workflow.name,
                        context.depth,
                        Some(ProgressEventData {
                            step_index: Some(i),
                            step_name: Some(step_id.clone()),
                            action: Some(step.action.clone()),
                            ..Default::default()
                        }),
                    );
                    continue;
                }
            }

            let input = template::interpolate_value(&step.params_value(), &vars_snapshot)?;
            let step_started_at = Utc::now();
            let step_start_instant = Instant::now();

            if context.dry_run {
                let output = serde_json::json!({"dry_run": true});
                let record = StepRecord {
                    execution_id,
                    step_index: i as i64,
                    step_name: step_id.clone(),
                    action: step.action.clone(),
                    description: step.description.clone(),
                    status: StepStatus::Completed,
                    started_at: step_started_at,
                    completed_at: Some(Utc::now()),
                    duration_ms: Some(0),
                    input: Some(input),
                    output: Some(output.clone()),
                    error: None,
                    error_stack: None,
                    child_execution_id: None,
                    retry_attempt: 0,
                    skip_reason: None,
                };
                self.storage.save_step_result(&record).await?;
                steps_persisted.push(record);
                if let Some(name) = &step.output {
                    variables.insert(name.clone(), output);
                    self.storage.save_context(execution_id, variables).await?;
                }
                self.emit(
                    ProgressEventType::StepComplete,
                    execution_id,
                    &workflow.name,
                    context.depth,
                    Some(ProgressEventData {
                        step_index: Some(i),
                        step_name: Some(step_id.clone()),
                        action: Some(step.action.clone()),
                        duration: Some(0),
                        ..Default::default()
                    }),
                );
                self.check_timeout(workflow, execution_id, start_instant)?;
                continue;
            }

            let dispatch_result = self
                .dispatch_with_retry(step, &input, variables, context, execution_id, i, &workflow.name)
                .await;

            let duration_ms = step_start_instant.elapsed().as_millis() as i64;

            match dispatch_result {
                Ok((output, child_execution_id, retry_attempt)) => {
                    let record = StepRecord {
                        execution_id,
                        step_index: i as i64,
                        step_name: step_id.clone(),
                        action: step.action.clone(),
                        description: step.description.clone(),
                        status: StepStatus::Completed,
                        started_at: step_started_at,
                        completed_at: Some(Utc::now()),
                        duration_ms: Some(duration_ms),
                        input: Some(input),
                        output: Some(output.clone()),
                        error: None,
                        error_stack: None,
                        child_execution_id,
                        retry_attempt,
                        skip_reason: None,
                    };
                    self.storage.save_step_result(&record).await?;
                    steps_persisted.push(record);

                    if let Some(name) = &step.output {
                        variables.insert(name.clone(), output);
                        self.storage.save_context(execution_id, variables).await?;
                    }

                    self.emit(
                        ProgressEventType::StepComplete,
                        execution_id,
                        &workflow.name,
                        context.depth,
                        Some(ProgressEventData {
                            step_index: Some(i),
                            step_name: Some(step_id.clone()),
                            action: Some(step.action.clone()),
                            duration: Some(duration_ms),
                            ..Default::default()
                        }),
                    );

                    self.check_timeout(workflow, execution_id, start_instant)?;
                }
                Err((err, retry_attempt)) => {
                    let short = err.short_message();
                    let stack = err.error_stack();
                    let record = StepRecord {
                        execution_id,
                        step_index: i as i64,
                        step_name: step_id.clone(),
                        action: step.action.clone(),
                        description: step.description.clone(),
                        status: StepStatus::Failed,
                        started_at: step_started_at,
                        completed_at: Some(Utc::now()),
                        duration_ms: Some(duration_ms),
                        input: Some(input),
                        output: None,
                        error: Some(short.clone()),
                        error_stack: Some(stack),
                        child_execution_id: None,
                        retry_attempt,
                        skip_reason: None,
                    };
                    self.storage.save_step_result(&record).await?;
                    steps_persisted.push(record);
                    warn!(execution_id = %execution_id, step_index = i, error = %short, "step:failed");
                    self.emit(
                        ProgressEventType::StepFailed,
                        execution_id,
                        &workflow.name,
                        context.depth,
                        Some(ProgressEventData {
                            step_index: Some(i),
                            step_name: Some(step_id.clone()),
                            action: Some(step.action.clone()),
                            error: Some(short),
                            duration: Some(duration_ms),
                            ..Default::default()
                        }),
                    );
                    return Err(err);
                }
            }
        }

        Ok(())
    }

    /// Dispatches the step's action, honoring `step.retry` for retryable
    /// error kinds (spec.md §7). Returns the output plus an optional
    /// child-execution id and the retry attempt the final try landed on.
    #[allow(clippy::too_many_arguments)]
    async fn dispatch_with_retry(
        &self,
        step: &Step,
        input: &Value,
        variables: &mut Map<String, Value>,
        context: &ExecutionContext,
        execution_id: Uuid,
        step_index: usize,
        workflow_name: &str,
    ) -> std::result::Result<(Value, Option<Uuid>, i32), (WorkflowError, i32)> {
        let (namespace, name) = step.namespace_and_name();
        let mut attempts_left = step.retry.map(|r| r.attempts).unwrap_or(0);
        let delay_ms = step.retry.and_then(|r| r.delay).unwrap_or(0);
        let mut retry_attempt = 0;

        loop {
            let result = actions::dispatch(
                self,
                namespace,
                name,
                input,
                variables,
                context,
                execution_id,
                step_index,
                workflow_name,
            )
            .await;

            match result {
                Ok(actions::DispatchResult::Output(v)) => return Ok((v, None, retry_attempt)),
                Ok(actions::DispatchResult::ChildWorkflow { output, child_execution_id }) => {
                    return Ok((output, Some(child_execution_id), retry_attempt))
                }
                Err(e) if e.is_retryable() && attempts_left > 0 => {
                    attempts_left -= 1;
                    retry_attempt += 1;
                    if delay_ms > 0 {
                        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                    }
                    continue;
                }
                Err(e) => return Err((e, retry_attempt)),
            }
        }
    }

    fn check_timeout(&self, workflow: &Workflow, execution_id: Uuid, start: Instant) -> Result<()> {
        if let Some(limit_ms) = workflow.timeout {
            let elapsed_ms = start.elapsed().as_millis() as u64;
            if elapsed_ms > limit_ms {
                return Err(WorkflowError::TimeoutError {
                    workflow: workflow.name.clone(),
                    elapsed_ms,
                    limit_ms,
                });
            }
        }
        let _ = execution_id;
        Ok(())
    }

    fn emit(
        &self,
        event_type: ProgressEventType,
        execution_id: Uuid,
        workflow_name: &str,
        depth: u32,
        data: Option<ProgressEventData>,
    ) {
        self.progress
            .emit(ProgressEvent::new(event_type, execution_id, workflow_name, depth, data));
    }

    fn emit_child_start(&self, execution_id: Uuid, workflow_name: &str, depth: u32, child_name: &str) {
        self.emit(
            ProgressEventType::ChildStart,
            execution_id,
            workflow_name,
            depth,
            Some(ProgressEventData {
                action: Some(format!("workflow.run:{}", child_name)),
                ..Default::default()
            }),
        );
    }

    fn emit_child_complete(
        &self,
        execution_id: Uuid,
        workflow_name: &str,
        depth: u32,
        child_name: &str,
        success: bool,
    ) {
        self.emit(
            ProgressEventType::ChildComplete,
            execution_id,
            workflow_name,
            depth,
            Some(ProgressEventData {
                action: Some(format!("workflow.run:{}", child_name)),
                error: if success { None } else { Some("failed".to_string()) },
                ..Default::default()
            }),
        );
    }

    /// `QueryExecutions` convenience passthrough used by the bootstrap
    /// binary and tests; the core algorithm never needs it itself.
    pub async fn query_executions(&self, filter: ExecutionFilter) -> Result<Vec<ExecutionRecord>> {
        self.storage.query_executions(filter).await
    }
}
