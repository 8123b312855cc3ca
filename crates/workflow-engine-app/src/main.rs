//! Bootstrap binary: wires the registry, storage, tool client, and LLM
//! provider into a runnable [`Executor`] and runs a single workflow.
//!
//! This is deliberately thin — `clap` here only covers "run a workflow and
//! print its outcome," not the fuller CLI surface (list/search/install
//! workflows, inspect executions, serve an inspector UI) that a complete
//! front end would expose.

mod prompt;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use serde_json::Map;

use workflow_engine_core::config::{config_home, database_path, mcp_servers_config_path};
use workflow_engine_core::context::{ExecutionContext, Trigger, TriggerType};
use workflow_engine_core::executor::Executor;
use workflow_engine_core::llm::{build_provider, config as llm_config};
use workflow_engine_core::progress::{ProgressBus, ProgressEvent, ProgressHandler};
use workflow_engine_core::registry::WorkflowRegistry;
use workflow_engine_core::workflow;
use workflow_engine_mcp::HybridToolClient;
use workflow_engine_storage::{init_pool, SqliteStorageAdapter};

use crate::prompt::StdinPromptHandler;

#[derive(Parser)]
#[command(name = "workflow-engine", about = "Run a declarative YAML workflow")]
struct Cli {
    /// Path to the workflow YAML document to run.
    workflow: PathBuf,

    /// Configuration values as `key=value` pairs, parsed as JSON when
    /// possible and falling back to a plain string.
    #[arg(long = "set", value_name = "KEY=VALUE")]
    config: Vec<String>,

    /// Run without dispatching any step, recording `{dry_run: true}` output.
    #[arg(long)]
    dry_run: bool,
}

struct TracingProgressHandler;

impl ProgressHandler for TracingProgressHandler {
    fn notify(&self, event: &ProgressEvent) {
        tracing::info!(
            execution_id = %event.execution_id,
            workflow = %event.workflow_name,
            depth = event.depth,
            "{:?}",
            event.event_type
        );
    }
}

fn parse_config_values(pairs: &[String]) -> Map<String, serde_json::Value> {
    let mut values = Map::new();
    for pair in pairs {
        if let Some((key, raw)) = pair.split_once('=') {
            let value = serde_json::from_str(raw).unwrap_or_else(|_| serde_json::Value::String(raw.to_string()));
            values.insert(key.to_string(), value);
        }
    }
    values
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let yaml = match std::fs::read_to_string(&cli.workflow) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("could not read {}: {}", cli.workflow.display(), e);
            return std::process::ExitCode::FAILURE;
        }
    };
    let workflow = match workflow::load(&yaml) {
        Ok(wf) => wf,
        Err(e) => {
            eprintln!("invalid workflow document: {}", e);
            return std::process::ExitCode::FAILURE;
        }
    };

    let home = config_home();

    let pool = match init_pool(&database_path().to_string_lossy()) {
        Ok(pool) => pool,
        Err(e) => {
            eprintln!("failed to open execution history database: {}", e);
            return std::process::ExitCode::FAILURE;
        }
    };
    let storage = Arc::new(SqliteStorageAdapter::new(pool));

    let tool_client = match HybridToolClient::from_config_path(mcp_servers_config_path()) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            eprintln!("failed to load tool-server config: {}", e);
            return std::process::ExitCode::FAILURE;
        }
    };

    let llm_provider = match llm_config::load(&home) {
        Ok(Some(cfg)) => Some(Arc::from(build_provider(&cfg))),
        Ok(None) => None,
        Err(e) => {
            eprintln!("failed to load LLM provider config: {}", e);
            return std::process::ExitCode::FAILURE;
        }
    };

    let prompt_handler = Arc::new(StdinPromptHandler::new(llm_provider.clone()));

    let registry = WorkflowRegistry::new();
    if let Some(dir) = cli.workflow.parent() {
        registry.add_search_path(dir);
    }
    registry.register(workflow.clone());

    let progress = ProgressBus::new();
    progress.subscribe(Arc::new(TracingProgressHandler));

    let executor = Executor::new(registry, storage, tool_client, prompt_handler, llm_provider, progress);

    let config_values = parse_config_values(&cli.config);
    let mut context = ExecutionContext::root();
    context.trigger = Some(Trigger {
        trigger_type: TriggerType::Cli,
        source: Some("workflow-engine".to_string()),
    });
    context.dry_run = cli.dry_run;

    match executor.execute(&workflow, config_values, context).await {
        Ok(outcome) => {
            println!(
                "{}",
                serde_json::json!({
                    "execution_id": outcome.execution_id,
                    "status": outcome.status,
                    "duration_ms": outcome.duration_ms,
                    "context": outcome.context,
                })
            );
            std::process::ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("workflow failed: {}", e);
            std::process::ExitCode::FAILURE
        }
    }
}
