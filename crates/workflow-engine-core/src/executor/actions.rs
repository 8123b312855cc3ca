//! Built-in action dispatch for namespaces reserved by spec.md §3:
//! `prompt`, `variable`, `log`, `ai`, `workflow`. Any other namespace routes
//! to a tool server of that name (spec.md §4.7's final dispatch clause).

use serde_json::{json, Map, Value};

use crate::context::ExecutionContext;
use crate::error::{Result, WorkflowError};
use crate::executor::{Executor, ExecutionOutcome};
use crate::prompt::{self, AskRequest, PromptKind};

/// What the step-loop does with the action's return value once dispatch
/// completes — distinguishes a plain output from a sub-workflow recursion,
/// which additionally needs to record `child_execution_id` on the step row.
pub enum DispatchResult {
    Output(Value),
    ChildWorkflow {
        output: Value,
        child_execution_id: uuid::Uuid,
    },
}

pub async fn dispatch(
    executor: &Executor,
    namespace: &str,
    name: &str,
    params: &Value,
    variables: &mut Map<String, Value>,
    context: &ExecutionContext,
    parent_execution_id: uuid::Uuid,
    parent_step_index: usize,
    parent_workflow_name: &str,
) -> Result<DispatchResult> {
    match namespace {
        "prompt" => prompt_action(executor, name, params).await.map(DispatchResult::Output),
        "variable" => variable_action(name, params, variables).map(DispatchResult::Output),
        "log" => log_action(name, params).map(DispatchResult::Output),
        "ai" => ai_action(executor, name, params).await.map(DispatchResult::Output),
        "workflow" => {
            if name != "run" {
                return Err(WorkflowError::CompositionError {
                    message: format!("unknown workflow action 'workflow.{}'", name),
                });
            }
            workflow_run(
                executor,
                params,
                variables,
                context,
                parent_execution_id,
                parent_step_index,
                parent_workflow_name,
            )
            .await
        }
        _ => tool_action(executor, namespace, name, params).await.map(DispatchResult::Output),
    }
}

async fn prompt_action(executor: &Executor, name: &str, params: &Value) -> Result<Value> {
    let message = params
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    match name {
        "ask" => {
            let default = params.get("default").and_then(Value::as_str).map(String::from);
            let options = params.get("options").and_then(Value::as_array).map(|arr| {
                arr.iter().filter_map(|v| v.as_str().map(String::from)).collect()
            });
            let dynamic = params.get("dynamic").and_then(Value::as_bool).unwrap_or(false);
            let response = executor
                .prompt_handler
                .ask(AskRequest {
                    message,
                    kind: Some(PromptKind::Text),
                    default,
                    options,
                    dynamic,
                })
                .await?;
            Ok(json!({"raw": response.raw, "interpreted": response.interpreted}))
        }
        "confirm" => {
            let default = params.get("default").and_then(Value::as_bool);
            let answer = executor.prompt_handler.confirm(&message, default).await?;
            Ok(json!(answer))
        }
        "select" => {
            let options: Vec<String> = params
                .get("options")
                .and_then(Value::as_array)
                .map(|arr| arr.iter().filter_map(|v| v.as_str().map(String::from)).collect())
                .unwrap_or_default();
            let answer = executor.prompt_handler.select(&message, &options).await?;
            Ok(json!(answer))
        }
        other => Err(WorkflowError::CompositionError {
            message: format!("unknown prompt action 'prompt.{}'", other),
        }),
    }
}

fn variable_action(name: &str, params: &Value, variables: &mut Map<String, Value>) -> Result<Value> {
    match name {
        "set" => {
            let var_name = params
                .get("name")
                .and_then(Value::as_str)
                .ok_or_else(|| WorkflowError::ValidationError {
                    violations: vec!["variable.set requires 'name'".to_string()],
                })?
                .to_string();
            let value = params.get("value").cloned().unwrap_or(Value::Null);
            variables.insert(var_name, value.clone());
            Ok(value)
        }
        "get" => {
            let var_name = params.get("name").and_then(Value::as_str).unwrap_or_default();
            Ok(variables.get(var_name).cloned().unwrap_or(Value::Null))
        }
        other => Err(WorkflowError::CompositionError {
            message: format!("unknown variable action 'variable.{}'", other),
        }),
    }
}

fn log_action(name: &str, params: &Value) -> Result<Value> {
    let message = params
        .get("message")
        .map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .unwrap_or_default();

    let rendered = render_log_message(&message);
    match name {
        "info" => println!("{}", rendered),
        "error" => eprintln!("{}", rendered),
        "debug" => println!("{}", rendered),
        other => {
            return Err(WorkflowError::CompositionError {
                message: format!("unknown log action 'log.{}'", other),
            })
        }
    }
    Ok(json!(message))
}

/// spec.md §4.7: "A message whose trimmed content is a JSON object or array
/// is pretty-printed; if it contains the key `result`, the prose of
/// `result` is surfaced instead of the raw JSON."
fn render_log_message(message: &str) -> String {
    let trimmed = message.trim();
    let starts_structured = trimmed.starts_with('{') || trimmed.starts_with('[');
    if !starts_structured {
        return message.to_string();
    }
    match serde_json::from_str::<Value>(trimmed) {
        Ok(value) => {
            if let Some(result) = value.get("result") {
                match result {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                }
            } else {
                serde_json::to_string_pretty(&value).unwrap_or_else(|_| message.to_string())
            }
        }
        Err(_) => message.to_string(),
    }
}

async fn ai_action(executor: &Executor, name: &str, params: &Value) -> Result<Value> {
    let provider = executor
        .llm_provider
        .as_ref()
        .ok_or_else(|| WorkflowError::ProviderError {
            message: "no LLM provider configured".to_string(),
        })?;

    let system = params.get("system").and_then(Value::as_str);
    let temperature = params.get("temperature").and_then(Value::as_f64).map(|f| f as f32);
    let max_tokens = params.get("max_tokens").and_then(Value::as_u64).map(|n| n as u32);

    let prompt_text = match name {
        "generate" => params
            .get("prompt")
            .and_then(Value::as_str)
            .ok_or_else(|| WorkflowError::ValidationError {
                violations: vec!["ai.generate requires 'prompt'".to_string()],
            })?
            .to_string(),
        "interpret" => {
            let input = params.get("input").and_then(Value::as_str).unwrap_or_default();
            let extra_context = params.get("context").and_then(Value::as_str).unwrap_or_default();
            format!(
                "Reinterpret the following input concisely, keeping its meaning intact.\nContext: {}\nInput: {}",
                extra_context, input
            )
        }
        "summarize" => {
            let text = params.get("text").and_then(Value::as_str).unwrap_or_default();
            let max_length = params.get("max_length").and_then(Value::as_u64);
            match max_length {
                Some(n) => format!("Summarize the following text in at most {} words:\n\n{}", n, text),
                None => format!("Summarize the following text:\n\n{}", text),
            }
        }
        other => {
            return Err(WorkflowError::CompositionError {
                message: format!("unknown ai action 'ai.{}'", other),
            })
        }
    };

    let response = provider.generate(&prompt_text, system, temperature, max_tokens).await?;
    Ok(json!(response))
}

async fn workflow_run(
    executor: &Executor,
    params: &Value,
    variables: &Map<String, Value>,
    context: &ExecutionContext,
    parent_execution_id: uuid::Uuid,
    parent_step_index: usize,
    parent_workflow_name: &str,
) -> Result<DispatchResult> {
    let child_name = params
        .get("workflow")
        .and_then(Value::as_str)
        .ok_or_else(|| WorkflowError::ValidationError {
            violations: vec!["workflow.run requires 'workflow'".to_string()],
        })?
        .to_string();

    if context.call_stack.contains(&child_name) || parent_workflow_name == child_name {
        let mut path = context.call_stack.clone();
        path.push(parent_workflow_name.to_string());
        path.push(child_name.clone());
        return Err(WorkflowError::CompositionError {
            message: format!("Circular dependency detected: {}", path.join(" \u{2192} ")),
        });
    }

    let child_workflow = executor.registry.resolve(&child_name)?;

    let raw_vars = params.get("vars").cloned().unwrap_or(Value::Object(Map::new()));
    let vars_template = Value::Object(
        raw_vars
            .as_object()
            .cloned()
            .unwrap_or_default(),
    );
    let interpolated = crate::template::interpolate_value(&vars_template, &Value::Object(variables.clone()))?;
    let child_vars = interpolated.as_object().cloned().unwrap_or_default();

    let child_context = context.for_child(parent_execution_id, parent_step_index, parent_workflow_name, child_vars.clone());

    executor
        .emit_child_start(parent_execution_id, parent_workflow_name, context.depth, &child_name);

    let outcome = Box::pin(executor.execute(&child_workflow, child_vars, child_context)).await;

    executor.emit_child_complete(parent_execution_id, parent_workflow_name, context.depth, &child_name, outcome.is_ok());

    match outcome {
        Ok(ExecutionOutcome { execution_id, context: child_context, .. }) => Ok(DispatchResult::ChildWorkflow {
            output: Value::Object(child_context),
            child_execution_id: execution_id,
        }),
        Err(e) => Err(WorkflowError::CompositionError {
            message: format!("Child workflow '{}' failed: {}", child_name, e.short_message()),
        }),
    }
}

async fn tool_action(executor: &Executor, namespace: &str, name: &str, params: &Value) -> Result<Value> {
    if !executor.tool_client.is_connected(namespace).await {
        executor.tool_client.connect(namespace).await?;
    }
    let result = executor.tool_client.call_tool(namespace, name, params.clone()).await?;

    if namespace == "shell" {
        check_shell_exit(&result)?;
    }
    Ok(result)
}

/// spec.md §4.7: "If `ns == 'shell'` and the response contains a
/// recognizable `exit_code: N` field with `N != 0`, the engine raises a
/// step failure whose message includes the stderr (or stdout fallback)."
fn check_shell_exit(result: &Value) -> Result<()> {
    let exit_code = result.get("exit_code").and_then(Value::as_i64);
    if let Some(code) = exit_code {
        if code != 0 {
            let stderr = result.get("stderr").and_then(Value::as_str);
            let stdout = result.get("stdout").and_then(Value::as_str);
            let message = stderr
                .filter(|s| !s.is_empty())
                .or(stdout)
                .unwrap_or("command failed")
                .to_string();
            return Err(WorkflowError::ToolError {
                server: "shell".to_string(),
                tool: "execute_command".to_string(),
                message,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_log_message_pretty_prints_json_objects() {
        let rendered = render_log_message(r#"{"a": 1}"#);
        assert!(rendered.contains("\"a\""));
    }

    #[test]
    fn render_log_message_surfaces_result_prose() {
        let rendered = render_log_message(r#"{"result": "all good"}"#);
        assert_eq!(rendered, "all good");
    }

    #[test]
    fn render_log_message_passes_through_plain_text() {
        assert_eq!(render_log_message("hello"), "hello");
    }

    #[test]
    fn shell_nonzero_exit_fails_with_stderr() {
        let result = json!({"exit_code": 1, "stderr": "boom", "stdout": ""});
        let err = check_shell_exit(&result).unwrap_err();
        assert!(matches!(err, WorkflowError::ToolError { .. }));
    }

    #[test]
    fn shell_zero_exit_passes() {
        let result = json!({"exit_code": 0});
        assert!(check_shell_exit(&result).is_ok());
    }
}
