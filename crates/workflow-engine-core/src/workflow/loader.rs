//! YAML → [`Workflow`] loading with composite validation (spec.md §4.2).
//!
//! Grounded on the teacher's validator pattern in `workflow/builder.rs`
//! (`WorkflowError::InvalidWorkflow` with accumulated reasons) generalized to
//! a dedicated composite-violation path: every mistake is reported, not just
//! the first one found, because a loosely-typed intermediate `serde_json::Value`
//! is validated by hand before the document is committed to the strict
//! [`Workflow`] shape.

use serde_json::Value;

use crate::error::{Result, WorkflowError};
use crate::workflow::model::Workflow;

const PERMITTED_PROMPT_MODES: [&str; 3] = ["static", "dynamic", "both"];

/// Parses a YAML document into a validated [`Workflow`].
///
/// Collects every structural violation before failing, per spec.md §4.2:
/// "Fails with a composite error listing every violation — never on the
/// first mistake alone."
pub fn load(yaml: &str) -> Result<Workflow> {
    let raw: serde_yaml::Value = serde_yaml::from_str(yaml).map_err(|e| {
        WorkflowError::ValidationError {
            violations: vec![format!("invalid YAML: {}", e)],
        }
    })?;

    let json: Value = serde_json::to_value(&raw).map_err(|e| WorkflowError::ValidationError {
        violations: vec![format!("could not normalize document: {}", e)],
    })?;

    let violations = validate(&json);
    if !violations.is_empty() {
        return Err(WorkflowError::ValidationError { violations });
    }

    serde_json::from_value(json).map_err(|e| WorkflowError::ValidationError {
        violations: vec![format!("schema mismatch: {}", e)],
    })
}

fn validate(doc: &Value) -> Vec<String> {
    let mut violations = Vec::new();

    let Some(obj) = doc.as_object() else {
        violations.push("workflow document must be a mapping".to_string());
        return violations;
    };

    match obj.get("name") {
        Some(Value::String(s)) if !s.trim().is_empty() => {}
        Some(Value::String(_)) => violations.push("'name' must not be empty".to_string()),
        Some(_) => violations.push("'name' must be a string".to_string()),
        None => violations.push("'name' is required".to_string()),
    }

    match obj.get("steps") {
        Some(Value::Array(steps)) if steps.is_empty() => {
            violations.push("'steps' must not be empty".to_string())
        }
        Some(Value::Array(steps)) => {
            for (i, step) in steps.iter().enumerate() {
                validate_step(i, step, &mut violations);
            }
        }
        Some(_) => violations.push("'steps' must be an array".to_string()),
        None => violations.push("'steps' is required".to_string()),
    }

    if let Some(mode) = obj.get("prompt_mode") {
        match mode {
            Value::String(s) if PERMITTED_PROMPT_MODES.contains(&s.as_str()) => {}
            _ => violations.push(format!(
                "'prompt_mode' must be one of {:?}",
                PERMITTED_PROMPT_MODES
            )),
        }
    }

    violations
}

fn validate_step(index: usize, step: &Value, violations: &mut Vec<String>) {
    let Some(obj) = step.as_object() else {
        violations.push(format!("step {} must be a mapping", index));
        return;
    };
    match obj.get("action") {
        Some(Value::String(s)) if !s.trim().is_empty() => {}
        Some(Value::String(_)) => {
            violations.push(format!("step {}: 'action' must not be empty", index))
        }
        Some(_) => violations.push(format!("step {}: 'action' must be a string", index)),
        None => violations.push(format!("step {}: 'action' is required", index)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_minimal_workflow() {
        let yaml = r#"
name: example
steps:
  - action: log.info
    params: { message: "hi" }
"#;
        let wf = load(yaml).unwrap();
        assert_eq!(wf.name, "example");
        assert_eq!(wf.steps.len(), 1);
    }

    #[test]
    fn zero_step_workflow_fails_validation() {
        let yaml = "name: empty\nsteps: []\n";
        let err = load(yaml).unwrap_err();
        match err {
            WorkflowError::ValidationError { violations } => {
                assert!(violations.iter().any(|v| v.contains("steps")));
            }
            other => panic!("expected ValidationError, got {:?}", other),
        }
    }

    #[test]
    fn reports_every_violation_at_once() {
        let yaml = r#"
steps:
  - params: {}
prompt_mode: weird
"#;
        let err = load(yaml).unwrap_err();
        match err {
            WorkflowError::ValidationError { violations } => {
                assert!(violations.iter().any(|v| v.contains("name")));
                assert!(violations.iter().any(|v| v.contains("action")));
                assert!(violations.iter().any(|v| v.contains("prompt_mode")));
                assert_eq!(violations.len(), 3);
            }
            other => panic!("expected ValidationError, got {:?}", other),
        }
    }

    #[test]
    fn round_trips_unknown_top_level_keys() {
        let yaml = r#"
name: example
custom_field: keep-me
steps:
  - action: log.info
"#;
        let wf = load(yaml).unwrap();
        assert_eq!(
            wf.extra.get("custom_field").and_then(|v| v.as_str()),
            Some("keep-me")
        );
    }
}
