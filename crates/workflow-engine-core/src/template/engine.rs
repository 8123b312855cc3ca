//! `{{path}}` interpolation over a flat/nested variable map.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::error::{Result, WorkflowError};
use crate::value::{get_path, stringify};

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{\s*([A-Za-z0-9_\.]+)\s*\}\}").expect("valid regex"));

/// Rewrites every `{{path}}` occurrence in `template` against `vars`.
/// Fails the whole interpolation if any referenced path cannot be resolved —
/// spec.md §4.1: "An unresolved reference fails the step."
pub fn interpolate(template: &str, vars: &Value) -> Result<String> {
    let mut err: Option<WorkflowError> = None;
    let result = PLACEHOLDER.replace_all(template, |caps: &regex::Captures| {
        let path = &caps[1];
        match get_path(vars, path) {
            Some(value) => stringify(value),
            None => {
                if err.is_none() {
                    err = Some(WorkflowError::TemplateError {
                        template: template.to_string(),
                        message: format!("unresolved reference '{{{{{}}}}}'", path),
                    });
                }
                String::new()
            }
        }
    });
    match err {
        Some(e) => Err(e),
        None => Ok(result.into_owned()),
    }
}

/// Walks arbitrary JSON and interpolates every string leaf, per spec.md
/// §4.1's `InterpolateValue`.
pub fn interpolate_value(template: &Value, vars: &Value) -> Result<Value> {
    match template {
        Value::String(s) => Ok(Value::String(interpolate(s, vars)?)),
        Value::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(interpolate_value(item, vars)?);
            }
            Ok(Value::Array(out))
        }
        Value::Object(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (k, v) in map {
                out.insert(k.clone(), interpolate_value(v, vars)?);
            }
            Ok(Value::Object(out))
        }
        other => Ok(other.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn constant_string_is_idempotent() {
        let vars = json!({});
        assert_eq!(interpolate("no templates here", &vars).unwrap(), "no templates here");
    }

    #[test]
    fn resolves_nested_path() {
        let vars = json!({"a": {"b": {"c": "deep"}}});
        assert_eq!(interpolate("value: {{a.b.c}}", &vars).unwrap(), "value: deep");
    }

    #[test]
    fn unresolved_path_fails() {
        let vars = json!({"a": {}});
        let err = interpolate("{{a.b.c}}", &vars).unwrap_err();
        assert!(matches!(err, WorkflowError::TemplateError { .. }));
    }

    #[test]
    fn stringifies_numbers_bools_and_arrays() {
        let vars = json!({"n": 3, "b": true, "arr": [1, 2]});
        assert_eq!(interpolate("{{n}}-{{b}}-{{arr}}", &vars).unwrap(), "3-true-[1,2]");
    }

    #[test]
    fn interpolate_value_walks_objects_and_arrays() {
        let vars = json!({"x": "hi"});
        let template = json!({"msg": "{{x}}", "list": ["{{x}}", "literal"]});
        let rendered = interpolate_value(&template, &vars).unwrap();
        assert_eq!(rendered, json!({"msg": "hi", "list": ["hi", "literal"]}));
    }
}
