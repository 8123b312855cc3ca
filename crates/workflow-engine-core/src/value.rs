//! Variable-map value representation.
//!
//! The source keeps a duck-typed map for step outputs and variables; here
//! that collapses onto `serde_json::Value`, which is already the tagged
//! union the design notes ask for (string / number / bool / array / object /
//! null) and is what every other component (template engine, storage,
//! tool protocol) already speaks.

use serde_json::Value;

/// Stringifies a JSON value the way the template engine's `{{path}}`
/// substitution requires: numbers as decimal, booleans as `true`/`false`,
/// strings unquoted, arrays/objects as their JSON text.
pub fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Array(_) | Value::Object(_) => {
            serde_json::to_string(value).unwrap_or_else(|_| "null".to_string())
        }
    }
}

/// Walks a dot-separated path (`a.b.c`) through nested JSON objects/arrays.
/// Array indices are accepted as numeric path segments. Returns `None` if any
/// intermediate segment is missing.
pub fn get_path<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = root;
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(arr) => arr.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn stringify_matches_spec_rules() {
        assert_eq!(stringify(&json!("hi")), "hi");
        assert_eq!(stringify(&json!(42)), "42");
        assert_eq!(stringify(&json!(true)), "true");
        assert_eq!(stringify(&json!([1, 2])), "[1,2]");
    }

    #[test]
    fn get_path_walks_nested_objects() {
        let root = json!({"a": {"b": {"c": 1}}});
        assert_eq!(get_path(&root, "a.b.c"), Some(&json!(1)));
        assert_eq!(get_path(&root, "a.b.missing"), None);
    }

    #[test]
    fn get_path_walks_arrays() {
        let root = json!({"items": [10, 20]});
        assert_eq!(get_path(&root, "items.1"), Some(&json!(20)));
    }
}
