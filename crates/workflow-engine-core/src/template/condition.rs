//! Boolean condition grammar used by `step.if`.
//!
//! spec.md §4.1: substitute every `{{path}}` with its JSON-encoded value,
//! then parse `||` (lowest) / `&&` / one binary comparison, with JSON-literal
//! operands, plus a bare-truthy fallback (`true`, non-empty string, non-zero
//! number).

use serde_json::Value;

use crate::error::{Result, WorkflowError};
use crate::value::get_path;

/// Substitutes every `{{path}}` in `condition` with the JSON encoding of its
/// value, then evaluates the resulting boolean expression.
pub fn evaluate(condition: &str, vars: &Value) -> Result<bool> {
    let substituted = substitute(condition, vars)?;
    let tokens = tokenize(&substituted, condition)?;
    let mut parser = Parser {
        tokens: &tokens,
        pos: 0,
        source: condition,
    };
    let result = parser.parse_or()?;
    if parser.pos != parser.tokens.len() {
        return Err(WorkflowError::TemplateError {
            template: condition.to_string(),
            message: "trailing tokens in condition".to_string(),
        });
    }
    Ok(result)
}

fn substitute(condition: &str, vars: &Value) -> Result<String> {
    let placeholder = once_cell::sync::Lazy::new(|| {
        regex::Regex::new(r"\{\{\s*([A-Za-z0-9_\.]+)\s*\}\}").expect("valid regex")
    });
    let mut err = None;
    let rendered = placeholder.replace_all(condition, |caps: &regex::Captures| {
        let path = &caps[1];
        match get_path(vars, path) {
            Some(value) => serde_json::to_string(value).unwrap_or_else(|_| "null".to_string()),
            None => {
                if err.is_none() {
                    err = Some(WorkflowError::TemplateError {
                        template: condition.to_string(),
                        message: format!("unresolved reference '{{{{{}}}}}'", path),
                    });
                }
                "null".to_string()
            }
        }
    });
    match err {
        Some(e) => Err(e),
        None => Ok(rendered.into_owned()),
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Literal(Value),
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

fn tokenize(input: &str, source: &str) -> Result<Vec<Token>> {
    let bytes = input.as_bytes();
    let mut i = 0;
    let mut tokens = Vec::new();
    let fail = |msg: String| WorkflowError::TemplateError {
        template: source.to_string(),
        message: msg,
    };

    while i < bytes.len() {
        let c = bytes[i] as char;
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        if input[i..].starts_with("||") {
            tokens.push(Token::Or);
            i += 2;
        } else if input[i..].starts_with("&&") {
            tokens.push(Token::And);
            i += 2;
        } else if input[i..].starts_with("===") {
            tokens.push(Token::Eq);
            i += 3;
        } else if input[i..].starts_with("!==") {
            tokens.push(Token::Ne);
            i += 3;
        } else if input[i..].starts_with("==") {
            tokens.push(Token::Eq);
            i += 2;
        } else if input[i..].starts_with("!=") {
            tokens.push(Token::Ne);
            i += 2;
        } else if input[i..].starts_with("<=") {
            tokens.push(Token::Le);
            i += 2;
        } else if input[i..].starts_with(">=") {
            tokens.push(Token::Ge);
            i += 2;
        } else if c == '<' {
            tokens.push(Token::Lt);
            i += 1;
        } else if c == '>' {
            tokens.push(Token::Gt);
            i += 1;
        } else if c == '"' {
            let mut j = i + 1;
            let mut s = String::new();
            let mut closed = false;
            while j < bytes.len() {
                let cj = bytes[j] as char;
                if cj == '\\' && j + 1 < bytes.len() {
                    s.push(bytes[j + 1] as char);
                    j += 2;
                    continue;
                }
                if cj == '"' {
                    closed = true;
                    j += 1;
                    break;
                }
                s.push(cj);
                j += 1;
            }
            if !closed {
                return Err(fail("unterminated string literal".to_string()));
            }
            tokens.push(Token::Literal(Value::String(s)));
            i = j;
        } else {
            let start = i;
            while i < bytes.len() && !bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            let word = &input[start..i];
            let literal = match word {
                "true" => Value::Bool(true),
                "false" => Value::Bool(false),
                "null" => Value::Null,
                _ => word
                    .parse::<f64>()
                    .ok()
                    .and_then(|n| serde_json::Number::from_f64(n).map(Value::Number))
                    .ok_or_else(|| fail(format!("invalid literal '{}'", word)))?,
            };
            tokens.push(Token::Literal(literal));
        }
    }
    Ok(tokens)
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    source: &'a str,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn fail(&self, msg: &str) -> WorkflowError {
        WorkflowError::TemplateError {
            template: self.source.to_string(),
            message: msg.to_string(),
        }
    }

    fn parse_or(&mut self) -> Result<bool> {
        let mut acc = self.parse_and()?;
        while matches!(self.peek(), Some(Token::Or)) {
            self.pos += 1;
            let rhs = self.parse_and()?;
            acc = acc || rhs;
        }
        Ok(acc)
    }

    fn parse_and(&mut self) -> Result<bool> {
        let mut acc = self.parse_comparison()?;
        while matches!(self.peek(), Some(Token::And)) {
            self.pos += 1;
            let rhs = self.parse_comparison()?;
            acc = acc && rhs;
        }
        Ok(acc)
    }

    fn parse_comparison(&mut self) -> Result<bool> {
        let lhs = self.parse_literal()?;
        let op = match self.peek() {
            Some(Token::Eq) => Some(Token::Eq),
            Some(Token::Ne) => Some(Token::Ne),
            Some(Token::Lt) => Some(Token::Lt),
            Some(Token::Le) => Some(Token::Le),
            Some(Token::Gt) => Some(Token::Gt),
            Some(Token::Ge) => Some(Token::Ge),
            _ => None,
        };
        match op {
            None => Ok(is_truthy(&lhs)),
            Some(op) => {
                self.pos += 1;
                let rhs = self.parse_literal()?;
                compare(&lhs, &op, &rhs, self.source)
            }
        }
    }

    fn parse_literal(&mut self) -> Result<Value> {
        match self.tokens.get(self.pos) {
            Some(Token::Literal(v)) => {
                self.pos += 1;
                Ok(v.clone())
            }
            _ => Err(self.fail("expected a literal operand")),
        }
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::Null => false,
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

fn compare(lhs: &Value, op: &Token, rhs: &Value, source: &str) -> Result<bool> {
    match op {
        Token::Eq => Ok(lhs == rhs),
        Token::Ne => Ok(lhs != rhs),
        Token::Lt | Token::Le | Token::Gt | Token::Ge => {
            let ordering = match (lhs.as_f64(), rhs.as_f64()) {
                (Some(a), Some(b)) => a.partial_cmp(&b),
                _ => match (lhs.as_str(), rhs.as_str()) {
                    (Some(a), Some(b)) => Some(a.cmp(b)),
                    _ => None,
                },
            };
            let ordering = ordering.ok_or_else(|| WorkflowError::TemplateError {
                template: source.to_string(),
                message: "ordering comparison requires two numbers or two strings".to_string(),
            })?;
            Ok(match op {
                Token::Lt => ordering.is_lt(),
                Token::Le => ordering.is_le(),
                Token::Gt => ordering.is_gt(),
                Token::Ge => ordering.is_ge(),
                _ => unreachable!(),
            })
        }
        _ => unreachable!(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn equality_is_strict_and_eq_eqeqeq_identical() {
        let vars = json!({"status": "main"});
        assert!(evaluate(r#"{{status}} == "main""#, &vars).unwrap());
        assert!(evaluate(r#"{{status}} === "main""#, &vars).unwrap());
        assert!(!evaluate(r#"{{status}} == "other""#, &vars).unwrap());
    }

    #[test]
    fn bare_truthy_values() {
        let vars = json!({"ok": true, "empty": "", "zero": 0});
        assert!(evaluate("{{ok}}", &vars).unwrap());
        assert!(!evaluate("{{empty}}", &vars).unwrap());
        assert!(!evaluate("{{zero}}", &vars).unwrap());
        assert!(evaluate("true", &vars).unwrap());
    }

    #[test]
    fn and_or_precedence() {
        let vars = json!({"a": true, "b": false, "c": true});
        // || has lower precedence than &&
        assert!(evaluate("{{a}} && {{b}} || {{c}}", &vars).unwrap());
        assert!(!evaluate("{{b}} && {{c}} || {{b}}", &vars).unwrap());
    }

    #[test]
    fn numeric_ordering() {
        let vars = json!({"n": 5});
        assert!(evaluate("{{n}} > 3", &vars).unwrap());
        assert!(evaluate("{{n}} <= 5", &vars).unwrap());
        assert!(!evaluate("{{n}} < 5", &vars).unwrap());
    }

    #[test]
    fn false_literal_condition_is_skip() {
        let vars = json!({});
        assert!(!evaluate("false", &vars).unwrap());
    }
}
