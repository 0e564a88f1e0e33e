//! JSON-Logic to `Expr` compilation
//!
//! An object with exactly one key is an operation `{operator: operands}`. A
//! non-array operand list is shorthand for a single operand, so
//! `{"var": "tweet"}` and `{"var": ["tweet"]}` are equivalent. Arrays compile
//! element-wise; all other JSON values are literals.

use std::sync::Arc;

use regex::Regex;
use serde_json::Value;

use crate::Result;
use crate::date::parse_epoch_millis;
use crate::error::PredicateCompileError;
use crate::expr::{CompareOp, CustomOperator, Expr, FieldPath, LogicalOp};
use crate::registry::OperatorRegistry;

#[cfg(test)]
#[path = "compile_test.rs"]
mod tests;

/// Compile a JSON-Logic value
pub(crate) fn compile(value: &Value, ops: &OperatorRegistry) -> Result<Expr> {
    match value {
        Value::Object(map) => {
            let mut entries = map.iter();
            match (entries.next(), entries.next()) {
                (Some((operator, args)), None) => compile_operation(operator, args, ops),
                _ => Err(PredicateCompileError::MalformedOperation(map.len())),
            }
        }
        Value::Array(items) => {
            let exprs = compile_all(items, ops)?;
            Ok(fold_array(exprs))
        }
        scalar => Ok(Expr::Literal(scalar.clone())),
    }
}

fn compile_all(items: &[Value], ops: &OperatorRegistry) -> Result<Vec<Expr>> {
    items.iter().map(|item| compile(item, ops)).collect()
}

/// Fold an array of constants into a single literal
fn fold_array(exprs: Vec<Expr>) -> Expr {
    if exprs.iter().all(|e| matches!(e, Expr::Literal(_))) {
        let values = exprs
            .into_iter()
            .filter_map(|e| match e {
                Expr::Literal(v) => Some(v),
                _ => None,
            })
            .collect();
        Expr::Literal(Value::Array(values))
    } else {
        Expr::Array(exprs)
    }
}

/// Operand list: arrays as-is, anything else as a single operand
fn operands(args: &Value) -> &[Value] {
    match args {
        Value::Array(items) => items.as_slice(),
        other => std::slice::from_ref(other),
    }
}

fn compile_operation(operator: &str, args: &Value, ops: &OperatorRegistry) -> Result<Expr> {
    let args = operands(args);

    if let Some(op) = CompareOp::from_name(operator) {
        let max = if op.allows_between() { 3 } else { 2 };
        if args.len() < 2 || args.len() > max {
            let expected = if op.allows_between() { "2 or 3" } else { "2" };
            return Err(PredicateCompileError::arity(operator, expected, args.len()));
        }
        return Ok(Expr::Compare {
            op,
            operands: compile_all(args, ops)?,
        });
    }

    match operator {
        "var" => compile_field(args, ops),

        "and" | "or" => {
            if args.is_empty() {
                return Err(PredicateCompileError::arity(operator, "at least 1", 0));
            }
            let op = if operator == "and" {
                LogicalOp::And
            } else {
                LogicalOp::Or
            };
            Ok(Expr::Logical {
                op,
                operands: compile_all(args, ops)?,
            })
        }

        "!" | "not" => {
            let [inner] = args else {
                return Err(PredicateCompileError::arity(operator, "1", args.len()));
            };
            Ok(Expr::Not(Box::new(compile(inner, ops)?)))
        }

        "contains" => {
            let [subject, needle] = args else {
                return Err(PredicateCompileError::arity(operator, "2", args.len()));
            };
            Ok(Expr::Contains {
                subject: Box::new(compile(subject, ops)?),
                needle: Box::new(fold_lowercase(compile(needle, ops)?)),
            })
        }

        "regex" => {
            let [subject, pattern] = args else {
                return Err(PredicateCompileError::arity(operator, "2", args.len()));
            };
            let Value::String(pattern) = pattern else {
                return Err(PredicateCompileError::NonLiteralPattern);
            };
            let stripped = strip_delimiters(pattern);
            let pattern = Regex::new(stripped)
                .map_err(|e| PredicateCompileError::invalid_regex(stripped, e))?;
            Ok(Expr::RegexMatch {
                subject: Box::new(compile(subject, ops)?),
                pattern,
            })
        }

        "Date" => {
            let [literal] = args else {
                return Err(PredicateCompileError::arity(operator, "1", args.len()));
            };
            let millis = match literal {
                Value::String(s) => parse_epoch_millis(s)?,
                Value::Number(n) => {
                    return Ok(Expr::Literal(Value::Number(n.clone())));
                }
                other => {
                    return Err(PredicateCompileError::invalid_date(
                        other.to_string(),
                        "expected an ISO-8601 string",
                    ));
                }
            };
            Ok(Expr::Literal(Value::from(millis)))
        }

        "in" => {
            let [needle, haystack] = args else {
                return Err(PredicateCompileError::arity(operator, "2", args.len()));
            };
            Ok(Expr::In {
                needle: Box::new(compile(needle, ops)?),
                haystack: Box::new(compile(haystack, ops)?),
            })
        }

        name => {
            let func = ops
                .get(name)
                .ok_or_else(|| PredicateCompileError::UnknownOperator(name.to_string()))?;
            Ok(Expr::Custom {
                operator: CustomOperator {
                    name: Arc::from(name),
                    func: Arc::clone(func),
                },
                operands: compile_all(args, ops)?,
            })
        }
    }
}

/// `{"var": path}` or `{"var": [path, default]}`
fn compile_field(args: &[Value], ops: &OperatorRegistry) -> Result<Expr> {
    let (path, default) = match args {
        [] => ("".to_string(), None),
        [path] => (field_path(path)?, None),
        [path, default] => (field_path(path)?, Some(Box::new(compile(default, ops)?))),
        _ => return Err(PredicateCompileError::arity("var", "1 or 2", args.len())),
    };
    Ok(Expr::Field {
        path: FieldPath::parse(&path),
        default,
    })
}

fn field_path(value: &Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Ok(String::new()),
        other => Err(PredicateCompileError::InvalidField(other.to_string())),
    }
}

/// Lowercase a literal needle once instead of on every evaluation
fn fold_lowercase(expr: Expr) -> Expr {
    match expr {
        Expr::Literal(Value::String(s)) => Expr::Literal(Value::String(s.to_lowercase())),
        other => other,
    }
}

/// Strip one leading and one trailing `/` (`/^RT/` → `^RT`)
fn strip_delimiters(pattern: &str) -> &str {
    let pattern = pattern.strip_prefix('/').unwrap_or(pattern);
    pattern.strip_suffix('/').unwrap_or(pattern)
}
