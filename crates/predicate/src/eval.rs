//! Expression evaluation
//!
//! Values follow JSON-Logic conventions: truthiness as in JavaScript, loose
//! equality with numeric coercion for `==`, and IEEE-754 doubles for ordering.
//! A missing field is *undefined* (`None`), which is distinct from JSON `null`.

use std::borrow::Cow;
use std::cmp::Ordering;
use std::panic::{self, AssertUnwindSafe};

use serde_json::{Number, Value};

use crate::error::PredicateEvaluationFault;
use crate::expr::{CompareOp, Expr, LogicalOp};

#[cfg(test)]
#[path = "eval_test.rs"]
mod tests;

/// Evaluated operand; `None` is undefined
pub(crate) type Resolved<'a> = Option<Cow<'a, Value>>;

type EvalResult<'a> = Result<Resolved<'a>, PredicateEvaluationFault>;

impl Expr {
    /// Evaluate against an event
    pub(crate) fn eval<'a>(&'a self, data: &'a Value) -> EvalResult<'a> {
        match self {
            Expr::Literal(value) => Ok(Some(Cow::Borrowed(value))),

            Expr::Field { path, default } => match path.resolve(data) {
                Some(value) => Ok(Some(Cow::Borrowed(value))),
                None => match default {
                    Some(default) => default.eval(data),
                    None => Ok(None),
                },
            },

            Expr::Compare { op, operands } => {
                let values = operands
                    .iter()
                    .map(|operand| operand.eval(data))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(boolean(compare(*op, &values)))
            }

            Expr::Logical { op, operands } => {
                for operand in operands {
                    let truth = truthy(&operand.eval(data)?);
                    match (op, truth) {
                        (LogicalOp::And, false) => return Ok(boolean(false)),
                        (LogicalOp::Or, true) => return Ok(boolean(true)),
                        _ => {}
                    }
                }
                Ok(boolean(matches!(op, LogicalOp::And)))
            }

            Expr::Not(inner) => Ok(boolean(!truthy(&inner.eval(data)?))),

            Expr::Contains { subject, needle } => {
                let (Some(haystack), Some(value)) = (subject.eval(data)?, needle.eval(data)?) else {
                    return Ok(boolean(false));
                };
                let haystack = stringify(&haystack).to_lowercase();
                // String literals are lowercased at compile time
                let folded = match (needle.as_ref(), stringify(&value)) {
                    (Expr::Literal(Value::String(_)), text) => text,
                    (_, text) => Cow::Owned(text.to_lowercase()),
                };
                Ok(boolean(haystack.contains(folded.as_ref())))
            }

            Expr::RegexMatch { subject, pattern } => {
                let matched = subject
                    .eval(data)?
                    .is_some_and(|subject| pattern.is_match(&stringify(&subject)));
                Ok(boolean(matched))
            }

            Expr::In { needle, haystack } => {
                let (Some(needle), Some(haystack)) = (needle.eval(data)?, haystack.eval(data)?)
                else {
                    return Ok(boolean(false));
                };
                let found = match &*haystack {
                    Value::String(s) => s.contains(&*stringify(&needle)),
                    Value::Array(items) => items.iter().any(|item| strict_eq(item, &needle)),
                    _ => false,
                };
                Ok(boolean(found))
            }

            Expr::Array(items) => {
                let values = items
                    .iter()
                    .map(|item| Ok(item.eval(data)?.map_or(Value::Null, Cow::into_owned)))
                    .collect::<Result<Vec<_>, PredicateEvaluationFault>>()?;
                Ok(Some(Cow::Owned(Value::Array(values))))
            }

            Expr::Custom { operator, operands } => {
                let args = operands
                    .iter()
                    .map(|operand| Ok(operand.eval(data)?.map(Cow::into_owned)))
                    .collect::<Result<Vec<_>, PredicateEvaluationFault>>()?;
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| (operator.func)(&args)))
                    .unwrap_or_else(|payload| Err(panic_message(payload.as_ref())));
                outcome
                    .map(|value| Some(Cow::Owned(value)))
                    .map_err(|message| PredicateEvaluationFault {
                        operator: operator.name.to_string(),
                        message,
                    })
            }
        }
    }
}

/// Message for a caught operator panic
fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("operator panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("operator panicked: {s}")
    } else {
        "operator panicked".to_string()
    }
}

#[inline]
fn boolean<'a>(value: bool) -> Resolved<'a> {
    Some(Cow::Owned(Value::Bool(value)))
}

/// Apply a comparison; any undefined operand makes it false
fn compare(op: CompareOp, values: &[Resolved<'_>]) -> bool {
    let Some(values) = values
        .iter()
        .map(|v| v.as_deref())
        .collect::<Option<Vec<&Value>>>()
    else {
        return false;
    };

    match op {
        CompareOp::Eq => loose_eq(values[0], values[1]),
        CompareOp::Ne => !loose_eq(values[0], values[1]),
        CompareOp::StrictEq => strict_eq(values[0], values[1]),
        CompareOp::StrictNe => !strict_eq(values[0], values[1]),
        CompareOp::Lt => ordered(&values, |o| o == Ordering::Less),
        CompareOp::Le => ordered(&values, |o| o != Ordering::Greater),
        CompareOp::Gt => ordered(&values, |o| o == Ordering::Greater),
        CompareOp::Ge => ordered(&values, |o| o != Ordering::Less),
    }
}

/// Check every adjacent pair satisfies `accept`
fn ordered(values: &[&Value], accept: impl Fn(Ordering) -> bool) -> bool {
    values
        .windows(2)
        .all(|pair| order(pair[0], pair[1]).is_some_and(&accept))
}

/// Order two values: lexicographic for two strings, numeric otherwise
///
/// `None` when either side is not numeric (or NaN), which makes the
/// comparison false.
pub(crate) fn order(a: &Value, b: &Value) -> Option<Ordering> {
    if let (Value::String(a), Value::String(b)) = (a, b) {
        return Some(a.cmp(b));
    }
    to_number(a)?.partial_cmp(&to_number(b)?)
}

/// Loose equality (`==`)
pub(crate) fn loose_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Number(a), Value::Number(b)) => number_eq(a, b),
        (Value::Array(_) | Value::Object(_), _) | (_, Value::Array(_) | Value::Object(_)) => a == b,
        _ => match (to_number(a), to_number(b)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        },
    }
}

/// Strict equality (`===`): same JSON type and equal value
pub(crate) fn strict_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(a), Value::Number(b)) => number_eq(a, b),
        _ => a == b,
    }
}

fn number_eq(a: &Number, b: &Number) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(a), Some(b)) => a == b,
        _ => a == b,
    }
}

/// Numeric coercion
///
/// Numbers as-is, booleans as 0/1, null as 0, numeric strings parsed (the
/// empty string is 0). Arrays, objects and other strings do not coerce.
pub(crate) fn to_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Null => Some(0.0),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Some(0.0)
            } else {
                trimmed.parse::<f64>().ok()
            }
        }
        Value::Array(_) | Value::Object(_) => None,
    }
}

/// JSON-Logic truthiness; undefined is falsy
pub(crate) fn truthy(value: &Resolved<'_>) -> bool {
    match value.as_deref() {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(items)) => !items.is_empty(),
        Some(Value::Object(_)) => true,
    }
}

/// String form used by `contains`, `regex` and `in`
pub(crate) fn stringify(value: &Value) -> Cow<'_, str> {
    match value {
        Value::String(s) => Cow::Borrowed(s),
        Value::Number(n) => Cow::Owned(format_number(n)),
        Value::Bool(true) => Cow::Borrowed("true"),
        Value::Bool(false) => Cow::Borrowed("false"),
        Value::Null => Cow::Borrowed("null"),
        Value::Array(_) | Value::Object(_) => Cow::Owned(value.to_string()),
    }
}

/// Shortest decimal form: integral floats print without a fraction
fn format_number(n: &Number) -> String {
    if n.is_i64() || n.is_u64() {
        return n.to_string();
    }
    match n.as_f64() {
        Some(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
        Some(f) => f.to_string(),
        None => n.to_string(),
    }
}
