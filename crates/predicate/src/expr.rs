//! Typed expression tree
//!
//! Produced by `compile` from a JSON-Logic value and evaluated by `eval`.
//! Nothing here is stringly typed: operators are resolved to variants, regexes
//! are compiled and date literals are already folded to epoch milliseconds.

use std::fmt;
use std::sync::Arc;

use regex::Regex;
use serde_json::Value;

use crate::registry::OperatorFn;

/// Compiled expression node
#[derive(Debug, Clone)]
pub(crate) enum Expr {
    /// Constant value (including folded `Date` literals)
    Literal(Value),
    /// Field accessor with optional default for missing fields
    Field {
        path: FieldPath,
        default: Option<Box<Expr>>,
    },
    /// Comparison over two operands (three for the `a < b < c` form)
    Compare { op: CompareOp, operands: Vec<Expr> },
    /// Short-circuiting `and` / `or`
    Logical { op: LogicalOp, operands: Vec<Expr> },
    /// Logical negation
    Not(Box<Expr>),
    /// Case-insensitive substring test
    Contains {
        subject: Box<Expr>,
        needle: Box<Expr>,
    },
    /// Regex test against the stringified subject
    RegexMatch { subject: Box<Expr>, pattern: Regex },
    /// Substring (string haystack) or membership (array haystack)
    In {
        needle: Box<Expr>,
        haystack: Box<Expr>,
    },
    /// Array whose elements are not all constant
    Array(Vec<Expr>),
    /// Registered custom operator
    Custom {
        operator: CustomOperator,
        operands: Vec<Expr>,
    },
}

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CompareOp {
    /// `==` (loose)
    Eq,
    /// `!=` (loose)
    Ne,
    /// `===`
    StrictEq,
    /// `!==`
    StrictNe,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
}

impl CompareOp {
    /// Map an operator name to a comparison
    pub(crate) fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "==" => Self::Eq,
            "!=" => Self::Ne,
            "===" => Self::StrictEq,
            "!==" => Self::StrictNe,
            "<" => Self::Lt,
            "<=" => Self::Le,
            ">" => Self::Gt,
            ">=" => Self::Ge,
            _ => return None,
        })
    }

    /// Whether the three-operand "between" form is allowed
    pub(crate) fn allows_between(self) -> bool {
        matches!(self, Self::Lt | Self::Le)
    }
}

/// Logical combinators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LogicalOp {
    And,
    Or,
}

/// Dot-separated field path (`user.name`, `entities.0.tag`)
///
/// An empty path refers to the whole event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    /// Parse a dot path
    pub(crate) fn parse(path: &str) -> Self {
        let segments = if path.is_empty() {
            Vec::new()
        } else {
            path.split('.').map(str::to_string).collect()
        };
        Self { segments }
    }

    /// Resolve against an event; `None` when any segment is missing
    pub(crate) fn resolve<'a>(&self, data: &'a Value) -> Option<&'a Value> {
        self.segments
            .iter()
            .try_fold(data, |current, segment| match current {
                Value::Object(map) => map.get(segment),
                Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
                _ => None,
            })
    }
}

/// Custom operator bound at compile time
#[derive(Clone)]
pub(crate) struct CustomOperator {
    pub(crate) name: Arc<str>,
    pub(crate) func: OperatorFn,
}

impl fmt::Debug for CustomOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomOperator")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
