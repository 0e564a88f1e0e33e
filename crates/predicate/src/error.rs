//! Predicate error types

use thiserror::Error;

/// A filter could not be compiled
///
/// Raised once, when a subscriber installs a filter. The subscriber keeps its
/// previous predicate.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PredicateCompileError {
    /// Payload is not JSON
    #[error("invalid filter JSON: {0}")]
    InvalidJson(String),

    /// Operator is neither built in nor registered
    #[error("unknown operator '{0}'")]
    UnknownOperator(String),

    /// Wrong number of operands
    #[error("operator '{operator}' expects {expected} operand(s), got {actual}")]
    Arity {
        operator: String,
        expected: &'static str,
        actual: usize,
    },

    /// Object used as an operation does not have exactly one key
    #[error("operation must be an object with exactly one key, got {0} keys")]
    MalformedOperation(usize),

    /// `var` path is not a string or number literal
    #[error("invalid field reference: {0}")]
    InvalidField(String),

    /// Regex pattern failed to compile
    #[error("invalid regex '{pattern}': {message}")]
    InvalidRegex { pattern: String, message: String },

    /// Regex pattern is computed instead of a string literal
    #[error("regex pattern must be a string literal")]
    NonLiteralPattern,

    /// Date literal could not be parsed
    #[error("invalid date '{value}': {message}")]
    InvalidDate { value: String, message: String },
}

impl PredicateCompileError {
    /// Create an arity error
    pub fn arity(operator: impl Into<String>, expected: &'static str, actual: usize) -> Self {
        Self::Arity {
            operator: operator.into(),
            expected,
            actual,
        }
    }

    /// Create an invalid regex error
    pub fn invalid_regex(pattern: impl Into<String>, message: impl ToString) -> Self {
        Self::InvalidRegex {
            pattern: pattern.into(),
            message: message.to_string(),
        }
    }

    /// Create an invalid date error
    pub fn invalid_date(value: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidDate {
            value: value.into(),
            message: message.into(),
        }
    }
}

/// A custom operator failed while evaluating against one event
///
/// Only the current (subscriber, event) pair is affected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("operator '{operator}' failed: {message}")]
pub struct PredicateEvaluationFault {
    /// Name of the failing operator
    pub operator: String,
    /// Message returned by the operator
    pub message: String,
}
