//! Compiled predicates

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::Result;
use crate::compile::compile;
use crate::error::{PredicateCompileError, PredicateEvaluationFault};
use crate::eval::truthy;
use crate::expr::Expr;
use crate::registry::OperatorRegistry;

#[cfg(test)]
#[path = "filter_test.rs"]
mod tests;

/// Immutable, compiled filter
///
/// Cheap to clone; the expression tree is shared.
#[derive(Clone)]
pub struct Predicate {
    root: Arc<Expr>,
    rule: Arc<Value>,
}

impl Predicate {
    /// Compile a JSON-Logic rule
    pub fn compile(rule: &Value, ops: &OperatorRegistry) -> Result<Self> {
        let root = compile(rule, ops)?;
        Ok(Self {
            root: Arc::new(root),
            rule: Arc::new(rule.clone()),
        })
    }

    /// Parse and compile a JSON-Logic rule from text
    pub fn parse(text: &str, ops: &OperatorRegistry) -> Result<Self> {
        let rule: Value = serde_json::from_str(text)
            .map_err(|e| PredicateCompileError::InvalidJson(e.to_string()))?;
        Self::compile(&rule, ops)
    }

    /// Evaluate against an event
    ///
    /// Built-in operators never fail; an error always comes from a custom
    /// operator.
    pub fn matches(&self, event: &Value) -> std::result::Result<bool, PredicateEvaluationFault> {
        Ok(truthy(&self.root.eval(event)?))
    }

    #[cfg(test)]
    pub(crate) fn root(&self) -> &Expr {
        &self.root
    }

    /// The rule this predicate was compiled from
    pub fn rule(&self) -> &Value {
        &self.rule
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Predicate")
            .field("rule", &self.rule)
            .finish()
    }
}

/// Parse a subscriber filter payload
///
/// An empty payload or JSON `null` clears the filter (`Ok(None)`).
pub fn parse_filter(payload: &str, ops: &OperatorRegistry) -> Result<Option<Predicate>> {
    let payload = payload.trim();
    if payload.is_empty() {
        return Ok(None);
    }

    let rule: Value = serde_json::from_str(payload)
        .map_err(|e| PredicateCompileError::InvalidJson(e.to_string()))?;
    if rule.is_null() {
        return Ok(None);
    }

    Predicate::compile(&rule, ops).map(Some)
}

/// Evaluate an optional predicate; no predicate matches everything
#[inline]
pub fn evaluate(
    predicate: Option<&Predicate>,
    event: &Value,
) -> std::result::Result<bool, PredicateEvaluationFault> {
    match predicate {
        None => Ok(true),
        Some(predicate) => predicate.matches(event),
    }
}
