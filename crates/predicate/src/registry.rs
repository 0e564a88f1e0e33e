//! Operator Registry - named custom operators
//!
//! Custom operators extend the filter grammar with `{"name": [operands...]}`.
//! They must be registered before filters using them are compiled; a filter
//! naming an unregistered operator fails to compile.
//!
//! Built-in operator names (`contains`, `regex`, the comparisons and the
//! combinators) are reserved and cannot be replaced.
//!
//! # Example
//!
//! ```
//! use chirp_predicate::{OperatorRegistry, Predicate};
//! use serde_json::{json, Value};
//!
//! let mut ops = OperatorRegistry::new();
//! ops.register("starts_with", |args: &[Option<Value>]| {
//!     match (&args[0], &args[1]) {
//!         (Some(Value::String(s)), Some(Value::String(p))) => Ok(Value::Bool(s.starts_with(p.as_str()))),
//!         _ => Ok(Value::Bool(false)),
//!     }
//! });
//!
//! let predicate = Predicate::compile(&json!({"starts_with": [{"var": "tweet"}, "RT"]}), &ops).unwrap();
//! assert!(predicate.matches(&json!({"tweet": "RT hi"})).unwrap());
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

#[cfg(test)]
#[path = "registry_test.rs"]
mod tests;

/// Custom operator function
///
/// Receives the evaluated operands (`None` = undefined, e.g. a missing field)
/// and returns a value whose truthiness is used when it is the predicate root.
/// An `Err` becomes a `PredicateEvaluationFault`.
pub type OperatorFn = Arc<dyn Fn(&[Option<Value>]) -> Result<Value, String> + Send + Sync>;

/// Operator names handled by the compiler itself
pub const RESERVED_OPERATORS: &[&str] = &[
    "var", "==", "!=", "===", "!==", "<", "<=", ">", ">=", "and", "or", "!", "not", "contains",
    "regex", "Date", "in",
];

/// Check if an operator name is reserved for a built-in
#[inline]
pub fn is_reserved(name: &str) -> bool {
    RESERVED_OPERATORS.contains(&name)
}

/// Registry for custom operators
#[derive(Clone, Default)]
pub struct OperatorRegistry {
    operators: HashMap<String, OperatorFn>,
}

impl OperatorRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a custom operator
    ///
    /// # Panics
    /// Panics if the name is reserved or already registered.
    /// Use `try_register` for fallible registration.
    pub fn register<F>(&mut self, name: &str, f: F)
    where
        F: Fn(&[Option<Value>]) -> Result<Value, String> + Send + Sync + 'static,
    {
        if !self.try_register(name, f) {
            panic!("operator '{}' is reserved or already registered", name);
        }
    }

    /// Try to register a custom operator
    ///
    /// Returns `false` if the name is reserved or already registered.
    pub fn try_register<F>(&mut self, name: &str, f: F) -> bool
    where
        F: Fn(&[Option<Value>]) -> Result<Value, String> + Send + Sync + 'static,
    {
        if name.is_empty() || is_reserved(name) || self.operators.contains_key(name) {
            return false;
        }
        self.operators.insert(name.to_string(), Arc::new(f));
        true
    }

    /// Check if an operator is registered
    pub fn contains(&self, name: &str) -> bool {
        self.operators.contains_key(name)
    }

    /// Look up an operator
    pub(crate) fn get(&self, name: &str) -> Option<&OperatorFn> {
        self.operators.get(name)
    }

    /// Registered operator names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.operators.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of registered operators
    pub fn len(&self) -> usize {
        self.operators.len()
    }

    /// Check if no custom operators are registered
    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }
}

impl fmt::Debug for OperatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperatorRegistry")
            .field("operators", &self.names())
            .finish()
    }
}
