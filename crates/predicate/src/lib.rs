//! Chirp Predicate - subscriber filters over semi-structured events
//!
//! Filters arrive as JSON-Logic trees (as produced by query-builder UIs) and
//! are compiled once into a typed expression tree. Everything that can be
//! checked up front is checked at compile time: operator names, arity, regex
//! syntax and date literals. Evaluation is then pure and infallible for the
//! built-in operators; only registered custom operators can fault.
//!
//! # Example
//!
//! ```
//! use chirp_predicate::{OperatorRegistry, Predicate};
//! use serde_json::json;
//!
//! let ops = OperatorRegistry::new();
//! let predicate = Predicate::compile(
//!     &json!({"and": [
//!         {"contains": [{"var": "tweet"}, "rust"]},
//!         {">=": [{"var": "retweet_count"}, 10]}
//!     ]}),
//!     &ops,
//! )
//! .unwrap();
//!
//! let event = json!({"tweet": "Learning Rust today", "retweet_count": 12});
//! assert!(predicate.matches(&event).unwrap());
//! ```
//!
//! # Missing fields
//!
//! A `var` that does not resolve yields *undefined*. Every comparison with an
//! undefined operand is false (including `!=`), and `contains`, `regex` and
//! `in` are false for an undefined subject.

mod compile;
mod date;
mod error;
mod eval;
mod expr;
mod filter;
mod registry;

pub use date::parse_epoch_millis;
pub use error::{PredicateCompileError, PredicateEvaluationFault};
pub use filter::{Predicate, evaluate, parse_filter};
pub use registry::{OperatorFn, OperatorRegistry, RESERVED_OPERATORS, is_reserved};

/// Result type for predicate compilation
pub type Result<T> = std::result::Result<T, PredicateCompileError>;

