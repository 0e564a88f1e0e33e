//! Error types for the tap crate

use chirp_predicate::PredicateCompileError;
use thiserror::Error;

use crate::subscriber::SubscriberId;

/// Errors that can occur in the fan-out layer
#[derive(Error, Debug)]
pub enum TapError {
    /// Subscriber not found
    #[error("subscriber not found: {id}")]
    SubscriberNotFound { id: SubscriberId },

    /// Maximum subscribers reached
    #[error("maximum subscribers reached ({max})")]
    MaxSubscribers { max: usize },

    /// Filter rejected; the previous predicate is still installed
    #[error(transparent)]
    Predicate(#[from] PredicateCompileError),

    /// Ingestion channel closed without a shutdown request
    #[error("upstream ingestion exhausted")]
    IngestionExhausted,
}

impl TapError {
    /// Create a subscriber-not-found error
    pub fn not_found(id: SubscriberId) -> Self {
        Self::SubscriberNotFound { id }
    }
}

/// Result type for tap operations
pub type Result<T> = std::result::Result<T, TapError>;
