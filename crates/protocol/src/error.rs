//! Protocol error types

use thiserror::Error;

/// Errors that can occur when decoding protocol payloads
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Payload is not valid JSON
    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// Binary payload is not UTF-8
    #[error("payload is not valid UTF-8")]
    InvalidUtf8,

    /// Payload is empty
    #[error("empty payload")]
    Empty,
}
