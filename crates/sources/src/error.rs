//! Ingestion error types

use chirp_protocol::ProtocolError;
use thiserror::Error;

/// Errors from the upstream ingestion adapter
#[derive(Error, Debug)]
pub enum IngestionError {
    /// One upstream unit could not be decoded; the stream continues
    #[error("malformed upstream event: {0}")]
    Decode(#[from] ProtocolError),

    /// Connection could not be established or was lost
    #[error("upstream connection error: {0}")]
    Connection(String),

    /// Upstream answered with a non-success status
    #[error("upstream returned HTTP {status}")]
    Status { status: u16 },

    /// Reconnect attempts exceeded the configured maximum
    #[error("upstream unavailable after {attempts} consecutive attempts")]
    Exhausted { attempts: u32 },

    /// Adapter could not be built from its configuration
    #[error("invalid upstream configuration: {0}")]
    InvalidConfig(String),
}

impl IngestionError {
    /// Create a connection error
    pub fn connection(reason: impl ToString) -> Self {
        Self::Connection(reason.to_string())
    }
}

/// Result type for ingestion operations
pub type Result<T> = std::result::Result<T, IngestionError>;
