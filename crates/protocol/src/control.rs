//! Subscriber control frames
//!
//! Inbound: a subscriber sends either a JSON predicate tree (install) or an
//! empty payload (clear back to "match all"). Outbound errors are a small JSON
//! object so clients can tell them apart from relayed events.

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;
use crate::Result;

/// Inbound frame from a subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMessage<'a> {
    /// Remove the current filter
    Clear,
    /// Install a new filter (unparsed JSON text)
    Filter(&'a str),
}

impl<'a> ControlMessage<'a> {
    /// Classify a text frame
    pub fn from_text(payload: &'a str) -> Self {
        let trimmed = payload.trim();
        if trimmed.is_empty() {
            Self::Clear
        } else {
            Self::Filter(trimmed)
        }
    }

    /// Classify a binary frame (must be UTF-8)
    pub fn from_bytes(payload: &'a [u8]) -> Result<Self> {
        std::str::from_utf8(payload)
            .map(Self::from_text)
            .map_err(|_| ProtocolError::InvalidUtf8)
    }
}

/// Error notice delivered to one subscriber
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorFrame {
    /// Human-readable reason
    pub error: String,
}

impl ErrorFrame {
    /// Create an error frame
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }

    /// Encode as JSON text
    pub fn encode(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| String::from(r#"{"error":"internal"}"#))
    }
}
