//! Upstream event record

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::ProtocolError;
use crate::Result;

/// One decoded upstream record
///
/// Immutable after construction. `raw` is forwarded verbatim to subscribers,
/// `value` is what predicates evaluate against. The schema is not enforced:
/// any JSON value is accepted and unknown fields pass through.
#[derive(Clone, PartialEq)]
pub struct Event {
    raw: Arc<str>,
    value: Value,
}

impl Event {
    /// Decode an event from its JSON text
    pub fn from_json(raw: impl Into<Arc<str>>) -> Result<Self> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(ProtocolError::Empty);
        }
        let value = serde_json::from_str(&raw)?;
        Ok(Self { raw, value })
    }

    /// Build an event from an already parsed value
    pub fn from_value(value: Value) -> Self {
        Self {
            raw: value.to_string().into(),
            value,
        }
    }

    /// Raw JSON text as received
    #[inline]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Parsed value
    #[inline]
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Top-level field lookup
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.value.get(field)
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event").field("raw", &self.raw).finish()
    }
}
