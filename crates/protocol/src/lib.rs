//! Chirp Protocol - core types that flow through the relay
//!
//! - `Event` - one upstream record: raw JSON text plus its parsed value
//! - `ControlMessage` - inbound subscriber frame (install or clear a filter)
//! - `ErrorFrame` - outbound notice sent to a single subscriber
//! - `UpstreamItem` - what the ingestion adapter hands to the broadcast loop
//!
//! Events are shared as `Arc<Event>` so one ingested record fans out to any
//! number of subscribers without copying. The raw text is what subscribers
//! receive; the parsed value is what predicates inspect.

mod control;
mod error;
mod event;
mod upstream;

pub use control::{ControlMessage, ErrorFrame};
pub use error::ProtocolError;
pub use event::Event;
pub use upstream::UpstreamItem;

/// Result type for protocol operations
pub type Result<T> = std::result::Result<T, ProtocolError>;

#[cfg(test)]
mod control_test;
