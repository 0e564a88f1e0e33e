//! Items emitted by the upstream ingestion adapter

use std::sync::Arc;

use crate::event::Event;

/// One item on the ingestion channel
///
/// `Connected` and `Disconnected` bracket each upstream session; events in
/// between arrive in upstream order.
#[derive(Debug, Clone, PartialEq)]
pub enum UpstreamItem {
    /// A session to the upstream was established
    Connected,
    /// A decoded upstream record
    Event(Arc<Event>),
    /// The session ended; the adapter will reconnect unless exhausted
    Disconnected { reason: String },
}

impl UpstreamItem {
    /// Wrap an event
    pub fn event(event: Event) -> Self {
        Self::Event(Arc::new(event))
    }

    /// Session-ended marker
    pub fn disconnected(reason: impl Into<String>) -> Self {
        Self::Disconnected {
            reason: reason.into(),
        }
    }
}
