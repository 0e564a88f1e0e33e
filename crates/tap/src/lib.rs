//! Chirp Tap - filtered fan-out of upstream events to live subscribers
//!
//! - Evaluates each subscriber's predicate against every event
//! - Coalesces deliveries per subscriber (leading edge plus trailing latest)
//! - Never blocks the broadcast loop on a slow subscriber
//! - Removes subscribers atomically with closing their channel
//!
//! # Architecture
//!
//! ```text
//! UpstreamSource ──mpsc──→ Broadcaster.run()
//!                               │
//!                          registry.snapshot()
//!                               │
//!                 ┌─────────────┼─────────────┐
//!                 ▼             ▼             ▼
//!            predicate?    predicate?    predicate?
//!                 │             │             │
//!            ThrottleSender.offer()   (never blocks)
//!                 │             │             │
//!                 ▼             ▼             ▼
//!          ThrottleReceiver.recv() in each connection task
//!                 │
//!                 ▼
//!            WebSocket
//! ```

pub mod broadcast;
mod error;
pub mod subscriber;
pub mod throttle;

pub use broadcast::{BroadcastReport, BroadcastStats, Broadcaster, LoopState};
pub use error::{Result, TapError};
pub use subscriber::{
    FilterUpdate, RegistryConfig, SubscriberHandle, SubscriberId, SubscriberRegistry,
};
pub use throttle::{Offer, ThrottleReceiver, ThrottleSender};
