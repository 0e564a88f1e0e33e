//! Chirp Sources - upstream ingestion
//!
//! Connects to a Server-Sent-Events endpoint and turns its `message` frames
//! into `Event`s for the broadcast loop.
//!
//! # Design
//!
//! - **Incremental decoding**: `SseDecoder` accepts arbitrary chunk boundaries
//! - **Resilience**: a malformed frame is logged and dropped, the stream goes on
//! - **Reconnect**: exponential backoff, reset after every successful connect
//! - **Resume**: the last seen `id:` is sent back as `Last-Event-ID`
//!
//! # Example
//!
//! ```ignore
//! use chirp_sources::{UpstreamSource, UpstreamSourceConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! let config = UpstreamSourceConfig {
//!     url: "https://example.com/stream".into(),
//!     ..Default::default()
//! };
//!
//! let source = UpstreamSource::new(config)?;
//! let (handle, items) = source.spawn(CancellationToken::new());
//! ```

mod backoff;
mod error;
pub mod metrics;
pub mod sse;
pub mod upstream;

pub use backoff::Backoff;
pub use chirp_protocol::UpstreamItem;
pub use error::{IngestionError, Result};
pub use metrics::{UpstreamMetrics, UpstreamMetricsSnapshot};
pub use sse::{SseDecoder, SseFrame, decode_event};
pub use upstream::{UpstreamSource, UpstreamSourceConfig};
