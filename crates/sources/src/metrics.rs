//! Upstream ingestion counters

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Counters updated by the ingestion task
#[derive(Debug, Default)]
pub struct UpstreamMetrics {
    /// Successful connects
    pub connects: AtomicU64,

    /// Sessions that ended (EOF, error or timeout)
    pub disconnects: AtomicU64,

    /// Failed connection attempts
    pub connect_failures: AtomicU64,

    /// Events forwarded to the broadcast loop
    pub events: AtomicU64,

    /// Frames dropped because they did not decode
    pub decode_errors: AtomicU64,

    /// Total bytes read from upstream
    pub bytes_received: AtomicU64,
}

impl UpstreamMetrics {
    /// Create new metrics instance
    pub const fn new() -> Self {
        Self {
            connects: AtomicU64::new(0),
            disconnects: AtomicU64::new(0),
            connect_failures: AtomicU64::new(0),
            events: AtomicU64::new(0),
            decode_errors: AtomicU64::new(0),
            bytes_received: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn connected(&self) {
        self.connects.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn disconnected(&self) {
        self.disconnects.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn connect_failed(&self) {
        self.connect_failures.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn event_forwarded(&self) {
        self.events.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn decode_error(&self) {
        self.decode_errors.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn bytes(&self, count: u64) {
        self.bytes_received.fetch_add(count, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> UpstreamMetricsSnapshot {
        UpstreamMetricsSnapshot {
            connects: self.connects.load(Ordering::Relaxed),
            disconnects: self.disconnects.load(Ordering::Relaxed),
            connect_failures: self.connect_failures.load(Ordering::Relaxed),
            events: self.events.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of upstream metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UpstreamMetricsSnapshot {
    pub connects: u64,
    pub disconnects: u64,
    pub connect_failures: u64,
    pub events: u64,
    pub decode_errors: u64,
    pub bytes_received: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_reflects_counters() {
        let metrics = UpstreamMetrics::new();

        metrics.connected();
        metrics.event_forwarded();
        metrics.event_forwarded();
        metrics.decode_error();
        metrics.bytes(128);
        metrics.disconnected();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.connects, 1);
        assert_eq!(snapshot.events, 2);
        assert_eq!(snapshot.decode_errors, 1);
        assert_eq!(snapshot.bytes_received, 128);
        assert_eq!(snapshot.disconnects, 1);
        assert_eq!(snapshot.connect_failures, 0);
    }
}
