//! Broadcaster - the fan-out point between ingestion and subscribers
//!
//! `Broadcaster` consumes the ingestion channel and, for every event, offers
//! it to each subscriber whose predicate matches. It provides:
//!
//! - Zero work per event when no one is subscribed
//! - Non-blocking delivery through each subscriber's throttle
//! - Fault isolation: a failing predicate only skips that subscriber
//! - `Idle` / `Running` state tracking of the upstream session
//!
//! # Usage
//!
//! ```ignore
//! let registry = Arc::new(SubscriberRegistry::new(config));
//! let broadcaster = Broadcaster::new(Arc::clone(&registry));
//!
//! // Drives the loop until cancelled or ingestion gives up
//! broadcaster.run(upstream_rx, cancel).await?;
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};

use chirp_protocol::{Event, UpstreamItem};
use chirp_predicate::evaluate;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::error::{Result, TapError};
use crate::subscriber::SubscriberRegistry;
use crate::throttle::Offer;

/// Upstream session state as seen by the loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoopState {
    /// No upstream session
    Idle,
    /// Upstream connected; events are being fanned out
    Running,
}

impl LoopState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Running,
            _ => Self::Idle,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Running => 1,
        }
    }
}

/// Outcome of broadcasting one event
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Subscribers whose predicate matched
    pub matched: usize,
    /// Matched subscribers whose channel was idle (delivered at once)
    pub offered: usize,
    /// Matched subscribers whose pending slot was replaced
    pub coalesced: usize,
    /// Matched subscribers whose channel had already closed
    pub closed: usize,
    /// Subscribers skipped because their predicate faulted
    pub faults: usize,
}

/// Cumulative broadcast statistics
#[derive(Debug, Clone, Copy, Serialize)]
pub struct BroadcastStats {
    /// Events received from upstream
    pub events: u64,
    /// Offers that were delivered immediately
    pub offered: u64,
    /// Offers that replaced a pending item
    pub coalesced: u64,
    /// Predicate evaluation faults
    pub faults: u64,
    /// Current number of subscribers
    pub subscribers: usize,
    /// Upstream session state
    pub state: LoopState,
}

/// The fan-out loop
#[derive(Debug)]
pub struct Broadcaster {
    registry: Arc<SubscriberRegistry>,
    state: AtomicU8,
    events: AtomicU64,
    offered: AtomicU64,
    coalesced: AtomicU64,
    faults: AtomicU64,
}

impl Broadcaster {
    /// Create a broadcaster over a registry
    pub fn new(registry: Arc<SubscriberRegistry>) -> Self {
        Self {
            registry,
            state: AtomicU8::new(LoopState::Idle.as_u8()),
            events: AtomicU64::new(0),
            offered: AtomicU64::new(0),
            coalesced: AtomicU64::new(0),
            faults: AtomicU64::new(0),
        }
    }

    /// Registry this broadcaster fans out to
    #[inline]
    pub fn registry(&self) -> &Arc<SubscriberRegistry> {
        &self.registry
    }

    /// Offer one event to every matching subscriber
    ///
    /// Works on a registry snapshot, so subscribers added during the pass see
    /// only later events.
    pub fn broadcast(&self, event: &Arc<Event>) -> BroadcastReport {
        self.events.fetch_add(1, Ordering::Relaxed);

        let mut report = BroadcastReport::default();

        // Fast path: no subscribers = no work
        if self.registry.is_empty() {
            return report;
        }

        for subscriber in self.registry.snapshot() {
            match evaluate(subscriber.predicate.as_ref(), event.value()) {
                Ok(true) => {}
                Ok(false) => continue,
                Err(fault) => {
                    warn!(
                        subscriber_id = %subscriber.id,
                        operator = %fault.operator,
                        error = %fault.message,
                        "predicate evaluation failed, skipping subscriber"
                    );
                    report.faults += 1;
                    continue;
                }
            }

            report.matched += 1;
            match subscriber.sender.offer(Arc::clone(event)) {
                Offer::Immediate => report.offered += 1,
                Offer::Coalesced => report.coalesced += 1,
                Offer::Closed => report.closed += 1,
            }
        }

        self.offered
            .fetch_add(report.offered as u64, Ordering::Relaxed);
        self.coalesced
            .fetch_add(report.coalesced as u64, Ordering::Relaxed);
        self.faults.fetch_add(report.faults as u64, Ordering::Relaxed);

        if report.closed > 0 {
            let removed = self.registry.remove_closed();
            debug!(removed, "cleaned up disconnected subscribers");
        }

        trace!(
            matched = report.matched,
            offered = report.offered,
            coalesced = report.coalesced,
            "broadcast event"
        );

        report
    }

    /// Drive the loop until cancelled
    ///
    /// Returns `TapError::IngestionExhausted` when the ingestion channel
    /// closes without a cancellation request.
    pub async fn run(
        &self,
        mut upstream: mpsc::Receiver<UpstreamItem>,
        cancel: CancellationToken,
    ) -> Result<()> {
        info!("broadcast loop started");

        loop {
            let item = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    self.set_state(LoopState::Idle);
                    info!("broadcast loop stopped");
                    return Ok(());
                }
                item = upstream.recv() => item,
            };

            match item {
                Some(UpstreamItem::Connected) => self.set_state(LoopState::Running),
                Some(UpstreamItem::Event(event)) => {
                    self.set_state(LoopState::Running);
                    self.broadcast(&event);
                }
                Some(UpstreamItem::Disconnected { reason }) => {
                    warn!(reason = %reason, "upstream disconnected");
                    self.set_state(LoopState::Idle);
                }
                None => {
                    self.set_state(LoopState::Idle);
                    if cancel.is_cancelled() {
                        info!("broadcast loop stopped");
                        return Ok(());
                    }
                    return Err(TapError::IngestionExhausted);
                }
            }
        }
    }

    fn set_state(&self, next: LoopState) {
        let previous = LoopState::from_u8(self.state.swap(next.as_u8(), Ordering::Relaxed));
        if previous != next {
            info!(from = ?previous, to = ?next, "broadcast state changed");
        }
    }

    /// Current loop state
    #[inline]
    pub fn state(&self) -> LoopState {
        LoopState::from_u8(self.state.load(Ordering::Relaxed))
    }

    /// Cumulative statistics
    pub fn stats(&self) -> BroadcastStats {
        BroadcastStats {
            events: self.events.load(Ordering::Relaxed),
            offered: self.offered.load(Ordering::Relaxed),
            coalesced: self.coalesced.load(Ordering::Relaxed),
            faults: self.faults.load(Ordering::Relaxed),
            subscribers: self.registry.count(),
            state: self.state(),
        }
    }
}

#[cfg(test)]
#[path = "broadcast_test.rs"]
mod tests;
