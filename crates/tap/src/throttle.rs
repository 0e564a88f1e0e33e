//! Throttled delivery channel
//!
//! A single-slot, coalescing channel with leading-edge delivery:
//!
//! - idle: an offered item is delivered at once and a cooldown window opens
//! - cooling: offers overwrite one pending slot; only the latest survives
//! - window expiry: the pending item (if any) is delivered and a new window
//!   opens, otherwise the channel returns to idle
//!
//! The receiver drives the window timer, so the task that writes to the
//! subscriber's socket is also the one that observes expiry. At most two items
//! are held per channel (the undelivered leading item and the pending one).
//!
//! ```text
//! offer:  E1 E2 E3 .. E10 |              |
//! recv:   E1              | E10          | (idle)
//!         ├── cooldown ───┼── cooldown ──┤
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::time::{Instant, sleep_until};

#[cfg(test)]
#[path = "throttle_test.rs"]
mod tests;

/// Outcome of a non-blocking offer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Offer {
    /// Channel was idle; the item is delivered immediately
    Immediate,
    /// Channel is cooling down; the item replaced the pending slot
    Coalesced,
    /// Receiver is gone; the item was discarded
    Closed,
}

struct State<T> {
    /// End of the current cooldown window; idle when absent or past
    window_end: Option<Instant>,
    leading: Option<T>,
    pending: Option<T>,
    closed: bool,
}

impl<T> State<T> {
    fn cooling(&self, now: Instant) -> bool {
        self.leading.is_some() || self.window_end.is_some_and(|end| now < end)
    }
}

struct Shared<T> {
    state: Mutex<State<T>>,
    notify: Notify,
    cooldown: Duration,
}

impl<T> Shared<T> {
    fn close(&self) {
        {
            let mut state = self.state.lock();
            state.closed = true;
            state.leading = None;
            state.pending = None;
        }
        self.notify.notify_one();
    }
}

/// Create a throttled channel with the given cooldown window
pub fn channel<T>(cooldown: Duration) -> (ThrottleSender<T>, ThrottleReceiver<T>) {
    let shared = Arc::new(Shared {
        state: Mutex::new(State {
            window_end: None,
            leading: None,
            pending: None,
            closed: false,
        }),
        notify: Notify::new(),
        cooldown,
    });

    (
        ThrottleSender {
            shared: Arc::clone(&shared),
        },
        ThrottleReceiver { shared },
    )
}

/// Producer half; cheap to clone
pub struct ThrottleSender<T> {
    shared: Arc<Shared<T>>,
}

impl<T> ThrottleSender<T> {
    /// Offer an item without blocking
    pub fn offer(&self, item: T) -> Offer {
        let mut state = self.shared.state.lock();
        if state.closed {
            return Offer::Closed;
        }

        let now = Instant::now();
        if state.cooling(now) {
            state.pending = Some(item);
            return Offer::Coalesced;
        }

        // A pending item left over from an expired window is superseded.
        state.pending = None;
        state.leading = Some(item);
        state.window_end = Some(now + self.shared.cooldown);
        drop(state);

        self.shared.notify.notify_one();
        Offer::Immediate
    }

    /// Close the channel, discarding anything not yet delivered
    pub fn close(&self) {
        self.shared.close();
    }

    /// Check if the channel is closed
    #[inline]
    pub fn is_closed(&self) -> bool {
        self.shared.state.lock().closed
    }

    /// Cooldown window of this channel
    #[inline]
    pub fn cooldown(&self) -> Duration {
        self.shared.cooldown
    }
}

impl<T> Clone for ThrottleSender<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> fmt::Debug for ThrottleSender<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThrottleSender")
            .field("cooldown", &self.shared.cooldown)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Consumer half; owned by the subscriber's connection task
pub struct ThrottleReceiver<T> {
    shared: Arc<Shared<T>>,
}

/// What the receiver should do next
enum Step<T> {
    Deliver(T),
    Closed,
    Wait(Option<Instant>),
}

impl<T> ThrottleReceiver<T> {
    /// Wait for the next delivery
    ///
    /// Returns `None` once the channel is closed. Cancel-safe: all window
    /// state lives in the channel, so dropping the future loses nothing.
    pub async fn recv(&mut self) -> Option<T> {
        loop {
            let notified = self.shared.notify.notified();
            match self.step() {
                Step::Deliver(item) => return Some(item),
                Step::Closed => return None,
                Step::Wait(Some(deadline)) => {
                    tokio::select! {
                        _ = sleep_until(deadline) => {}
                        _ = notified => {}
                    }
                }
                Step::Wait(None) => notified.await,
            }
        }
    }

    fn step(&self) -> Step<T> {
        let mut state = self.shared.state.lock();
        if state.closed {
            return Step::Closed;
        }

        let now = Instant::now();
        if let Some(item) = state.leading.take() {
            state.window_end = Some(now + self.shared.cooldown);
            return Step::Deliver(item);
        }

        match state.window_end {
            Some(end) if now < end => Step::Wait(Some(end)),
            Some(_) => match state.pending.take() {
                Some(item) => {
                    state.window_end = Some(now + self.shared.cooldown);
                    Step::Deliver(item)
                }
                None => {
                    state.window_end = None;
                    Step::Wait(None)
                }
            },
            None => Step::Wait(None),
        }
    }

    /// Close the channel from the receiving side
    pub fn close(&self) {
        self.shared.close();
    }
}

impl<T> Drop for ThrottleReceiver<T> {
    fn drop(&mut self) {
        self.shared.close();
    }
}

impl<T> fmt::Debug for ThrottleReceiver<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThrottleReceiver")
            .field("cooldown", &self.shared.cooldown)
            .field("window_end", &self.shared.state.lock().window_end)
            .finish()
    }
}
