//! Reconnect delay schedule

use std::time::Duration;

/// Exponential backoff: `initial`, doubling on each call, capped at `max`
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    current: Duration,
}

impl Backoff {
    /// Create a schedule starting at `initial`
    pub fn new(initial: Duration, max: Duration) -> Self {
        let initial = initial.min(max);
        Self {
            initial,
            max,
            current: initial,
        }
    }

    /// Delay before the next attempt; advances the schedule
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = self.current.saturating_mul(2).min(self.max);
        delay
    }

    /// Restart from the initial delay (after a successful connect)
    pub fn reset(&mut self) {
        self.current = self.initial;
    }

    /// Replace the initial delay (server-announced `retry:`)
    pub fn set_initial(&mut self, initial: Duration) {
        self.initial = initial.min(self.max);
        self.current = self.initial;
    }
}
