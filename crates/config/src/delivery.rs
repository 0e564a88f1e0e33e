//! Per-subscriber delivery configuration

use std::time::Duration;

use serde::Deserialize;

/// Delivery throttling
///
/// ```toml
/// [delivery]
/// cooldown_ms = 50    # default
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DeliveryConfig {
    /// Cooldown window between deliveries to one subscriber
    /// Default: 50
    pub cooldown_ms: u64,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self { cooldown_ms: 50 }
    }
}

impl DeliveryConfig {
    #[inline]
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }
}
