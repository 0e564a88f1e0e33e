//! Subscriber registry
//!
//! Each open connection has exactly one entry holding:
//! - A registry-local `SubscriberId`
//! - The current predicate (`None` = match everything)
//! - The producer half of its throttled delivery channel
//!
//! Removal closes the channel under the same write lock, so once `remove`
//! returns no broadcast can reach the subscriber. The broadcast loop works on
//! a `snapshot` and never holds the lock while offering.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chirp_predicate::{OperatorRegistry, Predicate, parse_filter};
use chirp_protocol::Event;
use parking_lot::RwLock;

use crate::error::{Result, TapError};
use crate::throttle::{self, ThrottleReceiver, ThrottleSender};

/// Default maximum number of concurrent subscribers
pub const DEFAULT_MAX_SUBSCRIBERS: usize = 1000;

/// Default per-subscriber cooldown window
pub const DEFAULT_COOLDOWN: Duration = Duration::from_millis(50);

/// Identity of a subscriber within one registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Raw numeric value
    #[inline]
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Registry limits
#[derive(Debug, Clone, Copy)]
pub struct RegistryConfig {
    /// Maximum concurrent subscribers
    pub max_subscribers: usize,
    /// Cooldown window for each subscriber's delivery channel
    pub cooldown: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_subscribers: DEFAULT_MAX_SUBSCRIBERS,
            cooldown: DEFAULT_COOLDOWN,
        }
    }
}

/// Result of a successful filter update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterUpdate {
    /// A predicate is now installed
    Installed,
    /// The predicate was removed; the subscriber matches everything
    Cleared,
}

/// Consistent copy of one entry, taken for a single broadcast
#[derive(Debug, Clone)]
pub struct SubscriberHandle {
    /// Subscriber identity
    pub id: SubscriberId,
    /// Predicate at snapshot time
    pub predicate: Option<Predicate>,
    /// Delivery channel
    pub sender: ThrottleSender<Arc<Event>>,
}

#[derive(Debug)]
struct Entry {
    predicate: Option<Predicate>,
    sender: ThrottleSender<Arc<Event>>,
}

/// Registry of open subscriber connections
#[derive(Debug)]
pub struct SubscriberRegistry {
    config: RegistryConfig,
    next_id: AtomicU64,
    entries: RwLock<BTreeMap<SubscriberId, Entry>>,
}

impl SubscriberRegistry {
    /// Create an empty registry
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            config,
            next_id: AtomicU64::new(1),
            entries: RwLock::new(BTreeMap::new()),
        }
    }

    /// Registry limits
    #[inline]
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Register a new subscriber with no predicate
    ///
    /// Returns the subscriber ID and the receiving half of its channel.
    pub fn add(&self) -> Result<(SubscriberId, ThrottleReceiver<Arc<Event>>)> {
        let mut entries = self.entries.write();

        if entries.len() >= self.config.max_subscribers {
            return Err(TapError::MaxSubscribers {
                max: self.config.max_subscribers,
            });
        }

        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (sender, receiver) = throttle::channel(self.config.cooldown);
        entries.insert(
            id,
            Entry {
                predicate: None,
                sender,
            },
        );

        Ok((id, receiver))
    }

    /// Remove a subscriber and close its channel
    pub fn remove(&self, id: SubscriberId) -> Result<()> {
        let mut entries = self.entries.write();
        let entry = entries.remove(&id).ok_or(TapError::not_found(id))?;
        entry.sender.close();
        Ok(())
    }

    /// Replace a subscriber's predicate
    pub fn set_predicate(&self, id: SubscriberId, predicate: Option<Predicate>) -> Result<()> {
        let mut entries = self.entries.write();
        let entry = entries.get_mut(&id).ok_or(TapError::not_found(id))?;
        entry.predicate = predicate;
        Ok(())
    }

    /// Compile a filter payload and install it
    ///
    /// An empty or `null` payload clears the predicate. On a compile error
    /// the previous predicate stays in place.
    pub fn update_filter(
        &self,
        id: SubscriberId,
        payload: &str,
        ops: &OperatorRegistry,
    ) -> Result<FilterUpdate> {
        let predicate = parse_filter(payload, ops)?;
        let update = match predicate {
            Some(_) => FilterUpdate::Installed,
            None => FilterUpdate::Cleared,
        };
        self.set_predicate(id, predicate)?;
        Ok(update)
    }

    /// Current predicate of a subscriber
    pub fn predicate(&self, id: SubscriberId) -> Result<Option<Predicate>> {
        self.entries
            .read()
            .get(&id)
            .map(|entry| entry.predicate.clone())
            .ok_or(TapError::not_found(id))
    }

    /// Check if a subscriber is registered
    pub fn contains(&self, id: SubscriberId) -> bool {
        self.entries.read().contains_key(&id)
    }

    /// Copy every entry for one broadcast pass
    pub fn snapshot(&self) -> Vec<SubscriberHandle> {
        self.entries
            .read()
            .iter()
            .map(|(id, entry)| SubscriberHandle {
                id: *id,
                predicate: entry.predicate.clone(),
                sender: entry.sender.clone(),
            })
            .collect()
    }

    /// Number of registered subscribers
    pub fn count(&self) -> usize {
        self.entries.read().len()
    }

    /// Check if there are no subscribers
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Drop entries whose receiver has gone away
    pub fn remove_closed(&self) -> usize {
        let mut entries = self.entries.write();
        let original_len = entries.len();
        entries.retain(|_, entry| !entry.sender.is_closed());
        original_len - entries.len()
    }

    /// Close every channel and empty the registry
    pub fn close_all(&self) -> usize {
        let mut entries = self.entries.write();
        let closed = entries.len();
        for entry in entries.values() {
            entry.sender.close();
        }
        entries.clear();
        closed
    }
}

impl Default for SubscriberRegistry {
    fn default() -> Self {
        Self::new(RegistryConfig::default())
    }
}

#[cfg(test)]
#[path = "subscriber_test.rs"]
mod tests;
