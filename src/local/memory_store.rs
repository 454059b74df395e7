use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::{DashMap, mapref::entry::Entry};

use crate::{LeakyBucketError, Store, Ttl};

#[derive(Clone, Copy, Debug)]
struct Counter {
    value: u64,
    expires_at: Option<Instant>,
}

impl Counter {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// In-process implementation of the [`Store`] command contract.
///
/// Keeps integer counters with optional expiry in a [`DashMap`]. Expired counters are removed
/// lazily when a command touches them, or eagerly by [`MemoryStore::purge_expired`].
///
/// # Thread Safety
///
/// Each command takes the shard lock for its key, so every command is atomic with respect to
/// other commands on the same key, matching what Redis guarantees per command.
///
/// # Examples
///
/// ```
/// use std::{sync::Arc, time::Duration};
/// use leakybucket::{BucketFactory, BucketKey, NeverCancel, WindowDuration};
/// use leakybucket::local::MemoryStore;
///
/// futures::executor::block_on(async {
///     let factory = BucketFactory::new(Arc::new(MemoryStore::new()));
///     let window = WindowDuration::try_from(Duration::from_secs(1)).unwrap();
///     let key = BucketKey::try_from("user_123").unwrap();
///
///     let mut bucket = factory.create(&NeverCancel, &key, 10, window).await.unwrap();
///     let state = bucket.add(&NeverCancel, 4).await.unwrap();
///     assert_eq!(state.remaining, 6);
/// });
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    counters: DashMap<String, Counter>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys held, including expired keys not yet purged.
    pub fn len(&self) -> usize {
        self.counters.len()
    }

    /// Whether the store holds no keys.
    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }

    /// Drop every expired counter. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.counters.len();
        self.counters.retain(|_, counter| !counter.is_expired(now));
        before.saturating_sub(self.counters.len())
    }

    fn live(&self, key: &str, now: Instant) -> Option<Counter> {
        let counter = *self.counters.get(key)?;

        if counter.is_expired(now) {
            self.counters
                .remove_if(key, |_, counter| counter.is_expired(now));
            return None;
        }

        Some(counter)
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get_counter(&self, key: &str) -> Result<Option<u64>, LeakyBucketError> {
        Ok(self.live(key, Instant::now()).map(|counter| counter.value))
    }

    async fn increment_by(&self, key: &str, amount: u64) -> Result<u64, LeakyBucketError> {
        let now = Instant::now();

        match self.counters.entry(key.to_string()) {
            Entry::Occupied(mut entry) => {
                let counter = entry.get_mut();

                if counter.is_expired(now) {
                    *counter = Counter {
                        value: 0,
                        expires_at: None,
                    };
                }

                counter.value = counter.value.checked_add(amount).ok_or_else(|| {
                    LeakyBucketError::Store(format!(
                        "increment of {key} by {amount} would overflow"
                    ))
                })?;

                Ok(counter.value)
            }
            Entry::Vacant(entry) => {
                entry.insert(Counter {
                    value: amount,
                    expires_at: None,
                });

                Ok(amount)
            }
        }
    }

    async fn set_expiry(&self, key: &str, ttl: Duration) -> Result<bool, LeakyBucketError> {
        let now = Instant::now();

        let Some(mut counter) = self.counters.get_mut(key) else {
            return Ok(false);
        };

        if counter.is_expired(now) {
            drop(counter);
            self.counters
                .remove_if(key, |_, counter| counter.is_expired(now));
            return Ok(false);
        }

        // A TTL past the end of the clock never expires.
        counter.expires_at = now.checked_add(ttl);
        Ok(true)
    }

    async fn get_ttl(&self, key: &str) -> Result<Ttl, LeakyBucketError> {
        let now = Instant::now();

        Ok(match self.live(key, now) {
            None => Ttl::Missing,
            Some(Counter {
                expires_at: None, ..
            }) => Ttl::Persistent,
            Some(Counter {
                expires_at: Some(at),
                ..
            }) => Ttl::Expires(at.saturating_duration_since(now)),
        })
    }
}
