//! The command contract buckets use to talk to their backing store.
//!
//! A [`Store`] holds integer counters with an optional expiry. The store is the only
//! authoritative copy of a bucket's consumption; buckets merely cache what it last reported.
//!
//! Two implementations ship with the crate:
//!
//! - [`MemoryStore`](crate::local::MemoryStore): process-local, backed by a `DashMap`
//! - `RedisStore` (`redis-tokio` / `redis-smol` features): shared across processes

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;

use crate::LeakyBucketError;

/// Remaining lifetime of a store key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Ttl {
    /// The key exists and expires after the given duration.
    Expires(Duration),
    /// The key exists but has no expiry.
    Persistent,
    /// The key does not exist.
    Missing,
}

/// Typed store commands consumed by [`BucketFactory`](crate::BucketFactory) and
/// [`Bucket`](crate::Bucket).
///
/// Every command is a single round trip and must be atomic at the store. Nothing in this
/// crate composes them into a transaction.
#[async_trait]
pub trait Store: Send + Sync {
    /// Read the counter at `key`. `None` when the key does not exist.
    async fn get_counter(&self, key: &str) -> Result<Option<u64>, LeakyBucketError>;

    /// Atomically add `amount` to the counter at `key`, creating it from zero if absent.
    ///
    /// Returns the post-increment total.
    async fn increment_by(&self, key: &str, amount: u64) -> Result<u64, LeakyBucketError>;

    /// Set the remaining lifetime of `key`. Returns `false` when the key does not exist.
    async fn set_expiry(&self, key: &str, ttl: Duration) -> Result<bool, LeakyBucketError>;

    /// Read the remaining lifetime of `key`.
    async fn get_ttl(&self, key: &str) -> Result<Ttl, LeakyBucketError>;
}

#[async_trait]
impl<S: Store + ?Sized> Store for Arc<S> {
    async fn get_counter(&self, key: &str) -> Result<Option<u64>, LeakyBucketError> {
        (**self).get_counter(key).await
    }

    async fn increment_by(&self, key: &str, amount: u64) -> Result<u64, LeakyBucketError> {
        (**self).increment_by(key, amount).await
    }

    async fn set_expiry(&self, key: &str, ttl: Duration) -> Result<bool, LeakyBucketError> {
        (**self).set_expiry(key, ttl).await
    }

    async fn get_ttl(&self, key: &str) -> Result<Ttl, LeakyBucketError> {
        (**self).get_ttl(key).await
    }
}
