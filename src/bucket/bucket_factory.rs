use std::{sync::Arc, time::SystemTime};

use crate::{
    Bucket, BucketKey, CancellationToken, LeakyBucketError, Store, Ttl, WindowDuration,
    bucket::fixed_window_bucket::remaining_quota, cancellation::cancellable, common::reset_after,
};

/// Produces [`Bucket`]s backed by a shared [`Store`].
///
/// The factory owns nothing but a reference to the store. Whoever constructs the store
/// controls its lifetime; the factory and every bucket it creates keep it alive through an
/// [`Arc`].
///
/// # Examples
///
/// ```ignore
/// use std::{sync::Arc, time::Duration};
/// use leakybucket::{BucketFactory, BucketKey, Deadline, WindowDuration};
/// use leakybucket::redis::{RedisClient, RedisStore, RedisStoreOptions};
///
/// let client = redis::Client::open("redis://127.0.0.1:6379/")?;
/// let store = RedisStore::new(RedisStoreOptions {
///     client: RedisClient::default_from_client(client).await?,
///     prefix: None,
/// });
///
/// let factory = BucketFactory::new(Arc::new(store));
/// let key = BucketKey::try_from("api_key_42")?;
/// let window = WindowDuration::try_from(Duration::from_secs(60))?;
///
/// let mut bucket = factory
///     .create(&Deadline::after(Duration::from_millis(50)), &key, 100, window)
///     .await?;
/// ```
pub struct BucketFactory<S: Store + ?Sized> {
    store: Arc<S>,
}

impl<S: Store + ?Sized> Clone for BucketFactory<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S: Store + ?Sized> BucketFactory<S> {
    /// Create a factory over `store`.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// The store buckets are created against.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Create a bucket for `name`, attaching to any counter already in the store.
    ///
    /// - **No counter:** the bucket starts full (`remaining = capacity`) with
    ///   `reset = now + window`. Nothing is written; the window starts on the first
    ///   successful [`Bucket::add`].
    /// - **Existing counter:** `remaining = capacity - min(capacity, counter)` and
    ///   `reset = now + ttl`. This lets a restarted process pick up an in-flight window.
    ///   If the key has no expiry, or vanished between the two reads, `reset = now + window`.
    ///
    /// # Errors
    ///
    /// Any store failure other than "not found", or [`LeakyBucketError::Cancelled`] if
    /// `cancel` fires first.
    pub async fn create(
        &self,
        cancel: &dyn CancellationToken,
        name: &BucketKey,
        capacity: u64,
        window: WindowDuration,
    ) -> Result<Bucket<S>, LeakyBucketError> {
        let Some(count) = cancellable(cancel, self.store.get_counter(name)).await? else {
            tracing::debug!(bucket = %name, capacity, "bucket.create.fresh");

            return Ok(Bucket::new(
                name.clone(),
                capacity,
                capacity,
                reset_after(SystemTime::now(), *window),
                window,
                self.store.clone(),
            ));
        };

        let ttl = cancellable(cancel, self.store.get_ttl(name)).await?;

        let reset = match ttl {
            Ttl::Expires(ttl) => reset_after(SystemTime::now(), ttl),
            Ttl::Persistent | Ttl::Missing => reset_after(SystemTime::now(), *window),
        };

        let remaining = remaining_quota(capacity, count);

        tracing::debug!(
            bucket = %name,
            capacity,
            remaining,
            ttl = ?ttl,
            "bucket.create.attach"
        );

        Ok(Bucket::new(
            name.clone(),
            capacity,
            remaining,
            reset,
            window,
            self.store.clone(),
        ))
    } // end method create
}
