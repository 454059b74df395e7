use std::{sync::Arc, time::SystemTime};

use crate::{
    BucketKey, BucketState, CancellationToken, LeakyBucketError, Store, Ttl, WindowDuration,
    cancellation::cancellable, common::reset_after,
};

/// Fixed-window quota for one identifier.
///
/// The authoritative count lives in the [`Store`] under the bucket's name. The bucket only
/// caches the capacity, the remaining quota and the expected reset time computed on the last
/// [`Bucket::add`] (or at creation), so the accessors never touch the store.
///
/// Obtain a bucket from [`BucketFactory::create`](crate::BucketFactory::create).
///
/// # Algorithm
///
/// 1. **Read:** `GET` the counter; a missing counter counts as zero
/// 2. **Admission check:** reject with [`LeakyBucketError::BucketFull`] if
///    `amount > capacity - min(capacity, counter)`
/// 3. **Increment:** `INCRBY` the counter by `amount`
/// 4. **Window start:** if the new total equals `amount`, this call created the counter, so its
///    expiry is set to the window length
///
/// The window therefore starts with the first unit consumed, not when the bucket is created.
/// When the counter expires, the next [`Bucket::add`] sees a missing counter and starts a new
/// window.
///
/// # Thread Safety
///
/// [`Bucket::add`] takes `&mut self`: one handle is not meant to be shared between concurrent
/// callers without external synchronization. Many handles, in one process or many, may point
/// at the same name; that is the intended use.
///
/// # Semantics & Limitations
///
/// **Best-effort concurrency:**
/// - The admission check and the increment are two separate store round trips
/// - Concurrent callers on the same name can all pass the check against the same read
/// - All of them increment, so the store counter can exceed `capacity`
/// - Reported `remaining` is still clipped to `[0, capacity]`; the store counter is not
///
/// **Lazy reset time:**
/// - The cached reset time is only re-read from the store once it has passed
/// - Failures while re-reading it are logged and ignored
pub struct Bucket<S: Store + ?Sized> {
    name: BucketKey,
    capacity: u64,
    remaining: u64,
    reset: SystemTime,
    window: WindowDuration,
    store: Arc<S>,
}

impl<S: Store + ?Sized> std::fmt::Debug for Bucket<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bucket")
            .field("name", &self.name)
            .field("capacity", &self.capacity)
            .field("remaining", &self.remaining)
            .field("reset", &self.reset)
            .field("window", &self.window)
            .finish_non_exhaustive()
    }
}

impl<S: Store + ?Sized> Bucket<S> {
    pub(crate) fn new(
        name: BucketKey,
        capacity: u64,
        remaining: u64,
        reset: SystemTime,
        window: WindowDuration,
        store: Arc<S>,
    ) -> Self {
        Self {
            name,
            capacity,
            remaining,
            reset,
            window,
            store,
        }
    }

    /// Name of the bucket; also its key in the store.
    pub fn name(&self) -> &BucketKey {
        &self.name
    }

    /// Window length.
    pub fn window(&self) -> WindowDuration {
        self.window
    }

    /// Maximum units admissible within one window.
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Remaining quota as of the last operation.
    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    /// When the current window is expected to end, as of the last operation.
    pub fn reset(&self) -> SystemTime {
        self.reset
    }

    /// Snapshot of [`Bucket::capacity`], [`Bucket::remaining`] and [`Bucket::reset`].
    pub fn state(&self) -> BucketState {
        BucketState {
            capacity: self.capacity,
            remaining: self.remaining,
            reset: self.reset,
        }
    }

    /// Try to consume `amount` units.
    ///
    /// # Arguments
    ///
    /// - `cancel`: Token raced against every store call of this operation
    /// - `amount`: Units to consume (typically `1` for a single request, or a batch size)
    ///
    /// # Returns
    ///
    /// - `Ok(state)`: Units consumed; `state` is the refreshed snapshot
    /// - `Err(LeakyBucketError::BucketFull(state))`: `amount` exceeds the remaining quota; the
    ///   store counter was **not** touched
    /// - Any other error: a store call failed or `cancel` fired. Nothing is retried, and
    ///   whatever the store already committed stays committed. [`Bucket::state`] still holds
    ///   the best available snapshot
    ///
    /// # Concurrency
    ///
    /// **Not atomic across calls.** The admission check reads the counter and the increment
    /// happens in a second round trip. Concurrent callers on the same name may all be admitted
    /// and push the store counter past `capacity`.
    ///
    /// # Cancellation
    ///
    /// If `cancel` fires after the first increment of a window but before its expiry is set,
    /// the counter is left without an expiry. Remaining quota for that name then never resets
    /// until the key is removed from the store. Keep `Deadline`s longer than a couple of store
    /// round trips.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::{sync::Arc, time::Duration};
    /// use leakybucket::{BucketFactory, BucketKey, LeakyBucketError, NeverCancel, WindowDuration};
    /// use leakybucket::local::MemoryStore;
    ///
    /// futures::executor::block_on(async {
    ///     let factory = BucketFactory::new(Arc::new(MemoryStore::new()));
    ///     let window = WindowDuration::try_from(Duration::from_secs(1)).unwrap();
    ///     let key = BucketKey::try_from("user_123").unwrap();
    ///     let mut bucket = factory.create(&NeverCancel, &key, 10, window).await.unwrap();
    ///
    ///     assert_eq!(bucket.add(&NeverCancel, 4).await.unwrap().remaining, 6);
    ///
    ///     match bucket.add(&NeverCancel, 7).await {
    ///         Err(LeakyBucketError::BucketFull(state)) => assert_eq!(state.remaining, 6),
    ///         other => panic!("unexpected: {other:?}"),
    ///     }
    /// });
    /// ```
    pub async fn add(
        &mut self,
        cancel: &dyn CancellationToken,
        amount: u64,
    ) -> Result<BucketState, LeakyBucketError> {
        let count = cancellable(cancel, self.store.get_counter(&self.name))
            .await?
            .unwrap_or(0);

        self.remaining = remaining_quota(self.capacity, count);

        if amount > self.remaining {
            self.refresh_stale_reset(cancel).await;

            tracing::debug!(
                bucket = %self.name,
                amount,
                remaining = self.remaining,
                "bucket.full"
            );

            return Err(LeakyBucketError::BucketFull(self.state()));
        }

        let total = cancellable(cancel, self.store.increment_by(&self.name, amount)).await?;

        if total == amount {
            cancellable(cancel, self.store.set_expiry(&self.name, *self.window)).await?;

            tracing::debug!(
                bucket = %self.name,
                window_ms = self.window.as_millis(),
                "bucket.window.start"
            );
        }

        self.refresh_stale_reset(cancel).await;
        self.remaining = remaining_quota(self.capacity, total);

        tracing::debug!(
            bucket = %self.name,
            amount,
            remaining = self.remaining,
            "bucket.add"
        );

        Ok(self.state())
    } // end method add

    /// Re-read the reset time from the store, but only once the cached one has passed.
    ///
    /// Reset time is advisory, so failures are logged and swallowed and `reset` keeps its
    /// previous value.
    async fn refresh_stale_reset(&mut self, cancel: &dyn CancellationToken) {
        let now = SystemTime::now();

        if self.reset > now {
            return;
        }

        match cancellable(cancel, self.store.get_ttl(&self.name)).await {
            Ok(Ttl::Expires(ttl)) => self.reset = reset_after(now, ttl),
            Ok(Ttl::Persistent | Ttl::Missing) => {}
            Err(err) => {
                tracing::warn!(
                    bucket = %self.name,
                    error = ?err,
                    "bucket.reset.refresh.error, keeping stale reset time"
                );
            }
        }
    } // end method refresh_stale_reset
}

/// Remaining quota for a raw store counter, clipped to `[0, capacity]`.
pub(crate) fn remaining_quota(capacity: u64, count: u64) -> u64 {
    capacity - capacity.min(count)
}
