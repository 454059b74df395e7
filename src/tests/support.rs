use std::{
    future::Future,
    pin::Pin,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    task::{Context, Poll},
    time::{Duration, SystemTime},
};

use async_trait::async_trait;

use crate::{BucketKey, LeakyBucketError, Store, Ttl, WindowDuration, local::MemoryStore};

pub(super) fn key(s: &str) -> BucketKey {
    BucketKey::try_from(s).unwrap()
}

pub(super) fn window_ms(ms: u64) -> WindowDuration {
    WindowDuration::try_from(Duration::from_millis(ms)).unwrap()
}

/// Asserts `at` lies within `tolerance` of `now + offset`.
pub(super) fn assert_close_to_now_plus(at: SystemTime, offset: Duration, tolerance: Duration) {
    let expected = SystemTime::now() + offset;
    let diff = match at.duration_since(expected) {
        Ok(d) => d,
        Err(e) => e.duration(),
    };
    assert!(
        diff <= tolerance,
        "expected {at:?} within {tolerance:?} of now + {offset:?}, off by {diff:?}"
    );
}

/// Seed a counter the way another process would have left it.
pub(super) async fn seed(store: &MemoryStore, name: &str, count: u64, ttl: Option<Duration>) {
    store.increment_by(name, count).await.unwrap();
    if let Some(ttl) = ttl {
        assert!(store.set_expiry(name, ttl).await.unwrap());
    }
}

/// Counts every command reaching the wrapped store.
#[derive(Debug, Default)]
pub(super) struct CountingStore {
    pub inner: MemoryStore,
    pub gets: AtomicUsize,
    pub increments: AtomicUsize,
    pub expiries: AtomicUsize,
    pub ttls: AtomicUsize,
}

impl CountingStore {
    pub fn total_calls(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
            + self.increments.load(Ordering::SeqCst)
            + self.expiries.load(Ordering::SeqCst)
            + self.ttls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Store for CountingStore {
    async fn get_counter(&self, key: &str) -> Result<Option<u64>, LeakyBucketError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.inner.get_counter(key).await
    }

    async fn increment_by(&self, key: &str, amount: u64) -> Result<u64, LeakyBucketError> {
        self.increments.fetch_add(1, Ordering::SeqCst);
        self.inner.increment_by(key, amount).await
    }

    async fn set_expiry(&self, key: &str, ttl: Duration) -> Result<bool, LeakyBucketError> {
        self.expiries.fetch_add(1, Ordering::SeqCst);
        self.inner.set_expiry(key, ttl).await
    }

    async fn get_ttl(&self, key: &str) -> Result<Ttl, LeakyBucketError> {
        self.ttls.fetch_add(1, Ordering::SeqCst);
        self.inner.get_ttl(key).await
    }
}

/// Wraps a [`MemoryStore`] and fails the commands switched on.
#[derive(Debug, Default)]
pub(super) struct FailingStore {
    pub inner: MemoryStore,
    pub fail_get: AtomicBool,
    pub fail_increment: AtomicBool,
    pub fail_expiry: AtomicBool,
    pub fail_ttl: AtomicBool,
}

impl FailingStore {
    fn check(flag: &AtomicBool, command: &str) -> Result<(), LeakyBucketError> {
        if flag.load(Ordering::SeqCst) {
            Err(LeakyBucketError::Store(format!("{command} failed")))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Store for FailingStore {
    async fn get_counter(&self, key: &str) -> Result<Option<u64>, LeakyBucketError> {
        Self::check(&self.fail_get, "get")?;
        self.inner.get_counter(key).await
    }

    async fn increment_by(&self, key: &str, amount: u64) -> Result<u64, LeakyBucketError> {
        Self::check(&self.fail_increment, "incrby")?;
        self.inner.increment_by(key, amount).await
    }

    async fn set_expiry(&self, key: &str, ttl: Duration) -> Result<bool, LeakyBucketError> {
        Self::check(&self.fail_expiry, "pexpire")?;
        self.inner.set_expiry(key, ttl).await
    }

    async fn get_ttl(&self, key: &str) -> Result<Ttl, LeakyBucketError> {
        Self::check(&self.fail_ttl, "pttl")?;
        self.inner.get_ttl(key).await
    }
}

/// Yields once after every read, so two joined `add` calls both read before either
/// increments.
#[derive(Debug, Default)]
pub(super) struct InterleavingStore {
    pub inner: MemoryStore,
}

#[async_trait]
impl Store for InterleavingStore {
    async fn get_counter(&self, key: &str) -> Result<Option<u64>, LeakyBucketError> {
        let count = self.inner.get_counter(key).await;
        YieldNow(false).await;
        count
    }

    async fn increment_by(&self, key: &str, amount: u64) -> Result<u64, LeakyBucketError> {
        self.inner.increment_by(key, amount).await
    }

    async fn set_expiry(&self, key: &str, ttl: Duration) -> Result<bool, LeakyBucketError> {
        self.inner.set_expiry(key, ttl).await
    }

    async fn get_ttl(&self, key: &str) -> Result<Ttl, LeakyBucketError> {
        self.inner.get_ttl(key).await
    }
}

/// Store whose commands never complete.
#[derive(Debug, Default)]
pub(super) struct HangingStore {
    pub calls: Arc<AtomicUsize>,
}

#[async_trait]
impl Store for HangingStore {
    async fn get_counter(&self, _key: &str) -> Result<Option<u64>, LeakyBucketError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        futures::future::pending().await
    }

    async fn increment_by(&self, _key: &str, _amount: u64) -> Result<u64, LeakyBucketError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        futures::future::pending().await
    }

    async fn set_expiry(&self, _key: &str, _ttl: Duration) -> Result<bool, LeakyBucketError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        futures::future::pending().await
    }

    async fn get_ttl(&self, _key: &str) -> Result<Ttl, LeakyBucketError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        futures::future::pending().await
    }
}

struct YieldNow(bool);

impl Future for YieldNow {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.0 {
            return Poll::Ready(());
        }
        self.0 = true;
        cx.waker().wake_by_ref();
        Poll::Pending
    }
}
