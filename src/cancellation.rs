//! Per-operation cancellation.
//!
//! Every store round trip made by [`BucketFactory::create`](crate::BucketFactory::create) and
//! [`Bucket::add`](crate::Bucket::add) is raced against the token passed to that call. The
//! token is an argument, never state stored on the bucket, so one bucket can be driven with a
//! different deadline on every call.

use std::{
    future::Future,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use async_trait::async_trait;
use futures::{
    FutureExt,
    channel::oneshot,
    future::{BoxFuture, Either, Shared},
};

use crate::LeakyBucketError;

/// Cooperative cancellation token.
#[async_trait]
pub trait CancellationToken: Send + Sync {
    /// Resolves when cancellation is requested.
    async fn cancelled(&self);

    /// Non-blocking cancellation check.
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Cancellation token that never triggers.
#[derive(Clone, Copy, Debug, Default)]
pub struct NeverCancel;

#[async_trait]
impl CancellationToken for NeverCancel {
    async fn cancelled(&self) {
        futures::future::pending::<()>().await;
    }
}

/// Create a manually triggered token and the handle that triggers it.
///
/// ```
/// use leakybucket::{CancellationToken, cancel_pair};
///
/// let (handle, token) = cancel_pair();
/// let other = token.clone();
///
/// handle.cancel();
/// assert!(token.is_cancelled());
/// assert!(other.is_cancelled());
/// ```
pub fn cancel_pair() -> (CancelHandle, CancelToken) {
    let (sender, receiver) = oneshot::channel::<()>();
    let flag = Arc::new(AtomicBool::new(false));

    // A dropped handle means nobody can cancel any more, not that everybody is cancelled.
    let signal = async move {
        if receiver.await.is_err() {
            futures::future::pending::<()>().await;
        }
    }
    .boxed()
    .shared();

    (
        CancelHandle {
            sender,
            flag: flag.clone(),
        },
        CancelToken { signal, flag },
    )
}

/// Triggers the [`CancelToken`]s created alongside it by [`cancel_pair`].
#[derive(Debug)]
pub struct CancelHandle {
    sender: oneshot::Sender<()>,
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    /// Cancel every clone of the paired token.
    pub fn cancel(self) {
        self.flag.store(true, Ordering::Release);
        let _ = self.sender.send(());
    }
}

/// Cloneable token created by [`cancel_pair`].
#[derive(Clone)]
pub struct CancelToken {
    signal: Shared<BoxFuture<'static, ()>>,
    flag: Arc<AtomicBool>,
}

impl std::fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

#[async_trait]
impl CancellationToken for CancelToken {
    async fn cancelled(&self) {
        self.signal.clone().await;
    }

    fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

/// Token that fires once a point in time is reached.
///
/// Requires an async runtime, so it is only available with the `redis-tokio` or `redis-smol`
/// feature.
#[cfg(any(feature = "redis-tokio", feature = "redis-smol"))]
#[cfg_attr(docsrs, doc(cfg(any(feature = "redis-tokio", feature = "redis-smol"))))]
#[derive(Clone, Copy, Debug)]
pub struct Deadline {
    // `None` when the deadline lies beyond the end of the clock.
    at: Option<std::time::Instant>,
}

#[cfg(any(feature = "redis-tokio", feature = "redis-smol"))]
impl Deadline {
    /// Fire at `at`.
    pub fn at(at: std::time::Instant) -> Self {
        Self { at: Some(at) }
    }

    /// Fire once `timeout` has elapsed from now.
    ///
    /// A timeout too large to represent never fires.
    pub fn after(timeout: std::time::Duration) -> Self {
        Self {
            at: std::time::Instant::now().checked_add(timeout),
        }
    }
}

#[cfg(any(feature = "redis-tokio", feature = "redis-smol"))]
#[async_trait]
impl CancellationToken for Deadline {
    async fn cancelled(&self) {
        match self.at {
            Some(at) => crate::runtime::sleep_until(at).await,
            None => futures::future::pending().await,
        }
    }

    fn is_cancelled(&self) -> bool {
        self.at.is_some_and(|at| std::time::Instant::now() >= at)
    }
}

/// Run a store call unless `token` fires first.
pub(crate) async fn cancellable<T, F>(
    token: &dyn CancellationToken,
    call: F,
) -> Result<T, LeakyBucketError>
where
    F: Future<Output = Result<T, LeakyBucketError>>,
{
    if token.is_cancelled() {
        return Err(LeakyBucketError::Cancelled);
    }

    let call = std::pin::pin!(call);
    let cancelled = token.cancelled();

    match futures::future::select(call, cancelled).await {
        Either::Left((result, _)) => result,
        Either::Right(((), _)) => Err(LeakyBucketError::Cancelled),
    }
} // end fn cancellable
