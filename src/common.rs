use std::{
    ops::Deref,
    sync::Arc,
    time::{Duration, SystemTime},
};

use crate::LeakyBucketError;

/// Snapshot of a bucket's quota.
///
/// Returned by [`Bucket::add`](crate::Bucket::add) and [`Bucket::state`](crate::Bucket::state).
/// The values are derived from the store at the time of the last operation and may be stale.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BucketState {
    /// Maximum units admissible within one window.
    pub capacity: u64,
    /// Units still admissible in the current window. Always `<= capacity`.
    pub remaining: u64,
    /// Wall-clock time at which the current window is expected to end.
    pub reset: SystemTime,
}

impl BucketState {
    /// Time left until [`BucketState::reset`], or zero if it already passed.
    ///
    /// Useful for `Retry-After` style hints when a bucket is full.
    pub fn retry_after(&self) -> Duration {
        self.reset
            .duration_since(SystemTime::now())
            .unwrap_or(Duration::ZERO)
    }
}

/// Window length of a bucket.
///
/// The store counter expires this long after the first unit of a window is consumed.
/// Expiry is set with millisecond granularity, so anything shorter than one millisecond is
/// rejected. Windows longer than [`WindowDuration::MAX`] (the largest `PEXPIRE` Redis accepts)
/// are rejected too.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use leakybucket::WindowDuration;
///
/// let window = WindowDuration::try_from(Duration::from_secs(1)).unwrap();
/// assert_eq!(*window, Duration::from_secs(1));
///
/// assert!(WindowDuration::try_from(Duration::from_micros(10)).is_err());
/// assert!(WindowDuration::try_from(Duration::MAX).is_err());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WindowDuration(Duration);

impl WindowDuration {
    /// Longest accepted window: `i64::MAX` milliseconds.
    pub const MAX: Duration = Duration::from_millis(i64::MAX as u64);

    /// The window length in whole milliseconds, as sent to the store.
    pub fn as_millis(&self) -> u64 {
        u64::try_from(self.0.as_millis()).unwrap_or(u64::MAX)
    }
}

impl Deref for WindowDuration {
    type Target = Duration;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl TryFrom<Duration> for WindowDuration {
    type Error = &'static str;

    fn try_from(value: Duration) -> Result<Self, Self::Error> {
        if value < Duration::from_millis(1) {
            Err("Window duration must be at least 1 millisecond")
        } else if value > Self::MAX {
            Err("Window duration must not exceed i64::MAX milliseconds")
        } else {
            Ok(Self(value))
        }
    }
}

/// `now + offset`, saturating at the latest representable time instead of panicking.
pub(crate) fn reset_after(now: SystemTime, offset: Duration) -> SystemTime {
    now.checked_add(offset)
        .or_else(|| SystemTime::UNIX_EPOCH.checked_add(WindowDuration::MAX))
        .unwrap_or(now)
}

/// A validated bucket identifier.
///
/// This is a string with the following constraints:
/// - Must not be empty
/// - Must not be longer than 255 bytes
///
/// The same type is used for the optional key prefix of the Redis store.
#[derive(Debug, Clone, PartialEq, PartialOrd, Hash, Eq)]
pub struct BucketKey(Arc<str>);

impl BucketKey {
    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Deref for BucketKey {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl std::fmt::Display for BucketKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for BucketKey {
    type Error = LeakyBucketError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.is_empty() {
            Err(LeakyBucketError::InvalidBucketKey(
                "Bucket key must not be empty".to_string(),
            ))
        } else if value.len() > 255 {
            Err(LeakyBucketError::InvalidBucketKey(
                "Bucket key must not be longer than 255 characters".to_string(),
            ))
        } else {
            Ok(Self(Arc::from(value)))
        }
    }
}

impl TryFrom<&str> for BucketKey {
    type Error = LeakyBucketError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::try_from(value.to_string())
    }
}
