use crate::BucketState;

/// Error type for this crate.
#[derive(Debug, thiserror::Error)]
pub enum LeakyBucketError {
    /// The requested amount does not fit in the remaining quota.
    ///
    /// Carries the bucket snapshot at the time of the rejection. The store was not modified.
    #[error("bucket is full ({} of {} remaining)", .0.remaining, .0.capacity)]
    BucketFull(BucketState),

    /// Redis error.
    #[cfg(any(feature = "redis-tokio", feature = "redis-smol"))]
    #[cfg_attr(docsrs, doc(cfg(any(feature = "redis-tokio", feature = "redis-smol"))))]
    #[error("redis error: {0}")]
    RedisError(#[from] redis::RedisError),

    /// A non-Redis store failed to execute a command.
    #[error("store error: {0}")]
    Store(String),

    /// The store answered with a reply the command contract does not allow.
    #[error("unexpected store reply: {0}")]
    UnexpectedReply(String),

    /// The cancellation token fired before the store call completed.
    #[error("operation cancelled")]
    Cancelled,

    /// Invalid bucket key.
    #[error("invalid bucket key: {0}")]
    InvalidBucketKey(String),

    /// Invalid Redis client connection count.
    #[error("invalid redis client connection count: {0}")]
    InvalidRedisClientConnectionCount(String),
}

impl LeakyBucketError {
    /// Whether this is the [`LeakyBucketError::BucketFull`] business outcome rather than a fault.
    pub fn is_full(&self) -> bool {
        matches!(self, Self::BucketFull(_))
    }

    /// The snapshot carried by a [`LeakyBucketError::BucketFull`] rejection.
    pub fn state(&self) -> Option<&BucketState> {
        match self {
            Self::BucketFull(state) => Some(state),
            _ => None,
        }
    }
}
