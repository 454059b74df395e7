use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use redis::{Client, aio::ConnectionManager};

use crate::{BucketKey, LeakyBucketError};

/// A wrapper for a vector of [`redis::aio::ConnectionManager`]s.
///
/// Connections are handed out round-robin. The client is constructed explicitly by the caller
/// and shared by cloning; clones reuse the same managers.
pub struct RedisClient {
    connection_managers: Arc<Vec<ConnectionManager>>,
    track_index: AtomicUsize,
}

impl RedisClient {
    /// Create a new [`RedisClient`] with a single [`redis::aio::ConnectionManager`].
    pub async fn default_from_client(client: Client) -> Result<Self, LeakyBucketError> {
        Self::from_client(client, 1).await
    }

    /// Create a new [`RedisClient`] with `connection_count` [`redis::aio::ConnectionManager`]s.
    pub async fn from_client(
        client: Client,
        connection_count: usize,
    ) -> Result<Self, LeakyBucketError> {
        if connection_count == 0 {
            return Err(Self::empty_pool_error());
        }

        let mut connection_managers = Vec::with_capacity(connection_count);

        for _ in 0..connection_count {
            connection_managers.push(client.get_connection_manager().await?);
        }

        Self::from_connection_managers(connection_managers)
    }

    /// Wrap connection managers that were already established.
    pub fn from_connection_managers(
        connection_managers: Vec<ConnectionManager>,
    ) -> Result<Self, LeakyBucketError> {
        if connection_managers.is_empty() {
            return Err(Self::empty_pool_error());
        }

        Ok(Self {
            connection_managers: Arc::new(connection_managers),
            track_index: AtomicUsize::new(0),
        })
    }

    fn empty_pool_error() -> LeakyBucketError {
        LeakyBucketError::InvalidRedisClientConnectionCount(
            "connection count must be > 0".to_string(),
        )
    }

    /// Get a [`redis::aio::ConnectionManager`] from the client.
    pub(crate) fn get(&self) -> ConnectionManager {
        let index = self.track_index.fetch_add(1, Ordering::Relaxed);
        self.connection_managers[index % self.connection_managers.len()].clone()
    } // end method get
} // end impl RedisClient

impl std::fmt::Debug for RedisClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisClient")
            .field("connection_count", &self.connection_managers.len())
            .finish_non_exhaustive()
    }
}

impl Clone for RedisClient {
    fn clone(&self) -> Self {
        Self {
            connection_managers: self.connection_managers.clone(),
            track_index: AtomicUsize::new(0),
        }
    }
}

/// Maps bucket names to Redis keys.
///
/// With a prefix the key is `<prefix>:<name>`; without one the bare name is used.
#[derive(Clone, Debug)]
pub(crate) struct RedisKeyGenerator {
    prefix: Option<BucketKey>,
}

impl RedisKeyGenerator {
    pub(crate) fn new(prefix: Option<BucketKey>) -> Self {
        Self { prefix }
    }

    pub(crate) fn get_key(&self, name: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{prefix}:{name}"),
            None => name.to_string(),
        }
    }
}
