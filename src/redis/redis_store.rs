use std::time::Duration;

use async_trait::async_trait;

use crate::{
    BucketKey, LeakyBucketError, Store, Ttl,
    redis::{RedisClient, RedisKeyGenerator},
};

/// Configuration for the Redis store.
///
/// # Requirements
///
/// - **Runtime:** Tokio or Smol (via `redis-tokio` or `redis-smol` features)
///
/// # Examples
///
/// ```ignore
/// use leakybucket::{BucketKey, redis::{RedisClient, RedisStoreOptions}};
///
/// let client = redis::Client::open("redis://127.0.0.1:6379/")?;
///
/// let options = RedisStoreOptions {
///     client: RedisClient::from_client(client, 4).await?,
///     prefix: Some(BucketKey::try_from("myapp")?), // Keys: myapp:<name>
/// };
/// ```
#[derive(Clone, Debug)]
pub struct RedisStoreOptions {
    /// Connection pool used for every command.
    pub client: RedisClient,

    /// Optional prefix for all Redis keys.
    ///
    /// If provided, bucket `name` is stored under `<prefix>:<name>`.
    /// If `None`, the bare name is the key, so processes that do not use this crate but
    /// agree on names share the same counters.
    pub prefix: Option<BucketKey>,
}

/// Redis implementation of the [`Store`] command contract.
///
/// | Command | Redis |
/// |---|---|
/// | `get_counter` | `GET` |
/// | `increment_by` | `INCRBY` |
/// | `set_expiry` | `PEXPIRE` |
/// | `get_ttl` | `PTTL` |
///
/// Each command is a single round trip and is atomic in Redis. No command is retried.
#[derive(Clone, Debug)]
pub struct RedisStore {
    client: RedisClient,
    key_generator: RedisKeyGenerator,
}

impl RedisStore {
    /// Create a store from `options`.
    pub fn new(options: RedisStoreOptions) -> Self {
        Self {
            client: options.client,
            key_generator: RedisKeyGenerator::new(options.prefix),
        }
    }

    /// The Redis key a bucket called `name` is stored under.
    pub fn key_for(&self, name: &str) -> String {
        self.key_generator.get_key(name)
    }
}

#[async_trait]
impl Store for RedisStore {
    async fn get_counter(&self, key: &str) -> Result<Option<u64>, LeakyBucketError> {
        let mut connection_manager = self.client.get();

        let count: Option<u64> = redis::cmd("GET")
            .arg(self.key_generator.get_key(key))
            .query_async(&mut connection_manager)
            .await?;

        Ok(count)
    }

    async fn increment_by(&self, key: &str, amount: u64) -> Result<u64, LeakyBucketError> {
        let mut connection_manager = self.client.get();

        let total: u64 = redis::cmd("INCRBY")
            .arg(self.key_generator.get_key(key))
            .arg(amount)
            .query_async(&mut connection_manager)
            .await?;

        Ok(total)
    }

    async fn set_expiry(&self, key: &str, ttl: Duration) -> Result<bool, LeakyBucketError> {
        let mut connection_manager = self.client.get();
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);

        let updated: bool = redis::cmd("PEXPIRE")
            .arg(self.key_generator.get_key(key))
            .arg(ttl_ms)
            .query_async(&mut connection_manager)
            .await?;

        Ok(updated)
    }

    async fn get_ttl(&self, key: &str) -> Result<Ttl, LeakyBucketError> {
        let mut connection_manager = self.client.get();

        let ttl_ms: i64 = redis::cmd("PTTL")
            .arg(self.key_generator.get_key(key))
            .query_async(&mut connection_manager)
            .await?;

        match ttl_ms {
            -2 => Ok(Ttl::Missing),
            -1 => Ok(Ttl::Persistent),
            ms if ms >= 0 => Ok(Ttl::Expires(Duration::from_millis(ms.unsigned_abs()))),
            other => Err(LeakyBucketError::UnexpectedReply(format!(
                "PTTL returned {other}"
            ))),
        }
    }
}
