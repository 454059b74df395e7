//! Redis-backed store.
//!
//! [`RedisStore`] keeps bucket counters in Redis so every process pointed at the same server
//! enforces the same quotas.
//!
//! # Requirements
//!
//! - **Runtime:** Tokio or Smol (via `redis-tokio` or `redis-smol` features)
//!
//! # Consistency Semantics
//!
//! - **Atomic commands:** each command (`GET`, `INCRBY`, `PEXPIRE`, `PTTL`) is atomic in Redis
//! - **Non-atomic sequences:** a bucket's read-check-increment spans several commands
//! - **Concurrent overshoot:** multiple processes can be admitted past a bucket's capacity

mod redis_store;
pub use redis_store::*;

mod common;
pub use common::*;
