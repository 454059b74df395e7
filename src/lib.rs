#![doc = include_str!("../README.md")]
#![deny(missing_docs)]
#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod bucket;
pub use bucket::*;

mod cancellation;
pub use cancellation::*;

pub mod local;

#[cfg(any(feature = "redis-tokio", feature = "redis-smol"))]
#[cfg_attr(docsrs, doc(cfg(any(feature = "redis-tokio", feature = "redis-smol"))))]
pub mod redis;

#[cfg(any(feature = "redis-tokio", feature = "redis-smol"))]
mod runtime;

mod error;
pub use error::*;

mod common;
pub use common::{BucketKey, BucketState, WindowDuration};

mod store;
pub use store::{Store, Ttl};

#[cfg(test)]
mod tests;
