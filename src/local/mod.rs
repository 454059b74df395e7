//! In-process store.
//!
//! [`MemoryStore`] implements the same command contract as the Redis store, with state kept
//! inside the current process.
//!
//! # Key Characteristics
//!
//! - **Thread-safe:** Safe for concurrent use across multiple threads
//! - **Zero external dependencies:** No network or database required
//! - **Process-scoped:** Counters are not shared across processes and do not survive restarts
//!
//! # When to Use
//!
//! ✅ **Use the memory store when:**
//! - Single-process application
//! - Tests that need a deterministic store
//!
//! ❌ **Don't use the memory store when:**
//! - Multiple application instances need shared quotas
//! - Quotas must survive process restarts

mod memory_store;
pub use memory_store::*;
