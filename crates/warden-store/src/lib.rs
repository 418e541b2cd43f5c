//! # warden-store
//!
//! Shared identity store for the Warden request-defense pipeline.
//!
//! Every stateful component in the pipeline (behavioral tracker, rate
//! limiter, token revocation list) keeps its per-identity state behind the
//! [`KeyValueStore`] trait rather than in a global map, so the backing
//! implementation can be swapped without touching the components:
//!
//! - [`MemoryStore`] - process-local implementation with TTL support and
//!   atomic read-modify-write primitives
//! - [`FailoverStore`] - wraps an injected shared/remote implementation and
//!   degrades to a process-local fallback when the primary is unreachable
//! - [`Sweeper`] - background task that prunes strictly-expired entries,
//!   owned by the store lifecycle (started at init, stopped at shutdown)
//!
//! All read-modify-write operations (counter increments, compare-and-set)
//! happen inside the store under a single lock acquisition, so concurrent
//! requests touching the same key never lose updates.
//!
//! # Example
//!
//! ```rust
//! use warden_store::{KeyValueStore, MemoryStore};
//! use std::time::Duration;
//!
//! let store = MemoryStore::new();
//! store.set_with_ttl("ip:10.0.0.1", "1", Duration::from_secs(60)).unwrap();
//!
//! let count = store.incr("rl:login:10.0.0.1", Some(Duration::from_secs(60))).unwrap();
//! assert_eq!(count, 1);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod failover;
pub mod kv;
pub mod memory;
pub mod sweep;

pub use error::{StoreError, StoreResult};
pub use failover::FailoverStore;
pub use kv::{KeyValueStore, KvEntry};
pub use memory::MemoryStore;
pub use sweep::{Sweeper, SweeperHandle};

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_basic_store_flow() {
        let store = MemoryStore::new();

        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap(), Some("v".to_string()));

        assert!(store.delete("k").unwrap());
        assert_eq!(store.get("k").unwrap(), None);
    }

    #[test]
    fn test_counter_flow() {
        let store = MemoryStore::new();

        assert_eq!(store.incr("c", Some(Duration::from_secs(60))).unwrap(), 1);
        assert_eq!(store.incr("c", Some(Duration::from_secs(60))).unwrap(), 2);
        assert_eq!(store.incr("c", None).unwrap(), 3);
    }
}
