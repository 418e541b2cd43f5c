//! Failover wrapper around a shared primary store.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::{info, warn};

use crate::error::{StoreError, StoreResult};
use crate::kv::KeyValueStore;
use crate::memory::MemoryStore;

/// Wraps a shared (typically remote) primary store with a process-local
/// fallback.
///
/// When the primary reports [`StoreError::Unavailable`] the operation is
/// retried against an owned [`MemoryStore`] and the degradation is logged
/// once per transition: penalties and blocks recorded while degraded no
/// longer survive a restart, and that weakening must be visible in the
/// logs. All other errors pass through unchanged.
#[derive(Debug)]
pub struct FailoverStore<P: KeyValueStore> {
    primary: P,
    fallback: MemoryStore,
    degraded: AtomicBool,
}

impl<P: KeyValueStore> FailoverStore<P> {
    /// Wrap a primary store.
    #[must_use]
    pub fn new(primary: P) -> Self {
        Self {
            primary,
            fallback: MemoryStore::new(),
            degraded: AtomicBool::new(false),
        }
    }

    /// Whether the store is currently serving from the fallback.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::Relaxed)
    }

    fn run<T>(
        &self,
        primary_result: StoreResult<T>,
        fallback_op: impl FnOnce(&MemoryStore) -> StoreResult<T>,
    ) -> StoreResult<T> {
        match primary_result {
            Ok(value) => {
                if self.degraded.swap(false, Ordering::Relaxed) {
                    info!("primary store recovered, leaving degraded mode");
                }
                Ok(value)
            }
            Err(StoreError::Unavailable { reason }) => {
                if !self.degraded.swap(true, Ordering::Relaxed) {
                    warn!(
                        reason = %reason,
                        "primary store unavailable, degrading to process-local fallback"
                    );
                }
                fallback_op(&self.fallback)
            }
            Err(other) => Err(other),
        }
    }
}

impl<P: KeyValueStore> KeyValueStore for FailoverStore<P> {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        self.run(self.primary.get(key), |fb| fb.get(key))
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.run(self.primary.set(key, value), |fb| fb.set(key, value))
    }

    fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()> {
        self.run(self.primary.set_with_ttl(key, value, ttl), |fb| {
            fb.set_with_ttl(key, value, ttl)
        })
    }

    fn incr(&self, key: &str, ttl_on_create: Option<Duration>) -> StoreResult<u64> {
        self.run(self.primary.incr(key, ttl_on_create), |fb| {
            fb.incr(key, ttl_on_create)
        })
    }

    fn expire(&self, key: &str, ttl: Duration) -> StoreResult<bool> {
        self.run(self.primary.expire(key, ttl), |fb| fb.expire(key, ttl))
    }

    fn delete(&self, key: &str) -> StoreResult<bool> {
        self.run(self.primary.delete(key), |fb| fb.delete(key))
    }

    fn compare_and_set(
        &self,
        key: &str,
        expected: Option<&str>,
        value: &str,
        ttl: Option<Duration>,
    ) -> StoreResult<bool> {
        self.run(
            self.primary.compare_and_set(key, expected, value, ttl),
            |fb| fb.compare_and_set(key, expected, value, ttl),
        )
    }

    fn purge_expired(&self) -> StoreResult<usize> {
        // Sweep both sides; entries written while degraded live in the
        // fallback even after the primary recovers.
        let from_fallback = self.fallback.purge_expired()?;
        self.run(self.primary.purge_expired(), |_| Ok(0))
            .map(|from_primary| from_primary + from_fallback)
    }

    fn len(&self) -> StoreResult<usize> {
        self.run(self.primary.len(), |fb| fb.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    /// Primary stub whose availability can be toggled from a test.
    #[derive(Debug)]
    struct FlakyPrimary {
        inner: MemoryStore,
        up: Mutex<bool>,
    }

    impl FlakyPrimary {
        fn new() -> Self {
            Self {
                inner: MemoryStore::new(),
                up: Mutex::new(true),
            }
        }

        fn set_up(&self, up: bool) {
            *self.up.lock() = up;
        }

        fn check(&self) -> StoreResult<()> {
            if *self.up.lock() {
                Ok(())
            } else {
                Err(StoreError::Unavailable {
                    reason: "stub down".into(),
                })
            }
        }
    }

    impl KeyValueStore for FlakyPrimary {
        fn get(&self, key: &str) -> StoreResult<Option<String>> {
            self.check()?;
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> StoreResult<()> {
            self.check()?;
            self.inner.set(key, value)
        }

        fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()> {
            self.check()?;
            self.inner.set_with_ttl(key, value, ttl)
        }

        fn incr(&self, key: &str, ttl_on_create: Option<Duration>) -> StoreResult<u64> {
            self.check()?;
            self.inner.incr(key, ttl_on_create)
        }

        fn expire(&self, key: &str, ttl: Duration) -> StoreResult<bool> {
            self.check()?;
            self.inner.expire(key, ttl)
        }

        fn delete(&self, key: &str) -> StoreResult<bool> {
            self.check()?;
            self.inner.delete(key)
        }

        fn compare_and_set(
            &self,
            key: &str,
            expected: Option<&str>,
            value: &str,
            ttl: Option<Duration>,
        ) -> StoreResult<bool> {
            self.check()?;
            self.inner.compare_and_set(key, expected, value, ttl)
        }

        fn purge_expired(&self) -> StoreResult<usize> {
            self.check()?;
            self.inner.purge_expired()
        }

        fn len(&self) -> StoreResult<usize> {
            self.check()?;
            self.inner.len()
        }
    }

    #[test]
    fn test_uses_primary_when_healthy() {
        let store = FailoverStore::new(FlakyPrimary::new());
        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap(), Some("v".to_string()));
        assert!(!store.is_degraded());
    }

    #[test]
    fn test_degrades_to_fallback() {
        let store = FailoverStore::new(FlakyPrimary::new());
        store.primary.set_up(false);

        store.set("k", "v").unwrap();
        assert!(store.is_degraded());
        assert_eq!(store.get("k").unwrap(), Some("v".to_string()));
    }

    #[test]
    fn test_recovers_when_primary_returns() {
        let store = FailoverStore::new(FlakyPrimary::new());

        store.primary.set_up(false);
        store.set("k", "fallback-value").unwrap();
        assert!(store.is_degraded());

        store.primary.set_up(true);
        store.set("k2", "primary-value").unwrap();
        assert!(!store.is_degraded());
        assert_eq!(store.get("k2").unwrap(), Some("primary-value".to_string()));
    }

    #[test]
    fn test_counter_survives_in_fallback() {
        let store = FailoverStore::new(FlakyPrimary::new());
        store.primary.set_up(false);

        assert_eq!(store.incr("c", None).unwrap(), 1);
        assert_eq!(store.incr("c", None).unwrap(), 2);
    }

    #[test]
    fn test_non_availability_errors_pass_through() {
        let store = FailoverStore::new(FlakyPrimary::new());
        store.set("c", "text").unwrap();
        let result = store.incr("c", None);
        assert!(matches!(result, Err(StoreError::NotCounter { .. })));
        assert!(!store.is_degraded());
    }
}
