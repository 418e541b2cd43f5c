//! The key-value store abstraction shared by all pipeline components.

use std::time::{Duration, Instant};

use crate::error::StoreResult;

/// A stored value with its optional expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KvEntry {
    /// The stored value.
    pub value: String,
    /// When the entry expires (None = no expiry).
    pub expires_at: Option<Instant>,
}

impl KvEntry {
    /// Create an entry without an expiry.
    #[must_use]
    pub const fn permanent(value: String) -> Self {
        Self {
            value,
            expires_at: None,
        }
    }

    /// Create an entry that expires after `ttl`.
    #[must_use]
    pub fn with_ttl(value: String, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Some(Instant::now() + ttl),
        }
    }

    /// Check if this entry has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|exp| Instant::now() > exp)
    }

    /// Remaining lifetime (None if permanent or expired).
    #[must_use]
    pub fn remaining(&self) -> Option<Duration> {
        self.expires_at
            .and_then(|exp| exp.checked_duration_since(Instant::now()))
    }
}

/// Key-value interface every stateful pipeline component is injected with.
///
/// Implementations must make each method atomic with respect to concurrent
/// callers: `incr` and `compare_and_set` exist so components never perform
/// caller-side read-then-write cycles that could lose updates.
pub trait KeyValueStore: Send + Sync + std::fmt::Debug {
    /// Get the value for a key, if present and not expired.
    fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Set a key to a value with no expiry.
    fn set(&self, key: &str, value: &str) -> StoreResult<()>;

    /// Set a key to a value that expires after `ttl`.
    fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()>;

    /// Atomically increment the counter at `key`, creating it at 1.
    ///
    /// `ttl_on_create` applies only when the counter does not yet exist, so
    /// the first hit in a window fixes the window's expiry.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StoreError::NotCounter`] if the key holds a
    /// non-numeric value.
    fn incr(&self, key: &str, ttl_on_create: Option<Duration>) -> StoreResult<u64>;

    /// Reset the expiry of an existing key. Returns false if absent.
    fn expire(&self, key: &str, ttl: Duration) -> StoreResult<bool>;

    /// Delete a key. Returns true if it existed.
    fn delete(&self, key: &str) -> StoreResult<bool>;

    /// Atomically set `key` to `value` only if its current value equals
    /// `expected` (`None` = key must be absent). Returns true on success.
    fn compare_and_set(
        &self,
        key: &str,
        expected: Option<&str>,
        value: &str,
        ttl: Option<Duration>,
    ) -> StoreResult<bool>;

    /// Remove strictly-expired entries. Returns the number removed.
    fn purge_expired(&self) -> StoreResult<usize>;

    /// Number of live entries.
    fn len(&self) -> StoreResult<usize>;

    /// Whether the store holds no live entries.
    fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }
}
