//! Process-local store implementation.

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::RwLock;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::kv::{KeyValueStore, KvEntry};

/// In-process key-value store with TTL support.
///
/// All mutating operations take the write lock exactly once, so increments
/// and compare-and-set calls are atomic with respect to concurrent requests
/// hitting the same key. Expired entries are treated as absent on read and
/// removed either lazily on access or by [`purge_expired`].
///
/// [`purge_expired`]: KeyValueStore::purge_expired
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, KvEntry>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        // Fast path under the read lock; expired entries are left for the
        // sweep rather than upgraded to a write here.
        let entries = self.entries.read();
        Ok(entries
            .get(key)
            .filter(|entry| !entry.is_expired())
            .map(|entry| entry.value.clone()))
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.entries
            .write()
            .insert(key.to_string(), KvEntry::permanent(value.to_string()));
        Ok(())
    }

    fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()> {
        self.entries
            .write()
            .insert(key.to_string(), KvEntry::with_ttl(value.to_string(), ttl));
        Ok(())
    }

    fn incr(&self, key: &str, ttl_on_create: Option<Duration>) -> StoreResult<u64> {
        let mut entries = self.entries.write();

        match entries.get_mut(key).filter(|entry| !entry.is_expired()) {
            Some(entry) => {
                let current: u64 =
                    entry
                        .value
                        .parse()
                        .map_err(|_| StoreError::NotCounter {
                            key: key.to_string(),
                        })?;
                let next = current.saturating_add(1);
                entry.value = next.to_string();
                Ok(next)
            }
            None => {
                let entry = match ttl_on_create {
                    Some(ttl) => KvEntry::with_ttl("1".to_string(), ttl),
                    None => KvEntry::permanent("1".to_string()),
                };
                entries.insert(key.to_string(), entry);
                Ok(1)
            }
        }
    }

    fn expire(&self, key: &str, ttl: Duration) -> StoreResult<bool> {
        let mut entries = self.entries.write();
        match entries.get_mut(key).filter(|entry| !entry.is_expired()) {
            Some(entry) => {
                entry.expires_at = Some(std::time::Instant::now() + ttl);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn delete(&self, key: &str) -> StoreResult<bool> {
        Ok(self.entries.write().remove(key).is_some())
    }

    fn compare_and_set(
        &self,
        key: &str,
        expected: Option<&str>,
        value: &str,
        ttl: Option<Duration>,
    ) -> StoreResult<bool> {
        let mut entries = self.entries.write();

        let current = entries.get(key).filter(|entry| !entry.is_expired());
        let matches = match (current, expected) {
            (Some(entry), Some(want)) => entry.value == want,
            (None, None) => true,
            _ => false,
        };

        if matches {
            let entry = match ttl {
                Some(ttl) => KvEntry::with_ttl(value.to_string(), ttl),
                None => KvEntry::permanent(value.to_string()),
            };
            entries.insert(key.to_string(), entry);
        }
        Ok(matches)
    }

    fn purge_expired(&self) -> StoreResult<usize> {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired());
        let removed = before - entries.len();
        if removed > 0 {
            debug!(removed, "purged expired store entries");
        }
        Ok(removed)
    }

    fn len(&self) -> StoreResult<usize> {
        let entries = self.entries.read();
        Ok(entries.values().filter(|entry| !entry.is_expired()).count())
    }
}
