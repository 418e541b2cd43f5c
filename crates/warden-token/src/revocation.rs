//! Revocation list over the injected store.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::debug;
use warden_store::KeyValueStore;

use crate::error::TokenResult;

/// Store key namespace for revoked token IDs.
const KEY_PREFIX: &str = "revoked:";

/// Tracks revoked jtis until their tokens would have expired anyway.
///
/// Entries carry a TTL matching the token's remaining lifetime, so the
/// list never grows past the set of still-live tokens and the store sweep
/// prunes it without help.
#[derive(Debug, Clone)]
pub struct RevocationStore {
    store: Arc<dyn KeyValueStore>,
}

impl RevocationStore {
    /// Create a revocation list over the given store.
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Revoke a token ID until its expiration.
    ///
    /// Revoking an already-expired token is a no-op.
    pub fn revoke(&self, jti: &str, expires_at: DateTime<Utc>) -> TokenResult<()> {
        let remaining_ms = expires_at
            .timestamp_millis()
            .saturating_sub(Utc::now().timestamp_millis());
        if remaining_ms <= 0 {
            return Ok(());
        }
        let ttl = Duration::from_millis(u64::try_from(remaining_ms).unwrap_or(0));
        self.store
            .set_with_ttl(&format!("{KEY_PREFIX}{jti}"), "1", ttl)?;
        debug!(jti, "token revoked");
        Ok(())
    }

    /// Whether a token ID has been revoked.
    pub fn is_revoked(&self, jti: &str) -> TokenResult<bool> {
        Ok(self.store.get(&format!("{KEY_PREFIX}{jti}"))?.is_some())
    }
}
