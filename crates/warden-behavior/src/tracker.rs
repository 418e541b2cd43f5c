//! Rolling per-identity anomaly tracking.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};
use warden_store::KeyValueStore;

use crate::config::{BehaviorConfig, UNUSUAL_METHODS};
use crate::error::BehaviorResult;
use crate::record::IdentityRecord;

/// Store key namespace for identity records.
const KEY_PREFIX: &str = "behavior:";

/// Compare-and-set attempts before falling back to an unconditional write.
const CAS_RETRIES: usize = 4;

/// Outcome of a pre-handler block check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BehaviorDecision {
    /// The identity is not blocked.
    Allow,
    /// The identity is behaviorally blocked.
    Blocked {
        /// Time until the block lapses.
        retry_after: Duration,
    },
}

/// A reportable behavioral event.
///
/// Threshold crossings fire exactly one of these; honeypot hits fire one
/// per hit.
#[derive(Debug, Clone)]
pub struct BehaviorAlert {
    /// The tracking key involved.
    pub key: String,
    /// The anomaly score after the triggering update.
    pub score: u32,
}

/// What one record update produced.
struct MutateOutcome {
    score: u32,
    newly_blocked: bool,
}

impl MutateOutcome {
    fn crossing_alert(&self, key: &str) -> Option<BehaviorAlert> {
        self.newly_blocked.then(|| BehaviorAlert {
            key: key.to_string(),
            score: self.score,
        })
    }
}

/// Tracks one [`IdentityRecord`] per key over a rolling window.
///
/// All state lives in the injected store; every update is a single
/// read-modify-write via compare-and-set so concurrent requests from the
/// same identity never lose counts.
#[derive(Debug)]
pub struct BehaviorTracker {
    store: Arc<dyn KeyValueStore>,
    config: BehaviorConfig,
}

impl BehaviorTracker {
    /// Create a tracker over the given store.
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>, config: BehaviorConfig) -> Self {
        Self { store, config }
    }

    /// The active configuration.
    #[must_use]
    pub const fn config(&self) -> &BehaviorConfig {
        &self.config
    }

    /// Check whether an identity is currently blocked.
    pub fn check(&self, key: &str) -> BehaviorResult<BehaviorDecision> {
        let now = Utc::now();
        match self.load(key)? {
            Some((_, record)) if record.is_blocked_at(now) => {
                let remaining_ms = record
                    .blocked_until
                    .unwrap_or(0)
                    .saturating_sub(now.timestamp_millis());
                Ok(BehaviorDecision::Blocked {
                    retry_after: Duration::from_millis(
                        u64::try_from(remaining_ms).unwrap_or(0),
                    ),
                })
            }
            _ => Ok(BehaviorDecision::Allow),
        }
    }

    /// Record an inbound request for an identity.
    ///
    /// Adds the path to the distinct-path set and counts unusual verbs.
    /// Returns an alert if this update crossed the block threshold.
    pub fn observe_request(
        &self,
        key: &str,
        path: &str,
        method: &str,
    ) -> BehaviorResult<Option<BehaviorAlert>> {
        let path = path.to_string();
        let unusual = UNUSUAL_METHODS
            .iter()
            .any(|m| method.eq_ignore_ascii_case(m));

        let outcome = self.mutate(key, |record| {
            record.paths_seen.insert(path.clone());
            if unusual {
                record.unusual_method_count += 1;
            }
        })?;
        Ok(outcome.crossing_alert(key))
    }

    /// Record the final response status for an identity.
    ///
    /// This is the post-handler completion hook: 404s and 401s feed the
    /// anomaly score once the real outcome is known.
    pub fn observe_response(&self, key: &str, status: u16) -> BehaviorResult<Option<BehaviorAlert>> {
        let outcome = match status {
            404 => self.mutate(key, |record| record.count_404 += 1)?,
            401 => self.mutate(key, |record| record.count_auth_fail += 1)?,
            _ => return Ok(None),
        };
        Ok(outcome.crossing_alert(key))
    }

    /// Block an identity outright after a honeypot hit.
    ///
    /// Saturates the 404 component and sets the sticky block, bypassing
    /// normal scoring. Every hit returns an alert; decoy paths have no
    /// legitimate traffic, so repeat probes are each worth reporting.
    pub fn trip_honeypot(&self, key: &str) -> BehaviorResult<BehaviorAlert> {
        let cap = self.config.count_404_cap;
        let outcome = self.mutate_forcing_block(key, move |record| {
            record.count_404 = record.count_404.max(cap);
        })?;
        Ok(BehaviorAlert {
            key: key.to_string(),
            score: outcome.score,
        })
    }

    fn store_key(key: &str) -> String {
        format!("{KEY_PREFIX}{key}")
    }

    fn load(&self, key: &str) -> BehaviorResult<Option<(String, IdentityRecord)>> {
        let store_key = Self::store_key(key);
        match self.store.get(&store_key)? {
            Some(raw) => match serde_json::from_str::<IdentityRecord>(&raw) {
                Ok(record) => Ok(Some((raw, record))),
                Err(error) => {
                    // A corrupt record is dropped rather than wedging the
                    // identity forever.
                    warn!(key, error = %error, "dropping undecodable identity record");
                    self.store.delete(&store_key)?;
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }

    fn mutate(
        &self,
        key: &str,
        apply: impl Fn(&mut IdentityRecord),
    ) -> BehaviorResult<MutateOutcome> {
        self.mutate_inner(key, apply, false)
    }

    fn mutate_forcing_block(
        &self,
        key: &str,
        apply: impl Fn(&mut IdentityRecord),
    ) -> BehaviorResult<MutateOutcome> {
        self.mutate_inner(key, apply, true)
    }

    fn mutate_inner(
        &self,
        key: &str,
        apply: impl Fn(&mut IdentityRecord),
        force_block: bool,
    ) -> BehaviorResult<MutateOutcome> {
        let store_key = Self::store_key(key);
        let ttl = self.config.record_ttl();

        for _ in 0..CAS_RETRIES {
            let now = Utc::now();
            let loaded = self.load(key)?;
            let expected = loaded.as_ref().map(|(raw, _)| raw.clone());

            let (record, outcome) =
                self.step(key, now, loaded.map(|(_, r)| r), &apply, force_block);
            let serialized = serde_json::to_string(&record)
                .map_err(|e| warden_store::StoreError::Internal(e.to_string()))?;

            if self
                .store
                .compare_and_set(&store_key, expected.as_deref(), &serialized, Some(ttl))?
            {
                if outcome.newly_blocked {
                    debug!(
                        key,
                        score = outcome.score,
                        "identity crossed behavioral block threshold"
                    );
                }
                return Ok(outcome);
            }
        }

        // Contention exhausted the retries; accept a best-effort write so
        // the request path never spins. The full update step still runs,
        // so a crossing on this write blocks and alerts like any other.
        warn!(key, "behavior record contention, writing without compare-and-set");
        let now = Utc::now();
        let loaded = self.load(key)?.map(|(_, r)| r);
        let (record, outcome) = self.step(key, now, loaded, &apply, force_block);
        let serialized = serde_json::to_string(&record)
            .map_err(|e| warden_store::StoreError::Internal(e.to_string()))?;
        self.store.set_with_ttl(&store_key, &serialized, ttl)?;
        if outcome.newly_blocked {
            debug!(
                key,
                score = outcome.score,
                "identity crossed behavioral block threshold"
            );
        }
        Ok(outcome)
    }

    /// One record update: window reset, observation, block transition.
    fn step(
        &self,
        key: &str,
        now: DateTime<Utc>,
        loaded: Option<IdentityRecord>,
        apply: &impl Fn(&mut IdentityRecord),
        force_block: bool,
    ) -> (IdentityRecord, MutateOutcome) {
        // A lapsed block or a stale idle window opens fresh state; an
        // active block is sticky and never reset.
        let mut record = match loaded {
            Some(record) if record.is_blocked_at(now) => record,
            Some(record) if record.blocked || record.is_stale_at(now, &self.config) => {
                IdentityRecord::new(key, now)
            }
            Some(record) => record,
            None => IdentityRecord::new(key, now),
        };

        let was_blocked = record.is_blocked_at(now);
        apply(&mut record);
        record.last_touch = now.timestamp_millis();

        let score = record.anomaly_score(&self.config);
        if !record.blocked && (force_block || score >= self.config.block_score) {
            record.block(&self.config);
        }
        let newly_blocked = !was_blocked && record.is_blocked_at(now);

        (record, MutateOutcome { score, newly_blocked })
    }
}
