//! Per-identity rolling state.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::BehaviorConfig;

/// Rolling anomaly state for one tracking key.
///
/// Stored serialized in the identity store; all timestamps are wall-clock
/// millis so records survive handoff through a shared store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityRecord {
    /// The tracking key (client IP by default).
    pub key: String,
    /// When the current window opened (Unix millis).
    pub window_start: i64,
    /// 404 responses observed in the window.
    pub count_404: u32,
    /// 401 responses observed in the window.
    pub count_auth_fail: u32,
    /// Distinct paths requested in the window.
    pub paths_seen: HashSet<String>,
    /// Requests using unusual probing verbs.
    pub unusual_method_count: u32,
    /// Sticky block flag for the window.
    pub blocked: bool,
    /// When the block lapses (Unix millis), if blocked.
    pub blocked_until: Option<i64>,
    /// Last activity (Unix millis); staleness gates window resets.
    pub last_touch: i64,
}

impl IdentityRecord {
    /// Create a fresh record opening a window at `now`.
    #[must_use]
    pub fn new(key: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            key: key.into(),
            window_start: now.timestamp_millis(),
            count_404: 0,
            count_auth_fail: 0,
            paths_seen: HashSet::new(),
            unusual_method_count: 0,
            blocked: false,
            blocked_until: None,
            last_touch: now.timestamp_millis(),
        }
    }

    /// Weighted, individually-capped anomaly score.
    ///
    /// Each capped component contributes its weight proportionally up to
    /// saturation; unusual-verb hits contribute fixed points without a cap.
    #[must_use]
    pub fn anomaly_score(&self, config: &BehaviorConfig) -> u32 {
        let capped = |count: u32, cap: u32, weight: u32| count.min(cap) * weight / cap;

        capped(self.count_404, config.count_404_cap, config.count_404_weight)
            + capped(
                self.count_auth_fail,
                config.auth_fail_cap,
                config.auth_fail_weight,
            )
            + capped(
                u32::try_from(self.paths_seen.len()).unwrap_or(u32::MAX),
                config.paths_cap,
                config.paths_weight,
            )
            + self.unusual_method_count * config.unusual_method_points
    }

    /// Whether the record's block is active at `now`.
    #[must_use]
    pub fn is_blocked_at(&self, now: DateTime<Utc>) -> bool {
        self.blocked
            && self
                .blocked_until
                .is_some_and(|until| now.timestamp_millis() < until)
    }

    /// Whether the window is stale at `now` (no touch for a full window).
    #[must_use]
    pub fn is_stale_at(&self, now: DateTime<Utc>, config: &BehaviorConfig) -> bool {
        let idle_ms = now.timestamp_millis().saturating_sub(self.last_touch);
        idle_ms > i64::try_from(config.window.as_millis()).unwrap_or(i64::MAX)
    }

    /// Mark the record blocked for the remainder of its window plus the
    /// configured block duration.
    pub fn block(&mut self, config: &BehaviorConfig) {
        self.blocked = true;
        let window_ms = i64::try_from(config.window.as_millis()).unwrap_or(i64::MAX);
        let block_ms = i64::try_from(config.block_duration.as_millis()).unwrap_or(i64::MAX);
        self.blocked_until = Some(
            self.window_start
                .saturating_add(window_ms)
                .saturating_add(block_ms),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> BehaviorConfig {
        BehaviorConfig::default()
    }

    #[test]
    fn test_new_record_scores_zero() {
        let record = IdentityRecord::new("ip:1.2.3.4", Utc::now());
        assert_eq!(record.anomaly_score(&config()), 0);
        assert!(!record.is_blocked_at(Utc::now()));
    }

    #[test]
    fn test_components_cap_individually() {
        let mut record = IdentityRecord::new("k", Utc::now());
        record.count_404 = 1000;
        record.count_auth_fail = 1000;
        for i in 0..1000 {
            record.paths_seen.insert(format!("/p{i}"));
        }
        // All three capped components saturated: 40 + 30 + 20
        assert_eq!(record.anomaly_score(&config()), 90);
    }

    #[test]
    fn test_partial_components_scale() {
        let cfg = config();
        let mut record = IdentityRecord::new("k", Utc::now());
        record.count_404 = cfg.count_404_cap / 2;
        assert_eq!(record.anomaly_score(&cfg), cfg.count_404_weight / 2);
    }

    #[test]
    fn test_unusual_methods_uncapped() {
        let cfg = config();
        let mut record = IdentityRecord::new("k", Utc::now());
        record.unusual_method_count = 50;
        assert_eq!(
            record.anomaly_score(&cfg),
            50 * cfg.unusual_method_points
        );
    }

    #[test]
    fn test_block_covers_window_remainder_plus_duration() {
        let cfg = config();
        let now = Utc::now();
        let mut record = IdentityRecord::new("k", now);
        record.block(&cfg);

        assert!(record.is_blocked_at(now));
        // Still blocked at window end + half the block duration
        let later = now
            + chrono::Duration::from_std(cfg.window).unwrap()
            + chrono::Duration::from_std(cfg.block_duration / 2).unwrap();
        assert!(record.is_blocked_at(later));
        // Lapsed after window + full block duration
        let lapsed = now
            + chrono::Duration::from_std(cfg.window).unwrap()
            + chrono::Duration::from_std(cfg.block_duration).unwrap()
            + chrono::Duration::seconds(1);
        assert!(!record.is_blocked_at(lapsed));
    }

    #[test]
    fn test_staleness_requires_full_window() {
        let cfg = config();
        let now = Utc::now();
        let record = IdentityRecord::new("k", now);

        let half = now + chrono::Duration::from_std(cfg.window / 2).unwrap();
        assert!(!record.is_stale_at(half, &cfg));

        let past = now
            + chrono::Duration::from_std(cfg.window).unwrap()
            + chrono::Duration::seconds(1);
        assert!(record.is_stale_at(past, &cfg));
    }

    #[test]
    fn test_record_round_trips_through_serde() {
        let mut record = IdentityRecord::new("ip:1.2.3.4", Utc::now());
        record.paths_seen.insert("/a".into());
        record.count_404 = 3;

        let json = serde_json::to_string(&record).unwrap();
        let back: IdentityRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back.key, record.key);
        assert_eq!(back.count_404, 3);
        assert!(back.paths_seen.contains("/a"));
    }
}
