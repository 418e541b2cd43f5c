//! Behavioral tracker configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{BehaviorError, BehaviorResult};

/// Methods counted as unusual probing verbs.
pub const UNUSUAL_METHODS: &[&str] = &["TRACE", "TRACK", "DEBUG", "CONNECT"];

/// Configuration for the behavioral tracker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BehaviorConfig {
    /// Rolling observation window.
    #[serde(with = "duration_secs")]
    pub window: Duration,
    /// How long a block lasts beyond the end of its window.
    #[serde(with = "duration_secs")]
    pub block_duration: Duration,
    /// Anomaly score at or above which the identity is blocked.
    pub block_score: u32,
    /// 404 count at which that component saturates.
    pub count_404_cap: u32,
    /// Weight of a saturated 404 component.
    pub count_404_weight: u32,
    /// Auth-failure count at which that component saturates.
    pub auth_fail_cap: u32,
    /// Weight of a saturated auth-failure component.
    pub auth_fail_weight: u32,
    /// Distinct-path count at which that component saturates.
    pub paths_cap: u32,
    /// Weight of a saturated distinct-path component.
    pub paths_weight: u32,
    /// Points added per unusual-verb hit (uncapped).
    pub unusual_method_points: u32,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(600),
            block_duration: Duration::from_secs(900),
            block_score: 80,
            count_404_cap: 10,
            count_404_weight: 40,
            auth_fail_cap: 10,
            auth_fail_weight: 30,
            paths_cap: 40,
            paths_weight: 20,
            unusual_method_points: 5,
        }
    }
}

impl BehaviorConfig {
    /// Validate window and cap settings.
    ///
    /// # Errors
    ///
    /// Returns [`BehaviorError::Config`] on zero windows or caps.
    pub fn validate(&self) -> BehaviorResult<()> {
        if self.window.is_zero() {
            return Err(BehaviorError::Config {
                reason: "observation window must be non-zero".into(),
            });
        }
        if self.block_duration.is_zero() {
            return Err(BehaviorError::Config {
                reason: "block duration must be non-zero".into(),
            });
        }
        if self.count_404_cap == 0 || self.auth_fail_cap == 0 || self.paths_cap == 0 {
            return Err(BehaviorError::Config {
                reason: "component caps must be non-zero".into(),
            });
        }
        if self.block_score == 0 {
            return Err(BehaviorError::Config {
                reason: "block score must be non-zero".into(),
            });
        }
        Ok(())
    }

    /// How long an idle record stays before the sweep may delete it.
    #[must_use]
    pub fn record_ttl(&self) -> Duration {
        self.window + self.block_duration
    }
}

mod duration_secs {
    use super::Duration;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(d)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(BehaviorConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_window_rejected() {
        let config = BehaviorConfig {
            window: Duration::ZERO,
            ..BehaviorConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_cap_rejected() {
        let config = BehaviorConfig {
            paths_cap: 0,
            ..BehaviorConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_record_ttl_covers_window_and_block() {
        let config = BehaviorConfig::default();
        assert_eq!(config.record_ttl(), config.window + config.block_duration);
    }

    #[test]
    fn test_config_round_trips_through_serde() {
        let config = BehaviorConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: BehaviorConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.window, config.window);
        assert_eq!(back.block_score, config.block_score);
    }
}
