//! Rate limiter configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{RateLimitError, RateLimitResult};
use crate::key::KeyStrategy;

/// Window and quota for one class of protected routes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteClass {
    /// Stable name, used in counter keys.
    pub name: String,
    /// Requests allowed per window per derived key.
    pub max_requests: u64,
    /// Fixed window length.
    #[serde(with = "duration_secs")]
    pub window: Duration,
    /// How the counting key is derived.
    pub strategy: KeyStrategy,
}

impl RouteClass {
    /// A route class with the given quota, counting by IP.
    #[must_use]
    pub fn new(name: impl Into<String>, max_requests: u64, window: Duration) -> Self {
        Self {
            name: name.into(),
            max_requests,
            window,
            strategy: KeyStrategy::ByIp,
        }
    }

    /// Override the key strategy.
    #[must_use]
    pub fn with_strategy(mut self, strategy: KeyStrategy) -> Self {
        self.strategy = strategy;
        self
    }
}

/// Escalation settings shared across route classes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Window violations before the key lands in the penalty box.
    pub violation_threshold: u64,
    /// Rolling window over which violations accumulate.
    #[serde(with = "duration_secs")]
    pub violation_window: Duration,
    /// How long a penalized key stays rejected.
    #[serde(with = "duration_secs")]
    pub penalty_duration: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            violation_threshold: 5,
            violation_window: Duration::from_secs(3600),
            penalty_duration: Duration::from_secs(1800),
        }
    }
}

impl RateLimitConfig {
    /// Validate escalation settings.
    ///
    /// # Errors
    ///
    /// Returns [`RateLimitError::Config`] on zero thresholds or windows.
    pub fn validate(&self) -> RateLimitResult<()> {
        if self.violation_threshold == 0 {
            return Err(RateLimitError::Config {
                reason: "violation threshold must be non-zero".into(),
            });
        }
        if self.violation_window.is_zero() || self.penalty_duration.is_zero() {
            return Err(RateLimitError::Config {
                reason: "violation window and penalty duration must be non-zero".into(),
            });
        }
        Ok(())
    }
}

/// Validate a set of route classes.
///
/// # Errors
///
/// Returns [`RateLimitError::Config`] on empty names, duplicate names,
/// zero quotas, or zero windows.
pub fn validate_route_classes(classes: &[RouteClass]) -> RateLimitResult<()> {
    let mut seen = std::collections::HashSet::new();
    for class in classes {
        if class.name.is_empty() {
            return Err(RateLimitError::Config {
                reason: "route class name must be non-empty".into(),
            });
        }
        if !seen.insert(class.name.as_str()) {
            return Err(RateLimitError::Config {
                reason: format!("duplicate route class name: {}", class.name),
            });
        }
        if class.max_requests == 0 || class.window.is_zero() {
            return Err(RateLimitError::Config {
                reason: format!("route class {} must allow at least one request", class.name),
            });
        }
    }
    Ok(())
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
