//! Fixed-window limiting with an escalating penalty box.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, warn};
use warden_store::KeyValueStore;

use crate::config::{RateLimitConfig, RouteClass};
use crate::error::RateLimitResult;
use crate::key::RequestKeys;

/// Store key namespaces.
const COUNTER_PREFIX: &str = "rl:";
const VIOLATION_PREFIX: &str = "rlv:";
const PENALTY_PREFIX: &str = "rlp:";

/// Escalation state for one derived key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViolationRecord {
    /// The derived key.
    pub key: String,
    /// Violations in the current rolling window.
    pub count: u64,
    /// When the active penalty lapses (Unix millis), if penalized.
    pub penalty_until: Option<i64>,
}

/// Details of a rate-limit rejection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LimitReport {
    /// The derived key that exceeded its window.
    pub key: String,
    /// Violations accumulated by that key in the rolling violation window.
    pub violations: u64,
    /// Whether this rejection pushed the key into the penalty box.
    pub penalised: bool,
    /// Suggested wait before retrying.
    pub retry_after: Duration,
}

/// Outcome of a rate-limit check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateDecision {
    /// Within quota.
    Allow {
        /// Requests left in the current window.
        remaining: u64,
    },
    /// The route window was exceeded.
    Limited(LimitReport),
    /// A candidate key is serving a penalty.
    Penalised {
        /// Time until the penalty lapses.
        retry_after: Duration,
    },
}

/// Per-key fixed-window limiter with violation escalation.
///
/// Counters, violations, and penalties all live in the injected store so
/// limits are shared when the store is shared. The penalty box is checked
/// against every identity facet of the request before the route window is
/// consulted, so a penalized client cannot slip through on a quieter route
/// or by switching between anonymous and authenticated traffic.
#[derive(Debug)]
pub struct RateLimiter {
    store: Arc<dyn KeyValueStore>,
    config: RateLimitConfig,
}

impl RateLimiter {
    /// Create a limiter over the given store.
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>, config: RateLimitConfig) -> Self {
        Self { store, config }
    }

    /// The active escalation settings.
    #[must_use]
    pub const fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Check one request against a route class.
    ///
    /// Consumes one slot of the window when allowed.
    pub fn check(&self, keys: &RequestKeys, route: &RouteClass) -> RateLimitResult<RateDecision> {
        if let Some(retry_after) = self.active_penalty(keys)? {
            return Ok(RateDecision::Penalised { retry_after });
        }

        let derived = keys.derive(route.strategy);
        let counter_key = format!("{COUNTER_PREFIX}{}:{derived}", route.name);
        let count = self.store.incr(&counter_key, Some(route.window))?;

        if count <= route.max_requests {
            return Ok(RateDecision::Allow {
                remaining: route.max_requests - count,
            });
        }

        debug!(key = %derived, class = %route.name, count, "route window exceeded");
        let report = self.record_violation(&derived, route)?;
        Ok(RateDecision::Limited(report))
    }

    /// Remaining penalty across all candidate keys, if any.
    fn active_penalty(&self, keys: &RequestKeys) -> RateLimitResult<Option<Duration>> {
        let now_ms = Utc::now().timestamp_millis();
        for candidate in keys.candidates() {
            let penalty_key = format!("{PENALTY_PREFIX}{candidate}");
            let Some(raw) = self.store.get(&penalty_key)? else {
                continue;
            };
            match raw.parse::<i64>() {
                Ok(until_ms) if until_ms > now_ms => {
                    let remaining = u64::try_from(until_ms - now_ms).unwrap_or(0);
                    return Ok(Some(Duration::from_millis(remaining)));
                }
                Ok(_) => {}
                Err(_) => {
                    self.store.delete(&penalty_key)?;
                }
            }
        }
        Ok(None)
    }

    /// Current escalation state for a derived key.
    pub fn violation_record(&self, derived: &str) -> RateLimitResult<ViolationRecord> {
        let count = self
            .store
            .get(&format!("{VIOLATION_PREFIX}{derived}"))?
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(0);
        let penalty_until = self
            .store
            .get(&format!("{PENALTY_PREFIX}{derived}"))?
            .and_then(|raw| raw.parse().ok());
        Ok(ViolationRecord {
            key: derived.to_string(),
            count,
            penalty_until,
        })
    }

    fn record_violation(&self, derived: &str, route: &RouteClass) -> RateLimitResult<LimitReport> {
        let violation_key = format!("{VIOLATION_PREFIX}{derived}");
        let violations = self
            .store
            .incr(&violation_key, Some(self.config.violation_window))?;

        let mut penalised = false;
        if violations >= self.config.violation_threshold {
            let penalty_key = format!("{PENALTY_PREFIX}{derived}");
            // A live penalty is never extended or re-announced
            if self.store.get(&penalty_key)?.is_none() {
                let until_ms = Utc::now().timestamp_millis().saturating_add(
                    i64::try_from(self.config.penalty_duration.as_millis()).unwrap_or(i64::MAX),
                );
                self.store.set_with_ttl(
                    &penalty_key,
                    &until_ms.to_string(),
                    self.config.penalty_duration,
                )?;
                penalised = true;
                warn!(key = %derived, violations, "key entered the penalty box");
            }
        }

        Ok(LimitReport {
            key: derived.to_string(),
            violations,
            penalised,
            retry_after: route.window,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::KeyStrategy;
    use warden_store::MemoryStore;

    fn limiter() -> RateLimiter {
        RateLimiter::new(Arc::new(MemoryStore::new()), RateLimitConfig::default())
    }

    fn keys(ip: &str) -> RequestKeys {
        RequestKeys::anonymous(ip, Some("curl/8.0".into()))
    }

    // ==================== Window Counting ====================

    #[test]
    fn test_allows_up_to_quota() {
        let l = limiter();
        let route = RouteClass::new("api", 3, Duration::from_secs(60));
        let k = keys("10.0.0.1");

        for remaining in [2, 1, 0] {
            assert_eq!(
                l.check(&k, &route).unwrap(),
                RateDecision::Allow { remaining }
            );
        }
        assert!(matches!(
            l.check(&k, &route).unwrap(),
            RateDecision::Limited(_)
        ));
    }

    #[test]
    fn test_keys_count_independently() {
        let l = limiter();
        let route = RouteClass::new("api", 1, Duration::from_secs(60));

        l.check(&keys("10.0.0.1"), &route).unwrap();
        assert!(matches!(
            l.check(&keys("10.0.0.1"), &route).unwrap(),
            RateDecision::Limited(_)
        ));
        // A different IP still has its full window
        assert!(matches!(
            l.check(&keys("10.0.0.2"), &route).unwrap(),
            RateDecision::Allow { .. }
        ));
    }

    #[test]
    fn test_route_classes_count_independently() {
        let l = limiter();
        let strict = RouteClass::new("login", 1, Duration::from_secs(60));
        let loose = RouteClass::new("api", 100, Duration::from_secs(60));
        let k = keys("10.0.0.1");

        l.check(&k, &strict).unwrap();
        assert!(matches!(
            l.check(&k, &strict).unwrap(),
            RateDecision::Limited(_)
        ));
        assert!(matches!(
            l.check(&k, &loose).unwrap(),
            RateDecision::Allow { .. }
        ));
    }

    #[test]
    fn test_window_expiry_restores_quota() {
        let l = limiter();
        let route = RouteClass::new("api", 1, Duration::from_millis(20));
        let k = keys("10.0.0.1");

        l.check(&k, &route).unwrap();
        assert!(matches!(
            l.check(&k, &route).unwrap(),
            RateDecision::Limited(_)
        ));
        std::thread::sleep(Duration::from_millis(40));
        assert!(matches!(
            l.check(&k, &route).unwrap(),
            RateDecision::Allow { .. }
        ));
    }

    // ==================== Violation Escalation ====================

    #[test]
    fn test_sixth_violation_triggers_penalty() {
        let config = RateLimitConfig {
            violation_threshold: 5,
            ..RateLimitConfig::default()
        };
        let l = RateLimiter::new(Arc::new(MemoryStore::new()), config);
        let route = RouteClass::new("login", 1, Duration::from_secs(60))
            .with_strategy(KeyStrategy::ByFingerprint);
        let k = keys("10.0.0.1");

        // First attempt consumes the window
        assert!(matches!(
            l.check(&k, &route).unwrap(),
            RateDecision::Allow { .. }
        ));

        // Five more attempts accumulate violations 1..=5
        for expected in 1..=5u64 {
            let RateDecision::Limited(report) = l.check(&k, &route).unwrap() else {
                panic!("expected limited");
            };
            assert_eq!(report.violations, expected);
            assert_eq!(report.penalised, expected == 5);
        }
    }

    #[test]
    fn test_penalty_rejects_unrelated_route() {
        let config = RateLimitConfig {
            violation_threshold: 1,
            ..RateLimitConfig::default()
        };
        let l = RateLimiter::new(Arc::new(MemoryStore::new()), config);
        let strict = RouteClass::new("login", 1, Duration::from_secs(60));
        let unrelated = RouteClass::new("api", 100, Duration::from_secs(60));
        let k = keys("10.0.0.1");

        l.check(&k, &strict).unwrap();
        let RateDecision::Limited(report) = l.check(&k, &strict).unwrap() else {
            panic!("expected limited");
        };
        assert!(report.penalised);

        // Unrelated route with plenty of quota still rejects
        let decision = l.check(&k, &unrelated).unwrap();
        let RateDecision::Penalised { retry_after } = decision else {
            panic!("expected penalised, got {decision:?}");
        };
        assert!(retry_after > Duration::ZERO);
    }

    #[test]
    fn test_penalty_not_reannounced_while_active() {
        let config = RateLimitConfig {
            violation_threshold: 1,
            ..RateLimitConfig::default()
        };
        let l = RateLimiter::new(Arc::new(MemoryStore::new()), config);
        let route = RouteClass::new("login", 1, Duration::from_secs(60));

        // Penalize via the IP strategy, then drain the window again under a
        // key that is not itself penalized
        let k = keys("10.0.0.1");
        l.check(&k, &route).unwrap();
        let RateDecision::Limited(first) = l.check(&k, &route).unwrap() else {
            panic!("expected limited");
        };
        assert!(first.penalised);

        // Subsequent checks hit the penalty box, not a second announcement
        assert!(matches!(
            l.check(&k, &route).unwrap(),
            RateDecision::Penalised { .. }
        ));
    }

    #[test]
    fn test_penalty_expires() {
        let config = RateLimitConfig {
            violation_threshold: 1,
            penalty_duration: Duration::from_millis(30),
            ..RateLimitConfig::default()
        };
        let l = RateLimiter::new(Arc::new(MemoryStore::new()), config);
        let route = RouteClass::new("login", 1, Duration::from_millis(20));
        let k = keys("10.0.0.1");

        l.check(&k, &route).unwrap();
        assert!(matches!(
            l.check(&k, &route).unwrap(),
            RateDecision::Limited(_)
        ));
        assert!(matches!(
            l.check(&k, &route).unwrap(),
            RateDecision::Penalised { .. }
        ));

        std::thread::sleep(Duration::from_millis(60));
        assert!(matches!(
            l.check(&k, &route).unwrap(),
            RateDecision::Allow { .. }
        ));
    }

    #[test]
    fn test_violation_record_reflects_state() {
        let config = RateLimitConfig {
            violation_threshold: 2,
            ..RateLimitConfig::default()
        };
        let l = RateLimiter::new(Arc::new(MemoryStore::new()), config);
        let route = RouteClass::new("login", 1, Duration::from_secs(60));
        let k = keys("10.0.0.1");

        assert_eq!(l.violation_record("ip:10.0.0.1").unwrap().count, 0);

        l.check(&k, &route).unwrap();
        l.check(&k, &route).unwrap();
        l.check(&k, &route).unwrap();

        let record = l.violation_record("ip:10.0.0.1").unwrap();
        assert_eq!(record.count, 2);
        assert!(record.penalty_until.is_some());
    }

    // ==================== Candidate Coverage ====================

    #[test]
    fn test_subject_cannot_dodge_ip_penalty() {
        let config = RateLimitConfig {
            violation_threshold: 1,
            ..RateLimitConfig::default()
        };
        let l = RateLimiter::new(Arc::new(MemoryStore::new()), config);
        let route = RouteClass::new("login", 1, Duration::from_secs(60));

        let anon = keys("10.0.0.1");
        l.check(&anon, &route).unwrap();
        l.check(&anon, &route).unwrap(); // penalized under ip:10.0.0.1

        // Authenticating from the same IP does not escape the box
        let authed = keys("10.0.0.1").with_subject("user-7");
        assert!(matches!(
            l.check(&authed, &route).unwrap(),
            RateDecision::Penalised { .. }
        ));
    }
}
