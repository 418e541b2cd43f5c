//! # warden-ratelimit
//!
//! Adaptive rate limiting for the Warden request-defense pipeline.
//!
//! Each protected [`RouteClass`] counts requests in a fixed window, keyed by
//! a per-class [`KeyStrategy`] (client IP, authenticated subject, or an
//! IP + user-agent fingerprint). Exceeding a window accumulates violations
//! in a longer rolling window; crossing the violation threshold puts the
//! key in the penalty box, where every identity facet of the request is
//! rejected before any route window is consulted.
//!
//! All counters live in the injected [`warden_store::KeyValueStore`] and
//! are advanced with its atomic increment, so concurrent requests never
//! lose counts and limits are shared when the store is shared.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use warden_ratelimit::{
//!     KeyStrategy, RateDecision, RateLimitConfig, RateLimiter, RequestKeys, RouteClass,
//! };
//! use warden_store::MemoryStore;
//!
//! let limiter = RateLimiter::new(Arc::new(MemoryStore::new()), RateLimitConfig::default());
//! let login = RouteClass::new("login", 5, Duration::from_secs(60))
//!     .with_strategy(KeyStrategy::ByFingerprint);
//!
//! let keys = RequestKeys::anonymous("10.0.0.1", Some("curl/8.0".into()));
//! assert!(matches!(
//!     limiter.check(&keys, &login).unwrap(),
//!     RateDecision::Allow { .. }
//! ));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod key;
pub mod limiter;

pub use config::{RateLimitConfig, RouteClass, validate_route_classes};
pub use error::{RateLimitError, RateLimitResult};
pub use key::{KeyStrategy, RequestKeys, fingerprint};
pub use limiter::{LimitReport, RateDecision, RateLimiter, ViolationRecord};
