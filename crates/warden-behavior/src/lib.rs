//! # warden-behavior
//!
//! Behavioral anomaly tracking for the Warden request-defense pipeline.
//!
//! Keeps one rolling [`IdentityRecord`] per tracking key (client IP by
//! default) in an injected [`warden_store::KeyValueStore`] and scores each
//! identity across a fixed window: 404 storms, repeated auth failures, wide
//! path scans, and unusual probing verbs all feed a weighted anomaly score.
//! Crossing the block threshold rejects the identity until the block lapses
//! and fires exactly one [`BehaviorAlert`].
//!
//! Two tripwires bypass scoring entirely:
//!
//! - [`HoneypotRegistry`] - decoy paths (`/.env`, `/wp-admin`, ...) that
//!   block the prober while answering with a plausible 200
//! - [`CanaryFields`] - hidden form fields that only automated form
//!   stuffers fill in
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use warden_behavior::{BehaviorConfig, BehaviorDecision, BehaviorTracker};
//! use warden_store::MemoryStore;
//!
//! let tracker = BehaviorTracker::new(
//!     Arc::new(MemoryStore::new()),
//!     BehaviorConfig::default(),
//! );
//!
//! tracker.observe_request("ip:10.0.0.1", "/api/login", "POST").unwrap();
//! tracker.observe_response("ip:10.0.0.1", 401).unwrap();
//! assert_eq!(tracker.check("ip:10.0.0.1").unwrap(), BehaviorDecision::Allow);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod canary;
pub mod config;
pub mod error;
pub mod honeypot;
pub mod record;
pub mod tracker;

pub use canary::{CanaryFields, CanaryVerdict, DEFAULT_CANARY_FIELDS};
pub use config::{BehaviorConfig, UNUSUAL_METHODS};
pub use error::{BehaviorError, BehaviorResult};
pub use honeypot::{DecoyKind, DecoyResponse, HoneypotRegistry};
pub use record::IdentityRecord;
pub use tracker::{BehaviorAlert, BehaviorDecision, BehaviorTracker};
