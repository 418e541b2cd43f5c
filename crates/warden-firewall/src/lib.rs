//! # warden-firewall
//!
//! Threat-scoring firewall for the Warden request-defense pipeline.
//!
//! Three layers, applied in order by the pipeline:
//!
//! - [`pollution::sanitize`] - rebuilds the parsed body into a fresh tree
//!   with reserved prototype-pollution keys removed, before anything else
//!   reads the body
//! - [`normalize::normalize`] - bounded repeated percent-decoding plus
//!   Unicode canonicalization, defeating multi-layer encoding and homoglyph
//!   substitution that evade single-pass matching
//! - [`ThreatScorer`] - flattens the request into strings and classifies
//!   each against independent category pattern sets, producing a
//!   [`ScoreVerdict`] the pipeline resolves into block/warn/monitor
//!
//! # Example
//!
//! ```rust
//! use warden_firewall::{Disposition, ScanTarget, ThreatScorer};
//! use serde_json::json;
//!
//! let scorer = ThreatScorer::with_defaults();
//! let verdict = scorer.score(&ScanTarget {
//!     method: "POST".into(),
//!     raw_path: "/api/login".into(),
//!     body: json!({ "username": "admin", "password": "' OR '1'='1" }),
//!     ..ScanTarget::default()
//! });
//! assert!(verdict.total > 0);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod normalize;
pub mod patterns;
pub mod pollution;
pub mod scorer;

pub use config::{CategoryWeights, ScorerConfig};
pub use error::{FirewallError, FirewallResult};
pub use normalize::normalize;
pub use patterns::ThreatCategory;
pub use pollution::{Sanitized, sanitize};
pub use scorer::{Disposition, ScanTarget, ScoreVerdict, ThreatScorer, ThreatSignal};
