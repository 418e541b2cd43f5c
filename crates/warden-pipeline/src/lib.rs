//! # warden-pipeline
//!
//! The assembled Warden request-defense pipeline.
//!
//! [`Pipeline`] mounts ahead of application routes and consumes a
//! normalized [`RequestView`] per request, running the defense stages in
//! a fixed order: prototype-pollution guard, penalty box and per-route
//! rate window, pattern threat scorer, honeypot decoys, behavioral block
//! and update, canary fields. The first stage to decide produces an early
//! [`PipelineDecision`]; otherwise the request passes through with its
//! sanitized body and threat verdict attached. After the business handler
//! runs, [`Pipeline::complete`] feeds the final status back into the
//! behavioral window.
//!
//! Security alerts fan out through the [`Notifier`] trait fire-and-forget;
//! channel failures never reach the request path.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use warden_pipeline::{Pipeline, PipelineConfig, PipelineDecision, RequestView};
//! use warden_store::MemoryStore;
//!
//! let pipeline = Pipeline::new(
//!     PipelineConfig::default(),
//!     Arc::new(MemoryStore::new()),
//! ).unwrap();
//!
//! let view = RequestView {
//!     method: "GET".into(),
//!     path: "/api/bookings".into(),
//!     raw_path: "/api/bookings".into(),
//!     client_ip: "10.0.0.1".into(),
//!     ..RequestView::default()
//! };
//! assert!(matches!(
//!     pipeline.check(&view).unwrap(),
//!     PipelineDecision::Pass { .. }
//! ));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod alert;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod reputation;
pub mod request;

pub use alert::{AlertDispatcher, AlertEvent, LogNotifier, Notifier, WebhookNotifier};
pub use config::PipelineConfig;
pub use error::{PipelineError, PipelineResult};
pub use pipeline::{AuthOutcome, Pipeline, PipelineDecision};
pub use reputation::{Reputation, ReputationClient, ReputationConfig};
pub use request::{HEADER_ALLOWLIST, RejectCode, RejectionBody, RequestView};
