//! # warden-token
//!
//! Session token lifecycle for the Warden request-defense pipeline.
//!
//! [`TokenService`] issues short-lived access and long-lived refresh JWTs
//! and verifies them with a hardened, fixed-order check sequence: the
//! algorithm allowlist is consulted from the raw header before any
//! cryptographic work, then signature and registered claims, then token
//! type, revocation, and constant-time device binding. Failure reasons
//! form the closed [`VerifyFailure`] set so callers never leak verifier
//! internals to clients.
//!
//! Revoked jtis live in the injected [`warden_store::KeyValueStore`] with
//! a TTL matching the token's remaining lifetime.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use warden_store::MemoryStore;
//! use warden_token::{TokenConfig, TokenService, TokenType};
//!
//! let config = TokenConfig::new(
//!     b"0123456789abcdef0123456789abcdef",
//!     "warden",
//!     "warden-api",
//! ).unwrap();
//! let service = TokenService::new(config, Arc::new(MemoryStore::new()));
//!
//! let token = service
//!     .issue("user-7", "a@b.example", "customer", TokenType::Access, None)
//!     .unwrap();
//! let outcome = service.verify(&token, TokenType::Access, None).unwrap();
//! assert!(outcome.claims().is_some());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod claims;
pub mod config;
pub mod error;
pub mod revocation;
pub mod service;

pub use claims::{TokenClaims, TokenType, device_fingerprint};
pub use config::{MIN_SECRET_LEN, TokenConfig};
pub use error::{TokenError, TokenResult};
pub use revocation::RevocationStore;
pub use service::{LogoutOutcome, TokenService, VerifyFailure, VerifyOutcome};
