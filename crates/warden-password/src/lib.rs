//! # warden-password
//!
//! Migration-aware password hashing for the Warden request-defense
//! pipeline.
//!
//! New hashes are argon2id PHC strings. Verification also accepts the
//! legacy `sha256$<salt>$<hex>` format still present in older account
//! rows and reports `needs_rehash` so the caller can upgrade the stored
//! hash on the next successful login. The service is stateless; it never
//! touches storage itself.
//!
//! # Example
//!
//! ```rust
//! use warden_password::PasswordService;
//!
//! let service = PasswordService::default();
//! let stored = service.hash("hunter2").unwrap();
//!
//! let verification = service.verify("hunter2", &stored);
//! assert!(verification.valid);
//! assert!(!verification.needs_rehash);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod hasher;

pub use error::{PasswordError, PasswordResult};
pub use hasher::{PasswordConfig, PasswordService, Verification, legacy_hash};
