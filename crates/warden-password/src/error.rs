//! Error types for password hashing.

use thiserror::Error;

/// Errors that can occur while hashing.
///
/// Verification never errors; unreadable or unknown stored hashes verify
/// as invalid instead.
#[derive(Debug, Error)]
pub enum PasswordError {
    /// Configuration error.
    #[error("password configuration error: {reason}")]
    Config {
        /// Why the configuration is invalid.
        reason: String,
    },

    /// The hasher itself failed.
    #[error("password hashing failed: {reason}")]
    Hash {
        /// Hasher error detail.
        reason: String,
    },
}

/// Result type for password hashing.
pub type PasswordResult<T> = Result<T, PasswordError>;
