//! Error types for behavioral tracking.

use thiserror::Error;
use warden_store::StoreError;

/// Errors that can occur in behavioral tracking.
#[derive(Debug, Error)]
pub enum BehaviorError {
    /// The identity store failed.
    #[error("identity store error: {0}")]
    Store(#[from] StoreError),

    /// A stored record could not be decoded.
    #[error("corrupt identity record for {key}: {reason}")]
    CorruptRecord {
        /// The tracking key whose record is corrupt.
        key: String,
        /// Decoder error detail.
        reason: String,
    },

    /// Configuration error.
    #[error("behavior configuration error: {reason}")]
    Config {
        /// Why the configuration is invalid.
        reason: String,
    },
}

/// Result type for behavioral tracking.
pub type BehaviorResult<T> = Result<T, BehaviorError>;
