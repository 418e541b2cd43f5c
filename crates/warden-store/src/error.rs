//! Error types for store operations.

use thiserror::Error;

/// Errors that can occur in store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store is unreachable.
    #[error("store unavailable: {reason}")]
    Unavailable {
        /// Why the store could not be reached.
        reason: String,
    },

    /// An increment was attempted on a key holding a non-numeric value.
    #[error("key {key} does not hold a counter value")]
    NotCounter {
        /// The offending key.
        key: String,
    },

    /// Internal error.
    #[error("internal store error: {0}")]
    Internal(String),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
