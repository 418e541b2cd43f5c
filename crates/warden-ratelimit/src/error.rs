//! Error types for rate limiting.

use thiserror::Error;
use warden_store::StoreError;

/// Errors that can occur in the rate limiter.
#[derive(Debug, Error)]
pub enum RateLimitError {
    /// The backing store failed.
    #[error("rate-limit store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration error.
    #[error("rate-limit configuration error: {reason}")]
    Config {
        /// Why the configuration is invalid.
        reason: String,
    },
}

/// Result type for rate limiting.
pub type RateLimitResult<T> = Result<T, RateLimitError>;
