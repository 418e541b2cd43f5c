//! Error types for the token service.

use thiserror::Error;
use warden_store::StoreError;

/// Errors that can occur in the token service.
///
/// Verification failures are not errors; they are the
/// [`VerifyFailure`](crate::VerifyFailure) outcomes of a well-functioning
/// verifier. Only infrastructure problems surface here.
#[derive(Debug, Error)]
pub enum TokenError {
    /// Configuration error, fatal at startup.
    #[error("token configuration error: {reason}")]
    Config {
        /// Why the configuration is invalid.
        reason: String,
    },

    /// Token encoding failed.
    #[error("token issuance failed: {reason}")]
    Issue {
        /// Encoder error detail.
        reason: String,
    },

    /// The revocation store failed.
    #[error("revocation store error: {0}")]
    Store(#[from] StoreError),
}

/// Result type for the token service.
pub type TokenResult<T> = Result<T, TokenError>;
