//! Error types for the firewall.

use thiserror::Error;

/// Errors that can occur in firewall operations.
#[derive(Debug, Error)]
pub enum FirewallError {
    /// Configuration error.
    #[error("firewall configuration error: {reason}")]
    Config {
        /// Why the configuration is invalid.
        reason: String,
    },
}

/// Result type for firewall operations.
pub type FirewallResult<T> = Result<T, FirewallError>;
