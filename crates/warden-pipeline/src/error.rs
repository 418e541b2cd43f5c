//! Error types for the pipeline.

use thiserror::Error;

/// Errors that can occur while running the pipeline.
///
/// Request rejections are decisions, not errors; only configuration and
/// infrastructure problems surface here.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Configuration error, fatal at startup.
    #[error("pipeline configuration error: {reason}")]
    Config {
        /// Why the configuration is invalid.
        reason: String,
    },

    /// The firewall component failed.
    #[error(transparent)]
    Firewall(#[from] warden_firewall::FirewallError),

    /// The behavioral tracker failed.
    #[error(transparent)]
    Behavior(#[from] warden_behavior::BehaviorError),

    /// The rate limiter failed.
    #[error(transparent)]
    RateLimit(#[from] warden_ratelimit::RateLimitError),

    /// The token service failed.
    #[error(transparent)]
    Token(#[from] warden_token::TokenError),

    /// A notification channel failed.
    #[error("notification failed on {channel}: {reason}")]
    Notify {
        /// The channel that failed.
        channel: String,
        /// Failure detail.
        reason: String,
    },
}

/// Result type for the pipeline.
pub type PipelineResult<T> = Result<T, PipelineError>;
