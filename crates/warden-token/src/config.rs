//! Token service configuration.

use std::time::Duration;

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey};
use zeroize::Zeroizing;

use crate::error::{TokenError, TokenResult};

/// Minimum HMAC signing secret length in bytes.
pub const MIN_SECRET_LEN: usize = 32;

/// Default access token lifetime.
const DEFAULT_ACCESS_TTL: Duration = Duration::from_secs(15 * 60);

/// Default refresh token lifetime.
const DEFAULT_REFRESH_TTL: Duration = Duration::from_secs(7 * 24 * 3600);

/// Configuration for token signing and verification.
///
/// The signing secret is held zeroized-on-drop and never printed.
#[derive(Clone)]
pub struct TokenConfig {
    secret: Zeroizing<Vec<u8>>,
    issuer: String,
    audience: String,
    allowed_algorithms: Vec<Algorithm>,
    access_ttl: Duration,
    refresh_ttl: Duration,
    enforce_device_fingerprint: bool,
}

impl TokenConfig {
    /// Create a configuration signing with HS256.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Config`] if the secret is shorter than
    /// [`MIN_SECRET_LEN`] bytes. This is fatal at startup; the service
    /// must not run with a guessable secret.
    pub fn new(
        secret: impl AsRef<[u8]>,
        issuer: impl Into<String>,
        audience: impl Into<String>,
    ) -> TokenResult<Self> {
        let secret = secret.as_ref();
        if secret.len() < MIN_SECRET_LEN {
            return Err(TokenError::Config {
                reason: format!("signing secret must be at least {MIN_SECRET_LEN} bytes"),
            });
        }
        Ok(Self {
            secret: Zeroizing::new(secret.to_vec()),
            issuer: issuer.into(),
            audience: audience.into(),
            allowed_algorithms: vec![Algorithm::HS256],
            access_ttl: DEFAULT_ACCESS_TTL,
            refresh_ttl: DEFAULT_REFRESH_TTL,
            enforce_device_fingerprint: false,
        })
    }

    /// Override the access token lifetime.
    #[must_use]
    pub const fn with_access_ttl(mut self, ttl: Duration) -> Self {
        self.access_ttl = ttl;
        self
    }

    /// Override the refresh token lifetime.
    #[must_use]
    pub const fn with_refresh_ttl(mut self, ttl: Duration) -> Self {
        self.refresh_ttl = ttl;
        self
    }

    /// Reject fingerprint mismatches instead of logging them.
    #[must_use]
    pub const fn with_enforced_device_fingerprint(mut self, enforce: bool) -> Self {
        self.enforce_device_fingerprint = enforce;
        self
    }

    /// The issuer claim written and required.
    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// The audience claim written and required.
    #[must_use]
    pub fn audience(&self) -> &str {
        &self.audience
    }

    /// Algorithms accepted during verification.
    #[must_use]
    pub fn allowed_algorithms(&self) -> &[Algorithm] {
        &self.allowed_algorithms
    }

    /// Access token lifetime.
    #[must_use]
    pub const fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    /// Refresh token lifetime.
    #[must_use]
    pub const fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    /// Whether fingerprint mismatches fail verification.
    #[must_use]
    pub const fn enforce_device_fingerprint(&self) -> bool {
        self.enforce_device_fingerprint
    }

    pub(crate) fn encoding_key(&self) -> EncodingKey {
        EncodingKey::from_secret(&self.secret)
    }

    pub(crate) fn decoding_key(&self) -> DecodingKey {
        DecodingKey::from_secret(&self.secret)
    }
}

impl std::fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenConfig")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("allowed_algorithms", &self.allowed_algorithms)
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .field(
                "enforce_device_fingerprint",
                &self.enforce_device_fingerprint,
            )
            .field("secret", &"[REDACTED]")
            .finish()
    }
}
