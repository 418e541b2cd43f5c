//! Token issuance and hardened verification.

use std::sync::Arc;

use chrono::Utc;
use jsonwebtoken::{Header, Validation, decode, decode_header, encode};
use subtle::ConstantTimeEq;
use tracing::{debug, warn};
use uuid::Uuid;
use warden_store::KeyValueStore;

use crate::claims::{TokenClaims, TokenType};
use crate::config::TokenConfig;
use crate::error::{TokenError, TokenResult};
use crate::revocation::RevocationStore;

/// Why a token failed verification.
///
/// A closed set; callers map these to responses without ever echoing the
/// verifier's internals to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyFailure {
    /// The header named an algorithm outside the allowlist.
    AlgorithmNotAllowed,
    /// The token is valid but of the wrong type for this use.
    TypeMismatch,
    /// The token's jti has been revoked.
    Revoked,
    /// The token is past its expiration.
    Expired,
    /// The signature did not verify.
    InvalidSignature,
    /// The device fingerprint did not match under enforcement.
    FingerprintMismatch,
    /// Any other malformation or claim failure.
    VerificationFailed,
}

impl VerifyFailure {
    /// Stable machine-readable name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AlgorithmNotAllowed => "algorithm_not_allowed",
            Self::TypeMismatch => "type_mismatch",
            Self::Revoked => "revoked",
            Self::Expired => "expired",
            Self::InvalidSignature => "invalid_signature",
            Self::FingerprintMismatch => "fingerprint_mismatch",
            Self::VerificationFailed => "verification_failed",
        }
    }
}

impl std::fmt::Display for VerifyFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of verifying one token.
#[derive(Debug, Clone)]
pub enum VerifyOutcome {
    /// The token passed every check.
    Valid(Box<TokenClaims>),
    /// The token was rejected.
    Failed(VerifyFailure),
}

impl VerifyOutcome {
    /// The claims, if the token was valid.
    #[must_use]
    pub fn claims(&self) -> Option<&TokenClaims> {
        match self {
            Self::Valid(claims) => Some(claims),
            Self::Failed(_) => None,
        }
    }

    /// The failure, if the token was rejected.
    #[must_use]
    pub const fn failure(&self) -> Option<VerifyFailure> {
        match self {
            Self::Valid(_) => None,
            Self::Failed(failure) => Some(*failure),
        }
    }
}

/// Outcome of a logout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogoutOutcome {
    /// Always true; the client must drop its stored tokens.
    pub clear_client_state: bool,
}

/// Issues, verifies, and revokes session tokens.
#[derive(Debug)]
pub struct TokenService {
    config: TokenConfig,
    revocation: RevocationStore,
}

impl TokenService {
    /// Create a service over the given revocation store backing.
    #[must_use]
    pub fn new(config: TokenConfig, store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            config,
            revocation: RevocationStore::new(store),
        }
    }

    /// The active configuration.
    #[must_use]
    pub const fn config(&self) -> &TokenConfig {
        &self.config
    }

    /// Issue a signed token with a fresh jti.
    pub fn issue(
        &self,
        subject: &str,
        email: &str,
        role: &str,
        token_type: TokenType,
        device_fingerprint: Option<String>,
    ) -> TokenResult<String> {
        let now = Utc::now();
        let ttl = match token_type {
            TokenType::Access => self.config.access_ttl(),
            TokenType::Refresh => self.config.refresh_ttl(),
        };
        let claims = TokenClaims {
            sub: subject.to_string(),
            email: email.to_string(),
            role: role.to_string(),
            token_type,
            jti: Uuid::new_v4().to_string(),
            iss: self.config.issuer().to_string(),
            aud: self.config.audience().to_string(),
            iat: now.timestamp(),
            exp: (now + chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::zero()))
                .timestamp(),
            device_fingerprint,
        };
        encode(&Header::default(), &claims, &self.config.encoding_key()).map_err(|e| {
            TokenError::Issue {
                reason: e.to_string(),
            }
        })
    }

    /// Verify a token for one use.
    ///
    /// Checks run in a fixed order: algorithm allowlist before any
    /// cryptographic work, then signature and registered claims, then
    /// type, revocation, and device binding.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Store`] only when the revocation store is
    /// unreachable; every token problem is a [`VerifyOutcome::Failed`].
    pub fn verify(
        &self,
        token: &str,
        expected_type: TokenType,
        device_context: Option<&str>,
    ) -> TokenResult<VerifyOutcome> {
        let Ok(header) = decode_header(token) else {
            return Ok(VerifyOutcome::Failed(VerifyFailure::VerificationFailed));
        };
        if !self.config.allowed_algorithms().contains(&header.alg) {
            warn!(alg = ?header.alg, "token presented with disallowed algorithm");
            return Ok(VerifyOutcome::Failed(VerifyFailure::AlgorithmNotAllowed));
        }

        let mut validation = Validation::default();
        validation.algorithms = self.config.allowed_algorithms().to_vec();
        validation.set_issuer(&[self.config.issuer()]);
        validation.set_audience(&[self.config.audience()]);
        validation.set_required_spec_claims(&["exp", "iat", "sub", "aud", "iss"]);

        let claims = match decode::<TokenClaims>(token, &self.config.decoding_key(), &validation) {
            Ok(data) => data.claims,
            Err(e) => {
                let failure = match e.kind() {
                    jsonwebtoken::errors::ErrorKind::ExpiredSignature => VerifyFailure::Expired,
                    jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                        VerifyFailure::InvalidSignature
                    }
                    _ => VerifyFailure::VerificationFailed,
                };
                return Ok(VerifyOutcome::Failed(failure));
            }
        };

        if claims.token_type != expected_type {
            return Ok(VerifyOutcome::Failed(VerifyFailure::TypeMismatch));
        }

        if self.revocation.is_revoked(&claims.jti)? {
            debug!(jti = %claims.jti, "revoked token presented");
            return Ok(VerifyOutcome::Failed(VerifyFailure::Revoked));
        }

        if let Some(bound) = &claims.device_fingerprint {
            let matches = device_context.is_some_and(|ctx| constant_time_eq(bound, ctx));
            if !matches {
                if self.config.enforce_device_fingerprint() {
                    return Ok(VerifyOutcome::Failed(VerifyFailure::FingerprintMismatch));
                }
                warn!(
                    sub = %claims.sub,
                    jti = %claims.jti,
                    "device fingerprint mismatch on otherwise valid token"
                );
            }
        }

        Ok(VerifyOutcome::Valid(Box::new(claims)))
    }

    /// Revoke a single token ID until the given expiration.
    pub fn revoke(&self, jti: &str, expires_at: chrono::DateTime<Utc>) -> TokenResult<()> {
        self.revocation.revoke(jti, expires_at)
    }

    /// Revoke both halves of a session.
    ///
    /// Revocations are held for the refresh lifetime, the longest either
    /// token could still be live.
    pub fn logout(&self, access_jti: &str, refresh_jti: &str) -> TokenResult<LogoutOutcome> {
        let until = Utc::now()
            + chrono::Duration::from_std(self.config.refresh_ttl())
                .unwrap_or_else(|_| chrono::Duration::days(7));
        self.revocation.revoke(access_jti, until)?;
        self.revocation.revoke(refresh_jti, until)?;
        Ok(LogoutOutcome {
            clear_client_state: true,
        })
    }
}

/// Length-guarded constant-time string comparison.
fn constant_time_eq(a: &str, b: &str) -> bool {
    a.len() == b.len() && bool::from(a.as_bytes().ct_eq(b.as_bytes()))
}
