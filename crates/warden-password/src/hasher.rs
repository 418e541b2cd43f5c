//! Dual-format verification with rehash signaling.

use argon2::password_hash::SaltString;
use argon2::password_hash::rand_core::OsRng;
use argon2::{Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::error::{PasswordError, PasswordResult};

/// Prefix of modern argon2id PHC strings.
const MODERN_PREFIX: &str = "$argon2";

/// Prefix of the self-describing legacy format.
const LEGACY_PREFIX: &str = "sha256$";

/// Argon2id cost parameters for newly-written hashes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PasswordConfig {
    /// Memory cost in KiB.
    pub m_cost: u32,
    /// Iteration count.
    pub t_cost: u32,
    /// Parallelism degree.
    pub p_cost: u32,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            m_cost: Params::DEFAULT_M_COST,
            t_cost: Params::DEFAULT_T_COST,
            p_cost: Params::DEFAULT_P_COST,
        }
    }
}

/// What a stored hash said about a presented password.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verification {
    /// The password matched the stored hash.
    pub valid: bool,
    /// The stored hash should be replaced with a fresh modern one.
    ///
    /// Set for legacy matches and for modern matches whose stored cost
    /// parameters have drifted from the configured ones. The caller
    /// persists the rehash; this service is stateless.
    pub needs_rehash: bool,
}

impl Verification {
    const INVALID: Self = Self {
        valid: false,
        needs_rehash: false,
    };
}

/// Stateless dual-format password hasher.
///
/// Writes argon2id PHC strings; verifies both those and the legacy
/// `sha256$<salt>$<hex>` format still present in older account rows.
#[derive(Debug, Clone)]
pub struct PasswordService {
    config: PasswordConfig,
}

impl Default for PasswordService {
    fn default() -> Self {
        Self::new(PasswordConfig::default())
    }
}

impl PasswordService {
    /// Create a service hashing with the given costs.
    #[must_use]
    pub const fn new(config: PasswordConfig) -> Self {
        Self { config }
    }

    /// Hash a password into an argon2id PHC string.
    pub fn hash(&self, plaintext: &str) -> PasswordResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .hasher()?
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(|e| PasswordError::Hash {
                reason: e.to_string(),
            })?;
        Ok(hash.to_string())
    }

    /// Verify a password against a stored hash of either format.
    ///
    /// The stored prefix routes the verifier. Unknown or unreadable
    /// hashes verify as invalid rather than erroring, so one corrupt row
    /// cannot break a login path.
    #[must_use]
    pub fn verify(&self, plaintext: &str, stored: &str) -> Verification {
        if stored.starts_with(MODERN_PREFIX) {
            self.verify_modern(plaintext, stored)
        } else if stored.starts_with(LEGACY_PREFIX) {
            verify_legacy(plaintext, stored)
        } else {
            Verification::INVALID
        }
    }

    fn verify_modern(&self, plaintext: &str, stored: &str) -> Verification {
        let Ok(parsed) = PasswordHash::new(stored) else {
            return Verification::INVALID;
        };
        if Argon2::default()
            .verify_password(plaintext.as_bytes(), &parsed)
            .is_err()
        {
            return Verification::INVALID;
        }
        let drifted = Params::try_from(&parsed).map_or(true, |stored_params| {
            stored_params.m_cost() != self.config.m_cost
                || stored_params.t_cost() != self.config.t_cost
                || stored_params.p_cost() != self.config.p_cost
        });
        Verification {
            valid: true,
            needs_rehash: drifted,
        }
    }

    fn hasher(&self) -> PasswordResult<Argon2<'static>> {
        let params = Params::new(self.config.m_cost, self.config.t_cost, self.config.p_cost, None)
            .map_err(|e| PasswordError::Config {
                reason: e.to_string(),
            })?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }
}

/// Produce a legacy-format hash.
///
/// Only used to seed fixtures and migration tests; new hashes are always
/// argon2id.
#[must_use]
pub fn legacy_hash(plaintext: &str, salt: &str) -> String {
    format!("{LEGACY_PREFIX}{salt}${}", legacy_digest(plaintext, salt))
}

fn legacy_digest(plaintext: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(plaintext.as_bytes());
    hex_encode(&hasher.finalize())
}

fn verify_legacy(plaintext: &str, stored: &str) -> Verification {
    let mut parts = stored.splitn(3, '$');
    let (Some(_), Some(salt), Some(expected)) = (parts.next(), parts.next(), parts.next()) else {
        return Verification::INVALID;
    };
    let computed = legacy_digest(plaintext, salt);
    let matched = computed.len() == expected.len()
        && bool::from(computed.as_bytes().ct_eq(expected.as_bytes()));
    if matched {
        Verification {
            valid: true,
            needs_rehash: true,
        }
    } else {
        Verification::INVALID
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    use std::fmt::Write;
    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut out, b| {
        let _ = write!(out, "{b:02x}");
        out
    })
}
