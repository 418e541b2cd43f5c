//! Token claims.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Whether a token grants access or only refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    /// Short-lived token presented on every authenticated request.
    Access,
    /// Long-lived token exchanged for fresh access tokens.
    Refresh,
}

impl std::fmt::Display for TokenType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Access => write!(f, "access"),
            Self::Refresh => write!(f, "refresh"),
        }
    }
}

/// Claims carried by every issued token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject (user ID).
    pub sub: String,
    /// Account email.
    pub email: String,
    /// Account role.
    pub role: String,
    /// Access or refresh.
    pub token_type: TokenType,
    /// Unique token ID, the unit of revocation.
    pub jti: String,
    /// Issuer.
    pub iss: String,
    /// Audience.
    pub aud: String,
    /// Issued at (Unix seconds).
    pub iat: i64,
    /// Expiration (Unix seconds).
    pub exp: i64,
    /// Device binding, if the client presented one at issuance.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_fingerprint: Option<String>,
}

impl TokenClaims {
    /// Whether the token is past its expiration.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() > self.exp
    }
}

/// Stable device hash bound into tokens at issuance.
///
/// Derived from headers the same client sends on every request, so a
/// stolen token replayed from different tooling stands out.
#[must_use]
pub fn device_fingerprint(user_agent: &str, accept_language: &str) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(user_agent.as_bytes());
    hasher.update(b"\n");
    hasher.update(accept_language.as_bytes());
    hasher.finalize().to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_type_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&TokenType::Access).unwrap(),
            "\"access\""
        );
        assert_eq!(
            serde_json::to_string(&TokenType::Refresh).unwrap(),
            "\"refresh\""
        );
    }

    #[test]
    fn test_device_fingerprint_is_stable() {
        let a = device_fingerprint("Mozilla/5.0", "en-US");
        let b = device_fingerprint("Mozilla/5.0", "en-US");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_device_fingerprint_varies() {
        let base = device_fingerprint("Mozilla/5.0", "en-US");
        assert_ne!(base, device_fingerprint("curl/8.0", "en-US"));
        assert_ne!(base, device_fingerprint("Mozilla/5.0", "fr-FR"));
    }

    #[test]
    fn test_claims_round_trip() {
        let claims = TokenClaims {
            sub: "user-7".into(),
            email: "a@b.example".into(),
            role: "customer".into(),
            token_type: TokenType::Access,
            jti: "jti-1".into(),
            iss: "warden".into(),
            aud: "warden-api".into(),
            iat: 1_700_000_000,
            exp: 1_700_000_900,
            device_fingerprint: None,
        };
        let json = serde_json::to_string(&claims).unwrap();
        assert!(!json.contains("device_fingerprint"));
        let back: TokenClaims = serde_json::from_str(&json).unwrap();
        assert_eq!(back.token_type, TokenType::Access);
        assert_eq!(back.jti, "jti-1");
    }
}
