//! Key derivation strategies.

use serde::{Deserialize, Serialize};

/// How the counting key is derived for a route class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyStrategy {
    /// Count per client IP.
    ByIp,
    /// Count per authenticated subject, falling back to IP when anonymous.
    BySubjectOrIp,
    /// Count per stable hash of IP and user-agent.
    ByFingerprint,
}

/// The identity facets of one request that keys can be derived from.
#[derive(Debug, Clone)]
pub struct RequestKeys {
    /// Client IP, always present.
    pub ip: String,
    /// User-agent header, if sent.
    pub user_agent: Option<String>,
    /// Authenticated subject, if the request carries a verified token.
    pub subject: Option<String>,
}

impl RequestKeys {
    /// Keys for an anonymous request.
    #[must_use]
    pub fn anonymous(ip: impl Into<String>, user_agent: Option<String>) -> Self {
        Self {
            ip: ip.into(),
            user_agent,
            subject: None,
        }
    }

    /// Attach the authenticated subject.
    #[must_use]
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Stable hash of IP and user-agent.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        fingerprint(&self.ip, self.user_agent.as_deref().unwrap_or(""))
    }

    /// Derive the counting key for one strategy.
    #[must_use]
    pub fn derive(&self, strategy: KeyStrategy) -> String {
        match strategy {
            KeyStrategy::ByIp => format!("ip:{}", self.ip),
            KeyStrategy::BySubjectOrIp => self.subject.as_ref().map_or_else(
                || format!("ip:{}", self.ip),
                |subject| format!("sub:{subject}"),
            ),
            KeyStrategy::ByFingerprint => format!("fp:{}", self.fingerprint()),
        }
    }

    /// Every key this request could be penalized under.
    ///
    /// The penalty box is checked against all of these so a prober cannot
    /// dodge an IP penalty by authenticating, or vice versa.
    #[must_use]
    pub fn candidates(&self) -> Vec<String> {
        let mut keys = vec![
            format!("ip:{}", self.ip),
            format!("fp:{}", self.fingerprint()),
        ];
        if let Some(subject) = &self.subject {
            keys.push(format!("sub:{subject}"));
        }
        keys
    }
}

/// Hex digest binding an IP to its user-agent.
#[must_use]
pub fn fingerprint(ip: &str, user_agent: &str) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(ip.as_bytes());
    hasher.update(b"\n");
    hasher.update(user_agent.as_bytes());
    hasher.finalize().to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_fingerprint_is_stable() {
        let a = fingerprint("10.0.0.1", "curl/8.0");
        let b = fingerprint("10.0.0.1", "curl/8.0");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_fingerprint_varies_with_either_input() {
        let base = fingerprint("10.0.0.1", "curl/8.0");
        assert_ne!(base, fingerprint("10.0.0.2", "curl/8.0"));
        assert_ne!(base, fingerprint("10.0.0.1", "curl/8.1"));
    }

    #[test_case(KeyStrategy::ByIp, None, "ip:10.0.0.1"; "by ip")]
    #[test_case(KeyStrategy::BySubjectOrIp, None, "ip:10.0.0.1"; "subject falls back to ip")]
    #[test_case(KeyStrategy::BySubjectOrIp, Some("user-7"), "sub:user-7"; "subject preferred")]
    fn test_derive(strategy: KeyStrategy, subject: Option<&str>, expected: &str) {
        let mut keys = RequestKeys::anonymous("10.0.0.1", Some("curl/8.0".into()));
        if let Some(subject) = subject {
            keys = keys.with_subject(subject);
        }
        assert_eq!(keys.derive(strategy), expected);
    }

    #[test]
    fn test_fingerprint_derivation_prefixed() {
        let keys = RequestKeys::anonymous("10.0.0.1", Some("curl/8.0".into()));
        let derived = keys.derive(KeyStrategy::ByFingerprint);
        assert!(derived.starts_with("fp:"));
        assert_eq!(derived, format!("fp:{}", keys.fingerprint()));
    }

    #[test]
    fn test_candidates_cover_all_facets() {
        let keys = RequestKeys::anonymous("10.0.0.1", Some("curl/8.0".into()))
            .with_subject("user-7");
        let candidates = keys.candidates();
        assert_eq!(candidates.len(), 3);
        assert!(candidates.contains(&"ip:10.0.0.1".to_string()));
        assert!(candidates.contains(&"sub:user-7".to_string()));
        assert!(candidates.iter().any(|k| k.starts_with("fp:")));
    }

    #[test]
    fn test_anonymous_candidates_omit_subject() {
        let keys = RequestKeys::anonymous("10.0.0.1", None);
        assert_eq!(keys.candidates().len(), 2);
    }

    #[test]
    fn test_missing_user_agent_still_fingerprints() {
        let keys = RequestKeys::anonymous("10.0.0.1", None);
        assert_eq!(keys.fingerprint(), fingerprint("10.0.0.1", ""));
    }
}
