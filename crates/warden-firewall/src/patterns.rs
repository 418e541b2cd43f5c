//! Category pattern sets for the threat scorer.
//!
//! Patterns are matched against [`normalized`](crate::normalize::normalize)
//! strings, so they are written lowercase-first; `(?i)` is kept as a belt
//! against partially-normalized callers. Sets are ordered: a category's
//! first matching pattern contributes the category weight and the rest of
//! that category is skipped for the string.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Threat categories the scorer recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreatCategory {
    /// SQL injection.
    SqlInjection,
    /// NoSQL operator injection.
    NoSqlInjection,
    /// Cross-site scripting.
    Xss,
    /// Server-side request forgery.
    Ssrf,
    /// Path traversal.
    PathTraversal,
    /// Command injection.
    CommandInjection,
    /// Reserved prototype-pollution key present in body keys.
    PrototypePollution,
    /// Method-override header present.
    MethodOverride,
    /// Serialized body over the size threshold.
    OversizedBody,
    /// NUL byte embedded in the raw request path.
    NulInPath,
}

impl ThreatCategory {
    /// Stable machine-readable name, used in alert payloads.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::SqlInjection => "sql_injection",
            Self::NoSqlInjection => "nosql_injection",
            Self::Xss => "xss",
            Self::Ssrf => "ssrf",
            Self::PathTraversal => "path_traversal",
            Self::CommandInjection => "command_injection",
            Self::PrototypePollution => "prototype_pollution",
            Self::MethodOverride => "method_override",
            Self::OversizedBody => "oversized_body",
            Self::NulInPath => "nul_in_path",
        }
    }
}

impl std::fmt::Display for ThreatCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compile a pattern list, dropping any that fail to parse.
///
/// The built-in sets are static and known-good; filtering instead of
/// panicking keeps custom rule injection from ever taking the scorer down.
fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns.iter().filter_map(|p| Regex::new(p).ok()).collect()
}

/// The ordered pattern sets checked per extracted string.
pub static STRING_PATTERN_SETS: Lazy<Vec<(ThreatCategory, Vec<Regex>)>> = Lazy::new(|| {
    vec![
        (
            ThreatCategory::SqlInjection,
            compile(&[
                r"(?i)'\s*(or|and)\s*'[^']*'\s*=\s*'",
                r"(?i)\b(or|and)\s+\d+\s*=\s*\d+",
                r"(?i)\bunion\s+(all\s+)?select\b",
                r"(?i)\b(select|insert|update|delete|drop|truncate)\b\s.*\b(from|into|table|where|set)\b",
                r"(?i);\s*(drop|delete|truncate)\b",
                r"(?i)\bsleep\s*\(\s*\d",
                r"(?i)\bbenchmark\s*\(",
                r"(?i)\bwaitfor\s+delay\b",
                r"(?i)'\s*--",
            ]),
        ),
        (
            ThreatCategory::NoSqlInjection,
            compile(&[
                r"(?i)\$(where|ne|gt|gte|lt|lte|regex|in|nin|exists|elemmatch)\b",
                r"(?i)\$or\b",
                r"(?i)\$and\b",
                r"(?i)mapreduce\s*:",
                r"(?i)this\.[a-z_]+\s*==",
            ]),
        ),
        (
            ThreatCategory::Xss,
            compile(&[
                r"(?i)<\s*script",
                r"(?i)javascript\s*:",
                r"(?i)\bon(error|load|click|mouseover|focus|submit)\s*=",
                r"(?i)<\s*(iframe|embed|object|svg)\b",
                r"(?i)document\s*\.\s*(cookie|location|write)",
                r"(?i)\beval\s*\(",
                r"(?i)expression\s*\(",
            ]),
        ),
        (
            ThreatCategory::Ssrf,
            compile(&[
                r"(?i)\b169\.254\.169\.254\b",
                r"(?i)metadata\.google\.internal",
                r"(?i)\b(https?|gopher|dict|ftp)://(127\.|0\.0\.0\.0|10\.|192\.168\.|169\.254\.|localhost|\[::1\])",
                r"(?i)\bhttps?://172\.(1[6-9]|2[0-9]|3[01])\.",
                r"(?i)\bfile://",
            ]),
        ),
        (
            ThreatCategory::PathTraversal,
            compile(&[
                r"\.\./",
                r"\.\.\\",
                r"(?i)/etc/(passwd|shadow|hosts)",
                r"(?i)c:\\(windows|winnt)\\",
                r"(?i)/proc/self/",
            ]),
        ),
        (
            ThreatCategory::CommandInjection,
            compile(&[
                r"(?i)[;&|`]\s*(cat|ls|id|whoami|uname|rm|wget|curl|nc|ncat|bash|sh|powershell|cmd)\b",
                r"\$\([^)]*\)",
                r"`[^`]+`",
                r"(?i)\|\s*(sh|bash)\b",
                r"(?i)&&\s*(rm|wget|curl)\b",
            ]),
        ),
    ]
});

/// Body key names that indicate a prototype-pollution attempt.
///
/// Matched exactly against raw (un-normalized) key names; these are
/// reserved member names, not free text.
pub const RESERVED_POLLUTION_KEYS: &[&str] = &[
    "__proto__",
    "constructor",
    "prototype",
    "__defineGetter__",
    "__defineSetter__",
    "__lookupGetter__",
    "__lookupSetter__",
];

/// Headers the scorer extracts strings from. Everything else is ignored.
pub const SCANNED_HEADERS: &[&str] = &["user-agent", "referer", "x-forwarded-for"];

/// Header used to override the HTTP method, a classic filter-evasion vector.
pub const METHOD_OVERRIDE_HEADER: &str = "x-http-method-override";
