//! The normalized request view and rejection shapes.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Header names forwarded into the pipeline.
///
/// Everything else is dropped at the boundary so scanners and loggers
/// never see cookies or authorization material.
pub const HEADER_ALLOWLIST: &[&str] = &[
    "user-agent",
    "referer",
    "accept-language",
    "content-type",
    "x-forwarded-for",
    "x-http-method-override",
];

/// One inbound request, normalized by the routing layer.
#[derive(Debug, Clone, Default)]
pub struct RequestView {
    /// HTTP method.
    pub method: String,
    /// Decoded route path.
    pub path: String,
    /// Raw request path as received on the wire.
    pub raw_path: String,
    /// Parsed query parameters.
    pub query: Value,
    /// Parsed route parameters.
    pub params: Value,
    /// Parsed body, if any.
    pub body: Value,
    /// Allowlisted headers (lowercase names).
    pub headers: Vec<(String, String)>,
    /// Client IP.
    pub client_ip: String,
    /// Authenticated subject, when a verified token accompanied the request.
    pub subject: Option<String>,
}

impl RequestView {
    /// First value of an allowlisted header.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Machine-readable rejection codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectCode {
    /// The threat score crossed the block threshold.
    ThreatBlocked,
    /// The identity is behaviorally blocked.
    BehaviorBlocked,
    /// The route window was exceeded.
    RateLimited,
    /// A candidate key is serving a penalty.
    PenaltyBox,
    /// The presented token failed verification.
    TokenInvalid,
}

impl RejectCode {
    /// The wire form of the code.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ThreatBlocked => "THREAT_BLOCKED",
            Self::BehaviorBlocked => "BEHAVIOR_BLOCKED",
            Self::RateLimited => "RATE_LIMITED",
            Self::PenaltyBox => "PENALTY_BOX",
            Self::TokenInvalid => "TOKEN_INVALID",
        }
    }
}

/// Body of an early rejection response.
///
/// Deliberately coarse: the message and code never reveal which layer or
/// pattern triggered the block.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RejectionBody {
    /// Generic human-readable message.
    pub error: String,
    /// One of the [`RejectCode`] wire strings.
    pub code: String,
    /// Correlation ID for support lookups.
    pub request_id: String,
    /// Seconds to wait before retrying, for rate rejections.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
    /// Violation count, for rate rejections.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub violations: Option<u64>,
    /// Whether this rejection just triggered a penalty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub penalised: Option<bool>,
}

impl RejectionBody {
    /// A rejection with a fresh request ID and no rate details.
    #[must_use]
    pub fn new(code: RejectCode) -> Self {
        Self {
            error: "Request rejected".to_string(),
            code: code.as_str().to_string(),
            request_id: Uuid::new_v4().to_string(),
            retry_after: None,
            violations: None,
            penalised: None,
        }
    }

    /// Attach a retry hint.
    #[must_use]
    pub const fn with_retry_after(mut self, secs: u64) -> Self {
        self.retry_after = Some(secs);
        self
    }

    /// Attach rate-violation details.
    #[must_use]
    pub const fn with_violations(mut self, violations: u64, penalised: bool) -> Self {
        self.violations = Some(violations);
        self.penalised = Some(penalised);
        self
    }
}
