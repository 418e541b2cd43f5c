//! Optional third-party IP reputation lookups.

use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{PipelineError, PipelineResult};

/// Reputation verdict for one IP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reputation {
    /// The provider reports the IP as clean.
    Clean,
    /// The provider reports prior abuse.
    Suspicious,
    /// No answer; lookups always fail open.
    Unknown,
}

/// Settings for the reputation provider.
#[derive(Debug, Clone)]
pub struct ReputationConfig {
    /// Provider endpoint; the IP is appended as a query parameter.
    pub endpoint: String,
    /// API key; lookups are disabled entirely when absent.
    pub api_key: Option<String>,
    /// Per-lookup timeout.
    pub timeout: Duration,
    /// Abuse-confidence score at or above which an IP is suspicious.
    pub suspicious_threshold: u32,
}

impl Default for ReputationConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key: None,
            timeout: Duration::from_secs(3),
            suspicious_threshold: 50,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ProviderResponse {
    #[serde(default)]
    abuse_confidence_score: u32,
}

/// Timeout-bounded GET client for the reputation provider.
///
/// Constructed only when credentials are configured; every failure mode
/// (timeout, transport, malformed body) is [`Reputation::Unknown`].
#[derive(Debug, Clone)]
pub struct ReputationClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    suspicious_threshold: u32,
}

impl ReputationClient {
    /// Build a client if credentials are present.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Config`] if the HTTP client cannot be
    /// built. Absent credentials return `Ok(None)`, disabling lookups.
    pub fn from_config(config: &ReputationConfig) -> PipelineResult<Option<Self>> {
        let Some(api_key) = &config.api_key else {
            debug!("reputation lookups disabled, no credentials configured");
            return Ok(None);
        };
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| PipelineError::Config {
                reason: format!("reputation client: {e}"),
            })?;
        Ok(Some(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: api_key.clone(),
            suspicious_threshold: config.suspicious_threshold,
        }))
    }

    /// Look up one IP, failing open.
    pub async fn lookup(&self, ip: &str) -> Reputation {
        let result = self
            .client
            .get(&self.endpoint)
            .query(&[("ip", ip)])
            .header("x-api-key", &self.api_key)
            .send()
            .await;
        let response = match result {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                warn!(ip, status = %response.status(), "reputation provider error");
                return Reputation::Unknown;
            }
            Err(error) => {
                warn!(ip, error = %error, "reputation lookup failed");
                return Reputation::Unknown;
            }
        };
        match response.json::<ProviderResponse>().await {
            Ok(body) if body.abuse_confidence_score >= self.suspicious_threshold => {
                Reputation::Suspicious
            }
            Ok(_) => Reputation::Clean,
            Err(error) => {
                warn!(ip, error = %error, "reputation response unreadable");
                Reputation::Unknown
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_credentials_disable_lookups() {
        let config = ReputationConfig::default();
        assert!(ReputationClient::from_config(&config).unwrap().is_none());
    }

    #[test]
    fn test_credentials_enable_lookups() {
        let config = ReputationConfig {
            endpoint: "https://reputation.example/check".into(),
            api_key: Some("key".into()),
            ..ReputationConfig::default()
        };
        assert!(ReputationClient::from_config(&config).unwrap().is_some());
    }

    #[tokio::test]
    async fn test_unreachable_provider_fails_open() {
        let config = ReputationConfig {
            // Reserved TEST-NET address, nothing listens here
            endpoint: "http://192.0.2.1:9/check".into(),
            api_key: Some("key".into()),
            timeout: Duration::from_millis(100),
            ..ReputationConfig::default()
        };
        let client = ReputationClient::from_config(&config).unwrap().unwrap();
        assert_eq!(client.lookup("10.0.0.1").await, Reputation::Unknown);
    }
}
