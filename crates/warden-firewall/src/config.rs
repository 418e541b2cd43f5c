//! Scorer configuration.

use serde::{Deserialize, Serialize};

use crate::error::{FirewallError, FirewallResult};
use crate::patterns::ThreatCategory;

/// Per-category score weights.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryWeights {
    /// SQL injection weight.
    pub sql_injection: u32,
    /// NoSQL operator injection weight.
    pub nosql_injection: u32,
    /// XSS weight.
    pub xss: u32,
    /// SSRF weight.
    pub ssrf: u32,
    /// Path traversal weight.
    pub path_traversal: u32,
    /// Command injection weight.
    pub command_injection: u32,
    /// Reserved pollution key in body (max weight).
    pub prototype_pollution: u32,
    /// Method-override header present (medium weight).
    pub method_override: u32,
    /// Oversized serialized body (low weight).
    pub oversized_body: u32,
    /// NUL byte in the raw path (high weight).
    pub nul_in_path: u32,
}

impl Default for CategoryWeights {
    fn default() -> Self {
        Self {
            sql_injection: 30,
            nosql_injection: 30,
            xss: 25,
            ssrf: 25,
            path_traversal: 25,
            command_injection: 30,
            prototype_pollution: 50,
            method_override: 15,
            oversized_body: 5,
            nul_in_path: 40,
        }
    }
}

impl CategoryWeights {
    /// Weight for a category.
    #[must_use]
    pub const fn weight(&self, category: ThreatCategory) -> u32 {
        match category {
            ThreatCategory::SqlInjection => self.sql_injection,
            ThreatCategory::NoSqlInjection => self.nosql_injection,
            ThreatCategory::Xss => self.xss,
            ThreatCategory::Ssrf => self.ssrf,
            ThreatCategory::PathTraversal => self.path_traversal,
            ThreatCategory::CommandInjection => self.command_injection,
            ThreatCategory::PrototypePollution => self.prototype_pollution,
            ThreatCategory::MethodOverride => self.method_override,
            ThreatCategory::OversizedBody => self.oversized_body,
            ThreatCategory::NulInPath => self.nul_in_path,
        }
    }
}

/// Configuration for the threat scorer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScorerConfig {
    /// Verdict total at or above which the request is rejected.
    pub block_threshold: u32,
    /// Total at or above which the score is attached for downstream scrutiny.
    pub warn_threshold: u32,
    /// Total at or above which the verdict is logged.
    pub monitor_threshold: u32,
    /// Serialized body size (bytes) above which the oversized-body weight
    /// is added.
    pub body_size_threshold: usize,
    /// Recursion cap when flattening nested payloads.
    pub max_extraction_depth: usize,
    /// Optional per-category score cap.
    ///
    /// The scorer deliberately counts repeated hits of one category across
    /// multiple extracted strings; this knob bounds that sum per category
    /// without changing the default behavior.
    pub per_category_cap: Option<u32>,
    /// Per-category weights.
    pub weights: CategoryWeights,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            block_threshold: 50,
            warn_threshold: 30,
            monitor_threshold: 15,
            body_size_threshold: 100 * 1024,
            max_extraction_depth: 8,
            per_category_cap: None,
            weights: CategoryWeights::default(),
        }
    }
}

impl ScorerConfig {
    /// Validate threshold ordering.
    ///
    /// # Errors
    ///
    /// Returns [`FirewallError::Config`] if thresholds are not strictly
    /// ordered or the extraction depth is zero.
    pub fn validate(&self) -> FirewallResult<()> {
        if self.block_threshold <= self.warn_threshold {
            return Err(FirewallError::Config {
                reason: "block threshold must exceed warn threshold".into(),
            });
        }
        if self.warn_threshold <= self.monitor_threshold {
            return Err(FirewallError::Config {
                reason: "warn threshold must exceed monitor threshold".into(),
            });
        }
        if self.max_extraction_depth == 0 {
            return Err(FirewallError::Config {
                reason: "extraction depth must be at least 1".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(ScorerConfig::default().validate().is_ok());
    }

    #[test]
    fn test_inverted_thresholds_rejected() {
        let config = ScorerConfig {
            block_threshold: 10,
            warn_threshold: 30,
            ..ScorerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_depth_rejected() {
        let config = ScorerConfig {
            max_extraction_depth: 0,
            ..ScorerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_weights_rank_structural_checks() {
        let weights = CategoryWeights::default();
        assert!(weights.prototype_pollution > weights.nul_in_path);
        assert!(weights.nul_in_path > weights.method_override);
        assert!(weights.method_override > weights.oversized_body);
    }
}
