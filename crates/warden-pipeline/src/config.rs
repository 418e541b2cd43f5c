//! Pipeline configuration.

use std::time::Duration;

use warden_behavior::BehaviorConfig;
use warden_firewall::ScorerConfig;
use warden_ratelimit::{RateLimitConfig, RouteClass, validate_route_classes};

use crate::error::{PipelineError, PipelineResult};
use crate::reputation::ReputationConfig;

/// Aggregated settings for every pipeline stage.
///
/// Validated once at startup; a service must refuse to start on an
/// invalid configuration rather than run with weakened defenses.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Threat scorer thresholds and weights.
    pub scorer: ScorerConfig,
    /// Behavioral tracker windows and weights.
    pub behavior: BehaviorConfig,
    /// Rate-limit escalation settings.
    pub ratelimit: RateLimitConfig,
    /// Window applied to routes with no override.
    pub default_route: RouteClass,
    /// Path-prefix route overrides, first match wins.
    pub route_overrides: Vec<(String, RouteClass)>,
    /// Reserved canary form-field names.
    pub canary_fields: Vec<String>,
    /// Reputation provider settings.
    pub reputation: ReputationConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            scorer: ScorerConfig::default(),
            behavior: BehaviorConfig::default(),
            ratelimit: RateLimitConfig::default(),
            default_route: RouteClass::new("default", 100, Duration::from_secs(60)),
            route_overrides: Vec::new(),
            canary_fields: warden_behavior::DEFAULT_CANARY_FIELDS
                .iter()
                .map(ToString::to_string)
                .collect(),
            reputation: ReputationConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Validate every stage's settings.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Config`] on the first invalid setting.
    pub fn validate(&self) -> PipelineResult<()> {
        self.scorer.validate()?;
        self.behavior.validate()?;
        self.ratelimit.validate()?;

        let mut classes = vec![self.default_route.clone()];
        classes.extend(self.route_overrides.iter().map(|(_, class)| class.clone()));
        validate_route_classes(&classes)?;

        for (prefix, _) in &self.route_overrides {
            if prefix.is_empty() {
                return Err(PipelineError::Config {
                    reason: "route override prefix must be non-empty".into(),
                });
            }
        }
        Ok(())
    }

    /// The route class governing a path.
    #[must_use]
    pub fn route_class_for(&self, path: &str) -> &RouteClass {
        self.route_overrides
            .iter()
            .find(|(prefix, _)| path.starts_with(prefix))
            .map_or(&self.default_route, |(_, class)| class)
    }
}
