//! Ordered defense stages over one request.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};
use warden_behavior::{
    BehaviorDecision, BehaviorTracker, CanaryFields, CanaryVerdict, DecoyResponse,
    HoneypotRegistry,
};
use warden_firewall::{Disposition, ScanTarget, ScoreVerdict, ThreatScorer, sanitize};
use warden_ratelimit::{RateDecision, RateLimiter, RequestKeys};
use warden_store::KeyValueStore;
use warden_token::{TokenClaims, TokenService, TokenType, VerifyFailure};

use crate::alert::{AlertDispatcher, AlertEvent, Notifier};
use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::reputation::ReputationClient;
use crate::request::{RejectCode, RejectionBody, RequestView};

/// What the pipeline decided about one request.
#[derive(Debug, Clone)]
pub enum PipelineDecision {
    /// Call through to the business handler.
    Pass {
        /// Body with reserved pollution keys removed.
        sanitized_body: Value,
        /// The threat verdict, for downstream scrutiny.
        threat: Option<ScoreVerdict>,
    },
    /// Answer early with a rejection.
    Reject {
        /// HTTP status.
        status: u16,
        /// Structured rejection body.
        body: RejectionBody,
    },
    /// Answer with a success-shaped decoy; the handler is never invoked.
    Decoy {
        /// The fake response to serve.
        response: DecoyResponse,
    },
}

/// Outcome of verifying the token on an authenticated route.
#[derive(Debug, Clone)]
pub enum AuthOutcome {
    /// The token passed; claims are attached to the request.
    Authenticated(Box<TokenClaims>),
    /// The token failed; answer early.
    Rejected {
        /// HTTP status.
        status: u16,
        /// Structured rejection body.
        body: RejectionBody,
    },
}

/// The assembled request-defense pipeline.
///
/// Stages run in a fixed order: pollution guard, penalty box and route
/// window, threat scorer, honeypot decoys, behavioral block and update,
/// canary fields. The first stage to decide ends the request.
#[derive(Debug)]
pub struct Pipeline {
    config: PipelineConfig,
    scorer: ThreatScorer,
    behavior: BehaviorTracker,
    limiter: RateLimiter,
    honeypots: HoneypotRegistry,
    canary: CanaryFields,
    tokens: Option<TokenService>,
    reputation: Option<ReputationClient>,
    dispatcher: AlertDispatcher,
}

impl Pipeline {
    /// Assemble the pipeline over one shared store.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Config`] if any stage's settings are
    /// invalid. This is fatal at startup by design.
    pub fn new(config: PipelineConfig, store: Arc<dyn KeyValueStore>) -> PipelineResult<Self> {
        config.validate()?;
        let reputation = ReputationClient::from_config(&config.reputation)?;
        Ok(Self {
            scorer: ThreatScorer::new(config.scorer.clone()),
            behavior: BehaviorTracker::new(Arc::clone(&store), config.behavior.clone()),
            limiter: RateLimiter::new(store, config.ratelimit.clone()),
            honeypots: HoneypotRegistry::default(),
            canary: CanaryFields::new(config.canary_fields.clone()),
            tokens: None,
            reputation,
            dispatcher: AlertDispatcher::new(),
            config,
        })
    }

    /// Replace the decoy path registry.
    #[must_use]
    pub fn with_honeypots(mut self, registry: HoneypotRegistry) -> Self {
        self.honeypots = registry;
        self
    }

    /// Attach the token service for authenticated routes.
    #[must_use]
    pub fn with_token_service(mut self, service: TokenService) -> Self {
        self.tokens = Some(service);
        self
    }

    /// Add an alert channel.
    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.dispatcher = self.dispatcher.with_notifier(notifier);
        self
    }

    /// The reputation client, when credentials were configured.
    #[must_use]
    pub const fn reputation(&self) -> Option<&ReputationClient> {
        self.reputation.as_ref()
    }

    /// Run the pre-handler stages over one request.
    pub fn check(&self, view: &RequestView) -> PipelineResult<PipelineDecision> {
        let key = Self::tracking_key(view);

        // Pollution guard: rebuild the body before anything reads it.
        let sanitized = sanitize(&view.body);
        if sanitized.was_polluted() {
            debug!(
                key = %key,
                removed = ?sanitized.removed,
                "reserved pollution keys stripped from body"
            );
        }

        // Penalty box, then the route's own window.
        let request_keys = self.request_keys(view);
        let route = self.config.route_class_for(&view.path);
        match self.limiter.check(&request_keys, route)? {
            RateDecision::Penalised { retry_after } => {
                return Ok(PipelineDecision::Reject {
                    status: 429,
                    body: RejectionBody::new(RejectCode::PenaltyBox)
                        .with_retry_after(retry_after.as_secs()),
                });
            }
            RateDecision::Limited(report) => {
                if report.penalised {
                    self.alert("penalty", &report.key, view, format!("violations {}", report.violations));
                }
                return Ok(PipelineDecision::Reject {
                    status: 429,
                    body: RejectionBody::new(RejectCode::RateLimited)
                        .with_retry_after(report.retry_after.as_secs())
                        .with_violations(report.violations, report.penalised),
                });
            }
            RateDecision::Allow { .. } => {}
        }

        // Threat scorer over the sanitized view.
        let verdict = self.scorer.score(&ScanTarget {
            method: view.method.clone(),
            raw_path: view.raw_path.clone(),
            query: view.query.clone(),
            params: view.params.clone(),
            body: sanitized.value.clone(),
            removed_keys: sanitized.removed.clone(),
            headers: view.headers.clone(),
        });
        match verdict.disposition(self.scorer.config()) {
            Disposition::Block => {
                self.dispatcher.dispatch(&AlertEvent {
                    category: "threat".to_string(),
                    key: key.clone(),
                    path: view.path.clone(),
                    method: view.method.clone(),
                    detail: format!("score {}", verdict.total),
                    categories: verdict
                        .categories()
                        .iter()
                        .map(|c| c.as_str().to_string())
                        .collect(),
                });
                return Ok(PipelineDecision::Reject {
                    status: 403,
                    body: RejectionBody::new(RejectCode::ThreatBlocked),
                });
            }
            Disposition::Warn => {
                warn!(key = %key, total = verdict.total, "request scored above warn threshold");
            }
            Disposition::Monitor => {
                debug!(key = %key, total = verdict.total, "request scored above monitor threshold");
            }
            Disposition::Clean => {}
        }

        // Decoy paths answer success-shaped even for blocked identities,
        // so the prober never learns it was detected.
        if let Some(kind) = self.honeypots.lookup(&view.path) {
            let alert = self.behavior.trip_honeypot(&key)?;
            self.alert("honeypot", &alert.key, view, format!("score {}", alert.score));
            return Ok(PipelineDecision::Decoy {
                response: self.honeypots.respond(&view.path, kind),
            });
        }

        // Behavioral block, then feed this request into the window.
        if let BehaviorDecision::Blocked { retry_after } = self.behavior.check(&key)? {
            return Ok(PipelineDecision::Reject {
                status: 403,
                body: RejectionBody::new(RejectCode::BehaviorBlocked)
                    .with_retry_after(retry_after.as_secs()),
            });
        }
        if let Some(alert) = self.behavior.observe_request(&key, &view.path, &view.method)? {
            self.alert("behavior", &alert.key, view, format!("score {}", alert.score));
        }

        // Canary fields: a filled one means a form stuffer, not a client.
        if let CanaryVerdict::Tripped { field } = self.canary.inspect(&sanitized.value) {
            self.alert("canary", &key, view, format!("field {field}"));
            return Ok(PipelineDecision::Decoy {
                response: DecoyResponse {
                    status: 200,
                    content_type: "application/json",
                    body: CanaryFields::decoy_success_body().to_string(),
                },
            });
        }

        Ok(PipelineDecision::Pass {
            sanitized_body: sanitized.value,
            threat: Some(verdict),
        })
    }

    /// The post-handler completion hook.
    ///
    /// The routing layer calls this with the final status so 404s and
    /// auth failures feed the behavioral window.
    pub fn complete(&self, view: &RequestView, status: u16) -> PipelineResult<()> {
        let key = Self::tracking_key(view);
        if let Some(alert) = self.behavior.observe_response(&key, status)? {
            self.alert("behavior", &alert.key, view, format!("score {}", alert.score));
        }
        Ok(())
    }

    /// Verify the access token on an authenticated route.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Config`] when no token service was
    /// attached, and store errors from the revocation check.
    pub fn authenticate(
        &self,
        token: &str,
        device_context: Option<&str>,
    ) -> PipelineResult<AuthOutcome> {
        let Some(service) = &self.tokens else {
            return Err(PipelineError::Config {
                reason: "no token service attached to the pipeline".into(),
            });
        };
        match service.verify(token, TokenType::Access, device_context)? {
            warden_token::VerifyOutcome::Valid(claims) => Ok(AuthOutcome::Authenticated(claims)),
            warden_token::VerifyOutcome::Failed(failure) => {
                let status = match failure {
                    VerifyFailure::Revoked | VerifyFailure::FingerprintMismatch => 403,
                    _ => 401,
                };
                debug!(reason = %failure, "token rejected");
                Ok(AuthOutcome::Rejected {
                    status,
                    body: RejectionBody::new(RejectCode::TokenInvalid),
                })
            }
        }
    }

    fn tracking_key(view: &RequestView) -> String {
        format!("ip:{}", view.client_ip)
    }

    fn request_keys(&self, view: &RequestView) -> RequestKeys {
        let mut keys = RequestKeys::anonymous(
            view.client_ip.clone(),
            view.header("user-agent").map(ToString::to_string),
        );
        if let Some(subject) = &view.subject {
            keys = keys.with_subject(subject.clone());
        }
        keys
    }

    fn alert(&self, category: &str, key: &str, view: &RequestView, detail: String) {
        self.dispatcher.dispatch(&AlertEvent {
            category: category.to_string(),
            key: key.to_string(),
            path: view.path.clone(),
            method: view.method.clone(),
            detail,
            categories: Vec::new(),
        });
    }
}
