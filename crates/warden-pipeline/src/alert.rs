//! Fire-and-forget alerting.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};

use crate::error::{PipelineError, PipelineResult};

/// One security event worth telling an operator about.
#[derive(Debug, Clone, Serialize)]
pub struct AlertEvent {
    /// Which defense produced the event.
    pub category: String,
    /// The tracking or derived key involved.
    pub key: String,
    /// Request path.
    pub path: String,
    /// Request method.
    pub method: String,
    /// Score or short description.
    pub detail: String,
    /// Matched threat categories, present on scorer block events.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<String>,
}

/// A destination for alert events.
pub trait Notifier: Send + Sync + fmt::Debug {
    /// Name of this channel, used in failure logs.
    fn name(&self) -> &str;

    /// Deliver one event.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Notify`] when delivery fails; the
    /// dispatcher logs and drops such failures.
    fn notify<'a>(
        &'a self,
        event: &'a AlertEvent,
    ) -> Pin<Box<dyn Future<Output = PipelineResult<()>> + Send + 'a>>;
}

/// Notifier that writes events to the process log.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn name(&self) -> &str {
        "log"
    }

    fn notify<'a>(
        &'a self,
        event: &'a AlertEvent,
    ) -> Pin<Box<dyn Future<Output = PipelineResult<()>> + Send + 'a>> {
        Box::pin(async move {
            info!(
                category = %event.category,
                key = %event.key,
                path = %event.path,
                method = %event.method,
                detail = %event.detail,
                categories = ?event.categories,
                "security alert"
            );
            Ok(())
        })
    }
}

/// Notifier that POSTs events as JSON to a webhook.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    /// Default delivery timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

    /// Create a notifier posting to the given URL.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Config`] if the HTTP client cannot be
    /// built.
    pub fn new(url: impl Into<String>, timeout: Duration) -> PipelineResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PipelineError::Config {
                reason: format!("webhook client: {e}"),
            })?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

impl Notifier for WebhookNotifier {
    fn name(&self) -> &str {
        "webhook"
    }

    fn notify<'a>(
        &'a self,
        event: &'a AlertEvent,
    ) -> Pin<Box<dyn Future<Output = PipelineResult<()>> + Send + 'a>> {
        Box::pin(async move {
            let response = self
                .client
                .post(&self.url)
                .json(event)
                .send()
                .await
                .map_err(|e| PipelineError::Notify {
                    channel: "webhook".into(),
                    reason: e.to_string(),
                })?;
            if !response.status().is_success() {
                return Err(PipelineError::Notify {
                    channel: "webhook".into(),
                    reason: format!("status {}", response.status()),
                });
            }
            Ok(())
        })
    }
}

/// Fans events out to every configured channel without blocking the
/// request path.
///
/// Delivery is spawned onto the runtime; a channel failure is logged and
/// dropped, never propagated, and scoring completes even when the client
/// has already gone away.
#[derive(Debug, Clone, Default)]
pub struct AlertDispatcher {
    notifiers: Vec<Arc<dyn Notifier>>,
}

impl AlertDispatcher {
    /// Dispatcher with no channels; events are still logged.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a channel.
    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifiers.push(notifier);
        self
    }

    /// Number of configured channels.
    #[must_use]
    pub fn channel_count(&self) -> usize {
        self.notifiers.len()
    }

    /// Fire one event at every channel.
    pub fn dispatch(&self, event: &AlertEvent) {
        info!(
            category = %event.category,
            key = %event.key,
            "dispatching security alert"
        );
        for notifier in &self.notifiers {
            let notifier = Arc::clone(notifier);
            let event = event.clone();
            match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    handle.spawn(async move {
                        if let Err(error) = notifier.notify(&event).await {
                            warn!(
                                channel = notifier.name(),
                                error = %error,
                                "alert delivery failed"
                            );
                        }
                    });
                }
                Err(_) => {
                    // No runtime; the structured log line above is the
                    // delivery of record.
                    warn!(
                        channel = notifier.name(),
                        "no async runtime, alert not delivered to channel"
                    );
                }
            }
        }
    }
}
