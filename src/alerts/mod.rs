//! Operator escalation for items that exhausted their retry budget.

pub mod mail;
pub mod slack;

use std::sync::Arc;

use async_trait::async_trait;

use crate::models::EscalationAlert;

pub use mail::MailAlertSink;
pub use slack::SlackAlertSink;

#[derive(Debug, thiserror::Error)]
#[error("{channel} alert failed: {message}")]
pub struct AlertError {
    pub channel: &'static str,
    pub message: String,
}

impl AlertError {
    pub fn new(channel: &'static str, message: impl Into<String>) -> Self {
        Self {
            channel,
            message: message.into(),
        }
    }
}

#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn send(&self, alert: &EscalationAlert) -> Result<(), AlertError>;
}

/// Human readable one-liner used by text-based channels.
pub fn summary(alert: &EscalationAlert) -> String {
    format!(
        "Webhook {} (source={}, type={}) failed after {} retries: {}",
        alert.id,
        alert.source,
        alert.kind,
        alert.retries,
        alert.last_error.as_deref().unwrap_or("unknown error")
    )
}

/// Fans an alert out to every configured sink. Best-effort: failures are
/// logged and dropped, never retried.
#[derive(Default, Clone)]
pub struct Escalator {
    sinks: Vec<Arc<dyn AlertSink>>,
}

impl Escalator {
    pub fn new(sinks: Vec<Arc<dyn AlertSink>>) -> Self {
        Self { sinks }
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    pub async fn escalate(&self, alert: &EscalationAlert) {
        tracing::warn!(
            item_id = %alert.id,
            source = %alert.source,
            retries = alert.retries,
            "Escalating exhausted webhook: {}",
            alert.last_error.as_deref().unwrap_or("unknown error")
        );

        for sink in &self.sinks {
            if let Err(e) = sink.send(alert).await {
                tracing::warn!(item_id = %alert.id, "{e}");
            }
        }
    }
}
