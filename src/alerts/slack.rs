use async_trait::async_trait;
use serde_json::json;

use super::{AlertError, AlertSink, summary};
use crate::models::EscalationAlert;

/// Posts escalations to a Slack-compatible incoming webhook.
pub struct SlackAlertSink {
    url: String,
    client: reqwest::Client,
}

impl SlackAlertSink {
    pub fn new(url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            url: url.into(),
            client,
        }
    }
}

#[async_trait]
impl AlertSink for SlackAlertSink {
    async fn send(&self, alert: &EscalationAlert) -> Result<(), AlertError> {
        let body = json!({
            "text": format!(":rotating_light: {}", summary(alert)),
            "alert": alert,
        });

        let resp = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AlertError::new("slack", e.to_string()))?;

        if !resp.status().is_success() {
            return Err(AlertError::new(
                "slack",
                format!("webhook returned {}", resp.status().as_u16()),
            ));
        }
        Ok(())
    }
}
