use async_trait::async_trait;

use super::{HandlerError, SourceHandler};

/// Relays the payload as JSON to a downstream URL.
pub struct ForwardHandler {
    source: String,
    url: String,
    client: reqwest::Client,
}

impl ForwardHandler {
    pub fn new(source: impl Into<String>, url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            source: source.into(),
            url: url.into(),
            client,
        }
    }
}

#[async_trait]
impl SourceHandler for ForwardHandler {
    fn source(&self) -> &str {
        &self.source
    }

    async fn process(&self, data: &serde_json::Value) -> Result<(), HandlerError> {
        let resp = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .json(data)
            .send()
            .await
            .map_err(|e| HandlerError::from(format!("Forward request failed: {e}")))?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }

        let body = resp
            .text()
            .await
            .unwrap_or_default()
            .chars()
            .take(256)
            .collect::<String>();
        Err(HandlerError::from(format!(
            "Forward to {} returned {}: {body}",
            self.url,
            status.as_u16()
        )))
    }
}
