use std::time::Duration;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use super::{AlertError, AlertSink, summary};
use crate::config::SmtpConfig;
use crate::models::EscalationAlert;

/// Mails escalations to the operator address.
pub struct MailAlertSink {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
    to: String,
    timeout: Duration,
}

impl MailAlertSink {
    /// `timeout` bounds each SMTP exchange so a stalled relay can't hold up a scan.
    pub fn new(config: &SmtpConfig, timeout: Duration) -> Result<Self, String> {
        let creds = Credentials::new(config.user.clone(), config.pass.clone());

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| format!("Alert SMTP error: {e}"))?
            .port(config.port)
            .credentials(creds)
            .timeout(Some(timeout))
            .build();

        Ok(Self {
            transport,
            from: config.from.clone(),
            to: config.to.clone(),
            timeout,
        })
    }
}

fn render_body(alert: &EscalationAlert) -> String {
    format!(
        "{}\n\nid: {}\nsource: {}\ntype: {}\nretries: {}\nlast error: {}\n",
        summary(alert),
        alert.id,
        alert.source,
        alert.kind,
        alert.retries,
        alert.last_error.as_deref().unwrap_or("-"),
    )
}

#[async_trait]
impl AlertSink for MailAlertSink {
    async fn send(&self, alert: &EscalationAlert) -> Result<(), AlertError> {
        let message = Message::builder()
            .from(
                self.from
                    .parse()
                    .map_err(|e| AlertError::new("mail", format!("Invalid from address: {e}")))?,
            )
            .to(self
                .to
                .parse()
                .map_err(|e| AlertError::new("mail", format!("Invalid to address: {e}")))?)
            .subject(format!("Webhook {} exhausted retries", alert.id))
            .header(ContentType::TEXT_PLAIN)
            .body(render_body(alert))
            .map_err(|e| AlertError::new("mail", format!("Failed to build email: {e}")))?;

        tokio::time::timeout(self.timeout, self.transport.send(message))
            .await
            .map_err(|_| AlertError::new("mail", format!("SMTP timed out after {:?}", self.timeout)))?
            .map_err(|e| AlertError::new("mail", format!("Failed to send email: {e}")))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_lists_alert_fields() {
        let alert = EscalationAlert {
            id: "wh_5_q".into(),
            source: "calendar".into(),
            kind: "booking".into(),
            retries: 5,
            last_error: None,
        };
        let body = render_body(&alert);
        assert!(body.contains("id: wh_5_q"));
        assert!(body.contains("retries: 5"));
        assert!(body.contains("last error: -"));
    }

    #[tokio::test]
    async fn stalled_relay_fails_within_timeout() {
        // Accepts connections but never sends the SMTP greeting.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let config = SmtpConfig {
            host: "127.0.0.1".into(),
            port,
            user: "queue".into(),
            pass: "secret".into(),
            from: "queue@example.com".into(),
            to: "ops@example.com".into(),
        };
        let sink = MailAlertSink::new(&config, Duration::from_millis(200)).unwrap();
        let alert = EscalationAlert {
            id: "wh_1_x".into(),
            source: "sms".into(),
            kind: "inbound".into(),
            retries: 3,
            last_error: Some("boom".into()),
        };

        let result = tokio::time::timeout(Duration::from_secs(5), sink.send(&alert))
            .await
            .expect("send should give up before the outer deadline");
        let err = result.unwrap_err();
        assert_eq!(err.channel, "mail");
    }
}
