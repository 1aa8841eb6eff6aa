//! Chat webhook notifications
//!
//! Posts `{"content": text}`, the payload Discord-style webhooks accept.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

use super::Notifier;
use crate::error::{OddsArbError, Result};

/// Webhook notification client
#[derive(Clone)]
pub struct WebhookNotifier {
    client: Client,
    webhook_url: String,
}

#[derive(Serialize)]
struct WebhookMessage<'a> {
    content: &'a str,
}

impl WebhookNotifier {
    /// Create a notifier from `ODDSARB_WEBHOOK_URL`
    pub fn from_env() -> Option<Arc<Self>> {
        std::env::var("ODDSARB_WEBHOOK_URL").ok().map(|url| {
            info!("Webhook notifications enabled");
            Self::new(url)
        })
    }

    /// Create a notifier with an explicit URL
    pub fn new(webhook_url: String) -> Arc<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| Client::new());
        Arc::new(Self {
            client,
            webhook_url,
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn send(&self, message: &str) -> Result<()> {
        let payload = WebhookMessage { content: message };

        match self
            .client
            .post(&self.webhook_url)
            .json(&payload)
            .send()
            .await
        {
            Ok(resp) => {
                if resp.status().is_success() {
                    debug!("Webhook notification sent successfully");
                    Ok(())
                } else {
                    let status = resp.status();
                    let body = resp.text().await.unwrap_or_default();
                    error!("Webhook notification failed: {} - {}", status, body);
                    Err(OddsArbError::Notify(format!("HTTP {}: {}", status, body)))
                }
            }
            Err(e) => {
                error!("Webhook request failed: {}", e);
                Err(OddsArbError::Notify(e.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_shape() {
        let body = serde_json::to_value(WebhookMessage { content: "hi" }).unwrap();
        assert_eq!(body, serde_json::json!({ "content": "hi" }));
    }

    #[tokio::test]
    async fn test_unreachable_webhook_is_notify_error() {
        let notifier = WebhookNotifier::new("http://127.0.0.1:9/hook".to_string());
        let err = notifier.send("hello").await.unwrap_err();
        assert!(matches!(err, OddsArbError::Notify(_)));
    }
}
