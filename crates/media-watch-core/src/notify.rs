use async_trait::async_trait;
use media_watch_config::NotifyConfig;
use media_watch_models::NotificationEvent;
use reqwest::Client;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Delivery failed: {0}")]
    Delivery(String),
}

/// Hands a notification to whatever renders it for the requester.
#[async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &str;

    async fn notify(&self, event: &NotificationEvent) -> Result<(), NotifyError>;
}

/// Writes notifications to the log only.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    fn name(&self) -> &str {
        "log"
    }

    async fn notify(&self, event: &NotificationEvent) -> Result<(), NotifyError> {
        info!(
            operation = "notify",
            channel = %event.requester_channel,
            media = %event.media,
            status = %event.status,
            confirmation_handle = event.confirmation_handle.as_deref().unwrap_or(""),
            "{}",
            event.message()
        );
        Ok(())
    }
}

#[derive(Serialize)]
struct WebhookPayload<'a> {
    #[serde(flatten)]
    event: &'a NotificationEvent,
    message: String,
}

/// POSTs each event as JSON to the chat layer.
pub struct WebhookNotifier {
    client: Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, NotifyError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, url: url.into() })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn notify(&self, event: &NotificationEvent) -> Result<(), NotifyError> {
        let payload = WebhookPayload {
            event,
            message: event.message(),
        };
        let response = self.client.post(&self.url).json(&payload).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Delivery(format!("{} - {}", status, body)));
        }

        debug!(channel = %event.requester_channel, media = %event.media, "Webhook notification delivered");
        Ok(())
    }
}

/// Webhook delivery when a URL is configured, log-only otherwise.
pub fn notifier_from_config(config: &NotifyConfig, timeout: Duration) -> Result<Arc<dyn Notifier>, NotifyError> {
    match &config.webhook_url {
        Some(url) => Ok(Arc::new(WebhookNotifier::new(url.clone(), timeout)?)),
        None => Ok(Arc::new(LogNotifier)),
    }
}
