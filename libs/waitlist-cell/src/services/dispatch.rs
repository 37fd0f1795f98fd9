// libs/waitlist-cell/src/services/dispatch.rs
//
// Hands finished notifications to whatever delivers them. The scheduling core
// never composes message bodies itself.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use tracing::{debug, info};

use shared_config::AppConfig;

use crate::models::OutboundNotification;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationDispatch: Send + Sync {
    async fn dispatch(&self, notification: OutboundNotification) -> Result<()>;

    fn channel(&self) -> &'static str;
}

/// Records notifications in the log only. Used when no delivery endpoint is configured.
#[derive(Debug, Default, Clone)]
pub struct LogDispatch;

#[async_trait]
impl NotificationDispatch for LogDispatch {
    async fn dispatch(&self, notification: OutboundNotification) -> Result<()> {
        info!(
            tenant_id = %notification.tenant_id,
            waitlist_entry_id = %notification.waitlist_entry_id,
            template = %notification.template,
            date = %notification.data.date,
            "Waitlist notification ready for {}",
            notification.contact.name
        );
        Ok(())
    }

    fn channel(&self) -> &'static str {
        "log"
    }
}

pub struct WebhookDispatch {
    client: Client,
    url: String,
}

impl WebhookDispatch {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl NotificationDispatch for WebhookDispatch {
    async fn dispatch(&self, notification: OutboundNotification) -> Result<()> {
        debug!("Posting waitlist notification {} to webhook", notification.waitlist_entry_id);

        let response = self
            .client
            .post(&self.url)
            .json(&notification)
            .send()
            .await
            .context("notification webhook unreachable")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("notification webhook returned {}: {}", status, body));
        }
        Ok(())
    }

    fn channel(&self) -> &'static str {
        "webhook"
    }
}

/// Webhook delivery when `NOTIFICATION_WEBHOOK_URL` is set, log-only otherwise.
pub fn dispatcher_from_config(config: &AppConfig) -> Arc<dyn NotificationDispatch> {
    match config.notification_webhook_url.as_deref() {
        Some(url) if !url.trim().is_empty() => Arc::new(WebhookDispatch::new(url)),
        _ => Arc::new(LogDispatch),
    }
}
