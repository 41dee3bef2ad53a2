// lib/src/notifications.rs
// Outbound SMS and email. Delivery never decides the outcome of the request
// that triggered it; failures are logged and dropped.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::NotificationConfig;
use crate::errors::{LabError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Sms,
    Email,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub channel: Channel,
    pub to: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    pub body: String,
}

impl Notification {
    pub fn sms(to: impl Into<String>, body: impl Into<String>) -> Self {
        Self { channel: Channel::Sms, to: to.into(), subject: None, body: body.into() }
    }

    pub fn email(to: impl Into<String>, subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            channel: Channel::Email,
            to: to.into(),
            subject: Some(subject.into()),
            body: body.into(),
        }
    }
}

#[async_trait]
pub trait Notifier: Send + Sync + 'static {
    async fn send(&self, notification: Notification) -> Result<()>;
}

/// Writes notifications to the log instead of delivering them.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, notification: Notification) -> Result<()> {
        info!(
            channel = ?notification.channel,
            to = %notification.to,
            "Notification: {}",
            notification.body
        );
        Ok(())
    }
}

/// Posts notifications as JSON to an HTTP gateway that relays SMS and email.
#[derive(Debug, Clone)]
pub struct GatewayNotifier {
    client: Client,
    endpoint: String,
}

impl GatewayNotifier {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, endpoint: endpoint.into() })
    }
}

#[async_trait]
impl Notifier for GatewayNotifier {
    async fn send(&self, notification: Notification) -> Result<()> {
        let response = self.client.post(&self.endpoint).json(&notification).send().await?;
        if !response.status().is_success() {
            return Err(LabError::Upstream(format!(
                "Notification gateway answered {}",
                response.status()
            )));
        }
        debug!(to = %notification.to, "Notification accepted by gateway");
        Ok(())
    }
}

/// Keeps every notification in memory. Used by tests to observe what would
/// have been sent, reset links included.
#[derive(Debug, Default, Clone)]
pub struct OutboxNotifier {
    sent: Arc<Mutex<Vec<Notification>>>,
}

impl OutboxNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn sent(&self) -> Vec<Notification> {
        self.sent.lock().await.clone()
    }

    pub async fn last_to(&self, to: &str) -> Option<Notification> {
        self.sent.lock().await.iter().rev().find(|n| n.to == to).cloned()
    }
}

#[async_trait]
impl Notifier for OutboxNotifier {
    async fn send(&self, notification: Notification) -> Result<()> {
        self.sent.lock().await.push(notification);
        Ok(())
    }
}

/// Picks the gateway when one is configured, the log otherwise.
pub fn notifier_from_config(config: &NotificationConfig) -> Result<Arc<dyn Notifier>> {
    match &config.gateway_url {
        Some(url) => {
            info!("Notifications go through gateway {}", url);
            Ok(Arc::new(GatewayNotifier::new(
                url.clone(),
                Duration::from_secs(config.timeout_secs),
            )?))
        }
        None => Ok(Arc::new(LogNotifier)),
    }
}

/// Sends in a background task. The caller's response does not wait for it.
pub fn dispatch_detached(notifier: Arc<dyn Notifier>, notification: Notification) -> JoinHandle<()> {
    tokio::spawn(async move {
        let to = notification.to.clone();
        if let Err(e) = notifier.send(notification).await {
            warn!("Failed to notify {}: {}", to, e);
        }
    })
}
