//! User-visible notifications
//!
//! The coordinator raises one persistent alert when manual
//! re-authentication is needed and dismisses it after the next successful
//! cycle. Sinks must treat `id` as idempotent.

use crate::config::settings::NotifySettings;
use crate::utils::service_user_agent;
use crate::{Error, Result};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Title of the re-authentication alert
pub const REAUTH_TITLE: &str = "Amazon Parent Dashboard - Authentication Required";

/// Body of the re-authentication alert
pub const REAUTH_MESSAGE: &str = "Your Amazon Parent Dashboard session has expired and could not be renewed automatically.\n\n\
To re-authenticate:\n\
1. Open the companion service web UI\n\
2. Log in to your Amazon account again\n\
3. The integration will pick up the new session automatically within a few minutes";

/// Destination for persistent alerts
#[async_trait::async_trait]
pub trait NotificationSink: Send + Sync {
    /// Create or update the alert with the given id
    async fn notify(&self, title: &str, message: &str, id: &str) -> Result<()>;

    /// Dismiss the alert with the given id
    async fn clear(&self, id: &str) -> Result<()>;
}

/// Sink that only writes to the log
#[derive(Debug, Default, Clone)]
pub struct LogNotificationSink;

#[async_trait::async_trait]
impl NotificationSink for LogNotificationSink {
    async fn notify(&self, title: &str, message: &str, id: &str) -> Result<()> {
        warn!(notification_id = id, "{}: {}", title, message);
        Ok(())
    }

    async fn clear(&self, id: &str) -> Result<()> {
        info!(notification_id = id, "Notification cleared");
        Ok(())
    }
}

/// Home Assistant persistent notifications
#[derive(Debug, Clone)]
pub struct HomeAssistantSink {
    client: Client,
    base_url: String,
    token: String,
}

impl HomeAssistantSink {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent(service_user_agent())
            .build()
            .map_err(|e| Error::config("notify", &format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    async fn call_service(&self, service: &str, body: serde_json::Value) -> Result<()> {
        let url = format!(
            "{}/api/services/persistent_notification/{}",
            self.base_url, service
        );
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::network(format!("Home Assistant request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::network_status(
                status.as_u16(),
                format!("Home Assistant {} answered {}", service, status),
            ));
        }

        debug!("Home Assistant persistent_notification.{} succeeded", service);
        Ok(())
    }
}

#[async_trait::async_trait]
impl NotificationSink for HomeAssistantSink {
    async fn notify(&self, title: &str, message: &str, id: &str) -> Result<()> {
        self.call_service(
            "create",
            serde_json::json!({
                "title": title,
                "message": message,
                "notification_id": id,
            }),
        )
        .await
    }

    async fn clear(&self, id: &str) -> Result<()> {
        self.call_service("dismiss", serde_json::json!({ "notification_id": id }))
            .await
    }
}

/// Pick the sink described by the `[notify]` settings
pub fn sink_from_settings(settings: &NotifySettings) -> Result<std::sync::Arc<dyn NotificationSink>> {
    match (&settings.home_assistant_url, &settings.token) {
        (Some(url), Some(token)) => {
            info!("Delivering notifications to Home Assistant at {}", url);
            Ok(std::sync::Arc::new(HomeAssistantSink::new(url, token)?))
        }
        _ => Ok(std::sync::Arc::new(LogNotificationSink)),
    }
}
