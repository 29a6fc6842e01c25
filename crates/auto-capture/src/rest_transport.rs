//! Notification delivery to the monitoring service's message endpoint.

use crate::{AppError, AppResult, config::NotificationConfig};

use auto_capture_core::{CaptureError, CoreResult, NotificationMessage, NotificationTransport};

use std::panic::Location;

use async_trait::async_trait;
use chrono::Local;
use error_location::ErrorLocation;
use reqwest::Client;
use tracing::debug;

const SEND_MESSAGE_PATH: &str = "/message/send_message";
const API_KEY_HEADER: &str = "X-Api-Key";
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// POSTs each message to `{api_base_url}/message/send_message`.
pub(crate) struct RestTransport {
    client: Client,
    url: String,
    api_key: String,
    category: u32,
    level: u32,
    device: u32,
    provider: u32,
}

impl RestTransport {
    /// Build the HTTP client from the notification settings.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::ConfigError`] if the client cannot be constructed.
    #[track_caller]
    pub fn new(config: &NotificationConfig) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .danger_accept_invalid_certs(!config.verify_ssl_cert)
            .build()
            .map_err(|e| AppError::ConfigError {
                reason: format!("Failed to build HTTP client: {e}"),
                location: ErrorLocation::from(Location::caller()),
            })?;

        Ok(Self {
            client,
            url: send_message_url(&config.api_base_url),
            api_key: config.api_key.clone(),
            category: config.message_category_id,
            level: config.message_level_id,
            device: config.device_id,
            provider: config.data_provider_id,
        })
    }

    /// Query parameters for `message`, in the order the endpoint documents them.
    pub(crate) fn query(&self, message: &NotificationMessage) -> Vec<(&'static str, String)> {
        vec![
            ("category", self.category.to_string()),
            ("level", self.level.to_string()),
            ("device", self.device.to_string()),
            ("provider", self.provider.to_string()),
            ("description", message.text.clone()),
            (
                "event_on",
                message.enqueued_at.format(TIME_FORMAT).to_string(),
            ),
            ("registered_on", Local::now().format(TIME_FORMAT).to_string()),
        ]
    }
}

#[async_trait]
impl NotificationTransport for RestTransport {
    async fn send(&self, message: &NotificationMessage) -> CoreResult<()> {
        let mut request = self.client.post(&self.url).query(&self.query(message));

        if !self.api_key.is_empty() {
            request = request.header(API_KEY_HEADER, &self.api_key);
        }

        let response = request.send().await.map_err(|e| CaptureError::Delivery {
            reason: format!("request to {} failed: {e}", self.url),
            location: ErrorLocation::from(Location::caller()),
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CaptureError::Delivery {
                reason: format!("{} returned {status}: {body}", self.url),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        debug!(status = %status, "Notification accepted");
        Ok(())
    }
}

/// Join the base URL and the send endpoint without doubling the slash.
pub(crate) fn send_message_url(base: &str) -> String {
    format!("{}{SEND_MESSAGE_PATH}", base.trim_end_matches('/'))
}
