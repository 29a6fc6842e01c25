use crate::config::{
    DEFAULT_DRAIN_TIMEOUT_MS, DEFAULT_QUEUE_CAPACITY, DEFAULT_REQUEST_TIMEOUT_SECS,
    default_drain_timeout_ms, default_id, default_min_level, default_queue_capacity,
    default_request_timeout_secs, default_true,
};

use auto_capture_core::{NotificationLevel, QueueSettings};

use std::time::Duration;

use serde::Deserialize;

/// Remote monitoring endpoint and queue settings.
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationConfig {
    /// Send lifecycle notifications at all.
    #[serde(default)]
    pub enabled: bool,

    /// Base URL of the monitoring REST API.
    #[serde(default)]
    pub api_base_url: String,

    /// API key sent as `X-Api-Key`. `${VAR}` is read from the environment.
    #[serde(default)]
    pub api_key: String,

    /// Reject invalid TLS certificates.
    #[serde(default = "default_true")]
    pub verify_ssl_cert: bool,

    #[serde(default = "default_id")]
    pub data_provider_id: u32,

    #[serde(default = "default_id")]
    pub device_id: u32,

    #[serde(default = "default_id")]
    pub message_category_id: u32,

    #[serde(default = "default_id")]
    pub message_level_id: u32,

    /// Undelivered messages kept before new ones are dropped.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// How long shutdown waits for the backlog.
    #[serde(default = "default_drain_timeout_ms")]
    pub drain_timeout_ms: u64,

    /// Per-request HTTP timeout.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Lowest level forwarded: `info`, `warning` or `error`.
    #[serde(default = "default_min_level")]
    pub min_level: String,
}

impl NotificationConfig {
    /// Parsed `min_level`; only valid after [`Config::validate`](crate::config::Config::validate).
    pub fn level(&self) -> NotificationLevel {
        self.min_level.parse().unwrap_or(NotificationLevel::Info)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn queue_settings(&self) -> QueueSettings {
        QueueSettings {
            enabled: self.enabled,
            capacity: self.queue_capacity,
            drain_timeout: Duration::from_millis(self.drain_timeout_ms),
            min_level: self.level(),
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_base_url: String::new(),
            api_key: String::new(),
            verify_ssl_cert: true,
            data_provider_id: default_id(),
            device_id: default_id(),
            message_category_id: default_id(),
            message_level_id: default_id(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            drain_timeout_ms: DEFAULT_DRAIN_TIMEOUT_MS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            min_level: default_min_level(),
        }
    }
}
