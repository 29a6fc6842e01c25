use crate::config::{
    DEFAULT_RECOVERY_TIMEOUT_SECS, DEFAULT_STOP_GRACE_MS, DEFAULT_STOP_TIMEOUT_MS,
    default_recovery_timeout_secs, default_stop_grace_ms, default_stop_timeout_ms,
};

use std::time::Duration;

use serde::Deserialize;

/// Recorder supervision timings.
#[derive(Debug, Clone, Deserialize)]
pub struct RecorderConfig {
    /// Upper bound on joining a stopped recording task.
    #[serde(default = "default_stop_timeout_ms")]
    pub stop_timeout_ms: u64,

    /// How long ffmpeg gets to quit on its own before it is killed.
    #[serde(default = "default_stop_grace_ms")]
    pub stop_grace_ms: u64,

    /// How long a dead recorder is left alone before it is restarted.
    #[serde(default = "default_recovery_timeout_secs")]
    pub recovery_timeout_secs: u64,
}

impl RecorderConfig {
    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }

    pub fn stop_grace(&self) -> Duration {
        Duration::from_millis(self.stop_grace_ms)
    }

    pub fn recovery_timeout(&self) -> Duration {
        Duration::from_secs(self.recovery_timeout_secs)
    }
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            stop_timeout_ms: DEFAULT_STOP_TIMEOUT_MS,
            stop_grace_ms: DEFAULT_STOP_GRACE_MS,
            recovery_timeout_secs: DEFAULT_RECOVERY_TIMEOUT_SECS,
        }
    }
}
