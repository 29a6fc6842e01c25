use crate::config::default_true;

use serde::Deserialize;

/// Per-session log file settings.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionLogConfig {
    /// Write `<start_ts>.log` next to each recording.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for SessionLogConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}
