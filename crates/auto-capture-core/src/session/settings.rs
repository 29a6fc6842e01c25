use crate::device::{AudioVolume, DeviceTarget};

use std::{path::PathBuf, time::Duration};

/// Explicit device paths from configuration. Each one wins over auto-detection.
#[derive(Debug, Clone, Default)]
pub struct DeviceOverrides {
    /// Video node to record from.
    pub video_path: Option<String>,
    /// Audio input to record from.
    pub audio_input: Option<String>,
    /// Audio input to fall back to when auto-detection finds nothing.
    pub audio_hint: Option<String>,
}

/// Everything the session controller needs besides its collaborators.
#[derive(Debug, Clone)]
pub struct ControllerSettings {
    /// Name used in notifications and session logs.
    pub app_name: String,
    /// Which capture device to follow.
    pub target: DeviceTarget,
    /// Explicit device paths.
    pub overrides: DeviceOverrides,
    /// Whether sessions record an audio input.
    pub audio_enabled: bool,
    /// Mixer levels applied to an auto-detected audio input card.
    pub audio_volumes: Vec<AudioVolume>,
    /// Pause between poll cycles.
    pub poll_interval: Duration,
    /// Configuration file watched for edits.
    pub config_path: PathBuf,
    /// Output directory template with `{year}` and `{month}` placeholders.
    pub out_path_template: String,
    /// Write a dedicated log file per session.
    pub session_log_enabled: bool,
    /// How long a dead recorder is left alone before a replacement starts.
    pub recovery_timeout: Duration,
}
