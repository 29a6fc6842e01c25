//! Configuration loading for auto-capture.
//!
//! The file is read once per controller run. Edits are picked up by the
//! fingerprint check, which ends the run so the host reloads from scratch.

use crate::{
    AppError, AppResult,
    config::{
        AUTO, ConductConfig, FfmpegConfig, NotificationConfig, RecorderConfig, SessionLogConfig, default_auto,
        default_poll_interval_ms, default_true, default_video_device_path_pattern,
    },
};

use auto_capture_core::{ControllerSettings, DeviceTarget, NotificationLevel};

use std::{fs, panic::Location, path::Path, time::Duration};

use error_location::ErrorLocation;
use regex::Regex;
use serde::Deserialize;
use tracing::{info, instrument};

/// Main configuration struct.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Serial number of the capture device, or `auto` for the first one found.
    pub device_serial_number: String,

    /// Glob matched against video nodes when resolving a device by serial.
    #[serde(default = "default_video_device_path_pattern")]
    pub video_device_path_pattern: String,

    /// Tag embedded in recording metadata; `auto` derives one.
    #[serde(default = "default_auto")]
    pub instance_tag: String,

    /// Record the capture device's audio input.
    #[serde(default = "default_true")]
    pub audio_enabled: bool,

    /// Pause between poll cycles.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Per-session log file.
    #[serde(default)]
    pub session_log: SessionLogConfig,

    /// ffmpeg command line fragments.
    pub ffmpeg: FfmpegConfig,

    /// Recorder supervision timings.
    #[serde(default)]
    pub recorder: RecorderConfig,

    /// Remote monitoring notifications.
    #[serde(default)]
    pub notifications: NotificationConfig,

    /// con/duct wrapping of the recorder command.
    #[serde(default)]
    pub conduct: ConductConfig,
}

impl Config {
    /// Load and validate the configuration at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::ConfigError`] when the file is missing, malformed or invalid.
    #[track_caller]
    #[instrument]
    pub fn load(path: &Path) -> AppResult<Self> {
        let contents = fs::read_to_string(path).map_err(|e| AppError::ConfigError {
            reason: format!("Failed to read config {}: {}", path.display(), e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        let config = Self::parse(&contents, |name| std::env::var(name).ok())?;

        info!(config_path = ?path, "Configuration loaded");

        Ok(config)
    }

    /// Parse, expand and validate TOML `contents`, resolving `${VAR}` through `lookup`.
    #[track_caller]
    pub fn parse(contents: &str, lookup: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        let mut config: Config = toml::from_str(contents).map_err(|e| AppError::ConfigError {
            reason: format!("Failed to parse config: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        config.notifications.api_key = expand_env(&config.notifications.api_key, lookup)?;
        config.validate()?;

        Ok(config)
    }

    /// Reject values the controller cannot run with.
    #[track_caller]
    pub fn validate(&self) -> AppResult<()> {
        let fail = |reason: String| AppError::ConfigError {
            reason,
            location: ErrorLocation::from(Location::caller()),
        };

        if self.ffmpeg.out_fmt.trim().is_empty() {
            return Err(fail("ffmpeg.out_fmt must not be empty".to_string()));
        }

        if self.poll_interval_ms == 0 {
            return Err(fail("poll_interval_ms must be greater than zero".to_string()));
        }

        if self.video_device_path_pattern.trim().is_empty() {
            return Err(fail("video_device_path_pattern must not be empty".to_string()));
        }

        self.ffmpeg.audio_volumes()?;

        if self.conduct.enabled {
            if self.conduct.duct_bin.trim().is_empty() {
                return Err(fail("conduct.duct_bin must not be empty".to_string()));
            }
            if !self.conduct.cmd.contains("{ffmpeg_cmd}") {
                return Err(fail("conduct.cmd must contain {ffmpeg_cmd}".to_string()));
            }
        }

        if self.recorder.stop_grace_ms >= self.recorder.stop_timeout_ms {
            return Err(fail(
                "recorder.stop_grace_ms must be shorter than recorder.stop_timeout_ms".to_string(),
            ));
        }

        let notifications = &self.notifications;
        if notifications.enabled && notifications.api_base_url.trim().is_empty() {
            return Err(fail(
                "notifications.api_base_url is required when notifications are enabled".to_string(),
            ));
        }

        if notifications.queue_capacity == 0 {
            return Err(fail("notifications.queue_capacity must be greater than zero".to_string()));
        }

        notifications
            .min_level
            .parse::<NotificationLevel>()
            .map_err(|e| fail(format!("notifications.min_level: {e}")))?;

        Ok(())
    }

    /// Configured instance tag, or `None` when it should be derived.
    pub fn explicit_instance_tag(&self) -> Option<&str> {
        let tag = self.instance_tag.trim();
        (!tag.is_empty() && tag != AUTO).then_some(tag)
    }

    /// Settings for one controller run.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::ConfigError`] when `ffmpeg.a_vol` is invalid.
    pub fn controller_settings(
        &self,
        app_name: &str,
        config_path: &Path,
        out_path_template: &str,
    ) -> AppResult<ControllerSettings> {
        Ok(ControllerSettings {
            app_name: app_name.to_string(),
            target: DeviceTarget::from_config(&self.device_serial_number),
            overrides: self.ffmpeg.device_overrides(),
            audio_enabled: self.audio_enabled,
            audio_volumes: self.ffmpeg.audio_volumes()?,
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            config_path: config_path.to_path_buf(),
            out_path_template: out_path_template.to_string(),
            session_log_enabled: self.session_log.enabled,
            recovery_timeout: self.recorder.recovery_timeout(),
        })
    }
}

/// Expand a whole-value `${VAR}` reference; anything else is returned unchanged.
///
/// # Errors
///
/// Returns [`AppError::ConfigError`] when the referenced variable is unset.
#[track_caller]
pub fn expand_env(value: &str, lookup: impl Fn(&str) -> Option<String>) -> AppResult<String> {
    let pattern = Regex::new(r"^\$\{([A-Za-z_][A-Za-z0-9_]*)\}$").map_err(|e| {
        AppError::ConfigError {
            reason: format!("Invalid env pattern: {e}"),
            location: ErrorLocation::from(Location::caller()),
        }
    })?;

    let Some(captures) = pattern.captures(value.trim()) else {
        return Ok(value.to_string());
    };

    let name = &captures[1];
    lookup(name).ok_or_else(|| AppError::ConfigError {
        reason: format!("Environment variable {name} is not set"),
        location: ErrorLocation::from(Location::caller()),
    })
}
