#[allow(clippy::module_inception)]
mod config;
mod conduct_config;
mod ffmpeg_config;
mod notification_config;
mod recorder_config;
mod session_log_config;

pub(crate) use {
    conduct_config::ConductConfig,
    config::{Config, expand_env},
    ffmpeg_config::{FfmpegConfig, parse_volume_level, sub_device_control},
    notification_config::NotificationConfig,
    recorder_config::RecorderConfig,
    session_log_config::SessionLogConfig,
};

pub(crate) const AUTO: &str = "auto";
pub(crate) const DEFAULT_VIDEO_DEVICE_PATH_PATTERN: &str = "/dev/video*";
pub(crate) const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;
pub(crate) const DEFAULT_STOP_TIMEOUT_MS: u64 = 10_000;
pub(crate) const DEFAULT_STOP_GRACE_MS: u64 = 5_000;
pub(crate) const DEFAULT_RECOVERY_TIMEOUT_SECS: u64 = 60;
pub(crate) const DEFAULT_QUEUE_CAPACITY: usize = 64;
pub(crate) const DEFAULT_DRAIN_TIMEOUT_MS: u64 = 5_000;
pub(crate) const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
pub(crate) const DEFAULT_DUCT_BIN: &str = "duct";
pub(crate) const DEFAULT_DUCT_CMD: &str =
    "{duct_bin} --output-prefix {prefix} --sample-interval 1 --report-interval 60 {ffmpeg_cmd}";

pub(crate) fn default_auto() -> String {
    AUTO.to_string()
}

pub(crate) fn default_true() -> bool {
    true
}

pub(crate) fn default_video_device_path_pattern() -> String {
    DEFAULT_VIDEO_DEVICE_PATH_PATTERN.to_string()
}

pub(crate) fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

pub(crate) fn default_stop_timeout_ms() -> u64 {
    DEFAULT_STOP_TIMEOUT_MS
}

pub(crate) fn default_stop_grace_ms() -> u64 {
    DEFAULT_STOP_GRACE_MS
}

pub(crate) fn default_recovery_timeout_secs() -> u64 {
    DEFAULT_RECOVERY_TIMEOUT_SECS
}

pub(crate) fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}

pub(crate) fn default_drain_timeout_ms() -> u64 {
    DEFAULT_DRAIN_TIMEOUT_MS
}

pub(crate) fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

pub(crate) fn default_id() -> u32 {
    1
}

pub(crate) fn default_min_level() -> String {
    "info".to_string()
}

pub(crate) fn default_duct_bin() -> String {
    DEFAULT_DUCT_BIN.to_string()
}

pub(crate) fn default_duct_cmd() -> String {
    DEFAULT_DUCT_CMD.to_string()
}
