use std::path::PathBuf;

use error_location::ErrorLocation;
use thiserror::Error;

/// Capture orchestration errors with source location tracking.
#[derive(Error, Debug)]
pub enum CaptureError {
    /// Configuration source could not be read for fingerprinting.
    #[error("Failed to read config {path:?}: {source} {location}")]
    ConfigRead {
        /// Path of the configuration source.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Device layer could not be initialized.
    #[error("Device layer init failed: {reason} {location}")]
    DeviceInit {
        /// Description of the failure.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Device enumeration or channel operation failed.
    #[error("Device error: {reason} {location}")]
    Device {
        /// Description of the device error.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Signal status could not be queried from an open channel.
    #[error("Signal query failed: {reason} {location}")]
    SignalQuery {
        /// Description of the failure.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Hot-plug registration failed.
    #[error("Hot-plug registration failed: {reason} {location}")]
    Hotplug {
        /// Description of the failure.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// A recording could not be started.
    #[error("Recording start failed: {reason} {location}")]
    RecordingStart {
        /// Description of the failure.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// A running recording failed or could not be stopped cleanly.
    #[error("Recording error: {reason} {location}")]
    Recording {
        /// Description of the failure.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// A notification could not be delivered.
    #[error("Notification delivery failed: {reason} {location}")]
    Delivery {
        /// Description of the failure.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Session log file operation failed.
    #[error("Session log error for {path:?}: {source} {location}")]
    SessionLog {
        /// Path of the session log file.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
        /// Source location where error occurred.
        location: ErrorLocation,
    },
}

/// Result type alias using [`CaptureError`].
pub type Result<T> = std::result::Result<T, CaptureError>;
