use auto_capture_core::CaptureError;

use std::{panic::Location, result::Result as StdResult};

use error_location::ErrorLocation;
use thiserror::Error;

/// `EX_USAGE` from sysexits.h.
pub(crate) const EX_USAGE: i32 = 64;
/// `EX_UNAVAILABLE` from sysexits.h.
pub(crate) const EX_UNAVAILABLE: i32 = 69;
/// `EX_CANTCREAT` from sysexits.h.
pub(crate) const EX_CANTCREAT: i32 = 73;
/// `EX_CONFIG` from sysexits.h.
pub(crate) const EX_CONFIG: i32 = 78;
/// Generic failure for anything without a dedicated code.
pub(crate) const EX_FAILURE: i32 = 1;

/// Application-level errors for the auto-capture binary.
///
/// All variants include `ErrorLocation` for call-site tracking.
#[derive(Error, Debug)]
pub enum AppError {
    /// Capture orchestration error from auto-capture-core.
    #[error("Capture error: {source} {location}")]
    Capture {
        /// The underlying capture error.
        #[source]
        source: CaptureError,
        /// Location where this error was created.
        location: ErrorLocation,
    },

    /// Invalid command line.
    #[error("Usage error: {reason} {location}")]
    Usage {
        /// Human-readable reason for failure.
        reason: String,
        /// Location where this error was created.
        location: ErrorLocation,
    },

    /// Configuration loading or validation error.
    #[error("Configuration error: {reason} {location}")]
    ConfigError {
        /// Human-readable reason for failure.
        reason: String,
        /// Location where this error was created.
        location: ErrorLocation,
    },

    /// Output directory cannot be created.
    #[error("Cannot create output path {path}: {reason} {location}")]
    OutputPath {
        /// Expanded output directory.
        path: String,
        /// Human-readable reason for failure.
        reason: String,
        /// Location where this error was created.
        location: ErrorLocation,
    },

    /// Logging could not be set up.
    #[error("Logging setup failed: {reason} {location}")]
    Logging {
        /// Human-readable reason for failure.
        reason: String,
        /// Location where this error was created.
        location: ErrorLocation,
    },

    /// IO error from filesystem operations.
    #[error("IO error: {source} {location}")]
    IoError {
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
        /// Location where this error was created.
        location: ErrorLocation,
    },
}

impl AppError {
    /// Process exit code reported for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::Capture {
                source: CaptureError::DeviceInit { .. },
                ..
            } => EX_UNAVAILABLE,
            AppError::Usage { .. } => EX_USAGE,
            AppError::ConfigError { .. } => EX_CONFIG,
            AppError::OutputPath { .. } => EX_CANTCREAT,
            AppError::Capture { .. } | AppError::Logging { .. } | AppError::IoError { .. } => {
                EX_FAILURE
            }
        }
    }
}

// Manual From<CaptureError> with location tracking.
// Cannot use #[from] because it does not support extra fields.
impl From<CaptureError> for AppError {
    #[track_caller]
    fn from(source: CaptureError) -> Self {
        AppError::Capture {
            source,
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<std::io::Error> for AppError {
    #[track_caller]
    fn from(source: std::io::Error) -> Self {
        AppError::IoError {
            source,
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

/// Convenience type alias for Results using `AppError`.
pub type Result<T> = StdResult<T, AppError>;
