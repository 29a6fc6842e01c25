use crate::signal::{DeviceIdentity, SignalStatus};

use std::{fmt, path::PathBuf};

use chrono::{DateTime, Local};

/// Recording state of the session controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Waiting for a valid signal.
    Idle,
    /// A recording task owns the capture device.
    Recording,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Idle => f.write_str("Idle"),
            SessionState::Recording => f.write_str("Recording"),
        }
    }
}

/// One continuous recording episode.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    /// Monotonic id within one controller run.
    pub id: u64,
    /// Local wall-clock start time.
    pub started_at: DateTime<Local>,
    /// `started_at` rendered for file names.
    pub start_stamp: String,
    /// Signal snapshot that triggered the session.
    pub signal: SignalStatus,
    /// Capture device being recorded.
    pub device: DeviceIdentity,
    /// Video node handed to the recorder.
    pub video_path: String,
    /// USB bus info of the video device, `N/A` when overridden.
    pub bus_info: String,
    /// Audio input handed to the recorder, if audio is enabled.
    pub audio_input: Option<String>,
    /// Directory the recording is written into.
    pub output_dir: PathBuf,
    /// True when started by auto-recovery after the recorder died.
    pub recovered: bool,
}

/// Why a recording session was stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// The remembered device instance reported a hot-plug departure.
    DeviceDisconnected {
        /// Instance path that left.
        instance_path: String,
    },
    /// No matching capture device was found.
    NoChannel,
    /// Signal geometry outside the accepted range.
    InvalidResolution {
        /// Reported width.
        width: i32,
        /// Reported height.
        height: i32,
    },
    /// Width or height differ from the previous cycle.
    SignalChanged,
    /// Recorder died and is being replaced.
    RecorderExited,
    /// Configuration file edited; the loop restarts.
    ConfigChanged,
    /// Loop cancelled from outside.
    Terminated,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::DeviceDisconnected { .. } => f.write_str("device disconnected"),
            StopReason::NoChannel => f.write_str("no channel"),
            StopReason::InvalidResolution { width, height } => {
                write!(f, "invalid resolution {width}x{height}")
            }
            StopReason::SignalChanged => f.write_str("signal changed"),
            StopReason::RecorderExited => f.write_str("recorder exited"),
            StopReason::ConfigChanged => f.write_str("config changed"),
            StopReason::Terminated => f.write_str("program terminated"),
        }
    }
}
