//! Auto-capture Core Library
//!
//! Session orchestration for unattended hardware video capture: a poll loop
//! watches the capture device's signal, starts a recording when a valid signal
//! appears, stops it when the signal changes or disappears, and restarts when
//! the configuration file is edited.
//!
//! # Example
//!
//! ```no_run
//! use auto_capture_core::{
//!     ControllerSettings, CoreResult, DeviceLayer, ExitStatus, NotificationQueue, QueueSettings,
//!     NotificationTransport, Recorder, RecordingExecutor, SessionController,
//! };
//!
//! use std::{sync::Arc, time::Duration};
//!
//! use tokio_util::sync::CancellationToken;
//!
//! async fn capture<D: DeviceLayer>(
//!     settings: ControllerSettings,
//!     device: D,
//!     recorder: Arc<dyn Recorder>,
//!     transport: Arc<dyn NotificationTransport>,
//! ) -> CoreResult<ExitStatus> {
//!     let mut queue = NotificationQueue::new(transport, QueueSettings::default());
//!     let notifier = queue.start();
//!     let executor = RecordingExecutor::new(recorder, Duration::from_secs(10));
//!
//!     let controller =
//!         SessionController::new(settings, device, executor, notifier, CancellationToken::new());
//!     let status = controller.run().await?;
//!
//!     queue.stop().await;
//!     Ok(status)
//! }
//! ```

mod device;
mod error;
mod exit_status;
mod fingerprint;
mod notify;
mod recording;
mod session;
mod signal;
mod timestamp;

pub use {
    device::{
        AudioVolume, DeviceDescriptor, DeviceLayer, DeviceTarget, HotplugEvent, HotplugSink,
        VideoDevicePath,
    },
    error::CaptureError,
    error::Result as CoreResult,
    exit_status::ExitStatus,
    fingerprint::{ConfigFingerprint, changed as fingerprint_changed, fingerprint},
    notify::{
        NotificationLevel, NotificationMessage, NotificationQueue, NotificationTransport,
        Notifier, QueueSettings,
    },
    recording::{Recorder, RecordingExecutor, RecordingJob, RecordingTask},
    session::{
        ControllerSettings, CycleAction, CycleReport, DeviceOverrides, Session, SessionController,
        SessionLog, SessionState, StopReason,
    },
    signal::{DeviceIdentity, MAX_SIGNAL_DIMENSION, SignalStatus},
    timestamp::{expand_out_path, session_stamp},
};

/// Crate version reported in notifications and session logs.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests;
