use crate::{CoreResult, session::Session};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Launches the external recorder for a session.
#[async_trait]
pub trait Recorder: Send + Sync {
    /// Start recording `session`.
    ///
    /// Errors here mean nothing was started (device busy, encoder missing)
    /// and the controller stays idle for this cycle.
    async fn launch(&self, session: &Session) -> CoreResult<Box<dyn RecordingJob>>;
}

/// A launched recording, supervised on its own task.
#[async_trait]
pub trait RecordingJob: Send {
    /// Drive the recording until it exits on its own or `cancel` fires.
    ///
    /// Must not return while the underlying recorder still holds the device.
    async fn run(self: Box<Self>, cancel: CancellationToken) -> CoreResult<()>;
}
