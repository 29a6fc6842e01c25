use crate::{
    CoreResult,
    recording::{Recorder, RecordingTask},
    session::Session,
};

use std::{sync::Arc, time::Duration};

use tracing::{info, instrument};

/// Owns at most one active recording and hands the device over safely.
///
/// The capture hardware cannot be opened twice, so `schedule` always retires
/// the outgoing task (stop, join, drop) before a replacement is launched.
/// Both slots are private; `schedule` and `shutdown` are the only mutators.
pub struct RecordingExecutor {
    recorder: Arc<dyn Recorder>,
    current: Option<RecordingTask>,
    previous: Option<RecordingTask>,
    stop_timeout: Duration,
}

impl RecordingExecutor {
    /// Create an empty executor launching jobs through `recorder`.
    pub fn new(recorder: Arc<dyn Recorder>, stop_timeout: Duration) -> Self {
        Self {
            recorder,
            current: None,
            previous: None,
            stop_timeout,
        }
    }

    /// Replace the current recording with `next`, or just stop it when `None`.
    ///
    /// Blocks only for the bounded stop of the outgoing task; the new task is
    /// started and left running in the background.
    ///
    /// # Errors
    ///
    /// Returns the recorder's launch error. The current slot is empty then.
    #[instrument(skip(self, next), fields(next_session = next.as_ref().map(|s| s.id)))]
    pub async fn schedule(&mut self, next: Option<Session>) -> CoreResult<()> {
        self.retire_previous().await;
        self.previous = self.current.take();
        self.retire_previous().await;

        let Some(session) = next else {
            return Ok(());
        };

        let job = self.recorder.launch(&session).await?;
        info!(session_id = session.id, output_dir = ?session.output_dir, "Recording task started");
        self.current = Some(RecordingTask::spawn(session, job));

        Ok(())
    }

    /// The active recording, if any.
    pub fn current(&self) -> Option<&RecordingTask> {
        self.current.as_ref()
    }

    /// Stop everything. Idempotent.
    pub async fn shutdown(&mut self) {
        // `schedule(None)` never launches, so it cannot fail.
        let _ = self.schedule(None).await;
    }

    async fn retire_previous(&mut self) {
        if let Some(task) = self.previous.take() {
            task.stop(self.stop_timeout).await;
        }
    }
}
