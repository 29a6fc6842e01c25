use crate::{recording::RecordingJob, session::Session};

use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
    time::{Duration, Instant},
};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Liveness shared between a task handle and its background future.
struct Liveness {
    running: AtomicBool,
    exited_at: Mutex<Option<Instant>>,
}

/// Marks the task exited however its future ends: return, panic or abort.
struct ExitGuard(Arc<Liveness>);

impl Drop for ExitGuard {
    fn drop(&mut self) {
        self.0.running.store(false, Ordering::SeqCst);
        let mut exited = self.0.exited_at.lock().unwrap_or_else(|e| e.into_inner());
        exited.get_or_insert_with(Instant::now);
    }
}

/// Handle to one recording running on its own tokio task.
pub struct RecordingTask {
    session: Session,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
    liveness: Arc<Liveness>,
}

impl RecordingTask {
    pub(crate) fn spawn(session: Session, job: Box<dyn RecordingJob>) -> Self {
        let cancel = CancellationToken::new();
        let liveness = Arc::new(Liveness {
            running: AtomicBool::new(true),
            exited_at: Mutex::new(None),
        });

        let session_id = session.id;
        let guard = ExitGuard(Arc::clone(&liveness));
        let job_cancel = cancel.clone();
        let handle = tokio::spawn(async move {
            let _guard = guard;
            match job.run(job_cancel).await {
                Ok(()) => info!(session_id, "Recording task finished"),
                Err(e) => error!(session_id, error = %e, "Recording task failed"),
            }
        });

        Self {
            session,
            cancel,
            handle,
            liveness,
        }
    }

    /// Session this task records.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// False once the recording future has ended for any reason.
    pub fn is_running(&self) -> bool {
        self.liveness.running.load(Ordering::SeqCst)
    }

    /// How long ago the recording ended, if it has.
    pub fn exited_for(&self) -> Option<Duration> {
        let exited = self
            .liveness
            .exited_at
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        exited.map(|at| at.elapsed())
    }

    /// Signal the recording to stop and wait up to `timeout` for it to finish.
    ///
    /// A task that overruns the timeout is aborted and joined again, so the job
    /// and whatever device or process it owns are dropped before this returns.
    pub(crate) async fn stop(mut self, timeout: Duration) {
        let session_id = self.session.id;
        self.cancel.cancel();

        match tokio::time::timeout(timeout, &mut self.handle).await {
            Ok(Ok(())) => debug!(session_id, "Recording task joined"),
            Ok(Err(e)) if e.is_cancelled() => debug!(session_id, "Recording task already aborted"),
            Ok(Err(e)) => error!(session_id, error = ?e, "Recording task panicked"),
            Err(_) => {
                self.handle.abort();
                if let Err(e) = (&mut self.handle).await {
                    if !e.is_cancelled() {
                        error!(session_id, error = ?e, "Recording task panicked");
                    }
                }
                warn!(
                    session_id,
                    timeout_ms = timeout.as_millis(),
                    "Recording task did not stop within timeout, aborted"
                );
            }
        }
    }
}
