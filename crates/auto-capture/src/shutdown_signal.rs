use auto_capture_core::ExitStatus;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Cancel `cancel` on the first SIGINT/SIGTERM; exit immediately on the second.
pub(crate) fn spawn_signal_watcher(cancel: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = termination_requested().await {
            error!(error = %e, "Failed to listen for termination signals");
            return;
        }
        info!("Termination requested, stopping capture");
        cancel.cancel();

        if let Err(e) = termination_requested().await {
            error!(error = %e, "Failed to listen for termination signals");
            return;
        }
        warn!("Second termination signal, exiting without cleanup");
        std::process::exit(ExitStatus::Interrupted.code());
    })
}

#[cfg(unix)]
async fn termination_requested() -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result,
        _ = terminate.recv() => Ok(()),
    }
}

#[cfg(not(unix))]
async fn termination_requested() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}
