//! Auto-Capture: unattended recording from a USB video capture box.

mod app;
mod cli;
mod command;
mod config;
mod error;
mod ffmpeg_recorder;
mod instance_tag;
mod rest_transport;
mod shutdown_signal;
#[cfg(test)]
mod tests;
mod v4l2;

pub(crate) use {
    app::App,
    cli::{Cli, Paths},
    error::{AppError, Result as AppResult},
    ffmpeg_recorder::FfmpegRecorder,
    rest_transport::RestTransport,
    v4l2::V4l2DeviceLayer,
};

use std::{panic::Location, path::Path};

use clap::Parser;
use error_location::ErrorLocation;
use tracing::{error, info};
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::EnvFilter;

/// Application entry point.
fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() { error::EX_USAGE } else { 0 };
            let _ = e.print();
            std::process::exit(code);
        }
    };

    let guard = match init_logging(&cli) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(e.exit_code());
        }
    };

    let code = run(cli);

    // Flush the file writer before exiting; process::exit skips destructors.
    drop(guard);
    std::process::exit(code);
}

fn run(cli: Cli) -> i32 {
    let app = match App::new(&cli) {
        Ok(app) => app,
        Err(e) => {
            error!(error = %e, "Invalid command line");
            return e.exit_code();
        }
    };

    if cli.list_devices {
        return match app.list_devices() {
            Ok(()) => 0,
            Err(e) => {
                error!(error = %e, "Failed to list capture devices");
                e.exit_code()
            }
        };
    }

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            error!(error = ?e, "Failed to create tokio runtime");
            return error::EX_FAILURE;
        }
    };

    match runtime.block_on(app.run()) {
        Ok(status) => {
            info!(status = %status, code = status.code(), "Exiting");
            status.code()
        }
        Err(e) => {
            error!(error = %e, "Capture failed");
            e.exit_code()
        }
    }
}

/// Install the tracing subscriber. `RUST_LOG` overrides the verbosity flag.
#[track_caller]
fn init_logging(cli: &Cli) -> AppResult<Option<WorkerGuard>> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_filter()));

    let Some(path) = &cli.file_log else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .try_init()
            .map_err(|e| AppError::Logging {
                reason: e.to_string(),
                location: ErrorLocation::from(Location::caller()),
            })?;
        return Ok(None);
    };

    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let file_name = path.file_name().ok_or_else(|| AppError::Usage {
        reason: format!("--file-log {} is not a file path", path.display()),
        location: ErrorLocation::from(Location::caller()),
    })?;

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name.to_string_lossy())
        .build(dir)
        .map_err(|e| AppError::Logging {
            reason: format!("cannot open {}: {e}", path.display()),
            location: ErrorLocation::from(Location::caller()),
        })?;
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .map_err(|e| AppError::Logging {
            reason: e.to_string(),
            location: ErrorLocation::from(Location::caller()),
        })?;

    Ok(Some(guard))
}
