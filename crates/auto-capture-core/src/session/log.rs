use crate::{CaptureError, CoreResult, session::Session, session::StopReason};

use std::{
    fs::{File, OpenOptions},
    io::{BufWriter, Write},
    panic::Location,
    path::{Path, PathBuf},
};

use chrono::Local;
use error_location::ErrorLocation;
use tracing::debug;

/// Dedicated log file opened at session start and closed at session stop.
pub struct SessionLog {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl SessionLog {
    /// Create the log at `path` and write the session header.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::SessionLog`] if the file cannot be created or written.
    #[track_caller]
    pub fn open<P: AsRef<Path>>(path: P, app_name: &str, session: &Session) -> CoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| CaptureError::SessionLog {
                path: path.clone(),
                source,
                location: ErrorLocation::from(Location::caller()),
            })?;

        let mut log = Self {
            path,
            writer: BufWriter::new(file),
        };

        log.line(&format!(
            "Session logging begin   : {} {}, session {}, start_ts={}{}",
            app_name,
            crate::VERSION,
            session.id,
            session.start_stamp,
            if session.recovered { ", recovered" } else { "" }
        ))?;
        log.line(&format!(
            "        Video device    : {}, S/N: {}, {}, bus info: {}",
            session.video_path, session.device.serial, session.device.name, session.bus_info
        ))?;
        log.line(&format!(
            "                        : {}x{}, {} fps",
            session.signal.width,
            session.signal.height,
            session.signal.frame_rate_label()
        ))?;
        if let Some(audio) = &session.audio_input {
            log.line(&format!("        Audio-in device : {audio}"))?;
        }
        log.flush()?;

        debug!(path = ?log.path, "Session log opened");

        Ok(log)
    }

    /// Append one timestamped line.
    #[track_caller]
    pub fn line(&mut self, text: &str) -> CoreResult<()> {
        let stamp = Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
        writeln!(self.writer, "[{stamp}] {text}").map_err(|source| CaptureError::SessionLog {
            path: self.path.clone(),
            source,
            location: ErrorLocation::from(Location::caller()),
        })
    }

    /// Write the stop line and close the file.
    #[track_caller]
    pub fn close(mut self, reason: &StopReason) -> CoreResult<PathBuf> {
        self.line(&format!("Session logging end     : {reason}"))?;
        self.flush()?;
        debug!(path = ?self.path, "Session log closed");
        Ok(self.path)
    }

    /// Location of the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[track_caller]
    fn flush(&mut self) -> CoreResult<()> {
        self.writer.flush().map_err(|source| CaptureError::SessionLog {
            path: self.path.clone(),
            source,
            location: ErrorLocation::from(Location::caller()),
        })
    }
}
