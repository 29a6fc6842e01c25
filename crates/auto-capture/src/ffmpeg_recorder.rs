//! [`Recorder`] that runs one `ffmpeg` process per session.

use crate::{
    command::run_bounded,
    config::{ConductConfig, FfmpegConfig},
};

use auto_capture_core::{
    CaptureError, CoreResult, Notifier, Recorder, RecordingJob, Session, session_stamp,
};

use std::{
    panic::Location,
    path::{Path, PathBuf},
    process::{ExitStatus, Stdio},
    time::Duration,
};

use async_trait::async_trait;
use chrono::Local;
use error_location::ErrorLocation;
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    process::{Child, ChildStderr, Command},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

const FFMPEG: &str = "ffmpeg";
const DUCT_VERSION_PREFIX: &str = "duct ";
const DUCT_CHECK_TIMEOUT: Duration = Duration::from_secs(5);
const DUCT_REPORTS: [&str; 2] = ["info.json", "usage.json"];

/// Launches `ffmpeg` with the configured option fragments.
pub(crate) struct FfmpegRecorder {
    app_name: String,
    options: FfmpegConfig,
    conduct: ConductConfig,
    instance_tag: String,
    stop_grace: Duration,
    notifier: Notifier,
}

impl FfmpegRecorder {
    pub fn new(
        app_name: &str,
        options: FfmpegConfig,
        conduct: ConductConfig,
        instance_tag: String,
        stop_grace: Duration,
        notifier: Notifier,
    ) -> Self {
        Self {
            app_name: app_name.to_string(),
            options,
            conduct,
            instance_tag,
            stop_grace,
            notifier,
        }
    }
}

#[async_trait]
impl Recorder for FfmpegRecorder {
    #[instrument(skip(self, session), fields(session_id = session.id))]
    async fn launch(&self, session: &Session) -> CoreResult<Box<dyn RecordingJob>> {
        let out_file = recording_path(
            &session.output_dir,
            &session.start_stamp,
            None,
            &self.options.out_fmt,
        );
        let args = ffmpeg_args(&self.options, session, &self.instance_tag, &out_file);
        let duct_prefix = self.conduct.enabled.then(|| conduct_prefix(&out_file));

        let (program, args) = match &duct_prefix {
            Some(prefix) => conduct_command(&self.conduct, &session.start_stamp, prefix, &args),
            None => (FFMPEG.to_string(), args),
        };

        info!(command = %format!("{program} {}", args.join(" ")), "Starting recorder");

        let mut child = Command::new(&program)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| CaptureError::RecordingStart {
                reason: format!("failed to spawn {program}: {e}"),
                location: ErrorLocation::from(Location::caller()),
            })?;

        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_stderr(session.id, stderr));
        }

        Ok(Box::new(FfmpegJob {
            app_name: self.app_name.clone(),
            session_id: session.id,
            start_stamp: session.start_stamp.clone(),
            output_dir: session.output_dir.clone(),
            out_fmt: self.options.out_fmt.clone(),
            out_file,
            duct_prefix,
            child,
            stop_grace: self.stop_grace,
            notifier: self.notifier.clone(),
        }))
    }
}

/// One running `ffmpeg` process.
struct FfmpegJob {
    app_name: String,
    session_id: u64,
    start_stamp: String,
    output_dir: PathBuf,
    out_fmt: String,
    out_file: PathBuf,
    duct_prefix: Option<String>,
    child: Child,
    stop_grace: Duration,
    notifier: Notifier,
}

#[async_trait]
impl RecordingJob for FfmpegJob {
    async fn run(mut self: Box<Self>, cancel: CancellationToken) -> CoreResult<()> {
        let exited = tokio::select! {
            status = self.child.wait() => Some(status),
            _ = cancel.cancelled() => None,
        };
        let outcome = match exited {
            Some(status) => Exit::OnItsOwn(status),
            None => Exit::Requested(self.quit().await),
        };

        let saved = self.finalize().await;

        match outcome {
            Exit::Requested(Ok(status)) => {
                info!(session_id = self.session_id, status = %status, "Recorder stopped");
                Ok(())
            }
            Exit::Requested(Err(e)) | Exit::OnItsOwn(Err(e)) => Err(CaptureError::Recording {
                reason: format!("waiting for {FFMPEG} failed: {e}"),
                location: ErrorLocation::from(Location::caller()),
            }),
            Exit::OnItsOwn(Ok(status)) => {
                warn!(
                    session_id = self.session_id,
                    status = %status,
                    saved = ?saved,
                    "Recorder exited on its own"
                );
                if status.success() {
                    Ok(())
                } else {
                    Err(CaptureError::Recording {
                        reason: format!("{FFMPEG} exited with {status}"),
                        location: ErrorLocation::from(Location::caller()),
                    })
                }
            }
        }
    }
}

enum Exit {
    OnItsOwn(std::io::Result<ExitStatus>),
    Requested(std::io::Result<ExitStatus>),
}

impl FfmpegJob {
    /// Ask ffmpeg to finish the file with `q`, killing it after the grace period.
    async fn quit(&mut self) -> std::io::Result<ExitStatus> {
        if let Some(mut stdin) = self.child.stdin.take() {
            if let Err(e) = stdin.write_all(b"q").await {
                debug!(session_id = self.session_id, error = %e, "Recorder stdin closed");
            }
            drop(stdin);
        }

        match tokio::time::timeout(self.stop_grace, self.child.wait()).await {
            Ok(status) => status,
            Err(_) => {
                warn!(
                    session_id = self.session_id,
                    grace_ms = self.stop_grace.as_millis(),
                    "Recorder ignored quit request, killing"
                );
                self.child.kill().await?;
                self.child.wait().await
            }
        }
    }

    /// Rename `<start>--.<fmt>` to `<start>--<stop>.<fmt>` and announce it.
    async fn finalize(&self) -> Option<PathBuf> {
        let stop_stamp = session_stamp(&Local::now());
        let target = recording_path(
            &self.output_dir,
            &self.start_stamp,
            Some(&stop_stamp),
            &self.out_fmt,
        );

        if tokio::fs::metadata(&self.out_file).await.is_err() {
            warn!(
                session_id = self.session_id,
                path = ?self.out_file,
                "Recorder left no output file"
            );
            return None;
        }

        if let Err(e) = tokio::fs::rename(&self.out_file, &target).await {
            error!(
                session_id = self.session_id,
                from = ?self.out_file,
                to = ?target,
                error = %e,
                "Failed to rename recording"
            );
            return None;
        }

        if let Some(old_prefix) = &self.duct_prefix {
            rename_conduct_reports(self.session_id, old_prefix, &conduct_prefix(&target)).await;
        }

        info!(session_id = self.session_id, path = ?target, "Saved recording");
        self.notifier.info(format!(
            "{} session {} end, saved to {}",
            self.app_name,
            self.start_stamp,
            target.display()
        ));

        Some(target)
    }
}

/// Move con/duct reports along with the recording they describe.
async fn rename_conduct_reports(session_id: u64, old_prefix: &str, new_prefix: &str) {
    for report in DUCT_REPORTS {
        let from = format!("{old_prefix}{report}");
        if tokio::fs::metadata(&from).await.is_err() {
            continue;
        }
        let to = format!("{new_prefix}{report}");
        match tokio::fs::rename(&from, &to).await {
            Ok(()) => info!(session_id, from = %from, to = %to, "Renamed con/duct report"),
            Err(e) => warn!(session_id, from = %from, error = %e, "Failed to rename con/duct report"),
        }
    }
}

/// Verify the con/duct executable answers `--version` like con/duct does.
///
/// # Errors
///
/// Returns [`CaptureError::DeviceInit`] when wrapping is enabled and the tool is missing or foreign.
#[track_caller]
pub(crate) fn check_conduct(conduct: &ConductConfig) -> CoreResult<()> {
    if !conduct.enabled {
        debug!("con/duct wrapping disabled");
        return Ok(());
    }

    let unavailable = |reason: String| CaptureError::DeviceInit {
        reason,
        location: ErrorLocation::from(Location::caller()),
    };

    let version = run_bounded(&conduct.duct_bin, &["--version"], DUCT_CHECK_TIMEOUT)
        .map_err(|e| unavailable(format!("con/duct not usable: {e}")))?;

    if !is_duct_version(&version) {
        return Err(unavailable(format!(
            "{} is not con/duct (reported {:?}), install it with 'pip install con-duct'",
            conduct.duct_bin,
            version.trim()
        )));
    }

    info!(duct_bin = %conduct.duct_bin, version = %version.trim(), "con/duct found");
    Ok(())
}

pub(crate) fn is_duct_version(output: &str) -> bool {
    output.trim_start().starts_with(DUCT_VERSION_PREFIX)
}

/// Prefix of the con/duct report files for a recording.
pub(crate) fn conduct_prefix(out_file: &Path) -> String {
    format!("{}.duct_", out_file.display())
}

/// Program and arguments running `ffmpeg_args` under the con/duct template.
///
/// The template is split on whitespace; `{ffmpeg_cmd}` expands to the whole
/// recorder command while the other macros are substituted inside their word.
pub(crate) fn conduct_command(
    conduct: &ConductConfig,
    start_stamp: &str,
    prefix: &str,
    ffmpeg_args: &[String],
) -> (String, Vec<String>) {
    let mut words = Vec::new();
    for word in conduct.cmd.split_whitespace() {
        if word == "{ffmpeg_cmd}" {
            words.push(FFMPEG.to_string());
            words.extend(ffmpeg_args.iter().cloned());
        } else {
            words.push(
                word.replace("{duct_bin}", &conduct.duct_bin)
                    .replace("{start_ts}", start_stamp)
                    .replace("{prefix}", prefix),
            );
        }
    }

    match words.split_first() {
        Some((program, rest)) => (program.clone(), rest.to_vec()),
        None => (FFMPEG.to_string(), ffmpeg_args.to_vec()),
    }
}

async fn forward_stderr(session_id: u64, stderr: ChildStderr) {
    let mut lines = BufReader::new(stderr).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => debug!(session_id, "ffmpeg: {}", line),
            Ok(None) => break,
            Err(e) => {
                debug!(session_id, error = %e, "ffmpeg stderr closed");
                break;
            }
        }
    }
}

/// `<dir>/<start>--<stop>.<fmt>`; the stop part is empty while recording.
pub(crate) fn recording_path(
    dir: &Path,
    start: &str,
    stop: Option<&str>,
    out_fmt: &str,
) -> PathBuf {
    dir.join(format!("{start}--{}.{out_fmt}", stop.unwrap_or_default()))
}

/// Full `ffmpeg` argument list for `session`, writing to `out_file`.
///
/// Option fragments are split on whitespace; device paths and signal values
/// are passed as single arguments. Audio inputs and encoder options are left
/// out when the session has no audio input.
pub(crate) fn ffmpeg_args(
    options: &FfmpegConfig,
    session: &Session,
    instance_tag: &str,
    out_file: &Path,
) -> Vec<String> {
    let mut args: Vec<String> = Vec::new();
    let split = |args: &mut Vec<String>, fragment: &str| {
        args.extend(fragment.split_whitespace().map(str::to_string));
    };

    if let Some(audio) = &session.audio_input {
        split(&mut args, &options.a_fmt);
        split(&mut args, &options.a_nchan);
        split(&mut args, &options.a_opt);
        args.push("-i".to_string());
        args.push(audio.clone());
    }

    split(&mut args, &options.v_fmt);
    args.push("-framerate".to_string());
    args.push(session.signal.frame_rate_label());
    args.push("-video_size".to_string());
    args.push(format!("{}x{}", session.signal.width, session.signal.height));
    split(&mut args, &options.v_opt);
    args.push("-i".to_string());
    args.push(session.video_path.clone());
    split(&mut args, &options.v_enc);
    split(&mut args, &options.pix_fmt);
    split(&mut args, &options.n_threads);

    if session.audio_input.is_some() {
        split(&mut args, &options.a_enc);
    }

    args.push("-metadata".to_string());
    args.push(format!("comment={instance_tag}"));
    args.push(out_file.to_string_lossy().into_owned());

    args
}
