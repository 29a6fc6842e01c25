use crate::{
    AppError, AppResult, Cli, FfmpegRecorder, Paths, RestTransport, V4l2DeviceLayer,
    config::Config, ffmpeg_recorder::check_conduct, instance_tag::derive_instance_tag,
    shutdown_signal::spawn_signal_watcher,
};

use auto_capture_core::{
    DeviceLayer, DeviceTarget, ExitStatus, NotificationQueue, RecordingExecutor,
    SessionController, expand_out_path,
};

use std::{fs, panic::Location, sync::Arc};

use chrono::Local;
use error_location::ErrorLocation;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

/// Name reported in notifications, session logs and the instance tag.
pub(crate) const APP_NAME: &str = env!("CARGO_PKG_NAME");

/// Hosts the capture loop and reruns it whenever the config file changes.
pub struct App {
    paths: Paths,
    cancel: CancellationToken,
}

impl App {
    /// Resolve paths from the command line.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Usage`] when the home directory cannot be determined.
    pub fn new(cli: &Cli) -> AppResult<Self> {
        Ok(Self {
            paths: cli.paths()?,
            cancel: CancellationToken::new(),
        })
    }

    /// Run capture until interrupted, reloading config on every restart request.
    #[instrument(skip(self), fields(home = ?self.paths.home))]
    pub async fn run(self) -> AppResult<ExitStatus> {
        let _signals = spawn_signal_watcher(self.cancel.clone());

        loop {
            let config = Config::load(&self.paths.config)?;
            check_output_path(&self.paths.out_template)?;

            let status = self.run_once(&config).await?;
            if status != ExitStatus::RestartRequested {
                return Ok(status);
            }

            info!(config_path = ?self.paths.config, "Configuration changed, restarting capture");
        }
    }

    /// Print the attached capture devices.
    ///
    /// # Errors
    ///
    /// Returns the config or device layer error that prevented enumeration.
    pub fn list_devices(&self) -> AppResult<()> {
        let config = Config::load(&self.paths.config)?;
        let mut device = V4l2DeviceLayer::new(&config.video_device_path_pattern)?;
        device.init()?;

        let devices = device.list_devices()?;
        if devices.is_empty() {
            println!("No capture devices found");
        }
        for found in &devices {
            println!(
                "{}, S/N={}, bus info={}",
                found.identity.name, found.identity.serial, found.bus_info
            );
        }

        device.shutdown();
        Ok(())
    }

    async fn run_once(&self, config: &Config) -> AppResult<ExitStatus> {
        check_conduct(&config.conduct)?;

        let transport = RestTransport::new(&config.notifications)?;
        let mut queue = NotificationQueue::new(
            Arc::new(transport),
            config.notifications.queue_settings(),
        );
        let notifier = queue.start();

        let instance_tag = match config.explicit_instance_tag() {
            Some(tag) => tag.to_string(),
            None => {
                let serial = match DeviceTarget::from_config(&config.device_serial_number) {
                    DeviceTarget::Serial(serial) => Some(serial),
                    DeviceTarget::FirstAvailable => None,
                };
                derive_instance_tag(APP_NAME, serial.as_deref(), &self.paths.home)
            }
        };
        info!(instance_tag = %instance_tag, "    <> Instance tag");

        let recorder = FfmpegRecorder::new(
            APP_NAME,
            config.ffmpeg.clone(),
            config.conduct.clone(),
            instance_tag,
            config.recorder.stop_grace(),
            notifier.clone(),
        );
        let executor = RecordingExecutor::new(Arc::new(recorder), config.recorder.stop_timeout());
        let device = V4l2DeviceLayer::new(&config.video_device_path_pattern)?;
        let settings =
            config.controller_settings(APP_NAME, &self.paths.config, &self.paths.out_template)?;

        let controller =
            SessionController::new(settings, device, executor, notifier, self.cancel.clone());
        let result = controller.run().await;

        queue.stop().await;

        Ok(result?)
    }
}

/// Make sure the output template expands to a directory we can create.
#[track_caller]
pub(crate) fn check_output_path(template: &str) -> AppResult<()> {
    let path = expand_out_path(template, &Local::now());
    fs::create_dir_all(&path).map_err(|e| AppError::OutputPath {
        path: path.display().to_string(),
        reason: e.to_string(),
        location: ErrorLocation::from(Location::caller()),
    })
}
