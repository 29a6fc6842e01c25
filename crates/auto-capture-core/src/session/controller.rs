//! The session state machine and its poll loop.
//!
//! One cycle per `poll_interval`, strictly sequential:
//!
//! 1. drain hot-plug events; a departure of the remembered device instance stops recording
//! 2. locate the target device; none found stops recording
//! 3. read the signal; invalid geometry stops, a valid one starts (when idle) or is
//!    compared with the previous cycle (when recording)
//! 4. remember the snapshot for the next comparison
//! 5. re-fingerprint the config file; an edit ends the loop with a restart request

use crate::{
    CoreResult, ExitStatus,
    device::{DeviceDescriptor, DeviceLayer, HotplugEvent, HotplugSink},
    fingerprint::{self, ConfigFingerprint},
    notify::Notifier,
    recording::RecordingExecutor,
    session::{ControllerSettings, Session, SessionLog, SessionState, StopReason},
    signal::SignalStatus,
    timestamp,
};

use std::{collections::HashSet, fs, time::Instant};

use chrono::Local;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// What a single poll cycle did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleAction {
    /// Nothing to do.
    None,
    /// A new session started.
    Started {
        /// Id of the new session.
        session_id: u64,
    },
    /// A replacement session started after the recorder died.
    Recovered {
        /// Id of the new session.
        session_id: u64,
    },
    /// Starting a session failed; retried next cycle.
    StartFailed,
    /// The current session stopped.
    Stopped(StopReason),
    /// Still recording, signal unchanged.
    Continued,
}

/// Outcome of one [`SessionController::cycle`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    /// State when the cycle began.
    pub before: SessionState,
    /// State when the cycle ended.
    pub after: SessionState,
    /// What happened.
    pub action: CycleAction,
}

struct ActiveSession {
    session: Session,
    log: Option<SessionLog>,
    started: Instant,
}

/// Central control loop driving the recording executor and notifications.
pub struct SessionController<D: DeviceLayer> {
    settings: ControllerSettings,
    device: D,
    executor: RecordingExecutor,
    notifier: Notifier,
    cancel: CancellationToken,
    hotplug_tx: HotplugSink,
    hotplug_rx: mpsc::UnboundedReceiver<HotplugEvent>,
    hotplug_registered: bool,
    initialized: bool,
    disconnected: HashSet<String>,
    target_instance: Option<String>,
    previous_signal: SignalStatus,
    active: Option<ActiveSession>,
    next_session_id: u64,
    config_fingerprint: Option<ConfigFingerprint>,
    reload_requested: bool,
}

impl<D: DeviceLayer> SessionController<D> {
    /// Assemble a controller. Nothing touches the device until [`start`](Self::start).
    pub fn new(
        settings: ControllerSettings,
        device: D,
        executor: RecordingExecutor,
        notifier: Notifier,
        cancel: CancellationToken,
    ) -> Self {
        let (hotplug_tx, hotplug_rx) = mpsc::unbounded_channel();

        Self {
            settings,
            device,
            executor,
            notifier,
            cancel,
            hotplug_tx,
            hotplug_rx,
            hotplug_registered: false,
            initialized: false,
            disconnected: HashSet::new(),
            target_instance: None,
            previous_signal: SignalStatus::default(),
            active: None,
            next_session_id: 1,
            config_fingerprint: None,
            reload_requested: false,
        }
    }

    /// Current state, derived from whether a session is active.
    pub fn state(&self) -> SessionState {
        if self.active.is_some() {
            SessionState::Recording
        } else {
            SessionState::Idle
        }
    }

    /// The session being recorded, if any.
    pub fn current_session(&self) -> Option<&Session> {
        self.active.as_ref().map(|a| &a.session)
    }

    /// True once a config edit has been detected.
    pub fn reload_requested(&self) -> bool {
        self.reload_requested
    }

    /// Initialize the device layer, capture the config baseline and register hot-plug.
    ///
    /// # Errors
    ///
    /// Returns the device layer's init error; the loop must not run then.
    #[instrument(skip(self))]
    pub fn start(&mut self) -> CoreResult<()> {
        info!(
            app = %self.settings.app_name,
            version = crate::VERSION,
            "<><><> Starting capture <><><>"
        );
        info!(out_path = %self.settings.out_path_template, "    <> Saving output to");
        info!(serial = %self.settings.target.label(), "    <> Recording from video device");

        self.device.init()?;
        self.initialized = true;

        self.config_fingerprint = match fingerprint::fingerprint(&self.settings.config_path) {
            Ok(fp) => Some(fp),
            Err(e) => {
                warn!(error = %e, "Config fingerprint unavailable, change detection deferred");
                None
            }
        };

        match self.device.register_hotplug(self.hotplug_tx.clone()) {
            Ok(()) => self.hotplug_registered = true,
            Err(e) => error!(error = %e, "Failed to register USB hot-plug callback"),
        }

        self.notifier.info(format!(
            "{} started, v{}",
            self.settings.app_name,
            crate::VERSION
        ));

        Ok(())
    }

    /// Run cycles until cancelled or a config edit is detected.
    ///
    /// # Errors
    ///
    /// Only startup failures are returned; everything inside the loop is absorbed and logged.
    #[instrument(skip(self))]
    pub async fn run(mut self) -> CoreResult<ExitStatus> {
        self.start()?;

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(self.settings.poll_interval) => {}
            }

            self.cycle().await;

            if self.reload_requested {
                info!("Reloading config and restarting capture");
                break;
            }
        }

        Ok(self.finish().await)
    }

    /// Execute one poll cycle.
    pub async fn cycle(&mut self) -> CycleReport {
        let before = self.state();
        let action = self.step().await;
        self.check_config();
        let after = self.state();

        if before != after {
            info!(from = %before, to = %after, action = ?action, "State transition");
        }

        CycleReport {
            before,
            after,
            action,
        }
    }

    /// Stop any recording and release device-layer resources.
    #[instrument(skip(self))]
    pub async fn finish(&mut self) -> ExitStatus {
        let reason = if self.reload_requested {
            StopReason::ConfigChanged
        } else {
            StopReason::Terminated
        };
        self.stop_if_recording(reason).await;
        self.executor.shutdown().await;

        self.notifier
            .info(format!("{} terminated", self.settings.app_name));

        if self.hotplug_registered {
            self.device.unregister_hotplug();
            self.hotplug_registered = false;
        }

        if self.initialized {
            self.device.shutdown();
            self.initialized = false;
        }

        let status = if self.cancel.is_cancelled() {
            ExitStatus::Interrupted
        } else if self.reload_requested {
            ExitStatus::RestartRequested
        } else {
            ExitStatus::Normal
        };

        info!(status = %status, "Capture loop finished");

        status
    }

    async fn step(&mut self) -> CycleAction {
        self.drain_hotplug();

        if let Some(path) = self.target_instance.take() {
            if self.disconnected.contains(&path) {
                info!(instance_path = %path, "Target device instance disconnected");
                return self
                    .stop_if_recording(StopReason::DeviceDisconnected {
                        instance_path: path,
                    })
                    .await;
            }
            self.target_instance = Some(path);
        }

        let Some(device) = self.find_target() else {
            return self.stop_if_recording(StopReason::NoChannel).await;
        };
        self.target_instance = Some(device.identity.instance_path.clone());

        let signal = self.read_signal(&device);
        debug!(signal = %signal, device = %device.identity, "Signal snapshot");

        let action = self.evaluate(&device, &signal).await;
        self.previous_signal = signal;
        action
    }

    async fn evaluate(&mut self, device: &DeviceDescriptor, signal: &SignalStatus) -> CycleAction {
        if !signal.is_valid() {
            debug!("No valid video signal detected from target device");
            return self
                .stop_if_recording(StopReason::InvalidResolution {
                    width: signal.width,
                    height: signal.height,
                })
                .await;
        }

        match self.state() {
            SessionState::Idle => self.start_recording(device, signal, false).await,
            SessionState::Recording if !signal.same_geometry(&self.previous_signal) => {
                self.stop_if_recording(StopReason::SignalChanged).await
            }
            SessionState::Recording => self.on_idle(device, signal).await,
        }
    }

    fn drain_hotplug(&mut self) {
        while let Ok(event) = self.hotplug_rx.try_recv() {
            match event {
                HotplugEvent::Arrived(path) => {
                    info!(instance_path = %path, "Connected USB device");
                    self.disconnected.remove(&path);
                    self.notifier.info(format!(
                        "{} USB device connected: {}",
                        self.settings.app_name, path
                    ));
                }
                HotplugEvent::Left(path) => {
                    info!(instance_path = %path, "Disconnected USB device");
                    self.notifier.info(format!(
                        "{} USB device disconnected: {}",
                        self.settings.app_name, path
                    ));
                    self.disconnected.insert(path);
                }
            }
        }
    }

    fn find_target(&mut self) -> Option<DeviceDescriptor> {
        match self.device.list_devices() {
            Ok(devices) => {
                let found = self.settings.target.select(&devices).cloned();
                if found.is_none() {
                    debug!(
                        serial = %self.settings.target.label(),
                        available = devices.len(),
                        "Wait, no matching capture device"
                    );
                }
                found
            }
            Err(e) => {
                warn!(error = %e, "Device enumeration failed");
                None
            }
        }
    }

    fn read_signal(&mut self, device: &DeviceDescriptor) -> SignalStatus {
        let channel = match self.device.open_channel(&device.identity.instance_path) {
            Ok(channel) => channel,
            Err(e) => {
                warn!(error = %e, "Failed to open capture channel");
                return SignalStatus::invalid(device.identity.clone());
            }
        };

        let signal = match self.device.query_signal(&channel) {
            Ok(status) => SignalStatus {
                device: device.identity.clone(),
                ..status
            },
            Err(e) => {
                warn!(error = %e, "Signal query failed");
                SignalStatus::invalid(device.identity.clone())
            }
        };

        self.device.close_channel(channel);
        signal
    }

    /// Remain-recording hook: restart a recorder that died on its own.
    async fn on_idle(&mut self, device: &DeviceDescriptor, signal: &SignalStatus) -> CycleAction {
        let dead_for = self
            .executor
            .current()
            .filter(|task| !task.is_running())
            .and_then(|task| task.exited_for());

        let Some(dead_for) = dead_for else {
            return CycleAction::Continued;
        };

        if self.cancel.is_cancelled() {
            info!("Skip recording restart, shutdown in progress");
            return CycleAction::Continued;
        }

        if dead_for < self.settings.recovery_timeout {
            debug!(
                dead_ms = dead_for.as_millis(),
                "Recorder exited, waiting for recovery timeout"
            );
            return CycleAction::Continued;
        }

        info!("Recorder exited, restarting capture");
        if let Some(active) = self.active.take() {
            self.end_session(active, &StopReason::RecorderExited);
        }

        self.start_recording(device, signal, true).await
    }

    async fn start_recording(
        &mut self,
        device: &DeviceDescriptor,
        signal: &SignalStatus,
        recovered: bool,
    ) -> CycleAction {
        let Some((video_path, bus_info)) = self.resolve_video(device) else {
            return CycleAction::StartFailed;
        };

        let audio_input = if self.settings.audio_enabled {
            self.resolve_audio(&bus_info)
        } else {
            None
        };

        let started_at = Local::now();
        let session = Session {
            id: self.next_session_id,
            start_stamp: timestamp::session_stamp(&started_at),
            output_dir: timestamp::expand_out_path(&self.settings.out_path_template, &started_at),
            started_at,
            signal: signal.clone(),
            device: device.identity.clone(),
            video_path,
            bus_info,
            audio_input,
            recovered,
        };
        self.next_session_id += 1;

        if let Err(e) = fs::create_dir_all(&session.output_dir) {
            error!(path = ?session.output_dir, error = %e, "Failed to create output path");
            return CycleAction::StartFailed;
        }

        if let Err(e) = self.executor.schedule(Some(session.clone())).await {
            error!(session_id = session.id, error = %e, "Failed to start recording, retrying next cycle");
            self.notifier.error(format!(
                "{} failed to start recording: {}",
                self.settings.app_name, e
            ));
            return CycleAction::StartFailed;
        }

        let log = self.open_session_log(&session);

        info!(
            session_id = session.id,
            start_ts = %session.start_stamp,
            resolution = %format!("{}x{}", signal.width, signal.height),
            frame_rate = %signal.frame_rate_label(),
            recovered,
            "Started recording"
        );
        self.notifier.info(format!(
            "{} session {} begin, {}x{}, {} fps",
            self.settings.app_name,
            session.start_stamp,
            signal.width,
            signal.height,
            signal.frame_rate_label()
        ));

        let session_id = session.id;
        self.active = Some(ActiveSession {
            session,
            log,
            started: Instant::now(),
        });

        if recovered {
            CycleAction::Recovered { session_id }
        } else {
            CycleAction::Started { session_id }
        }
    }

    async fn stop_if_recording(&mut self, reason: StopReason) -> CycleAction {
        let Some(active) = self.active.take() else {
            return CycleAction::None;
        };

        self.executor.shutdown().await;
        self.end_session(active, &reason);

        CycleAction::Stopped(reason)
    }

    fn end_session(&self, active: ActiveSession, reason: &StopReason) {
        close_log(active.log, reason);

        info!(
            session_id = active.session.id,
            start_ts = %active.session.start_stamp,
            duration_ms = active.started.elapsed().as_millis(),
            reason = %reason,
            "Stopped recording"
        );
        self.notifier.info(format!(
            "{} session {} stopped: {}",
            self.settings.app_name, active.session.start_stamp, reason
        ));
    }

    fn resolve_video(&mut self, device: &DeviceDescriptor) -> Option<(String, String)> {
        if let Some(path) = &self.settings.overrides.video_path {
            return Some((path.clone(), "N/A".to_string()));
        }

        match self.device.resolve_video_path(&device.identity.serial) {
            Some(found) => {
                info!(
                    path = %found.path,
                    serial = %device.identity.serial,
                    name = %device.identity.name,
                    bus_info = %found.bus_info,
                    "    <> Found video device"
                );
                Some((found.path, found.bus_info))
            }
            None => {
                error!(serial = %device.identity.serial, "Video device path not found by S/N");
                None
            }
        }
    }

    fn resolve_audio(&mut self, bus_info: &str) -> Option<String> {
        if let Some(input) = &self.settings.overrides.audio_input {
            return Some(input.clone());
        }

        let hint = self.settings.overrides.audio_hint.as_deref();
        let found = self.device.resolve_audio_input(bus_info, hint);
        match &found {
            Some(input) => {
                info!(audio_input = %input, "    <> Found audio-in device");
                self.apply_audio_volumes(input);
            }
            None => warn!(bus_info, "No audio-in device found, recording video only"),
        }
        found
    }

    fn apply_audio_volumes(&mut self, audio_input: &str) {
        let volumes = &self.settings.audio_volumes;
        if volumes.is_empty() {
            return;
        }

        for volume in volumes {
            info!(control = %volume.control, level = %volume.level, "    <> Sub-device volume");
        }

        if let Err(e) = self.device.set_audio_volume(audio_input, volumes) {
            warn!(audio_input, error = %e, "Failed to set audio-in volume");
        }
    }

    fn open_session_log(&self, session: &Session) -> Option<SessionLog> {
        if !self.settings.session_log_enabled {
            return None;
        }

        let path = session
            .output_dir
            .join(format!("{}.log", session.start_stamp));
        match SessionLog::open(&path, &self.settings.app_name, session) {
            Ok(log) => Some(log),
            Err(e) => {
                warn!(error = %e, "Session log unavailable");
                None
            }
        }
    }

    fn check_config(&mut self) {
        let current = match fingerprint::fingerprint(&self.settings.config_path) {
            Ok(fp) => fp,
            Err(e) => {
                warn!(error = %e, "Config fingerprint failed, treating as unchanged");
                return;
            }
        };

        match &self.config_fingerprint {
            Some(baseline) if fingerprint::changed(baseline, &current) => {
                info!(
                    path = ?self.settings.config_path,
                    from = %baseline,
                    to = %current,
                    "Config file was modified"
                );
                self.reload_requested = true;
            }
            Some(_) => {}
            None => self.config_fingerprint = Some(current),
        }
    }
}

fn close_log(log: Option<SessionLog>, reason: &StopReason) {
    if let Some(log) = log {
        if let Err(e) = log.close(reason) {
            warn!(error = %e, "Failed to close session log");
        }
    }
}
