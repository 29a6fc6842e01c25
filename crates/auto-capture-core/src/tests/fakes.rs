//! Scripted collaborators shared by the controller, executor and queue tests.

use crate::{
    AudioVolume, CaptureError, CoreResult, DeviceDescriptor, DeviceIdentity, DeviceLayer, HotplugEvent,
    HotplugSink, NotificationMessage, NotificationTransport, Recorder, RecordingJob, Session,
    SignalStatus, VideoDevicePath,
};

use std::{
    collections::VecDeque,
    panic::Location,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use error_location::ErrorLocation;
use tokio_util::sync::CancellationToken;

pub const INSTANCE_PATH: &str = "usb-0000:00:14.0-1";
pub const SERIAL: &str = "A1B2C3";

pub fn identity() -> DeviceIdentity {
    DeviceIdentity {
        serial: SERIAL.to_string(),
        name: "DVI2USB 3.0".to_string(),
        instance_path: INSTANCE_PATH.to_string(),
    }
}

pub fn signal(width: i32, height: i32, frame_rate: f64) -> SignalStatus {
    SignalStatus {
        width,
        height,
        frame_rate,
        device: identity(),
    }
}

/// Mutable script behind [`FakeDevice`], shared with the test body.
pub struct DeviceScript {
    pub devices: Vec<DeviceDescriptor>,
    pub signals: VecDeque<SignalStatus>,
    pub last_signal: SignalStatus,
    pub video_path: Option<VideoDevicePath>,
    pub audio_input: Option<String>,
    pub fail_init: bool,
    pub fail_volume: bool,
    pub volumes: Vec<(String, Vec<AudioVolume>)>,
    pub sink: Option<HotplugSink>,
    pub open_channels: usize,
    pub calls: Vec<&'static str>,
}

impl Default for DeviceScript {
    fn default() -> Self {
        Self {
            devices: vec![DeviceDescriptor {
                identity: identity(),
                bus_info: "usb-0000:00:14.0-1".to_string(),
            }],
            signals: VecDeque::new(),
            last_signal: SignalStatus::invalid(identity()),
            video_path: Some(VideoDevicePath {
                path: "/dev/video0".to_string(),
                bus_info: "usb-0000:00:14.0-1".to_string(),
            }),
            audio_input: Some("hw:2,0".to_string()),
            fail_init: false,
            fail_volume: false,
            volumes: Vec::new(),
            sink: None,
            open_channels: 0,
            calls: Vec::new(),
        }
    }
}

/// Device layer replaying a scripted list of signal snapshots.
///
/// Once the script runs out the last snapshot repeats.
#[derive(Clone, Default)]
pub struct FakeDevice {
    pub script: Arc<Mutex<DeviceScript>>,
}

impl FakeDevice {
    pub fn with_signals(signals: impl IntoIterator<Item = SignalStatus>) -> Self {
        let device = Self::default();
        device.push_signals(signals);
        device
    }

    pub fn push_signals(&self, signals: impl IntoIterator<Item = SignalStatus>) {
        self.script.lock().unwrap().signals.extend(signals);
    }

    pub fn emit(&self, event: HotplugEvent) {
        let script = self.script.lock().unwrap();
        if let Some(sink) = &script.sink {
            sink.send(event).unwrap();
        }
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.script.lock().unwrap().calls.clone()
    }

    fn record(&self, call: &'static str) {
        self.script.lock().unwrap().calls.push(call);
    }
}

impl DeviceLayer for FakeDevice {
    type Channel = String;

    fn init(&mut self) -> CoreResult<()> {
        self.record("init");
        if self.script.lock().unwrap().fail_init {
            return Err(CaptureError::DeviceInit {
                reason: "scripted init failure".to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }
        Ok(())
    }

    fn shutdown(&mut self) {
        self.record("shutdown");
    }

    fn list_devices(&mut self) -> CoreResult<Vec<DeviceDescriptor>> {
        Ok(self.script.lock().unwrap().devices.clone())
    }

    fn open_channel(&mut self, instance_path: &str) -> CoreResult<Self::Channel> {
        self.script.lock().unwrap().open_channels += 1;
        Ok(instance_path.to_string())
    }

    fn query_signal(&mut self, _channel: &Self::Channel) -> CoreResult<SignalStatus> {
        let mut script = self.script.lock().unwrap();
        if let Some(next) = script.signals.pop_front() {
            script.last_signal = next;
        }
        Ok(script.last_signal.clone())
    }

    fn close_channel(&mut self, _channel: Self::Channel) {
        self.script.lock().unwrap().open_channels -= 1;
    }

    fn resolve_video_path(&mut self, _serial: &str) -> Option<VideoDevicePath> {
        self.script.lock().unwrap().video_path.clone()
    }

    fn resolve_audio_input(&mut self, _bus_info: &str, hint: Option<&str>) -> Option<String> {
        let script = self.script.lock().unwrap();
        script
            .audio_input
            .clone()
            .or_else(|| hint.map(str::to_string))
    }

    fn set_audio_volume(&mut self, audio_input: &str, volumes: &[AudioVolume]) -> CoreResult<()> {
        let mut script = self.script.lock().unwrap();
        if script.fail_volume {
            return Err(CaptureError::Device {
                reason: "amixer failed".to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }
        script
            .volumes
            .push((audio_input.to_string(), volumes.to_vec()));
        Ok(())
    }

    fn register_hotplug(&mut self, sink: HotplugSink) -> CoreResult<()> {
        self.record("register_hotplug");
        self.script.lock().unwrap().sink = Some(sink);
        Ok(())
    }

    fn unregister_hotplug(&mut self) {
        self.record("unregister_hotplug");
        self.script.lock().unwrap().sink = None;
    }
}

/// Lifecycle event observed by [`FakeRecorder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecorderEvent {
    Launched(u64),
    Stopped(u64),
}

/// Recorder whose jobs wait for cancellation, or exit on their own when asked.
#[derive(Clone, Default)]
pub struct FakeRecorder {
    pub events: Arc<Mutex<Vec<RecorderEvent>>>,
    pub failing_launches: Arc<AtomicUsize>,
    pub exit_immediately: Arc<AtomicBool>,
    pub launched: Arc<Mutex<Vec<Session>>>,
}

impl FakeRecorder {
    pub fn events(&self) -> Vec<RecorderEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn launches(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, RecorderEvent::Launched(_)))
            .count()
    }

    pub fn stops(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, RecorderEvent::Stopped(_)))
            .count()
    }
}

#[async_trait]
impl Recorder for FakeRecorder {
    async fn launch(&self, session: &Session) -> CoreResult<Box<dyn RecordingJob>> {
        let pending = self.failing_launches.load(Ordering::SeqCst);
        if pending > 0 {
            self.failing_launches.store(pending - 1, Ordering::SeqCst);
            return Err(CaptureError::RecordingStart {
                reason: "scripted launch failure".to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        self.events
            .lock()
            .unwrap()
            .push(RecorderEvent::Launched(session.id));
        self.launched.lock().unwrap().push(session.clone());

        Ok(Box::new(FakeJob {
            session_id: session.id,
            events: Arc::clone(&self.events),
            exit_immediately: self.exit_immediately.load(Ordering::SeqCst),
        }))
    }
}

struct FakeJob {
    session_id: u64,
    events: Arc<Mutex<Vec<RecorderEvent>>>,
    exit_immediately: bool,
}

#[async_trait]
impl RecordingJob for FakeJob {
    async fn run(self: Box<Self>, cancel: CancellationToken) -> CoreResult<()> {
        if !self.exit_immediately {
            cancel.cancelled().await;
        }
        self.events
            .lock()
            .unwrap()
            .push(RecorderEvent::Stopped(self.session_id));
        Ok(())
    }
}

/// Transport that remembers every delivered message, optionally slowly.
#[derive(Clone, Default)]
pub struct CapturingTransport {
    pub delivered: Arc<Mutex<Vec<NotificationMessage>>>,
    pub delay: Duration,
}

impl CapturingTransport {
    pub fn texts(&self) -> Vec<String> {
        self.delivered
            .lock()
            .unwrap()
            .iter()
            .map(|m| m.text.clone())
            .collect()
    }
}

#[async_trait]
impl NotificationTransport for CapturingTransport {
    async fn send(&self, message: &NotificationMessage) -> CoreResult<()> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.delivered.lock().unwrap().push(message.clone());
        Ok(())
    }
}

/// Transport that never completes a send.
pub struct StallingTransport;

#[async_trait]
impl NotificationTransport for StallingTransport {
    async fn send(&self, _message: &NotificationMessage) -> CoreResult<()> {
        std::future::pending::<()>().await;
        Ok(())
    }
}

/// Transport failing every other send.
#[derive(Default)]
pub struct FlakyTransport {
    pub attempts: AtomicUsize,
    pub delivered: Mutex<Vec<String>>,
}

#[async_trait]
impl NotificationTransport for FlakyTransport {
    async fn send(&self, message: &NotificationMessage) -> CoreResult<()> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if attempt % 2 == 0 {
            return Err(CaptureError::Delivery {
                reason: "connection refused".to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }
        self.delivered.lock().unwrap().push(message.text.clone());
        Ok(())
    }
}
