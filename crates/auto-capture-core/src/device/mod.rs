//! Seam to the capture device layer.
//!
//! The controller drives a [`DeviceLayer`] from its single poll loop. Every
//! call is expected to return within a bounded time; hot-plug events are the
//! only asynchronous input and arrive through a [`HotplugSink`] channel that
//! the controller drains once per cycle.

use crate::{CoreResult, signal::DeviceIdentity, signal::SignalStatus};

use tokio::sync::mpsc;

/// A capture device discovered during enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDescriptor {
    /// Serial number, name and instance path.
    pub identity: DeviceIdentity,
    /// USB bus info, empty when unknown.
    pub bus_info: String,
}

/// Which capture device the controller records from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceTarget {
    /// The device with this serial number.
    Serial(String),
    /// Whatever capture device enumerates first.
    FirstAvailable,
}

impl DeviceTarget {
    /// Parse the config value; `"auto"` or empty selects the first device.
    pub fn from_config(serial: &str) -> Self {
        let serial = serial.trim();
        if serial.is_empty() || serial == "auto" {
            DeviceTarget::FirstAvailable
        } else {
            DeviceTarget::Serial(serial.to_string())
        }
    }

    /// Pick the matching device out of an enumeration.
    pub fn select<'a>(&self, devices: &'a [DeviceDescriptor]) -> Option<&'a DeviceDescriptor> {
        match self {
            DeviceTarget::Serial(serial) => devices.iter().find(|d| &d.identity.serial == serial),
            DeviceTarget::FirstAvailable => devices.first(),
        }
    }

    /// Serial for log output.
    pub fn label(&self) -> &str {
        match self {
            DeviceTarget::Serial(serial) => serial,
            DeviceTarget::FirstAvailable => "auto",
        }
    }
}

/// Resolved video node for a capture device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoDevicePath {
    /// Device node handed to the recorder.
    pub path: String,
    /// USB bus info used to locate the paired audio input.
    pub bus_info: String,
}

/// Mixer level for one sub-device of an audio input card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioVolume {
    /// Mixer control name, e.g. `Mic`.
    pub control: String,
    /// Level in the mixer's own syntax: `80%` or a raw step count.
    pub level: String,
}

/// Asynchronous USB hot-plug notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HotplugEvent {
    /// A device instance appeared.
    Arrived(String),
    /// A device instance went away.
    Left(String),
}

/// Producer side handed to the device layer on registration.
pub type HotplugSink = mpsc::UnboundedSender<HotplugEvent>;

/// Capture device layer consumed by the session controller.
pub trait DeviceLayer: Send {
    /// Open handle to one capture channel.
    type Channel: Send;

    /// Acquire device-layer resources. Failure is fatal at startup.
    fn init(&mut self) -> CoreResult<()>;

    /// Release whatever `init` acquired.
    fn shutdown(&mut self);

    /// Enumerate the capture devices currently attached.
    fn list_devices(&mut self) -> CoreResult<Vec<DeviceDescriptor>>;

    /// Open a channel to the device at `instance_path`.
    fn open_channel(&mut self, instance_path: &str) -> CoreResult<Self::Channel>;

    /// Read the current signal geometry on an open channel.
    fn query_signal(&mut self, channel: &Self::Channel) -> CoreResult<SignalStatus>;

    /// Close a channel opened by `open_channel`.
    fn close_channel(&mut self, channel: Self::Channel);

    /// Find the video node belonging to the device with `serial`.
    fn resolve_video_path(&mut self, serial: &str) -> Option<VideoDevicePath>;

    /// Find the audio input paired with the device on `bus_info`, falling back to `hint`.
    fn resolve_audio_input(&mut self, bus_info: &str, hint: Option<&str>) -> Option<String>;

    /// Apply mixer `volumes` to the card behind `audio_input`.
    fn set_audio_volume(&mut self, audio_input: &str, volumes: &[AudioVolume]) -> CoreResult<()>;

    /// Start delivering hot-plug events into `sink`.
    fn register_hotplug(&mut self, sink: HotplugSink) -> CoreResult<()>;

    /// Stop delivering hot-plug events.
    fn unregister_hotplug(&mut self);
}
