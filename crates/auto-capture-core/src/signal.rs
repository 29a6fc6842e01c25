//! Per-cycle signal snapshots reported by the device layer.

use std::fmt;

/// Exclusive upper bound for a usable signal dimension.
pub const MAX_SIGNAL_DIMENSION: i32 = 9999;

/// Identity of the physical capture device a snapshot was read from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceIdentity {
    /// Device serial number.
    pub serial: String,
    /// Human readable device name.
    pub name: String,
    /// Instance path used by hot-plug notifications.
    pub instance_path: String,
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, S/N={}, path={}", self.name, self.serial, self.instance_path)
    }
}

/// One poll cycle's read of the capture input.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignalStatus {
    /// Horizontal resolution in pixels.
    pub width: i32,
    /// Vertical resolution in pixels.
    pub height: i32,
    /// Frames per second. Informational only.
    pub frame_rate: f64,
    /// Device the snapshot was read from.
    pub device: DeviceIdentity,
}

impl SignalStatus {
    /// Snapshot standing in for a failed or missing read.
    pub fn invalid(device: DeviceIdentity) -> Self {
        Self {
            width: 0,
            height: 0,
            frame_rate: 0.0,
            device,
        }
    }

    /// True when both dimensions lie strictly between 0 and [`MAX_SIGNAL_DIMENSION`].
    pub fn is_valid(&self) -> bool {
        dimension_in_range(self.width) && dimension_in_range(self.height)
    }

    /// Compares geometry only; frame rate changes are not a signal change.
    pub fn same_geometry(&self, other: &SignalStatus) -> bool {
        self.width == other.width && self.height == other.height
    }

    /// Frame rate rounded to whole frames, as shown in logs and file metadata.
    pub fn frame_rate_label(&self) -> String {
        format!("{:.0}", self.frame_rate)
    }
}

impl fmt::Display for SignalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{}@{}",
            self.width,
            self.height,
            self.frame_rate_label()
        )
    }
}

fn dimension_in_range(value: i32) -> bool {
    value > 0 && value < MAX_SIGNAL_DIMENSION
}
