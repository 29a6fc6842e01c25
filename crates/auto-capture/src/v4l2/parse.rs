//! Parsers for `v4l2-ctl` output and `/proc/asound/cards`.

use auto_capture_core::{CaptureError, CoreResult};

use std::{panic::Location, path::PathBuf};

use error_location::ErrorLocation;
use regex::Regex;

/// Identity of a video node as reported by `v4l2-ctl --info`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct V4l2Info {
    pub card: String,
    pub serial: String,
    pub bus_info: String,
}

/// Compiled patterns for the text tools the device layer shells out to.
pub(crate) struct V4l2Parser {
    card_type: Regex,
    serial: Regex,
    bus_info: Regex,
    width_height: Regex,
    frames_per_second: Regex,
    sound_card: Regex,
}

impl V4l2Parser {
    #[track_caller]
    pub fn new() -> CoreResult<Self> {
        Ok(Self {
            card_type: compile(r"Card type\s*:\s*(.+)")?,
            serial: compile(r"Serial\s*:\s*(\w+)")?,
            bus_info: compile(r"Bus info\s*:\s*([\w\-:.]+)")?,
            width_height: compile(r"Width/Height\s*:\s*(\d+)/(\d+)")?,
            frames_per_second: compile(r"Frames per second\s*:\s*([\d.]+)")?,
            sound_card: compile(r"^\s*(\d+)\s+\[[^\]]*\]:\s*(.*)$")?,
        })
    }

    /// Parse `v4l2-ctl --info`.
    ///
    /// Only nodes whose device caps include video capture and that report a
    /// serial number are capture inputs; metadata nodes are skipped.
    pub fn parse_info(&self, output: &str) -> Option<V4l2Info> {
        let caps_at = output.find("Device Caps")?;
        let caps = &output[caps_at..];
        let capture_at = caps.find("Video Capture")?;
        let rest = &caps[capture_at..];

        let serial = self.serial.captures(rest)?[1].to_string();
        let bus_info = self
            .bus_info
            .captures(rest)
            .or_else(|| self.bus_info.captures(output))
            .map(|c| c[1].to_string())
            .unwrap_or_default();
        let card = self
            .card_type
            .captures(output)
            .map(|c| c[1].trim().to_string())
            .unwrap_or_default();

        Some(V4l2Info {
            card,
            serial,
            bus_info,
        })
    }

    /// Parse `Width/Height` from `v4l2-ctl --get-fmt-video`.
    pub fn parse_resolution(&self, output: &str) -> Option<(i32, i32)> {
        let captures = self.width_height.captures(output)?;
        let width = captures[1].parse().ok()?;
        let height = captures[2].parse().ok()?;
        Some((width, height))
    }

    /// Parse `Frames per second` from `v4l2-ctl --get-parm`; 0 when absent.
    pub fn parse_frame_rate(&self, output: &str) -> f64 {
        self.frames_per_second
            .captures(output)
            .and_then(|c| c[1].parse().ok())
            .unwrap_or(0.0)
    }

    /// Find the ALSA card whose long name mentions `bus_info`, as `hw:N,0`.
    pub fn find_sound_card(&self, cards: &str, bus_info: &str) -> Option<String> {
        if bus_info.is_empty() {
            return None;
        }

        let mut lines = cards.lines();
        while let Some(line) = lines.next() {
            let Some(header) = self.sound_card.captures(line) else {
                continue;
            };
            let long_name = lines.next().unwrap_or_default();
            if long_name.contains(bus_info) || header[2].contains(bus_info) {
                return Some(format!("hw:{},0", &header[1]));
            }
        }

        None
    }
}

#[track_caller]
fn compile(pattern: &str) -> CoreResult<Regex> {
    Regex::new(pattern).map_err(|e| CaptureError::DeviceInit {
        reason: format!("invalid pattern {pattern}: {e}"),
        location: ErrorLocation::from(Location::caller()),
    })
}

/// Turn an ALSA hint from config into a device name; bare card numbers become `hw:N,0`.
pub(crate) fn alsa_device_from_hint(hint: &str) -> String {
    let hint = hint.trim();
    if !hint.is_empty() && hint.chars().all(|c| c.is_ascii_digit()) {
        format!("hw:{hint},0")
    } else {
        hint.to_string()
    }
}

/// Card part of an ALSA device name: `hw:2,0` gives `2`, `plughw:CARD=Video,DEV=0` gives `Video`.
pub(crate) fn alsa_card_index(device: &str) -> Option<String> {
    let (_, rest) = device.split_once(':')?;
    let card = rest.split(',').next()?.trim();
    let card = card.strip_prefix("CARD=").unwrap_or(card);
    (!card.is_empty()).then(|| card.to_string())
}

/// Split a path glob into its directory and a regex for the file name.
///
/// Only `*` and `?` in the last component are supported, which covers `/dev/video*`.
pub(crate) fn glob_to_regex(pattern: &str) -> Option<(PathBuf, Regex)> {
    let path = PathBuf::from(pattern);
    let dir = path.parent()?.to_path_buf();
    let name = path.file_name()?.to_str()?;

    let mut expr = String::from("^");
    for c in name.chars() {
        match c {
            '*' => expr.push_str(".*"),
            '?' => expr.push('.'),
            other => expr.push_str(&regex::escape(&other.to_string())),
        }
    }
    expr.push('$');

    Regex::new(&expr).ok().map(|re| (dir, re))
}
