use crate::{
    AppError, AppResult,
    config::{AUTO, default_auto},
};

use auto_capture_core::{AudioVolume, DeviceOverrides};

use std::{collections::BTreeMap, panic::Location};

use error_location::ErrorLocation;
use serde::Deserialize;

/// Mixer controls of the capture box's audio sub-devices, keyed by config alias.
const SUB_DEVICE_ALIASES: [(&str, &str); 3] = [
    ("line", "Line In"),
    ("hdmi", "HDMI"),
    ("capture", "Capture"),
];

/// ffmpeg option fragments, each one a whitespace separated argument list.
///
/// The command line is assembled as
/// `a_fmt a_nchan a_opt -i a_dev v_fmt -framerate F -video_size WxH v_opt -i v_dev
/// v_enc pix_fmt n_threads a_enc -metadata comment=TAG out_file`.
#[derive(Debug, Clone, Deserialize)]
pub struct FfmpegConfig {
    #[serde(default = "default_a_fmt")]
    pub a_fmt: String,
    #[serde(default = "default_a_nchan")]
    pub a_nchan: String,
    #[serde(default = "default_thread_queue")]
    pub a_opt: String,
    /// `auto`, `auto,<alsa device>` or an explicit audio input.
    #[serde(default = "default_auto")]
    pub a_dev: String,
    #[serde(default = "default_v_fmt")]
    pub v_fmt: String,
    #[serde(default = "default_thread_queue")]
    pub v_opt: String,
    /// `auto` or an explicit video node.
    #[serde(default = "default_auto")]
    pub v_dev: String,
    #[serde(default = "default_v_enc")]
    pub v_enc: String,
    #[serde(default = "default_pix_fmt")]
    pub pix_fmt: String,
    #[serde(default = "default_n_threads")]
    pub n_threads: String,
    #[serde(default = "default_a_enc")]
    pub a_enc: String,
    /// Container extension without the dot.
    pub out_fmt: String,
    /// Sub-device volumes applied when the audio card is detected, e.g. `line = "80%"`.
    #[serde(default)]
    pub a_vol: BTreeMap<String, String>,
}

impl FfmpegConfig {
    /// Explicit device paths; anything containing `auto` is left to detection.
    pub fn device_overrides(&self) -> DeviceOverrides {
        let v_dev = self.v_dev.trim();
        let video_path = (!v_dev.is_empty() && v_dev != AUTO).then(|| v_dev.to_string());

        let a_dev = self.a_dev.trim();
        let audio_input = (!a_dev.is_empty() && !a_dev.contains(AUTO)).then(|| a_dev.to_string());
        let audio_hint = a_dev
            .strip_prefix("auto,")
            .map(str::trim)
            .filter(|hint| !hint.is_empty())
            .map(str::to_string);

        DeviceOverrides {
            video_path,
            audio_input,
            audio_hint,
        }
    }

    /// Mixer settings for `a_vol`, in alias order.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::ConfigError`] for an unknown alias or an unsupported level.
    #[track_caller]
    pub fn audio_volumes(&self) -> AppResult<Vec<AudioVolume>> {
        self.a_vol
            .iter()
            .map(|(alias, level)| {
                let fail = |reason: String| AppError::ConfigError {
                    reason: format!("ffmpeg.a_vol.{alias}: {reason}"),
                    location: ErrorLocation::from(Location::caller()),
                };

                let control = sub_device_control(alias)
                    .ok_or_else(|| fail("unknown audio sub-device alias".to_string()))?;
                let level = parse_volume_level(level).map_err(fail)?;

                Ok(AudioVolume {
                    control: control.to_string(),
                    level,
                })
            })
            .collect()
    }
}

/// Mixer control name for a sub-device alias.
pub(crate) fn sub_device_control(alias: &str) -> Option<&'static str> {
    let alias = alias.trim();
    SUB_DEVICE_ALIASES
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(alias))
        .map(|(_, control)| *control)
}

/// Normalise a volume level to the form `amixer sset` takes.
///
/// Accepts a raw mixer value (`12`) or a percentage (`80%`). Decibel levels are rejected.
pub(crate) fn parse_volume_level(text: &str) -> Result<String, String> {
    let text = text.trim();

    if text.to_ascii_lowercase().ends_with("db") {
        return Err(format!("decibel level {text} is not supported"));
    }

    if let Some(percent) = text.strip_suffix('%') {
        return match percent.trim().parse::<u8>() {
            Ok(value) if value <= 100 => Ok(format!("{value}%")),
            _ => Err(format!("percent level {text} must be between 0% and 100%")),
        };
    }

    text.parse::<u32>()
        .map(|raw| raw.to_string())
        .map_err(|_| format!("invalid volume level {text:?}"))
}

fn default_a_fmt() -> String {
    "-f alsa".to_string()
}

fn default_a_nchan() -> String {
    "-ac 2".to_string()
}

fn default_thread_queue() -> String {
    "-thread_queue_size 4000 -accurate_seek".to_string()
}

fn default_v_fmt() -> String {
    "-f v4l2".to_string()
}

fn default_v_enc() -> String {
    "-c:v libx264 -flush_packets 1 -preset ultrafast -crf 18".to_string()
}

fn default_pix_fmt() -> String {
    "-pix_fmt yuv420p".to_string()
}

fn default_n_threads() -> String {
    "-threads 4".to_string()
}

fn default_a_enc() -> String {
    "-c:a aac -b:a 128k".to_string()
}
