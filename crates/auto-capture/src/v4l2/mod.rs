//! Linux capture device layer built on `v4l2-ctl` and procfs.
//!
//! Every call shells out to a short-lived `v4l2-ctl` process and returns
//! once it exits, so each poll cycle stays bounded.

mod hotplug;
mod parse;

pub(crate) use {
    hotplug::HotplugWatcher,
    parse::{V4l2Info, V4l2Parser, alsa_card_index, alsa_device_from_hint, glob_to_regex},
};

#[cfg(test)]
pub(crate) use hotplug::{advance as hotplug_advance, diff as hotplug_diff};

use crate::command::run_bounded;

use auto_capture_core::{
    AudioVolume, CaptureError, CoreResult, DeviceDescriptor, DeviceIdentity, DeviceLayer, HotplugSink,
    SignalStatus, VideoDevicePath,
};

use std::{
    collections::HashMap,
    env, fs,
    panic::Location,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use error_location::ErrorLocation;
use tracing::{debug, info, instrument, warn};

const V4L2_CTL: &str = "v4l2-ctl";
const AMIXER: &str = "amixer";
const HELPER_TIMEOUT: Duration = Duration::from_secs(3);
const FFMPEG: &str = "ffmpeg";
const ASOUND_CARDS: &str = "/proc/asound/cards";
const HOTPLUG_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// A video node with the identity `v4l2-ctl --info` reported for it.
#[derive(Debug, Clone)]
pub(crate) struct VideoNode {
    pub path: String,
    pub info: V4l2Info,
}

impl VideoNode {
    /// Stable key across re-enumerations: USB bus info, or the node path when unknown.
    pub fn instance_path(&self) -> String {
        if self.info.bus_info.is_empty() {
            self.path.clone()
        } else {
            self.info.bus_info.clone()
        }
    }

    fn descriptor(&self) -> DeviceDescriptor {
        DeviceDescriptor {
            identity: DeviceIdentity {
                serial: self.info.serial.clone(),
                name: self.info.card.clone(),
                instance_path: self.instance_path(),
            },
            bus_info: self.info.bus_info.clone(),
        }
    }
}

/// Open channel: the video node queried for signal status.
#[derive(Debug)]
pub(crate) struct V4l2Channel {
    path: String,
}

/// [`DeviceLayer`] for UVC capture boxes.
pub(crate) struct V4l2DeviceLayer {
    pattern: String,
    parser: Arc<V4l2Parser>,
    nodes: HashMap<String, VideoNode>,
    hotplug: Option<HotplugWatcher>,
}

impl V4l2DeviceLayer {
    /// Create a layer enumerating nodes that match `pattern`, e.g. `/dev/video*`.
    #[track_caller]
    pub fn new(pattern: &str) -> CoreResult<Self> {
        Ok(Self {
            pattern: pattern.to_string(),
            parser: Arc::new(V4l2Parser::new()?),
            nodes: HashMap::new(),
            hotplug: None,
        })
    }
}

impl DeviceLayer for V4l2DeviceLayer {
    type Channel = V4l2Channel;

    #[instrument(skip(self))]
    fn init(&mut self) -> CoreResult<()> {
        for tool in [FFMPEG, V4L2_CTL] {
            match find_in_path(tool) {
                Some(path) => debug!(tool, path = ?path, "Found required program"),
                None => {
                    return Err(CaptureError::DeviceInit {
                        reason: format!("{tool} program not found, make sure it is installed"),
                        location: ErrorLocation::from(Location::caller()),
                    });
                }
            }
        }

        if glob_to_regex(&self.pattern).is_none() {
            return Err(CaptureError::DeviceInit {
                reason: format!("unsupported video device path pattern {}", self.pattern),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        info!(pattern = %self.pattern, "V4L2 device layer ready");
        Ok(())
    }

    fn shutdown(&mut self) {
        self.unregister_hotplug();
        self.nodes.clear();
        debug!("V4L2 device layer shut down");
    }

    fn list_devices(&mut self) -> CoreResult<Vec<DeviceDescriptor>> {
        let nodes = scan(&self.pattern, &self.parser)?;

        self.nodes = nodes
            .iter()
            .map(|node| (node.instance_path(), node.clone()))
            .collect();

        Ok(nodes.iter().map(VideoNode::descriptor).collect())
    }

    #[track_caller]
    fn open_channel(&mut self, instance_path: &str) -> CoreResult<Self::Channel> {
        let node = self
            .nodes
            .get(instance_path)
            .ok_or_else(|| CaptureError::Device {
                reason: format!("no video node for {instance_path}"),
                location: ErrorLocation::from(Location::caller()),
            })?;

        Ok(V4l2Channel {
            path: node.path.clone(),
        })
    }

    #[track_caller]
    fn query_signal(&mut self, channel: &Self::Channel) -> CoreResult<SignalStatus> {
        let output = v4l2_ctl(&["-d", &channel.path, "--get-fmt-video", "--get-parm"]).map_err(
            |reason| CaptureError::SignalQuery {
                reason,
                location: ErrorLocation::from(Location::caller()),
            },
        )?;

        let (width, height) = self.parser.parse_resolution(&output).unwrap_or((0, 0));

        Ok(SignalStatus {
            width,
            height,
            frame_rate: self.parser.parse_frame_rate(&output),
            device: DeviceIdentity::default(),
        })
    }

    fn close_channel(&mut self, channel: Self::Channel) {
        debug!(path = %channel.path, "Channel closed");
    }

    fn resolve_video_path(&mut self, serial: &str) -> Option<VideoDevicePath> {
        let nodes = match scan(&self.pattern, &self.parser) {
            Ok(nodes) => nodes,
            Err(e) => {
                warn!(error = %e, "Video node scan failed");
                return None;
            }
        };

        nodes
            .into_iter()
            .find(|node| node.info.serial == serial)
            .map(|node| VideoDevicePath {
                path: node.path,
                bus_info: node.info.bus_info,
            })
    }

    fn resolve_audio_input(&mut self, bus_info: &str, hint: Option<&str>) -> Option<String> {
        let detected = match fs::read_to_string(ASOUND_CARDS) {
            Ok(cards) => self.parser.find_sound_card(&cards, bus_info),
            Err(e) => {
                debug!(error = %e, "Sound card list unavailable");
                None
            }
        };

        detected.or_else(|| hint.map(alsa_device_from_hint))
    }

    #[track_caller]
    fn set_audio_volume(&mut self, audio_input: &str, volumes: &[AudioVolume]) -> CoreResult<()> {
        let card = alsa_card_index(audio_input).ok_or_else(|| CaptureError::Device {
            reason: format!("cannot tell the sound card of {audio_input}"),
            location: ErrorLocation::from(Location::caller()),
        })?;

        for volume in volumes {
            let args = amixer_args(&card, volume);
            let args: Vec<&str> = args.iter().map(String::as_str).collect();
            run_bounded(AMIXER, &args, HELPER_TIMEOUT).map_err(|reason| CaptureError::Device {
                reason,
                location: ErrorLocation::from(Location::caller()),
            })?;
            debug!(card = %card, control = %volume.control, level = %volume.level, "Mixer level set");
        }

        Ok(())
    }

    #[track_caller]
    fn register_hotplug(&mut self, sink: HotplugSink) -> CoreResult<()> {
        self.unregister_hotplug();

        let watcher = HotplugWatcher::spawn(
            self.pattern.clone(),
            Arc::clone(&self.parser),
            HOTPLUG_POLL_INTERVAL,
            sink,
        )
        .map_err(|e| CaptureError::Hotplug {
            reason: e.to_string(),
            location: ErrorLocation::from(Location::caller()),
        })?;

        self.hotplug = Some(watcher);
        Ok(())
    }

    fn unregister_hotplug(&mut self) {
        if let Some(mut watcher) = self.hotplug.take() {
            watcher.stop();
        }
    }
}

/// Enumerate capture-capable video nodes matching `pattern`, sorted by path.
#[track_caller]
pub(crate) fn scan(pattern: &str, parser: &V4l2Parser) -> CoreResult<Vec<VideoNode>> {
    let Some((dir, name)) = glob_to_regex(pattern) else {
        return Err(CaptureError::Device {
            reason: format!("unsupported video device path pattern {pattern}"),
            location: ErrorLocation::from(Location::caller()),
        });
    };

    let entries = fs::read_dir(&dir).map_err(|e| CaptureError::Device {
        reason: format!("cannot list {}: {}", dir.display(), e),
        location: ErrorLocation::from(Location::caller()),
    })?;

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| name.is_match(n))
        })
        .collect();
    paths.sort();

    let mut nodes = Vec::new();
    for path in paths {
        let path = path.to_string_lossy().into_owned();
        match v4l2_ctl(&["-d", &path, "--info"]) {
            Ok(output) => {
                if let Some(info) = parser.parse_info(&output) {
                    nodes.push(VideoNode { path, info });
                }
            }
            Err(reason) => debug!(path = %path, reason = %reason, "Skipping video node"),
        }
    }

    Ok(nodes)
}

/// `amixer` arguments setting one sub-device level on `card`.
pub(crate) fn amixer_args(card: &str, volume: &AudioVolume) -> Vec<String> {
    vec![
        "-q".to_string(),
        "-c".to_string(),
        card.to_string(),
        "sset".to_string(),
        volume.control.clone(),
        volume.level.clone(),
    ]
}

fn v4l2_ctl(args: &[&str]) -> Result<String, String> {
    run_bounded(V4L2_CTL, args, HELPER_TIMEOUT)
}

fn find_in_path(program: &str) -> Option<PathBuf> {
    let paths = env::var_os("PATH")?;
    env::split_paths(&paths)
        .map(|dir| dir.join(program))
        .find(|candidate| is_file(candidate))
}

fn is_file(path: &Path) -> bool {
    fs::metadata(path).is_ok_and(|m| m.is_file())
}
