use crate::{
    config::{ConductConfig, Config},
    ffmpeg_recorder::{
        check_conduct, conduct_command, conduct_prefix, ffmpeg_args, is_duct_version,
        recording_path,
    },
};

use auto_capture_core::{DeviceIdentity, Session, SignalStatus};

use std::path::{Path, PathBuf};

use chrono::Local;

fn session(audio_input: Option<&str>) -> Session {
    Session {
        id: 1,
        started_at: Local::now(),
        start_stamp: "2024.03.09.14.05.07.000".to_string(),
        signal: SignalStatus {
            width: 1920,
            height: 1080,
            frame_rate: 59.94,
            device: DeviceIdentity::default(),
        },
        device: DeviceIdentity::default(),
        video_path: "/dev/video0".to_string(),
        bus_info: "usb-0000:00:14.0-1".to_string(),
        audio_input: audio_input.map(str::to_string),
        output_dir: PathBuf::from("/data"),
        recovered: false,
    }
}

fn options() -> crate::config::FfmpegConfig {
    let contents = "device_serial_number = \"auto\"\n[ffmpeg]\nout_fmt = \"mkv\"\n";
    Config::parse(contents, |_| None).unwrap().ffmpeg
}

/// WHAT: The default command line records audio and video in the documented order
/// WHY: ffmpeg applies options to the next input, so order is behaviour
#[test]
fn given_audio_session_when_building_args_then_full_layout() {
    // Given: A session with an audio input
    let session = session(Some("hw:2,0"));
    let out = Path::new("/data/2024.03.09.14.05.07.000--.mkv");

    // When: Building the arguments
    let args = ffmpeg_args(&options(), &session, "0a0b0c0d-1-2", out);

    // Then: Every fragment is split and placed in order
    let expected = "-f alsa -ac 2 -thread_queue_size 4000 -accurate_seek -i hw:2,0 \
        -f v4l2 -framerate 60 -video_size 1920x1080 -thread_queue_size 4000 -accurate_seek \
        -i /dev/video0 -c:v libx264 -flush_packets 1 -preset ultrafast -crf 18 \
        -pix_fmt yuv420p -threads 4 -c:a aac -b:a 128k -metadata comment=0a0b0c0d-1-2 \
        /data/2024.03.09.14.05.07.000--.mkv";
    assert_eq!(args.join(" "), expected.split_whitespace().collect::<Vec<_>>().join(" "));
}

/// WHAT: Video-only sessions carry no audio input or encoder
/// WHY: ffmpeg fails when an audio encoder has no audio stream
#[test]
fn given_video_only_session_when_building_args_then_no_audio_fragments() {
    // Given: A session without audio
    let session = session(None);

    // When: Building the arguments
    let args = ffmpeg_args(&options(), &session, "tag", Path::new("/data/out.mkv"));

    // Then: Video is the first input and no audio options remain
    assert_eq!(&args[..2], ["-f", "v4l2"]);
    assert!(!args.iter().any(|a| a == "alsa" || a == "-c:a"));
    assert_eq!(args.iter().filter(|a| *a == "-i").count(), 1);
    assert_eq!(args.last().map(String::as_str), Some("/data/out.mkv"));
}

/// WHAT: Device paths and signal values stay single arguments
/// WHY: by-id paths may contain spaces, which must not split into extra inputs
#[test]
fn given_device_paths_with_spaces_when_building_args_then_kept_whole() {
    // Given: A video path and an audio input containing spaces
    let mut session = session(Some("hw:CARD=USB Capture,DEV=0"));
    session.video_path = "/dev/v4l/by-id/usb Video-index0".to_string();

    // When: Building the arguments
    let args = ffmpeg_args(&options(), &session, "tag", Path::new("/data/out.mkv"));

    // Then: Each value follows its flag as one argument
    let after = |flag: &str, nth: usize| {
        let index = args
            .iter()
            .enumerate()
            .filter(|(_, a)| *a == flag)
            .nth(nth)
            .map(|(i, _)| i)
            .unwrap();
        args[index + 1].clone()
    };
    assert_eq!(after("-i", 0), "hw:CARD=USB Capture,DEV=0");
    assert_eq!(after("-i", 1), "/dev/v4l/by-id/usb Video-index0");
    assert_eq!(after("-framerate", 0), "60");
    assert_eq!(after("-video_size", 0), "1920x1080");
}

fn conduct(cmd: &str) -> ConductConfig {
    ConductConfig {
        enabled: true,
        duct_bin: "/opt/duct".to_string(),
        cmd: cmd.to_string(),
    }
}

/// WHAT: The con/duct template expands around the whole recorder command
/// WHY: con/duct must launch ffmpeg with the exact arguments it would get unwrapped
#[test]
fn given_conduct_template_when_wrapping_then_macros_expanded() {
    // Given: A template using every macro and a recorder command
    let conduct = conduct("{duct_bin} --output-prefix {prefix} --tag={start_ts} {ffmpeg_cmd} ");
    let prefix = conduct_prefix(Path::new("/data/2024.03.09.14.05.07.000--.mkv"));
    let ffmpeg = vec!["-i".to_string(), "/dev/v4l/by-id/usb Video".to_string()];

    // When: Wrapping it
    let (program, args) = conduct_command(&conduct, "2024.03.09.14.05.07.000", &prefix, &ffmpeg);

    // Then: duct runs ffmpeg with its arguments untouched
    assert_eq!(program, "/opt/duct");
    assert_eq!(
        args,
        [
            "--output-prefix",
            "/data/2024.03.09.14.05.07.000--.mkv.duct_",
            "--tag=2024.03.09.14.05.07.000",
            "ffmpeg",
            "-i",
            "/dev/v4l/by-id/usb Video",
        ]
    );
}

/// WHAT: The con/duct check accepts only con/duct's version banner
/// WHY: Another program named duct would silently record nothing useful
#[test]
fn given_version_output_when_checking_conduct_then_only_duct_accepted() {
    // Given / When / Then: The banner must start with "duct "
    assert!(is_duct_version("duct 0.11.0\n"));
    assert!(!is_duct_version("ducttape 1.0"));
    assert!(!is_duct_version(""));

    // Given: Disabled wrapping, a foreign binary and a missing one
    let mut disabled = conduct("{duct_bin} {ffmpeg_cmd}");
    disabled.enabled = false;
    disabled.duct_bin = "/nonexistent/duct".to_string();
    let mut foreign = conduct("{duct_bin} {ffmpeg_cmd}");
    foreign.duct_bin = "echo".to_string();
    let mut missing = conduct("{duct_bin} {ffmpeg_cmd}");
    missing.duct_bin = "/nonexistent/duct".to_string();

    // When / Then: Only the disabled config passes, the others map to EX_UNAVAILABLE
    assert!(check_conduct(&disabled).is_ok());
    for config in [foreign, missing] {
        let err: crate::AppError = check_conduct(&config).unwrap_err().into();
        assert_eq!(err.exit_code(), 69);
    }
}

/// WHAT: File names carry start and stop stamps
/// WHY: An in-progress file is recognisable by its empty stop part
#[test]
fn given_stamps_when_building_recording_path_then_named_start_stop() {
    // Given: A directory and stamps
    let dir = Path::new("/data/Videos/2024/03");

    // When: Building the in-progress and final names
    let open = recording_path(dir, "2024.03.09.14.05.07.000", None, "mkv");
    let closed = recording_path(
        dir,
        "2024.03.09.14.05.07.000",
        Some("2024.03.09.15.00.00.250"),
        "mkv",
    );

    // Then: The stop part is filled in only when given
    assert_eq!(
        open,
        PathBuf::from("/data/Videos/2024/03/2024.03.09.14.05.07.000--.mkv")
    );
    assert_eq!(
        closed,
        PathBuf::from("/data/Videos/2024/03/2024.03.09.14.05.07.000--2024.03.09.15.00.00.250.mkv")
    );
}
