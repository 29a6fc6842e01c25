use crate::{
    AppError,
    config::{Config, expand_env, parse_volume_level, sub_device_control},
};

use auto_capture_core::{AudioVolume, DeviceTarget, NotificationLevel};

use std::{fs, time::Duration};

const MINIMAL: &str = r#"
device_serial_number = "A1B2C3"

[ffmpeg]
out_fmt = "mkv"
"#;

fn no_env(_: &str) -> Option<String> {
    None
}

/// WHAT: A minimal file fills every optional field with its default
/// WHY: Only the device serial and container format should be mandatory
#[test]
fn given_minimal_config_when_parsing_then_defaults_applied() {
    // Given: A config with only the required keys

    // When: Parsing it
    let config = Config::parse(MINIMAL, no_env).unwrap();

    // Then: Defaults are filled in
    assert_eq!(config.device_serial_number, "A1B2C3");
    assert_eq!(config.video_device_path_pattern, "/dev/video*");
    assert_eq!(config.instance_tag, "auto");
    assert!(config.audio_enabled);
    assert_eq!(config.poll_interval_ms, 1000);
    assert!(config.session_log.enabled);
    assert_eq!(config.ffmpeg.v_fmt, "-f v4l2");
    assert_eq!(config.ffmpeg.a_fmt, "-f alsa");
    assert_eq!(config.recorder.stop_timeout(), Duration::from_secs(10));
    assert_eq!(config.recorder.recovery_timeout(), Duration::from_secs(60));
    assert!(!config.notifications.enabled);
    assert!(config.notifications.verify_ssl_cert);
    assert_eq!(config.notifications.queue_capacity, 64);
    assert_eq!(config.notifications.level(), NotificationLevel::Info);
    assert!(config.explicit_instance_tag().is_none());
}

/// WHAT: Missing required keys are configuration errors
/// WHY: The recorder cannot run without a device selector or output format
#[test]
fn given_missing_required_keys_when_parsing_then_config_error() {
    // Given: Configs missing the serial and the ffmpeg table
    let no_serial = "[ffmpeg]\nout_fmt = \"mkv\"\n";
    let no_ffmpeg = "device_serial_number = \"auto\"\n";

    // When: Parsing them
    let first = Config::parse(no_serial, no_env);
    let second = Config::parse(no_ffmpeg, no_env);

    // Then: Both are rejected with the config exit code
    for result in [first, second] {
        let err = result.unwrap_err();
        assert!(matches!(err, AppError::ConfigError { .. }));
        assert_eq!(err.exit_code(), 78);
    }
}

/// WHAT: Semantically invalid values are rejected
/// WHY: Catching them at load beats failing mid-session
#[test]
fn given_invalid_values_when_parsing_then_rejected() {
    // Given: Configs that parse but cannot run
    let cases = [
        "device_serial_number = \"auto\"\n[ffmpeg]\nout_fmt = \"  \"\n",
        "device_serial_number = \"auto\"\npoll_interval_ms = 0\n[ffmpeg]\nout_fmt = \"mkv\"\n",
        "device_serial_number = \"auto\"\n[ffmpeg]\nout_fmt = \"mkv\"\n[notifications]\nenabled = true\n",
        "device_serial_number = \"auto\"\n[ffmpeg]\nout_fmt = \"mkv\"\n[notifications]\nqueue_capacity = 0\n",
        "device_serial_number = \"auto\"\n[ffmpeg]\nout_fmt = \"mkv\"\n[notifications]\nmin_level = \"loud\"\n",
        "device_serial_number = \"auto\"\n[ffmpeg]\nout_fmt = \"mkv\"\n[recorder]\nstop_timeout_ms = 1000\nstop_grace_ms = 1000\n",
    ];

    for contents in cases {
        // When: Parsing
        let result = Config::parse(contents, no_env);

        // Then: Validation fails
        assert!(
            matches!(result, Err(AppError::ConfigError { .. })),
            "accepted: {contents}"
        );
    }
}

/// WHAT: A `${VAR}` api key is read through the lookup
/// WHY: Keys stay out of the config file
#[test]
fn given_env_reference_when_parsing_then_api_key_expanded() {
    // Given: A config referencing an environment variable
    let contents = format!(
        "{MINIMAL}\n[notifications]\nenabled = true\napi_base_url = \"https://monitor.local/api\"\napi_key = \"${{CAPTURE_API_KEY}}\"\nmin_level = \"warning\"\n"
    );

    // When: Parsing with the variable set
    let config = Config::parse(&contents, |name| {
        (name == "CAPTURE_API_KEY").then(|| "s3cret".to_string())
    })
    .unwrap();

    // Then: The key is substituted and the level parsed
    assert_eq!(config.notifications.api_key, "s3cret");
    assert_eq!(config.notifications.level(), NotificationLevel::Warning);
    let settings = config.notifications.queue_settings();
    assert!(settings.enabled);
    assert_eq!(settings.min_level, NotificationLevel::Warning);
}

/// WHAT: Expansion only applies to whole-value references
/// WHY: Literal keys containing `$` must pass through untouched
#[test]
fn given_values_when_expanding_env_then_only_references_substituted() {
    // Given: A literal, a reference to a set variable and one to an unset variable
    let lookup = |name: &str| (name == "SET").then(|| "value".to_string());

    // When: Expanding each
    let literal = expand_env("abc$def", lookup).unwrap();
    let set = expand_env("${SET}", lookup).unwrap();
    let unset = expand_env("${UNSET}", lookup);

    // Then: Only the reference changes, the unset one fails
    assert_eq!(literal, "abc$def");
    assert_eq!(set, "value");
    assert!(matches!(unset, Err(AppError::ConfigError { .. })));
}

/// WHAT: Device overrides honour `auto`, `auto,<hint>` and explicit values
/// WHY: Explicit paths must win while hints only act as a fallback
#[test]
fn given_ffmpeg_device_values_when_building_overrides_then_mapped() {
    // Given: Auto devices, a hinted audio device, and explicit devices
    let mut config = Config::parse(MINIMAL, no_env).unwrap();

    // When / Then: Auto leaves everything to detection
    let overrides = config.ffmpeg.device_overrides();
    assert!(overrides.video_path.is_none());
    assert!(overrides.audio_input.is_none());
    assert!(overrides.audio_hint.is_none());

    // When / Then: A hint is kept as fallback only
    config.ffmpeg.a_dev = "auto, 3".to_string();
    let overrides = config.ffmpeg.device_overrides();
    assert!(overrides.audio_input.is_none());
    assert_eq!(overrides.audio_hint.as_deref(), Some("3"));

    // When / Then: Explicit values are used as given
    config.ffmpeg.v_dev = "/dev/video4".to_string();
    config.ffmpeg.a_dev = "hw:1,0".to_string();
    let overrides = config.ffmpeg.device_overrides();
    assert_eq!(overrides.video_path.as_deref(), Some("/dev/video4"));
    assert_eq!(overrides.audio_input.as_deref(), Some("hw:1,0"));
}

/// WHAT: Controller settings carry the parsed values through
/// WHY: The controller sees only these settings, never the raw file
#[test]
fn given_config_when_building_controller_settings_then_fields_copied() {
    // Given: A config with a serial and a fast poll
    let contents = "device_serial_number = \"auto\"\npoll_interval_ms = 250\ninstance_tag = \"lab-1\"\n[session_log]\nenabled = false\n[ffmpeg]\nout_fmt = \"mkv\"\n";
    let config = Config::parse(contents, no_env).unwrap();

    // When: Building controller settings
    let settings = config.controller_settings(
        "auto-capture",
        std::path::Path::new("/etc/capture.toml"),
        "/data/{year}",
    )
    .unwrap();

    // Then: Values are carried over
    assert_eq!(settings.target, DeviceTarget::FirstAvailable);
    assert_eq!(settings.poll_interval, Duration::from_millis(250));
    assert!(!settings.session_log_enabled);
    assert_eq!(settings.out_path_template, "/data/{year}");
    assert!(settings.audio_volumes.is_empty());
    assert_eq!(config.explicit_instance_tag(), Some("lab-1"));
}

/// WHAT: `a_vol` entries become mixer settings for the matching sub-devices
/// WHY: The controller applies them verbatim to the detected sound card
#[test]
fn given_audio_volumes_when_building_controller_settings_then_mixer_settings_included() {
    // Given: Volumes for two sub-devices
    let contents = format!("{MINIMAL}a_vol = {{ line = \"80%\", HDMI = \"12\" }}\n");
    let config = Config::parse(&contents, no_env).unwrap();

    // When: Building controller settings
    let settings = config
        .controller_settings("auto-capture", std::path::Path::new("c.toml"), "/data")
        .unwrap();

    // Then: Aliases resolve to mixer controls in alias order
    assert_eq!(
        settings.audio_volumes,
        vec![
            AudioVolume {
                control: "HDMI".to_string(),
                level: "12".to_string(),
            },
            AudioVolume {
                control: "Line In".to_string(),
                level: "80%".to_string(),
            },
        ]
    );
}

/// WHAT: Unknown aliases and unsupported levels fail at load
/// WHY: A typo must not silently leave the card at the wrong gain
#[test]
fn given_invalid_audio_volumes_when_parsing_then_config_error() {
    // Given: An unknown alias, a decibel level and an out of range percentage
    let cases = [
        "a_vol = { mic = \"50%\" }",
        "a_vol = { line = \"-3dB\" }",
        "a_vol = { line = \"150%\" }",
        "a_vol = { line = \"loud\" }",
    ];

    for case in cases {
        // When: Parsing
        let result = Config::parse(&format!("{MINIMAL}{case}\n"), no_env);

        // Then: The config is rejected
        assert!(
            matches!(result, Err(AppError::ConfigError { .. })),
            "accepted: {case}"
        );
    }
}

/// WHAT: Volume levels and aliases normalise to what amixer expects
/// WHY: Whitespace and alias case in hand-edited files must not matter
#[test]
fn given_volume_text_when_parsing_level_then_normalised() {
    // Given / When / Then: Percent and raw levels pass, decibels do not
    assert_eq!(parse_volume_level(" 75 % ").unwrap(), "75%");
    assert_eq!(parse_volume_level("0%").unwrap(), "0%");
    assert_eq!(parse_volume_level("31").unwrap(), "31");
    assert!(parse_volume_level("6dB").is_err());
    assert!(parse_volume_level("").is_err());

    assert_eq!(sub_device_control(" Line "), Some("Line In"));
    assert_eq!(sub_device_control("mic"), None);
}

/// WHAT: con/duct wrapping is off by default and validated when enabled
/// WHY: A template without the recorder command would record nothing
#[test]
fn given_conduct_section_when_parsing_then_defaults_and_validation_applied() {
    // Given: No conduct section, a valid one and one missing {ffmpeg_cmd}
    let default = Config::parse(MINIMAL, no_env).unwrap();
    let valid = format!(
        "{MINIMAL}[conduct]\nenabled = true\nduct_bin = \"/opt/duct\"\ncmd = \"{{duct_bin}} -p {{prefix}} {{ffmpeg_cmd}}\"\n"
    );
    let invalid = format!("{MINIMAL}[conduct]\nenabled = true\ncmd = \"{{duct_bin}} -p {{prefix}}\"\n");

    // When: Parsing them
    let valid = Config::parse(&valid, no_env).unwrap();
    let invalid = Config::parse(&invalid, no_env);

    // Then: Defaults are off, a valid section is kept and the invalid one rejected
    assert!(!default.conduct.enabled);
    assert_eq!(default.conduct.duct_bin, "duct");
    assert!(valid.conduct.enabled);
    assert_eq!(valid.conduct.duct_bin, "/opt/duct");
    assert!(matches!(invalid, Err(AppError::ConfigError { .. })));
}

/// WHAT: Loading a missing file fails with a config error
/// WHY: A missing config maps to EX_CONFIG, not a generic failure
#[test]
fn given_missing_file_when_loading_then_config_error() {
    // Given: A directory without a config file
    let dir = tempfile::tempdir().unwrap();

    // When: Loading a path inside it
    let result = Config::load(&dir.path().join("config.toml"));

    // Then: The error is a config error
    assert!(matches!(result, Err(AppError::ConfigError { .. })));
}

/// WHAT: A config on disk loads through the environment lookup
/// WHY: `load` is the path the application takes at every restart
#[test]
fn given_file_on_disk_when_loading_then_parsed() {
    // Given: A minimal config file
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, MINIMAL).unwrap();

    // When: Loading it
    let config = Config::load(&path).unwrap();

    // Then: It is parsed
    assert_eq!(config.ffmpeg.out_fmt, "mkv");
}
