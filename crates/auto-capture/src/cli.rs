use crate::{AppError, AppResult};

use std::{panic::Location, path::PathBuf};

use clap::Parser;
use directories::ProjectDirs;
use error_location::ErrorLocation;

/// Unattended video capture from a USB capture box.
#[derive(Debug, Clone, Parser)]
#[command(name = "auto-capture", version, about, long_about = None)]
pub(crate) struct Cli {
    /// Home directory holding config.toml and the default output tree.
    #[arg(short = 'd', long = "home")]
    pub home: Option<PathBuf>,

    /// Output directory template; {year} and {month} are expanded per session.
    #[arg(short = 'o', long = "out")]
    pub out: Option<String>,

    /// Configuration file [default: <home>/config.toml].
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Debug-level logging.
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    /// Write logs to this file instead of stderr.
    #[arg(short = 'f', long = "file-log")]
    pub file_log: Option<PathBuf>,

    /// Print the attached capture devices and exit.
    #[arg(short = 'l', long = "list-devices")]
    pub list_devices: bool,
}

/// Filesystem locations resolved from the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Paths {
    pub home: PathBuf,
    pub config: PathBuf,
    pub out_template: String,
}

impl Cli {
    /// Fill in defaults relative to the home directory.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Usage`] when no home is given and none can be derived.
    #[track_caller]
    pub fn paths(&self) -> AppResult<Paths> {
        let home = match &self.home {
            Some(home) => home.clone(),
            None => ProjectDirs::from("org", "auto-capture", "auto-capture")
                .map(|dirs| dirs.data_dir().to_path_buf())
                .ok_or_else(|| AppError::Usage {
                    reason: "home directory not specified, see --home".to_string(),
                    location: ErrorLocation::from(Location::caller()),
                })?,
        };

        let config = self
            .config
            .clone()
            .unwrap_or_else(|| home.join("config.toml"));

        let out_template = self.out.clone().unwrap_or_else(|| {
            home.join("Videos")
                .join("{year}")
                .join("{month}")
                .to_string_lossy()
                .into_owned()
        });

        Ok(Paths {
            home,
            config,
            out_template,
        })
    }

    /// Default tracing filter for the chosen verbosity.
    pub fn log_filter(&self) -> &'static str {
        if self.verbose {
            "auto_capture=debug,auto_capture_core=debug"
        } else {
            "auto_capture=info,auto_capture_core=info"
        }
    }
}
