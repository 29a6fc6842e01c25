use crate::config::{default_duct_bin, default_duct_cmd};

use serde::Deserialize;

/// Optional con/duct resource monitoring wrapped around the recorder.
#[derive(Debug, Clone, Deserialize)]
pub struct ConductConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Executable checked with `--version` at startup.
    #[serde(default = "default_duct_bin")]
    pub duct_bin: String,

    /// Command template; `{duct_bin}`, `{start_ts}`, `{prefix}` and `{ffmpeg_cmd}` are expanded.
    #[serde(default = "default_duct_cmd")]
    pub cmd: String,
}

impl Default for ConductConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            duct_bin: default_duct_bin(),
            cmd: default_duct_cmd(),
        }
    }
}
