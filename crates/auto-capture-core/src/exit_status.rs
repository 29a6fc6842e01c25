use std::fmt;

/// How a controller run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    /// Loop ended on its own.
    Normal,
    /// Cancelled by an interrupt or termination signal.
    Interrupted,
    /// Configuration changed; the host should run the loop again.
    RestartRequested,
}

impl ExitStatus {
    /// Process exit code for this status.
    pub const fn code(self) -> i32 {
        match self {
            ExitStatus::Normal => 0,
            ExitStatus::Interrupted => 140,
            ExitStatus::RestartRequested => 141,
        }
    }
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExitStatus::Normal => "normal",
            ExitStatus::Interrupted => "interrupted",
            ExitStatus::RestartRequested => "restart requested",
        };
        f.write_str(s)
    }
}
