use std::{fmt, str::FromStr};

use chrono::{DateTime, Local};

/// Severity of a status notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum NotificationLevel {
    /// Routine lifecycle event.
    Info,
    /// Something degraded but capture continues.
    Warning,
    /// Something failed.
    Error,
}

impl fmt::Display for NotificationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NotificationLevel::Info => "info",
            NotificationLevel::Warning => "warning",
            NotificationLevel::Error => "error",
        };
        f.write_str(s)
    }
}

impl FromStr for NotificationLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "info" => Ok(NotificationLevel::Info),
            "warning" | "warn" => Ok(NotificationLevel::Warning),
            "error" => Ok(NotificationLevel::Error),
            other => Err(format!("unknown notification level '{other}'")),
        }
    }
}

/// Status event queued for delivery to the remote observer.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationMessage {
    /// Severity.
    pub level: NotificationLevel,
    /// Human readable text.
    pub text: String,
    /// When the message was enqueued.
    pub enqueued_at: DateTime<Local>,
}

impl NotificationMessage {
    /// Create a message stamped with the current local time.
    pub fn new(level: NotificationLevel, text: impl Into<String>) -> Self {
        Self {
            level,
            text: text.into(),
            enqueued_at: Local::now(),
        }
    }
}
