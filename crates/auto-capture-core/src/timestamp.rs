use std::path::PathBuf;

use chrono::{DateTime, Datelike, Local};

/// Session timestamp in `YYYY.MM.DD.HH.MM.SS.mmm` local time, used in file names.
pub fn session_stamp(ts: &DateTime<Local>) -> String {
    ts.format("%Y.%m.%d.%H.%M.%S.%3f").to_string()
}

/// Expand `{year}` and `{month}` in an output path template.
pub fn expand_out_path(template: &str, ts: &DateTime<Local>) -> PathBuf {
    let expanded = template
        .replace("{year}", &format!("{:04}", ts.year()))
        .replace("{month}", &format!("{:02}", ts.month()));
    PathBuf::from(expanded)
}
