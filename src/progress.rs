//! Progress line parsing for yt-dlp output.

use crate::model::{HookStatus, ProgressHook};

/// Prefix of the progress lines produced by [`PROGRESS_TEMPLATE`]
pub const PROGRESS_MARKER: &str = "tubegrab-progress:";

/// Passed to `--progress-template`; one line per callback, `<status>:<percent>`
pub const PROGRESS_TEMPLATE: &str =
    "download:tubegrab-progress:%(progress.status)s:%(progress._percent_str)s";

/// Turns a marker line into a progress callback. Other lines yield `None`.
pub fn parse_progress_from_line(line: &str) -> Option<ProgressHook> {
    let rest = line.trim().strip_prefix(PROGRESS_MARKER)?;
    let (status, percent) = match rest.split_once(':') {
        Some((status, percent)) => (status, Some(percent.to_string())),
        None => (rest, None),
    };
    Some(ProgressHook {
        status: HookStatus::from_tag(status),
        percent,
    })
}

/// Parses a percentage string such as `" 42.3%"`.
///
/// Unparseable or out-of-range samples return `None`; callers keep their
/// previous value.
pub fn parse_percent(raw: &str) -> Option<f32> {
    let number = raw.trim().trim_end_matches('%').trim();
    let value = number.parse::<f32>().ok()?;
    (value.is_finite() && (0.0..=100.0).contains(&value)).then_some(value)
}
