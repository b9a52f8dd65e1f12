//! Error types shared by the resolvers, the download worker and the config loader.
//!
//! Every error ends up as free text in the UI, so the `Display` strings here
//! are the messages the user actually reads.

use std::path::PathBuf;
use thiserror::Error;

/// Input validation failures, reported before any work starts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("Enter a valid URL.")]
    InvalidUrl,
    #[error("Enter a topic to search.")]
    EmptyQuery,
    #[error("Please enter a URL and select a folder.")]
    MissingDownloadInput,
    #[error("A download is already running.")]
    DownloadInProgress,
    #[error("No search result at position {0}.")]
    NoSuchResult(usize),
}

/// Failures reported by the external extraction tool.
#[derive(Debug, Error)]
pub enum ExtractorError {
    /// yt-dlp could not be located or unpacked
    #[error("yt-dlp is not available: {0}")]
    ToolUnavailable(String),
    /// Spawning or talking to the child process failed
    #[error("failed to run yt-dlp: {0}")]
    Io(#[from] std::io::Error),
    /// yt-dlp exited with a non-zero status
    #[error("{0}")]
    Failed(String),
    /// yt-dlp produced output we could not decode
    #[error("unexpected yt-dlp output: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("malformed config file {}: {source}", .path.display())]
    Malformed {
        path: PathBuf,
        source: serde_json::Error,
    },
}
