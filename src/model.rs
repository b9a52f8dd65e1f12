use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::InputError;
use crate::progress::parse_percent;

/// Upper bound on the number of search results kept at once
pub const MAX_SEARCH_RESULTS: usize = 5;

static VIDEO_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(https?://)?(www\.|m\.|music\.)?(youtube\.com|youtu\.be)/.+$")
        .expect("static regex")
});

/// Which resolver the input field feeds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Input is a video URL
    #[default]
    Url,
    /// Input is a free-text search topic
    Search,
}

/// A link to one playable remote video. Not canonicalized.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VideoReference(String);

impl VideoReference {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    /// Loose check against known video-hosting URL shapes
    pub fn has_video_shape(candidate: &str) -> bool {
        VIDEO_URL.is_match(candidate)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VideoReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Non-download metadata for one video. Refetched on every request.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VideoMetadata {
    pub title: Option<String>,
    pub uploader: Option<String>,
    pub upload_date: Option<NaiveDate>,
    /// Preview image URL, when the site provides one
    pub thumbnail: Option<String>,
}

impl VideoMetadata {
    /// Parses the `YYYYMMDD` upload date format used by yt-dlp
    pub fn parse_upload_date(raw: &str) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(raw.trim(), "%Y%m%d").ok()
    }

    /// Text shown in the info panel
    pub fn info_text(&self) -> String {
        let date = self
            .upload_date
            .map(format_date)
            .unwrap_or_else(|| "unknown".to_string());
        format!(
            "Title: {}\nUploader: {}\nDate: {}",
            self.title.as_deref().unwrap_or("N/A"),
            self.uploader.as_deref().unwrap_or("N/A"),
            date
        )
    }
}

fn format_date(date: NaiveDate) -> String {
    date.format("%d.%m.%Y").to_string()
}

/// One search hit: its metadata plus the reference to play it
#[derive(Debug, Clone, PartialEq)]
pub struct SearchEntry {
    pub metadata: VideoMetadata,
    pub reference: VideoReference,
}

impl SearchEntry {
    /// List line for the entry at zero-based `index`
    pub fn display_line(&self, index: usize) -> String {
        let date = self
            .metadata
            .upload_date
            .map(format_date)
            .unwrap_or_else(|| "N/A".to_string());
        format!(
            "{}. {} | {} | {}",
            index + 1,
            self.metadata.title.as_deref().unwrap_or("No title"),
            self.metadata.uploader.as_deref().unwrap_or("No uploader"),
            date
        )
    }
}

/// Results of the last search. Replaced wholesale by every new search.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SearchResults {
    entries: Vec<SearchEntry>,
}

impl SearchResults {
    /// Keeps at most [`MAX_SEARCH_RESULTS`] entries, in order
    pub fn from_entries(entries: Vec<SearchEntry>) -> Self {
        let mut entries = entries;
        entries.truncate(MAX_SEARCH_RESULTS);
        Self { entries }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&SearchEntry> {
        self.entries.get(index)
    }

    pub fn display_lines(&self) -> Vec<String> {
        self.entries
            .iter()
            .enumerate()
            .map(|(idx, entry)| entry.display_line(idx))
            .collect()
    }
}

/// Everything one download call needs. Lives only for that call.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadRequest {
    pub reference: VideoReference,
    pub directory: PathBuf,
    /// Format selector and output container, e.g. `mp4`
    pub format: String,
}

impl DownloadRequest {
    /// Builds a request, refusing when either the URL or the folder is missing.
    pub fn new(url: &str, directory: Option<&Path>, format: &str) -> Result<Self, InputError> {
        let url = url.trim();
        match directory {
            Some(dir) if !url.is_empty() => Ok(Self {
                reference: VideoReference::new(url),
                directory: dir.to_path_buf(),
                format: format.to_string(),
            }),
            _ => Err(InputError::MissingDownloadInput),
        }
    }

    /// `<directory>/<title>.<ext>` in yt-dlp template syntax
    pub fn output_template(&self) -> String {
        self.directory
            .join("%(title)s.%(ext)s")
            .to_string_lossy()
            .into_owned()
    }
}

/// Status tag of a progress callback from the extraction tool
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookStatus {
    Downloading,
    Finished,
    /// Anything else the tool reports, e.g. `error`
    Other(String),
}

impl HookStatus {
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim() {
            "downloading" => Self::Downloading,
            "finished" => Self::Finished,
            other => Self::Other(other.to_string()),
        }
    }
}

/// One progress callback as reported by the extraction tool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressHook {
    pub status: HookStatus,
    /// Raw percentage text, e.g. `" 42.3%"`. Not validated.
    pub percent: Option<String>,
}

impl ProgressHook {
    pub fn downloading(percent: impl Into<String>) -> Self {
        Self {
            status: HookStatus::Downloading,
            percent: Some(percent.into()),
        }
    }

    pub fn finished() -> Self {
        Self {
            status: HookStatus::Finished,
            percent: None,
        }
    }
}

/// Represents the current state of a download
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DownloadStatus {
    /// No download started yet
    #[default]
    Idle,
    /// Download is in progress
    Downloading,
    /// Download has completed successfully
    Finished,
    /// Download was abandoned after an error
    Failed,
}

/// Progress of the current download, owned by the UI thread
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProgressState {
    /// Percentage, 0.0 to 100.0
    pub percent: f32,
    pub status: DownloadStatus,
    /// Last accepted percentage text, shown verbatim in the label
    percent_text: Option<String>,
}

impl ProgressState {
    /// Resets for a new download
    pub fn start(&mut self) {
        self.percent = 0.0;
        self.status = DownloadStatus::Downloading;
        self.percent_text = None;
    }

    /// Applies one progress callback. Returns `true` when it finished the download.
    ///
    /// Malformed percentages keep the previous value, as do values lower than
    /// the current one.
    pub fn apply(&mut self, hook: &ProgressHook) -> bool {
        if matches!(self.status, DownloadStatus::Finished | DownloadStatus::Failed) {
            return false;
        }
        match hook.status {
            HookStatus::Downloading => {
                self.status = DownloadStatus::Downloading;
                let Some(raw) = hook.percent.as_deref() else {
                    return false;
                };
                if let Some(value) = parse_percent(raw) {
                    if value >= self.percent {
                        self.percent = value;
                        self.percent_text = Some(raw.trim().to_string());
                    }
                }
                false
            }
            HookStatus::Finished => {
                self.finish();
                true
            }
            HookStatus::Other(_) => false,
        }
    }

    pub fn finish(&mut self) {
        self.percent = 100.0;
        self.status = DownloadStatus::Finished;
    }

    /// No effect once the download has finished.
    pub fn fail(&mut self) {
        if self.status != DownloadStatus::Finished {
            self.status = DownloadStatus::Failed;
        }
    }

    /// Fraction for the progress bar
    pub fn fraction(&self) -> f32 {
        (self.percent / 100.0).clamp(0.0, 1.0)
    }

    pub fn label(&self) -> String {
        match self.status {
            DownloadStatus::Idle => "Progress: ---".to_string(),
            DownloadStatus::Downloading => match &self.percent_text {
                Some(text) => format!("Progress: {}", text),
                None => "Progress: ---".to_string(),
            },
            DownloadStatus::Finished => "Download complete!".to_string(),
            DownloadStatus::Failed => "Download failed".to_string(),
        }
    }
}
