//! Boundary to the external video-extraction tool.

use crate::error::ExtractorError;
use crate::model::{DownloadRequest, ProgressHook, SearchEntry, VideoMetadata};

/// Progress callback handed to [`Extractor::download`].
pub type ProgressCallback = Box<dyn FnMut(ProgressHook) + Send>;

/// The three operations the app needs from the extraction tool.
///
/// Implementations block the calling thread until the tool is done.
#[cfg_attr(test, mockall::automock)]
pub trait Extractor: Send + Sync {
    /// Metadata only, nothing is downloaded.
    fn fetch_metadata(&self, url: &str) -> Result<VideoMetadata, ExtractorError>;

    /// Asks the tool for up to `limit` videos matching `query`.
    fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchEntry>, ExtractorError>;

    /// Downloads a single video, invoking `on_progress` for every progress report.
    fn download(
        &self,
        request: &DownloadRequest,
        on_progress: ProgressCallback,
    ) -> Result<(), ExtractorError>;
}
