//! Metadata Resolver: URL in, info-panel text out.

use tracing::{debug, warn};

use crate::error::InputError;
use crate::extractor::Extractor;
use crate::model::{VideoMetadata, VideoReference};

/// What the info panel should show after a metadata request
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataOutcome {
    Resolved(VideoMetadata),
    /// Input did not look like a video URL; the tool was not called
    Invalid(InputError),
    /// The tool failed; holds the failure description
    Failed(String),
}

impl MetadataOutcome {
    pub fn info_text(&self) -> String {
        match self {
            Self::Resolved(meta) => meta.info_text(),
            Self::Invalid(err) => err.to_string(),
            Self::Failed(msg) => format!("Error: {}", msg),
        }
    }

    pub fn metadata(&self) -> Option<&VideoMetadata> {
        match self {
            Self::Resolved(meta) => Some(meta),
            _ => None,
        }
    }
}

/// Validates `input` and asks the extractor for its metadata. No retries.
pub fn resolve_metadata(extractor: &dyn Extractor, input: &str) -> MetadataOutcome {
    let url = input.trim();
    if !VideoReference::has_video_shape(url) {
        debug!(input = url, "rejected non-video URL");
        return MetadataOutcome::Invalid(InputError::InvalidUrl);
    }
    match extractor.fetch_metadata(url) {
        Ok(meta) => MetadataOutcome::Resolved(meta),
        Err(err) => {
            warn!(%err, url, "metadata extraction failed");
            MetadataOutcome::Failed(err.to_string())
        }
    }
}
