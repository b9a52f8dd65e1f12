//! Search Resolver: free-text query in, bounded result set out.

use tracing::{debug, warn};

use crate::error::InputError;
use crate::extractor::Extractor;
use crate::model::{MAX_SEARCH_RESULTS, SearchResults};

/// Info text shown once results are listed
pub const SELECT_PROMPT: &str = "Select a video from the list.";

#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    Found(SearchResults),
    /// Query was blank; the tool was not called
    Empty(InputError),
    Failed(String),
}

impl SearchOutcome {
    pub fn info_text(&self) -> String {
        match self {
            Self::Found(_) => SELECT_PROMPT.to_string(),
            Self::Empty(err) => err.to_string(),
            Self::Failed(msg) => format!("Search error: {}", msg),
        }
    }

    /// The result set to display; empty for anything but a success.
    pub fn into_results(self) -> SearchResults {
        match self {
            Self::Found(results) => results,
            _ => SearchResults::default(),
        }
    }
}

/// Runs a `MAX_SEARCH_RESULTS`-entry search for `query`.
pub fn resolve_search(extractor: &dyn Extractor, query: &str) -> SearchOutcome {
    let query = query.trim();
    if query.is_empty() {
        return SearchOutcome::Empty(InputError::EmptyQuery);
    }
    match extractor.search(query, MAX_SEARCH_RESULTS) {
        Ok(entries) => {
            debug!(query, count = entries.len(), "search finished");
            SearchOutcome::Found(SearchResults::from_entries(entries))
        }
        Err(err) => {
            warn!(%err, query, "search failed");
            SearchOutcome::Failed(err.to_string())
        }
    }
}
