//! Paginated, cancellable regex search over stored traffic
pub mod cancel;
pub mod engine;
pub mod events;
pub mod extractor;
pub mod filter;
pub mod results;
pub mod transform;

use crate::error::{GrepError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

pub use engine::{SearchEngine, StopOutcome};
pub use events::{BatchPolicy, EventEmitter, MatchBatch, SearchEvent};
pub use extractor::extract_matches;
pub use filter::build_filter;
pub use results::ResultStore;

/// Per-run search options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchOptions {
    pub include_requests: bool,
    pub include_responses: bool,
    pub max_results: Option<usize>,
    /// Capture groups to prefer, in priority order. Empty means the whole match.
    pub match_groups: Option<Vec<usize>>,
    pub only_in_scope: bool,
    /// Cap responses at 10 MiB instead of 100 MiB
    pub skip_large_responses: bool,
    pub custom_filter: Option<String>,
    /// Drop matches containing characters outside printable ASCII
    pub cleanup_output: bool,
    pub transform_script: Option<String>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            include_requests: true,
            include_responses: true,
            max_results: None,
            match_groups: None,
            only_in_scope: false,
            skip_large_responses: false,
            custom_filter: None,
            cleanup_output: false,
            transform_script: None,
        }
    }
}

impl SearchOptions {
    /// Reject malformed input before a run is started.
    pub fn validate(&self, pattern: &str) -> Result<()> {
        if pattern.is_empty() {
            return Err(GrepError::Validation("pattern must not be empty".into()));
        }
        if self.max_results == Some(0) {
            return Err(GrepError::Validation(
                "max_results must be greater than zero".into(),
            ));
        }
        if !self.include_requests && !self.include_responses {
            return Err(GrepError::Validation(
                "at least one of requests or responses must be searched".into(),
            ));
        }
        Ok(())
    }

    pub(crate) fn limit_reached(&self, count: usize) -> bool {
        self.max_results.is_some_and(|max| count >= max)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchSource {
    Request,
    Response,
}

impl fmt::Display for MatchSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchSource::Request => write!(f, "request"),
            MatchSource::Response => write!(f, "response"),
        }
    }
}

/// A match located in some text, before it is attributed to a record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedMatch {
    pub value: String,
    pub start_index: usize,
    pub end_index: usize,
}

/// A deduplicated match attributed to the record it was found in.
///
/// Offsets describe the untransformed match in the raw text and are byte offsets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    pub value: String,
    pub request_id: String,
    pub source: MatchSource,
    pub start_index: usize,
    pub end_index: usize,
}

/// Outcome of a completed run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchSummary {
    pub matches_count: usize,
    #[serde(with = "duration_millis")]
    pub time_taken: Duration,
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
