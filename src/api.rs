//! Caller-facing operations; every result is an envelope, never an error.
use crate::error::{GrepError, Result};
use crate::host::TrafficStore;
use crate::patterns::{CustomPattern, PatternStore};
use crate::search::{
    EventEmitter, MatchResult, SearchEngine, SearchOptions, SearchSummary, StopOutcome,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope<T> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            data: Some(data),
            error: None,
        }
    }

    pub fn err(error: impl ToString) -> Self {
        Self {
            data: None,
            error: Some(error.to_string()),
        }
    }

    pub fn into_result(self) -> std::result::Result<T, String> {
        match (self.data, self.error) {
            (_, Some(error)) => Err(error),
            (Some(data), None) => Ok(data),
            (None, None) => Err("empty response".to_string()),
        }
    }
}

impl<T> From<Result<T>> for Envelope<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(data) => Envelope::ok(data),
            Err(err) => Envelope::err(err),
        }
    }
}

/// Raw text of a stored request and its response, for match detail views
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestDetail {
    pub id: String,
    pub request: String,
    pub response: Option<String>,
}

pub struct GrepService<S> {
    engine: SearchEngine<S>,
    patterns: PatternStore,
}

impl<S: TrafficStore> GrepService<S> {
    pub fn new(engine: SearchEngine<S>, patterns: PatternStore) -> Self {
        Self { engine, patterns }
    }

    pub fn engine(&self) -> &SearchEngine<S> {
        &self.engine
    }

    pub async fn search(
        &self,
        pattern: &str,
        options: &SearchOptions,
        events: &EventEmitter,
    ) -> Envelope<SearchSummary> {
        if let Err(err) = options.validate(pattern) {
            return Envelope::err(err);
        }
        self.engine.search(pattern, options, events).await.into()
    }

    pub async fn stop(&self) -> Envelope<StopOutcome> {
        Envelope::ok(self.engine.stop().await)
    }

    /// Every deduplicated match of the latest run, including a stopped one
    pub fn download_results(&self) -> Envelope<Vec<MatchResult>> {
        let results = self.engine.results().list();
        if results.is_empty() {
            return Envelope::err(GrepError::NoResults);
        }
        Envelope::ok(results)
    }

    pub fn upsert_pattern(&self, id: &str, pattern: &str) -> Envelope<CustomPattern> {
        self.patterns.upsert(id, pattern).into()
    }

    pub fn list_patterns(&self) -> Envelope<Vec<CustomPattern>> {
        Envelope::ok(self.patterns.list())
    }

    pub fn delete_pattern(&self, id: &str) -> Envelope<bool> {
        match self.patterns.delete(id) {
            Ok(true) => Envelope::ok(true),
            Ok(false) => Envelope::err(GrepError::PatternNotFound(id.to_string())),
            Err(err) => Envelope::err(err),
        }
    }

    pub async fn request_detail(&self, id: &str) -> Envelope<RequestDetail> {
        let lookup = async {
            let record = self
                .engine
                .store()
                .record_by_id(id)
                .await?
                .ok_or_else(|| GrepError::Host(format!("Request {id} not found")))?;
            Ok::<_, GrepError>(RequestDetail {
                id: record.request.id,
                request: record.request.raw,
                response: record.response.map(|r| r.raw),
            })
        };
        lookup.await.into()
    }
}
