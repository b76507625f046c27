//! Boundary to the proxy host's traffic store
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Project currently open in the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub id: String,
    pub raw: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub id: String,
    pub raw: String,
}

/// A stored request paired with its response, if one was received
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub request: Request,
    pub response: Option<Response>,
}

impl Request {
    /// Numeric form of the id; hosts hand out increasing integer ids.
    pub fn numeric_id(&self) -> Option<u64> {
        self.id.parse().ok()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfo {
    pub has_next_page: bool,
    pub end_cursor: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordPage {
    pub items: Vec<Record>,
    pub page_info: PageInfo,
}

/// Cursor query against the host store.
///
/// The filter string is written in the host's query language and is passed
/// through untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordQuery {
    pub filter: Option<String>,
    pub first: Option<usize>,
    pub after: Option<String>,
    pub last: Option<usize>,
}

impl RecordQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, expression: impl Into<String>) -> Self {
        self.filter = Some(expression.into());
        self
    }

    pub fn first(mut self, n: usize) -> Self {
        self.first = Some(n);
        self
    }

    pub fn after(mut self, cursor: impl Into<String>) -> Self {
        self.after = Some(cursor.into());
        self
    }

    pub fn last(mut self, n: usize) -> Self {
        self.last = Some(n);
        self
    }
}

/// Capabilities the search engine consumes from the host
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TrafficStore: Send + Sync {
    async fn current_project(&self) -> Result<Option<Project>>;

    /// Run a paginated query; `first`/`after` page forward, `last` reads the tail.
    async fn execute(&self, query: RecordQuery) -> Result<RecordPage>;

    fn is_in_scope(&self, request: &Request) -> bool;

    async fn record_by_id(&self, id: &str) -> Result<Option<Record>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_builder_chains() {
        let query = RecordQuery::new().filter("req.raw.regex:\"a\"").first(100).after("7");
        assert_eq!(query.filter.as_deref(), Some("req.raw.regex:\"a\""));
        assert_eq!(query.first, Some(100));
        assert_eq!(query.after.as_deref(), Some("7"));
        assert_eq!(query.last, None);
    }

    #[test]
    fn test_numeric_id() {
        let request = Request {
            id: "42".to_string(),
            raw: String::new(),
        };
        assert_eq!(request.numeric_id(), Some(42));

        let request = Request {
            id: "abc".to_string(),
            raw: String::new(),
        };
        assert_eq!(request.numeric_id(), None);
    }
}
