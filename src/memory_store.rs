//! In-process traffic store backed by a JSON traffic dump
use crate::error::{GrepError, Result};
use crate::host::{PageInfo, Project, Record, RecordPage, RecordQuery, Request, Response, TrafficStore};
use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// On-disk layout of a traffic dump
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrafficDump {
    #[serde(default)]
    pub project: Option<Project>,
    #[serde(default)]
    pub records: Vec<DumpRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DumpRecord {
    pub id: String,
    pub request: String,
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default = "default_in_scope")]
    pub in_scope: bool,
}

fn default_in_scope() -> bool {
    true
}

/// Serves records in insertion order.
///
/// Filter expressions are not evaluated here; every record is returned and the
/// engine's own regex pass decides what matches.
pub struct MemoryStore {
    project: Option<Project>,
    records: Vec<Record>,
    out_of_scope: HashSet<String>,
    latency: Option<Duration>,
    queries: AtomicUsize,
}

impl MemoryStore {
    pub fn new(project: Option<Project>) -> Self {
        Self {
            project,
            records: Vec::new(),
            out_of_scope: HashSet::new(),
            latency: None,
            queries: AtomicUsize::new(0),
        }
    }

    pub fn from_dump(dump: TrafficDump) -> Self {
        let mut store = Self::new(dump.project);
        for record in dump.records {
            store.push(record);
        }
        store
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let dump: TrafficDump = serde_json::from_str(&content)?;
        debug!(
            "Loaded {} records from {}",
            dump.records.len(),
            path.display()
        );
        Ok(Self::from_dump(dump))
    }

    pub fn push(&mut self, record: DumpRecord) {
        if !record.in_scope {
            self.out_of_scope.insert(record.id.clone());
        }
        self.records.push(Record {
            response: record.response.map(|raw| Response {
                id: record.id.clone(),
                raw,
            }),
            request: Request {
                id: record.id,
                raw: record.request,
            },
        });
    }

    /// Delay every query, to simulate a slow host.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Number of queries executed so far
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::Relaxed)
    }

    fn page_forward(&self, query: &RecordQuery) -> Result<RecordPage> {
        let start = match &query.after {
            Some(cursor) => cursor
                .parse::<usize>()
                .map_err(|_| GrepError::Host(format!("Invalid cursor: {cursor}")))?
                + 1,
            None => 0,
        };
        let start = start.min(self.records.len());
        let end = match query.first {
            Some(n) => (start + n).min(self.records.len()),
            None => self.records.len(),
        };

        Ok(RecordPage {
            items: self.records[start..end].to_vec(),
            page_info: PageInfo {
                has_next_page: end < self.records.len(),
                end_cursor: (end > start).then(|| (end - 1).to_string()),
            },
        })
    }

    fn page_tail(&self, n: usize) -> RecordPage {
        let start = self.records.len().saturating_sub(n);
        RecordPage {
            items: self.records[start..].to_vec(),
            page_info: PageInfo {
                has_next_page: false,
                end_cursor: self.records.len().checked_sub(1).map(|i| i.to_string()),
            },
        }
    }
}

#[async_trait]
impl TrafficStore for MemoryStore {
    async fn current_project(&self) -> Result<Option<Project>> {
        Ok(self.project.clone())
    }

    async fn execute(&self, query: RecordQuery) -> Result<RecordPage> {
        self.queries.fetch_add(1, Ordering::Relaxed);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        match query.last {
            Some(n) => Ok(self.page_tail(n)),
            None => self.page_forward(&query),
        }
    }

    fn is_in_scope(&self, request: &Request) -> bool {
        !self.out_of_scope.contains(&request.id)
    }

    async fn record_by_id(&self, id: &str) -> Result<Option<Record>> {
        Ok(self
            .records
            .iter()
            .find(|record| record.request.id == id)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(n: usize) -> MemoryStore {
        let mut store = MemoryStore::new(None);
        for i in 1..=n {
            store.push(DumpRecord {
                id: i.to_string(),
                request: format!("GET /{i} HTTP/1.1"),
                response: None,
                in_scope: i % 2 == 0,
            });
        }
        store
    }

    #[tokio::test]
    async fn test_cursor_pagination() {
        let store = store_with(5);

        let first = store.execute(RecordQuery::new().first(2)).await.unwrap();
        assert_eq!(first.items.len(), 2);
        assert!(first.page_info.has_next_page);

        let cursor = first.page_info.end_cursor.unwrap();
        let second = store
            .execute(RecordQuery::new().first(2).after(cursor))
            .await
            .unwrap();
        assert_eq!(second.items[0].request.id, "3");

        let cursor = second.page_info.end_cursor.unwrap();
        let third = store
            .execute(RecordQuery::new().first(2).after(cursor))
            .await
            .unwrap();
        assert_eq!(third.items.len(), 1);
        assert!(!third.page_info.has_next_page);
        assert_eq!(store.query_count(), 3);
    }

    #[tokio::test]
    async fn test_last_returns_most_recent() {
        let store = store_with(3);
        let page = store.execute(RecordQuery::new().last(1)).await.unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].request.id, "3");

        let empty = MemoryStore::new(None);
        let page = empty.execute(RecordQuery::new().last(1)).await.unwrap();
        assert!(page.items.is_empty());
    }

    #[tokio::test]
    async fn test_scope_and_lookup() {
        let store = store_with(2);
        let record = store.record_by_id("1").await.unwrap().unwrap();
        assert!(!store.is_in_scope(&record.request));
        let record = store.record_by_id("2").await.unwrap().unwrap();
        assert!(store.is_in_scope(&record.request));
        assert!(store.record_by_id("9").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_bad_cursor_is_host_error() {
        let store = store_with(2);
        let err = store
            .execute(RecordQuery::new().first(1).after("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, GrepError::Host(_)));
    }

    #[test]
    fn test_dump_defaults() {
        let dump: TrafficDump =
            serde_json::from_str(r#"{"records":[{"id":"1","request":"GET / HTTP/1.1"}]}"#).unwrap();
        assert!(dump.project.is_none());
        assert!(dump.records[0].in_scope);
        assert!(dump.records[0].response.is_none());
    }
}
