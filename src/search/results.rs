//! Deduplicated results of the most recent run, kept for download
use crate::search::MatchResult;
use parking_lot::Mutex;
use std::collections::HashMap;

#[derive(Debug, Default)]
struct Entries {
    index: HashMap<String, usize>,
    items: Vec<MatchResult>,
}

/// Process-lifetime map from match value to the first match seen with it.
///
/// Cleared when a run starts, never shrinks during one.
#[derive(Debug, Default)]
pub struct ResultStore {
    entries: Mutex<Entries>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&self) {
        let mut entries = self.entries.lock();
        entries.index.clear();
        entries.items.clear();
    }

    /// Insert `result` unless its value is already present.
    pub fn add(&self, result: MatchResult) -> bool {
        let mut entries = self.entries.lock();
        if entries.index.contains_key(&result.value) {
            return false;
        }
        let position = entries.items.len();
        entries.index.insert(result.value.clone(), position);
        entries.items.push(result);
        true
    }

    pub fn get(&self, value: &str) -> Option<MatchResult> {
        let entries = self.entries.lock();
        entries
            .index
            .get(value)
            .map(|&position| entries.items[position].clone())
    }

    /// All results in insertion order
    pub fn list(&self) -> Vec<MatchResult> {
        self.entries.lock().items.clone()
    }

    pub fn keys(&self) -> Vec<String> {
        self.entries
            .lock()
            .items
            .iter()
            .map(|item| item.value.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::MatchSource;

    fn result(value: &str, request_id: &str) -> MatchResult {
        MatchResult {
            value: value.to_string(),
            request_id: request_id.to_string(),
            source: MatchSource::Response,
            start_index: 3,
            end_index: 3 + value.len(),
        }
    }

    #[test]
    fn test_first_seen_wins() {
        let store = ResultStore::new();
        assert!(store.add(result("example.com", "1")));
        assert!(!store.add(result("example.com", "2")));
        assert!(store.add(result("Example.com", "3")));

        assert_eq!(store.len(), 2);
        assert_eq!(store.get("example.com").unwrap().request_id, "1");
        assert_eq!(store.keys(), vec!["example.com", "Example.com"]);
    }

    #[test]
    fn test_clear() {
        let store = ResultStore::new();
        store.add(result("a", "1"));
        store.clear();
        assert!(store.is_empty());
        assert!(store.get("a").is_none());
        assert!(store.add(result("a", "2")));
        assert_eq!(store.list()[0].request_id, "2");
    }
}
