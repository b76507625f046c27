//! Progress and match events streamed to the caller during a run
use crate::search::MatchResult;
use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "payload", rename_all = "snake_case")]
pub enum SearchEvent {
    /// Percentage of the store scanned, 0-99 while running
    Progress(u8),
    Matches(MatchBatch),
}

/// Newly discovered matches, or only their number once the run has sent
/// more than the payload limit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum MatchBatch {
    Items(Vec<MatchResult>),
    Count(usize),
}

impl MatchBatch {
    pub fn len(&self) -> usize {
        match self {
            MatchBatch::Items(items) => items.len(),
            MatchBatch::Count(count) => *count,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchPolicy {
    pub payload_limit: usize,
}

impl Default for BatchPolicy {
    fn default() -> Self {
        Self {
            payload_limit: 25_000,
        }
    }
}

impl BatchPolicy {
    /// Batch for `pending` given how many matches this run already sent.
    pub fn batch(&self, already_sent: usize, pending: &[MatchResult]) -> MatchBatch {
        if already_sent > self.payload_limit {
            MatchBatch::Count(pending.len())
        } else {
            MatchBatch::Items(pending.to_vec())
        }
    }
}

/// Fire-and-forget event sink for one run.
///
/// A dropped receiver never fails the run.
#[derive(Debug, Clone, Default)]
pub struct EventEmitter {
    tx: Option<UnboundedSender<SearchEvent>>,
    policy: BatchPolicy,
}

impl EventEmitter {
    pub fn new(tx: UnboundedSender<SearchEvent>, policy: BatchPolicy) -> Self {
        Self {
            tx: Some(tx),
            policy,
        }
    }

    /// An emitter that discards every event
    pub fn silent() -> Self {
        Self::default()
    }

    pub fn policy(&self) -> BatchPolicy {
        self.policy
    }

    pub fn progress(&self, percent: u8) {
        self.send(SearchEvent::Progress(percent));
    }

    pub fn matches(&self, already_sent: usize, pending: &[MatchResult]) {
        self.send(SearchEvent::Matches(self.policy.batch(already_sent, pending)));
    }

    fn send(&self, event: SearchEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }
}
