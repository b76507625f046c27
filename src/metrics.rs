use prometheus::{Encoder, IntCounter, Opts, Registry, TextEncoder};
use std::sync::Arc;

#[derive(Clone)]
pub struct Metrics {
    pub records_scanned: IntCounter,
    pub records_skipped: IntCounter,
    pub matches_found: IntCounter,
    pub matches_discarded: IntCounter,
    pub runs_started: IntCounter,
    pub runs_stopped: IntCounter,
    registry: Arc<Registry>,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

fn counter(name: &str, help: &str) -> IntCounter {
    IntCounter::with_opts(Opts::new(name, help).namespace("httpgrep"))
        .expect("counter options are static and valid")
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();
        let records_scanned = counter("records_scanned", "Number of records scanned");
        let records_skipped = counter("records_skipped", "Number of records skipped as out of scope");
        let matches_found = counter("matches_found", "Number of distinct matches kept");
        let matches_discarded = counter(
            "matches_discarded",
            "Number of matches dropped by cleanup, transform or dedup",
        );
        let runs_started = counter("runs_started", "Number of search runs started");
        let runs_stopped = counter("runs_stopped", "Number of search runs stopped by request");

        for c in [
            &records_scanned,
            &records_skipped,
            &matches_found,
            &matches_discarded,
            &runs_started,
            &runs_stopped,
        ] {
            registry.register(Box::new(c.clone())).ok();
        }

        Metrics {
            records_scanned,
            records_skipped,
            matches_found,
            matches_discarded,
            runs_started,
            runs_stopped,
            registry: Arc::new(registry),
        }
    }

    pub fn gather(&self) -> String {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if encoder.encode(&metric_families, &mut buffer).is_err() {
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}
