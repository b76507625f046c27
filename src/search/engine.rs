//! Search orchestration: single-flight runs over the paginated traffic store
use crate::config::Config;
use crate::error::{GrepError, Result};
use crate::host::{RecordPage, RecordQuery, TrafficStore};
use crate::metrics::Metrics;
use crate::search::cancel::with_cancellation;
use crate::search::events::{BatchPolicy, EventEmitter, SearchEvent};
use crate::search::extractor::extract_matches;
use crate::search::filter::build_filter;
use crate::search::results::ResultStore;
use crate::search::transform::{TransformEvaluator, TransformOutcome};
use crate::search::{MatchResult, MatchSource, SearchOptions, SearchSummary};
use log::{debug, info, warn};
use parking_lot::Mutex;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    Stopping,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopOutcome {
    pub success: bool,
    pub message: String,
}

struct Session {
    state: RunState,
    /// Resolved by the run's teardown once a stop was requested
    stop_signal: Option<watch::Sender<bool>>,
}

struct Inner<S> {
    store: Arc<S>,
    config: Config,
    session: Mutex<Session>,
    active: AtomicBool,
    results: Arc<ResultStore>,
    metrics: Arc<Metrics>,
}

/// Main search engine; clones share one session, so `stop` can be called
/// from another task while `search` runs.
pub struct SearchEngine<S> {
    inner: Arc<Inner<S>>,
}

impl<S> Clone for SearchEngine<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Resets the session when a run ends, however it ends.
struct RunGuard<'a, S> {
    inner: &'a Inner<S>,
}

impl<S> Drop for RunGuard<'_, S> {
    fn drop(&mut self) {
        let mut session = self.inner.session.lock();
        self.inner.active.store(false, Ordering::SeqCst);
        session.state = RunState::Idle;
        if let Some(signal) = session.stop_signal.take() {
            signal.send_replace(true);
        }
    }
}

/// What one run looks for, fixed before the first page is fetched
struct ScanPlan<'a> {
    regex: Regex,
    options: &'a SearchOptions,
    /// Transform script known to compile
    transform: Option<&'a str>,
}

/// Matches collected by one run, in discovery order
#[derive(Default)]
struct RunMatches {
    seen: HashSet<String>,
    items: Vec<MatchResult>,
    sent: usize,
}

impl RunMatches {
    fn insert(&mut self, result: &MatchResult) -> bool {
        if self.seen.contains(&result.value) {
            return false;
        }
        self.seen.insert(result.value.clone());
        self.items.push(result.clone());
        true
    }

    fn len(&self) -> usize {
        self.items.len()
    }

    fn unsent(&self) -> &[MatchResult] {
        &self.items[self.sent..]
    }
}

impl<S: TrafficStore> SearchEngine<S> {
    pub fn new(store: Arc<S>, config: Config) -> Self {
        Self::with_metrics(store, config, Arc::new(Metrics::new()))
    }

    pub fn with_metrics(store: Arc<S>, config: Config, metrics: Arc<Metrics>) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                config,
                session: Mutex::new(Session {
                    state: RunState::Idle,
                    stop_signal: None,
                }),
                active: AtomicBool::new(false),
                results: Arc::new(ResultStore::new()),
                metrics,
            }),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.inner.store
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn results(&self) -> Arc<ResultStore> {
        Arc::clone(&self.inner.results)
    }

    pub fn metrics(&self) -> Arc<Metrics> {
        Arc::clone(&self.inner.metrics)
    }

    pub fn state(&self) -> RunState {
        self.inner.session.lock().state
    }

    pub fn is_running(&self) -> bool {
        self.state() == RunState::Running
    }

    /// Event emitter using the configured batch policy
    pub fn emitter(&self, tx: UnboundedSender<SearchEvent>) -> EventEmitter {
        EventEmitter::new(
            tx,
            BatchPolicy {
                payload_limit: self.inner.config.search.payload_limit,
            },
        )
    }

    /// Scan the store for `pattern` and report progress and matches through `events`.
    ///
    /// Only one run may be active; a run still winding down after a stop is
    /// waited for before this one starts.
    pub async fn search(
        &self,
        pattern: &str,
        options: &SearchOptions,
        events: &EventEmitter,
    ) -> Result<SearchSummary> {
        let _guard = self.begin_run().await?;
        let started = Instant::now();

        let outcome = self.run(pattern, options, events).await;
        let time_taken = started.elapsed();

        match &outcome {
            Ok(count) => info!("Grep scan finished: {count} matches in {time_taken:.2?}"),
            Err(GrepError::Stopped) => {
                self.inner.metrics.runs_stopped.inc();
                info!(
                    "Grep scan stopped after {time_taken:.2?} with {} matches kept",
                    self.inner.results.len()
                );
            }
            Err(e) => warn!("Grep scan failed after {time_taken:.2?}: {e}"),
        }

        outcome.map(|matches_count| SearchSummary {
            matches_count,
            time_taken,
        })
    }

    /// Ask the active run to stop and wait until it has wound down.
    pub async fn stop(&self) -> StopOutcome {
        let mut done = {
            let mut session = self.inner.session.lock();
            if session.state == RunState::Idle {
                return StopOutcome {
                    success: false,
                    message: "No grep scan is running".to_string(),
                };
            }
            session.state = RunState::Stopping;
            self.inner.active.store(false, Ordering::SeqCst);
            session
                .stop_signal
                .get_or_insert_with(|| watch::channel(false).0)
                .subscribe()
        };

        info!("Stop requested, waiting for the grep scan to wind down");
        wait_stopped(&mut done).await;

        StopOutcome {
            success: true,
            message: "Grep scan stopped".to_string(),
        }
    }

    async fn begin_run(&self) -> Result<RunGuard<'_, S>> {
        loop {
            let teardown = {
                let mut session = self.inner.session.lock();
                match session.state {
                    RunState::Running => return Err(GrepError::AlreadyRunning),
                    RunState::Idle => {
                        session.state = RunState::Running;
                        self.inner.active.store(true, Ordering::SeqCst);
                        self.inner.results.clear();
                        self.inner.metrics.runs_started.inc();
                        return Ok(RunGuard { inner: &self.inner });
                    }
                    RunState::Stopping => session.stop_signal.as_ref().map(|s| s.subscribe()),
                }
            };

            debug!("Previous grep scan is still stopping, waiting before starting");
            match teardown {
                Some(mut done) => wait_stopped(&mut done).await,
                None => tokio::task::yield_now().await,
            }
        }
    }

    fn is_active(&self) -> bool {
        self.inner.active.load(Ordering::SeqCst)
    }

    fn checkpoint(&self) -> Result<()> {
        if self.is_active() {
            Ok(())
        } else {
            Err(GrepError::Stopped)
        }
    }

    async fn last_request_id(&self) -> Result<u64> {
        let page = self
            .inner
            .store
            .execute(RecordQuery::new().last(1))
            .await?;
        let last = page.items.last().ok_or(GrepError::NoRequestsFound)?;
        Ok(last.request.numeric_id().unwrap_or(0))
    }

    /// The run's transform script, if it has one that compiles.
    ///
    /// Checked once per run; pages rebuild their own evaluator because the
    /// interpreter context cannot be held across awaits.
    fn checked_transform<'o>(&self, options: &'o SearchOptions) -> Option<&'o str> {
        let script = options
            .transform_script
            .as_deref()
            .filter(|script| !script.trim().is_empty())?;
        match TransformEvaluator::try_compile(script, &self.inner.config.transform) {
            Ok(_) => Some(script),
            Err(err) => {
                warn!("Transform script failed to compile, matches pass through unchanged: {err}");
                None
            }
        }
    }

    fn compile(&self, pattern: &str) -> Result<Regex> {
        Ok(RegexBuilder::new(pattern)
            .case_insensitive(true)
            .size_limit(
                self.inner
                    .config
                    .search
                    .regex_size_limit_mb
                    .saturating_mul(1024 * 1024),
            )
            .build()?)
    }

    async fn run(&self, pattern: &str, options: &SearchOptions, events: &EventEmitter) -> Result<usize> {
        let store = &self.inner.store;
        let search_config = &self.inner.config.search;

        let project = store
            .current_project()
            .await?
            .ok_or(GrepError::NoProjectSelected)?;
        let last_id = self.last_request_id().await?;
        let plan = ScanPlan {
            regex: self.compile(pattern)?,
            options,
            transform: self.checked_transform(options),
        };
        let filter = build_filter(pattern, options);

        info!(
            "Starting grep scan in project '{}' for /{pattern}/i (last request id {last_id})",
            project.name
        );
        debug!("Filter: {filter}");
        events.progress(0);

        let mut matches = RunMatches::default();
        let mut cursor: Option<String> = None;
        let mut has_next = true;
        let mut processed_id = 0u64;
        let mut percent = 0u8;

        while has_next && !options.limit_reached(matches.len()) {
            self.checkpoint()?;

            percent = percent.max(progress_percent(processed_id, last_id));
            events.progress(percent);

            let mut query = RecordQuery::new()
                .filter(filter.as_str())
                .first(search_config.page_size);
            if let Some(after) = cursor.take() {
                query = query.after(after);
            }
            let page = with_cancellation(
                store.execute(query),
                || self.is_active(),
                search_config.poll_interval(),
            )
            .await?;

            debug!(
                "Fetched page of {} records (next page: {})",
                page.items.len(),
                page.page_info.has_next_page
            );
            self.collect_page(&page, &plan, &mut matches, &mut processed_id)?;

            if matches.len() > matches.sent {
                let limit = events.policy().payload_limit;
                if matches.sent <= limit && matches.len() > limit {
                    warn!("More than {limit} matches sent, further batches carry only counts");
                }
                events.matches(matches.sent, matches.unsent());
                matches.sent = matches.len();
            }

            cursor = page.page_info.end_cursor;
            has_next = page.page_info.has_next_page && !options.limit_reached(matches.len());
            if has_next && cursor.is_none() {
                warn!("Traffic store reported another page without a cursor, ending scan");
                has_next = false;
            }
        }

        Ok(matches.len())
    }

    fn collect_page(
        &self,
        page: &RecordPage,
        plan: &ScanPlan<'_>,
        matches: &mut RunMatches,
        processed_id: &mut u64,
    ) -> Result<()> {
        let options = plan.options;
        let metrics = &self.inner.metrics;
        let groups = options.match_groups.as_deref();
        let mut transform: Option<TransformEvaluator> = None;

        for record in &page.items {
            self.checkpoint()?;

            if let Some(id) = record.request.numeric_id() {
                *processed_id = id;
            }
            if options.limit_reached(matches.len()) {
                break;
            }
            if options.only_in_scope && !self.inner.store.is_in_scope(&record.request) {
                metrics.records_skipped.inc();
                continue;
            }
            metrics.records_scanned.inc();

            let mut sources = Vec::with_capacity(2);
            if options.include_requests {
                sources.push((MatchSource::Request, record.request.raw.as_str()));
            }
            if options.include_responses {
                if let Some(response) = &record.response {
                    sources.push((MatchSource::Response, response.raw.as_str()));
                }
            }

            'sources: for (source, text) in sources {
                for extracted in extract_matches(text, &plan.regex, groups) {
                    let Some(value) = self.finalize_value(&extracted.value, plan, &mut transform)
                    else {
                        metrics.matches_discarded.inc();
                        continue;
                    };

                    let result = MatchResult {
                        value,
                        request_id: record.request.id.clone(),
                        source,
                        start_index: extracted.start_index,
                        end_index: extracted.end_index,
                    };
                    if matches.insert(&result) {
                        self.inner.results.add(result);
                        metrics.matches_found.inc();
                    } else {
                        metrics.matches_discarded.inc();
                    }

                    if options.limit_reached(matches.len()) {
                        break 'sources;
                    }
                }
            }
        }

        Ok(())
    }

    /// Trim, clean up and transform a raw match; `None` drops it.
    fn finalize_value(
        &self,
        raw: &str,
        plan: &ScanPlan<'_>,
        transform: &mut Option<TransformEvaluator>,
    ) -> Option<String> {
        let value = raw.trim();
        if plan.options.cleanup_output && !is_printable(value) {
            return None;
        }
        if value.is_empty() {
            return None;
        }

        let Some(script) = plan.transform else {
            return Some(value.to_string());
        };

        let evaluator = transform
            .get_or_insert_with(|| TransformEvaluator::compile(script, &self.inner.config.transform));
        match evaluator.apply(value) {
            TransformOutcome::Discard => None,
            TransformOutcome::Replace(transformed) => {
                let transformed = transformed.trim();
                (!transformed.is_empty()).then(|| transformed.to_string())
            }
        }
    }
}

/// Wait for a run's teardown; a dropped signal also ends the wait.
async fn wait_stopped(done: &mut watch::Receiver<bool>) {
    while !*done.borrow_and_update() {
        if done.changed().await.is_err() {
            break;
        }
    }
}

/// Printable ASCII only, space through tilde
fn is_printable(value: &str) -> bool {
    value.chars().all(|c| matches!(c, ' '..='~'))
}

fn progress_percent(processed_id: u64, last_id: u64) -> u8 {
    if last_id == 0 {
        return 0;
    }
    let ratio = (processed_id as f64 / last_id as f64).min(0.99);
    (ratio * 100.0).floor() as u8
}
