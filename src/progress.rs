use crate::search::{MatchBatch, SearchEvent};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone)]
pub struct ProgressStats {
    pub percent: u8,
    pub matches_found: usize,
    pub batches: usize,
    start_time: Instant,
}

/// Renders search events as a percentage bar with a running match count
pub struct ProgressReporter {
    pub main_progress: ProgressBar,
    pub stats: Arc<Mutex<ProgressStats>>,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self::with_target(ProgressDrawTarget::stderr())
    }

    pub fn hidden() -> Self {
        Self::with_target(ProgressDrawTarget::hidden())
    }

    fn with_target(target: ProgressDrawTarget) -> Self {
        let main_progress = ProgressBar::with_draw_target(Some(100), target);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {pos:>2}% {msg}")
        {
            main_progress.set_style(style.progress_chars("=>-"));
        }

        Self {
            main_progress,
            stats: Arc::new(Mutex::new(ProgressStats {
                percent: 0,
                matches_found: 0,
                batches: 0,
                start_time: Instant::now(),
            })),
        }
    }

    pub fn handle(&self, event: &SearchEvent) {
        let mut stats = self.stats.lock();
        match event {
            SearchEvent::Progress(percent) => {
                stats.percent = stats.percent.max(*percent);
                self.main_progress.set_position(stats.percent as u64);
            }
            SearchEvent::Matches(batch) => {
                stats.batches += 1;
                stats.matches_found += batch.len();
                if let MatchBatch::Count(_) = batch {
                    self.main_progress
                        .set_message(format!("Matches: {} (counting only)", stats.matches_found));
                    return;
                }
            }
        }
        self.update_message(&stats);
    }

    fn update_message(&self, stats: &ProgressStats) {
        self.main_progress
            .set_message(format!("Matches: {}", stats.matches_found));
    }

    pub fn finish(&self, message: &str) -> ProgressStats {
        let stats = self.stats.lock().clone();
        self.main_progress.set_position(100);
        self.main_progress.finish_with_message(format!(
            "{message} in {:.2}s: {} matches",
            stats.start_time.elapsed().as_secs_f64(),
            stats.matches_found
        ));
        stats
    }

    pub fn abandon(&self, message: &str) -> ProgressStats {
        let stats = self.stats.lock().clone();
        self.main_progress.abandon_with_message(message.to_string());
        stats
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}
