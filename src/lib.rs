pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod host;
pub mod memory_store;
pub mod metrics;
pub mod output_formats;
pub mod patterns;
pub mod progress;
pub mod search;

pub use api::{Envelope, GrepService, RequestDetail};
pub use clap::Parser;
pub use cli::{Cli, Commands, PatternAction, SearchArgs};
pub use config::Config;
pub use error::{GrepError, Result};
pub use host::{Project, Record, RecordPage, RecordQuery, TrafficStore};
pub use memory_store::{DumpRecord, MemoryStore, TrafficDump};
pub use metrics::Metrics;
pub use output_formats::{OutputFormat, OutputFormatter};
pub use patterns::{CustomPattern, PatternStore};
pub use search::{
    EventEmitter, MatchBatch, MatchResult, MatchSource, SearchEngine, SearchEvent, SearchOptions,
    SearchSummary, StopOutcome,
};
