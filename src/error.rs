use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GrepError {
    #[error("A grep scan is already running")]
    AlreadyRunning,

    #[error("No project selected")]
    NoProjectSelected,

    #[error("No requests found")]
    NoRequestsFound,

    #[error("Invalid regular expression: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("Grep scan stopped")]
    Stopped,

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("No results to download")]
    NoResults,

    #[error("Pattern not found: {0}")]
    PatternNotFound(String),

    #[error("Pattern storage error: {0}")]
    Storage(String),

    #[error("Traffic store error: {0}")]
    Host(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Clipboard error: {0}")]
    Clipboard(#[from] arboard::Error),

    #[error("An unexpected error occurred: {0}")]
    Other(String),
}

impl GrepError {
    /// Whether this error ends a run because of a cooperative stop rather than a fault.
    pub fn is_stopped(&self) -> bool {
        matches!(self, GrepError::Stopped)
    }
}

impl From<anyhow::Error> for GrepError {
    fn from(err: anyhow::Error) -> Self {
        GrepError::Config(format!("{err:#}"))
    }
}

pub type Result<T> = std::result::Result<T, GrepError>;
