//! User-defined pattern library persisted as JSON
use crate::error::{GrepError, Result};
use chrono::{DateTime, Utc};
use log::debug;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomPattern {
    pub id: String,
    pub pattern: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub struct PatternStore {
    path: Option<PathBuf>,
    patterns: Mutex<Vec<CustomPattern>>,
}

impl PatternStore {
    /// Open the store at `path`, starting empty if the file does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let patterns = if path.exists() {
            let content = fs::read_to_string(&path).map_err(|e| storage_error(&path, e))?;
            serde_json::from_str(&content).map_err(|e| storage_error(&path, e))?
        } else {
            Vec::new()
        };
        debug!("Loaded {} custom patterns from {}", patterns.len(), path.display());

        Ok(Self {
            path: Some(path),
            patterns: Mutex::new(patterns),
        })
    }

    /// A store that is never written to disk
    pub fn in_memory() -> Self {
        Self {
            path: None,
            patterns: Mutex::new(Vec::new()),
        }
    }

    /// Insert a pattern or replace the one with the same id.
    pub fn upsert(&self, id: &str, pattern: &str) -> Result<CustomPattern> {
        let id = id.trim();
        if id.is_empty() {
            return Err(GrepError::Validation("pattern id must not be empty".into()));
        }
        if pattern.is_empty() {
            return Err(GrepError::Validation("pattern must not be empty".into()));
        }

        let mut patterns = self.patterns.lock();
        let mut updated = patterns.clone();
        let now = Utc::now();
        let saved = match updated.iter_mut().find(|p| p.id == id) {
            Some(existing) => {
                existing.pattern = pattern.to_string();
                existing.updated_at = now;
                existing.clone()
            }
            None => {
                let created = CustomPattern {
                    id: id.to_string(),
                    pattern: pattern.to_string(),
                    created_at: now,
                    updated_at: now,
                };
                updated.push(created.clone());
                created
            }
        };
        self.persist(&updated)?;
        *patterns = updated;
        Ok(saved)
    }

    pub fn list(&self) -> Vec<CustomPattern> {
        self.patterns.lock().clone()
    }

    pub fn get(&self, id: &str) -> Option<CustomPattern> {
        self.patterns.lock().iter().find(|p| p.id == id).cloned()
    }

    /// Remove a pattern; `false` when the id is unknown.
    pub fn delete(&self, id: &str) -> Result<bool> {
        let mut patterns = self.patterns.lock();
        if !patterns.iter().any(|p| p.id == id) {
            return Ok(false);
        }
        let remaining: Vec<_> = patterns.iter().filter(|p| p.id != id).cloned().collect();
        self.persist(&remaining)?;
        *patterns = remaining;
        Ok(true)
    }

    fn persist(&self, patterns: &[CustomPattern]) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| storage_error(path, e))?;
        }
        let content = serde_json::to_string_pretty(patterns).map_err(|e| storage_error(path, e))?;
        fs::write(path, content).map_err(|e| storage_error(path, e))
    }
}

fn storage_error(path: &Path, err: impl std::fmt::Display) -> GrepError {
    GrepError::Storage(format!("{}: {err}", path.display()))
}
