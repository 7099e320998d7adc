//! # History Module
//!
//! Session history persisted as a JSON array of `{user, bot}` turns. Only the
//! most recent turns are kept on disk.

use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, warn};

use crate::error::Error as CrateError;

/// Turns kept on disk
pub const DEFAULT_CAPACITY: usize = 5;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<HistoryError> for CrateError {
    fn from(err: HistoryError) -> Self {
        CrateError::History(err.to_string())
    }
}

/// One user message and the reply it received
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub user: String,
    pub bot: String,
}

impl Turn {
    pub fn new(user: impl Into<String>, bot: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            bot: bot.into(),
        }
    }
}

/// JSON file holding the latest turns of a session
#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
    capacity: usize,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            capacity: DEFAULT_CAPACITY,
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the file with an empty history if it does not exist
    pub async fn ensure_exists(&self) -> Result<(), HistoryError> {
        if fs::try_exists(&self.path).await? {
            return Ok(());
        }
        self.save(&[]).await
    }

    /// Stored turns; a missing or unreadable file is an empty history
    pub async fn load(&self) -> Vec<Turn> {
        let json = match fs::read_to_string(&self.path).await {
            Ok(json) => json,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                warn!("Failed to read history {}: {}", self.path.display(), e);
                return Vec::new();
            }
        };
        serde_json::from_str(&json).unwrap_or_else(|e| {
            warn!("Ignoring corrupt history {}: {}", self.path.display(), e);
            Vec::new()
        })
    }

    /// Replace the stored history with the last `capacity` turns of `turns`
    pub async fn save(&self, turns: &[Turn]) -> Result<(), HistoryError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let start = turns.len().saturating_sub(self.capacity);
        fs::write(&self.path, serde_json::to_string_pretty(&turns[start..])?).await?;
        debug!("Saved {} turns to {}", turns.len() - start, self.path.display());
        Ok(())
    }

    /// Append a turn and return the history as stored
    pub async fn append(&self, turn: Turn) -> Result<Vec<Turn>, HistoryError> {
        let mut turns = self.load().await;
        turns.push(turn);
        self.save(&turns).await?;
        let start = turns.len().saturating_sub(self.capacity);
        Ok(turns.split_off(start))
    }

    pub async fn clear(&self) -> Result<(), HistoryError> {
        self.save(&[]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_and_corrupt_files_are_empty() {
        let dir = TempDir::new().unwrap();
        let store = HistoryStore::new(dir.path().join("history.json"));
        assert!(store.load().await.is_empty());

        std::fs::write(store.path(), "{not json").unwrap();
        assert!(store.load().await.is_empty());
    }

    #[tokio::test]
    async fn test_ensure_exists_creates_empty_array() {
        let dir = TempDir::new().unwrap();
        let store = HistoryStore::new(dir.path().join("nested/history.json"));
        store.ensure_exists().await.unwrap();
        assert_eq!(std::fs::read_to_string(store.path()).unwrap(), "[]");

        store.append(Turn::new("hi", "hello")).await.unwrap();
        store.ensure_exists().await.unwrap();
        assert_eq!(store.load().await.len(), 1);
    }

    #[tokio::test]
    async fn test_keeps_last_turns() {
        let dir = TempDir::new().unwrap();
        let store = HistoryStore::new(dir.path().join("history.json"));

        for i in 0..7 {
            store
                .append(Turn::new(format!("q{}", i), format!("a{}", i)))
                .await
                .unwrap();
        }

        let turns = store.load().await;
        assert_eq!(turns.len(), DEFAULT_CAPACITY);
        assert_eq!(turns[0], Turn::new("q2", "a2"));
        assert_eq!(turns[4], Turn::new("q6", "a6"));

        store.clear().await.unwrap();
        assert!(store.load().await.is_empty());
    }
}
