//! Bounded on-disk execution history.
//!
//! A single JSON array of `HistoryRecord`s. Writers are serialised through
//! an async mutex and every write replaces the file atomically, so a crash
//! mid-write leaves the previous history intact.

use std::path::{Path, PathBuf};

use tokio::sync::Mutex;

use np_protocol::{DEFAULT_MAX_OUTPUT_CHARS, DEFAULT_MAX_RECORDS, HistoryRecord, Transcript};

use crate::config::HistoryConfig;
use crate::error::{HistoryError, HistoryResult};

pub struct HistoryStore {
    path: PathBuf,
    max_records: usize,
    max_output_chars: usize,
    write_lock: Mutex<()>,
}

impl HistoryStore {
    /// Store at `path` with default limits.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            max_records: DEFAULT_MAX_RECORDS,
            max_output_chars: DEFAULT_MAX_OUTPUT_CHARS,
            write_lock: Mutex::new(()),
        }
    }

    pub fn from_config(config: &HistoryConfig) -> Self {
        Self::new(&config.path)
            .with_max_records(config.max_records)
            .with_max_output_chars(config.max_output_chars)
    }

    pub fn with_max_records(mut self, max_records: usize) -> Self {
        self.max_records = max_records;
        self
    }

    pub fn with_max_output_chars(mut self, max_output_chars: usize) -> Self {
        self.max_output_chars = max_output_chars;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All stored records, oldest first. A missing or unreadable file is
    /// treated as empty history.
    pub async fn load(&self) -> Vec<HistoryRecord> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "history unreadable, starting empty");
                return Vec::new();
            }
        };

        match serde_json::from_str(&contents) {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "history corrupt, starting empty");
                Vec::new()
            }
        }
    }

    /// The most recent `limit` records, oldest first.
    pub async fn recent(&self, limit: usize) -> Vec<HistoryRecord> {
        let mut records = self.load().await;
        let excess = records.len().saturating_sub(limit);
        records.drain(..excess);
        records
    }

    /// Record a finished batch, dropping the oldest records beyond
    /// `max_records`.
    pub async fn append(&self, transcript: &Transcript) -> HistoryResult<HistoryRecord> {
        let record = HistoryRecord::from_transcript(transcript, self.max_output_chars);

        let _guard = self.write_lock.lock().await;
        let mut records = self.load().await;
        records.push(record.clone());
        let excess = records.len().saturating_sub(self.max_records);
        records.drain(..excess);

        self.write(&records).await?;
        tracing::debug!(
            path = %self.path.display(),
            records = records.len(),
            "history updated"
        );
        Ok(record)
    }

    async fn write(&self, records: &[HistoryRecord]) -> HistoryResult<()> {
        let json = serde_json::to_string_pretty(records)?;
        let io_err = |source| HistoryError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await.map_err(io_err)?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(io_err)?;
        Ok(())
    }
}
