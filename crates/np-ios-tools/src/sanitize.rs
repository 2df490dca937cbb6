//! Turns raw generator text into a `CommandBatch`.
//!
//! Policy:
//! - Lines starting with the danger sentinel are blocked (never sent). A bare
//!   sentinel line also blocks the next non-blank line, matching the
//!   generator's "sentinel line, then command" convention.
//! - Other `#` lines are comments (never sent).
//! - Everything else is executable; keyword matches are only flagged so the
//!   operator can be warned before confirming.

use np_protocol::command::{Command, CommandBatch, DANGER_SENTINEL};

use crate::danger::DangerClassifier;
use crate::error::{ToolsError, ToolsResult};

/// Splits, trims and classifies generated command text.
#[derive(Debug, Clone)]
pub struct Sanitizer {
    classifier: DangerClassifier,
    sentinel: String,
}

impl Sanitizer {
    pub fn new(classifier: DangerClassifier) -> Self {
        Self {
            classifier,
            sentinel: DANGER_SENTINEL.to_string(),
        }
    }

    pub fn with_sentinel(mut self, sentinel: impl Into<String>) -> ToolsResult<Self> {
        let sentinel = sentinel.into();
        if sentinel.trim().is_empty() {
            return Err(ToolsError::EmptySentinel);
        }
        self.sentinel = sentinel;
        Ok(self)
    }

    pub fn sentinel(&self) -> &str {
        &self.sentinel
    }

    /// True iff `line` carries the sentinel marker.
    pub fn is_sentinel(&self, line: &str) -> bool {
        line.trim_start().starts_with(self.sentinel.as_str())
    }

    /// Split `raw` into an ordered batch. Blank lines are dropped; every other
    /// line is kept, in order, with its disposition set.
    pub fn sanitize(&self, raw: &str) -> CommandBatch {
        let mut batch = CommandBatch::default();
        let mut block_next = false;

        for line in raw.lines().map(str::trim).filter(|l| !l.is_empty()) {
            if self.is_sentinel(line) {
                // Bare sentinel guards the following command
                block_next = line[self.sentinel.len()..].trim().is_empty();
                batch.push(Command::blocked(line));
                continue;
            }

            if line.starts_with('#') {
                batch.push(Command::comment(line));
                continue;
            }

            if block_next {
                block_next = false;
                tracing::debug!(command = %line, "blocked by preceding sentinel");
                batch.push(Command::blocked(line));
                continue;
            }

            let dangerous = self.classifier.classify(line);
            if dangerous {
                tracing::debug!(command = %line, "dangerous keyword flagged");
            }
            batch.push(Command::new(line, dangerous));
        }

        batch
    }
}

impl Default for Sanitizer {
    fn default() -> Self {
        Self::new(DangerClassifier::default())
    }
}
