use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::transcript::Transcript;

/// Default number of records a history store retains.
pub const DEFAULT_MAX_RECORDS: usize = 10;

/// Default cap on stored output, in characters.
pub const DEFAULT_MAX_OUTPUT_CHARS: usize = 5000;

/// One persisted batch execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// When the batch finished (ISO-8601, UTC).
    pub timestamp: DateTime<Utc>,
    /// Commands that were sent, in order.
    pub commands: Vec<String>,
    /// Rendered transcript, possibly truncated.
    pub output: String,
    #[serde(default)]
    pub batch_id: Option<Uuid>,
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub succeeded: bool,
}

impl HistoryRecord {
    /// Build a record from a finished transcript, keeping at most
    /// `max_output_chars` characters of rendered output.
    pub fn from_transcript(transcript: &Transcript, max_output_chars: usize) -> Self {
        Self {
            timestamp: Utc::now(),
            commands: transcript.commands(),
            output: truncate_chars(&transcript.render(), max_output_chars),
            batch_id: Some(transcript.batch_id),
            host: transcript.host.clone(),
            succeeded: transcript.succeeded(),
        }
    }
}

/// First `max` characters of `text`, never splitting a character.
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}
