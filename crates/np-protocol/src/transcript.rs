use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::command::Command;

/// Execution engine states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineState {
    Connecting,
    Draining,
    Ready,
    Sending,
    AwaitingPrompt,
    Done,
    Failed,
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Connecting => "connecting",
            Self::Draining => "draining",
            Self::Ready => "ready",
            Self::Sending => "sending",
            Self::AwaitingPrompt => "awaiting_prompt",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Phase of a batch in which a fatal error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Connect,
    Drain,
    Send,
    Read,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Connect => "connect",
            Self::Drain => "drain",
            Self::Send => "send",
            Self::Read => "read",
        };
        f.write_str(name)
    }
}

/// Fatal batch error: which phase, which command (if any) was in flight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{phase} failed{}: {message}", in_flight(.command))]
pub struct BatchFailure {
    pub phase: Phase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    pub message: String,
}

fn in_flight(command: &Option<String>) -> String {
    command
        .as_deref()
        .map(|c| format!(" on `{c}`"))
        .unwrap_or_default()
}

/// How a single command's read finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandOutcome {
    /// The device prompt reappeared.
    Completed,
    /// The read budget ran out; output is partial.
    TimedOut,
}

/// One executed command with everything the device said in response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub command: Command,
    pub output: String,
    pub outcome: CommandOutcome,
    /// Read latency in milliseconds.
    pub latency_ms: u64,
}

/// Result of running a `CommandBatch` against one device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    /// Batch ID (UUIDv7 for time-sortability).
    pub batch_id: Uuid,
    /// Device host the batch targeted.
    pub host: String,
    /// Executed commands in send order.
    pub entries: Vec<TranscriptEntry>,
    /// Non-executable lines passed over without contacting the device.
    pub skipped: usize,
    /// `Done` or `Failed`.
    pub final_state: EngineState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<BatchFailure>,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
}

impl Transcript {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            batch_id: Uuid::now_v7(),
            host: host.into(),
            entries: Vec::new(),
            skipped: 0,
            final_state: EngineState::Connecting,
            failure: None,
            started_at: Utc::now(),
            elapsed_ms: 0,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.final_state == EngineState::Done && self.failure.is_none()
    }

    pub fn timed_out(&self) -> impl Iterator<Item = &TranscriptEntry> {
        self.entries
            .iter()
            .filter(|e| e.outcome == CommandOutcome::TimedOut)
    }

    /// Command texts in send order.
    pub fn commands(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.command.text.clone()).collect()
    }

    /// Operator-facing text: a `>>> command` marker line per entry followed
    /// by its raw output.
    pub fn render(&self) -> String {
        self.entries
            .iter()
            .map(|entry| {
                let mut block = format!(">>> {}\n{}", entry.command.text, entry.output);
                if entry.outcome == CommandOutcome::TimedOut {
                    if !block.ends_with('\n') {
                        block.push('\n');
                    }
                    block.push_str(&format!("[timed out after {}ms]", entry.latency_ms));
                }
                block
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(text: &str, output: &str, outcome: CommandOutcome) -> TranscriptEntry {
        TranscriptEntry {
            command: Command::new(text, false),
            output: output.into(),
            outcome,
            latency_ms: 20_000,
        }
    }

    #[test]
    fn render_marks_each_command() {
        let mut t = Transcript::new("192.168.1.1");
        t.entries.push(entry("enable", "Router#", CommandOutcome::Completed));
        t.entries.push(entry(
            "show version",
            "Cisco IOS Software\r\nRouter#",
            CommandOutcome::Completed,
        ));

        assert_eq!(
            t.render(),
            ">>> enable\nRouter#\n>>> show version\nCisco IOS Software\r\nRouter#"
        );
    }

    #[test]
    fn render_notes_timeouts() {
        let mut t = Transcript::new("10.0.0.1");
        t.entries
            .push(entry("show tech", "partial", CommandOutcome::TimedOut));
        assert_eq!(t.render(), ">>> show tech\npartial\n[timed out after 20000ms]");
        assert_eq!(t.timed_out().count(), 1);
    }

    #[test]
    fn succeeded_requires_done_without_failure() {
        let mut t = Transcript::new("10.0.0.1");
        assert!(!t.succeeded());
        t.final_state = EngineState::Done;
        assert!(t.succeeded());
        t.final_state = EngineState::Failed;
        t.failure = Some(BatchFailure {
            phase: Phase::Connect,
            command: None,
            message: "authentication rejected".into(),
        });
        assert!(!t.succeeded());
    }

    #[test]
    fn failure_message_names_phase_and_command() {
        let with_cmd = BatchFailure {
            phase: Phase::Read,
            command: Some("show run".into()),
            message: "channel closed".into(),
        };
        assert_eq!(with_cmd.to_string(), "read failed on `show run`: channel closed");

        let without = BatchFailure {
            phase: Phase::Connect,
            command: None,
            message: "connection refused".into(),
        };
        assert_eq!(without.to_string(), "connect failed: connection refused");
    }

    #[test]
    fn engine_state_serialization() {
        assert_eq!(
            serde_json::to_string(&EngineState::AwaitingPrompt).unwrap(),
            r#""awaiting_prompt""#
        );
        assert_eq!(EngineState::AwaitingPrompt.to_string(), "awaiting_prompt");
    }

    #[test]
    fn transcript_json_skips_empty_failure() {
        let t = Transcript::new("10.0.0.1");
        let json = serde_json::to_string(&t).unwrap();
        assert!(!json.contains("failure"));
        assert!(json.contains("\"final_state\":\"connecting\""));
    }
}
