//! Operator command line: argument definitions and text rendering.

use std::fmt::Write as _;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use np_protocol::{CommandBatch, Disposition, HistoryRecord, Transcript};

/// NetPilot: natural-language Cisco IOS configuration over SSH.
#[derive(Parser, Debug)]
#[command(name = "netpilot", version, about)]
pub struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, global = true, default_value = "netpilot.toml")]
    pub config: PathBuf,

    /// Log level when RUST_LOG is unset (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate and screen commands without touching the device
    Generate {
        /// What to do, in plain language
        #[arg(trailing_var_arg = true, required = true)]
        request: Vec<String>,
    },

    /// Generate commands, confirm, then execute them on the device
    Run {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,

        /// Stop after showing the screened commands
        #[arg(long)]
        dry_run: bool,

        /// Print the transcript as JSON
        #[arg(long)]
        json: bool,

        /// What to do, in plain language
        #[arg(trailing_var_arg = true, required = true)]
        request: Vec<String>,
    },

    /// Execute commands read from a file (one per line)
    Exec {
        #[arg(long)]
        file: PathBuf,

        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,

        /// Print the transcript as JSON
        #[arg(long)]
        json: bool,
    },

    /// Log in to the device and disconnect
    TestConnection,

    /// Show recent executions
    History {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

/// Screened batch as shown to the operator before confirmation.
pub fn render_batch(batch: &CommandBatch) -> String {
    let mut out = String::new();

    for command in batch {
        let prefix = match command.disposition {
            Disposition::Blocked => "[BLOCKED] ",
            Disposition::Comment => "[COMMENT] ",
            Disposition::Execute if command.is_dangerous => "[DANGER]  ",
            Disposition::Execute => "          ",
        };
        let _ = writeln!(out, "{prefix}{}", command.text);
    }

    let blocked = batch
        .iter()
        .filter(|c| c.disposition == Disposition::Blocked)
        .count();
    if blocked > 0 {
        let _ = writeln!(out, "\n! {blocked} line(s) blocked by the danger marker will not be sent");
    }

    let risky = batch.executable().filter(|c| c.is_dangerous).count();
    if risky > 0 {
        let _ = writeln!(
            out,
            "! {risky} command(s) match danger keywords and WILL be sent; review carefully"
        );
    }

    out
}

/// Short per-batch summary printed after the transcript.
pub fn render_summary(transcript: &Transcript) -> String {
    let mut out = format!(
        "{} command(s) on {} in {}ms",
        transcript.entries.len(),
        transcript.host,
        transcript.elapsed_ms
    );

    let timed_out = transcript.timed_out().count();
    if timed_out > 0 {
        let _ = write!(out, ", {timed_out} timed out");
    }
    if transcript.skipped > 0 {
        let _ = write!(out, ", {} skipped", transcript.skipped);
    }
    match &transcript.failure {
        Some(failure) => {
            let _ = write!(out, "\nbatch FAILED: {failure}");
        }
        None => out.push_str("\nbatch done"),
    }
    out
}

pub fn render_history(records: &[HistoryRecord]) -> String {
    if records.is_empty() {
        return "no history\n".to_string();
    }

    let mut out = String::new();
    for record in records.iter().rev() {
        let status = if record.succeeded { "ok" } else { "failed" };
        let _ = writeln!(
            out,
            "{}  {:<16} {:<6} {}",
            record.timestamp.format("%Y-%m-%d %H:%M:%S"),
            record.host,
            status,
            record.commands.join("; ")
        );
    }
    out
}

/// `y` or `yes`, any case.
pub fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
