//! Shared types for NetPilot: command batches, execution transcripts and
//! persisted history records.

pub mod command;
pub mod history;
pub mod transcript;

pub use command::*;
pub use history::*;
pub use transcript::*;
