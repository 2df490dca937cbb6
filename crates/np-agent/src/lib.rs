//! NetPilot operator agent.
//!
//! Library half of the `netpilot` binary, re-exported so `np-e2e-tests` can
//! drive the same pieces the CLI wires together:
//! - `engine`: runs a `CommandBatch` over one device session
//! - `generator`: natural-language request to raw IOS command text
//! - `history`: bounded on-disk record of executed batches
//! - `config`: TOML configuration

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod generator;
pub mod history;

pub use config::AppConfig;
pub use engine::ExecutionEngine;
pub use error::{ConfigError, GenerationError, HistoryError};
pub use generator::{ChatCompletionsConfig, ChatCompletionsSource, CommandSource};
pub use history::HistoryStore;
