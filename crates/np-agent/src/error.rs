//! Agent error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from the natural-language command source.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// The API key environment variable is unset or empty.
    #[error("API key not set (expected in ${0})")]
    MissingApiKey(String),

    /// The HTTP client could not be constructed.
    #[error("HTTP client setup failed: {0}")]
    Client(String),

    /// Network failure or timeout.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("API returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body did not have the expected shape.
    #[error("unexpected response: {0}")]
    Decode(String),

    /// The model returned no command text.
    #[error("model returned no commands")]
    Empty,
}

/// Errors from the on-disk history store.
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("history I/O on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("history encode failed: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Errors loading the TOML configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid safety settings: {0}")]
    Safety(#[from] np_ios_tools::ToolsError),

    /// The device password environment variable is unset.
    #[error("device password not set (expected in ${0})")]
    MissingPassword(String),
}

/// Convenience alias for generation results.
pub type GenerationResult<T> = Result<T, GenerationError>;

/// Convenience alias for history results.
pub type HistoryResult<T> = Result<T, HistoryError>;
