//! IOS tooling error types.

use thiserror::Error;

/// Errors raised while building matchers or classifiers.
#[derive(Debug, Error)]
pub enum ToolsError {
    #[error("invalid prompt pattern: {0}")]
    InvalidPattern(String),

    #[error("pagination marker must not be empty")]
    EmptyMoreMarker,

    #[error("danger sentinel must not be empty")]
    EmptySentinel,
}

/// Convenience alias for IOS tooling results.
pub type ToolsResult<T> = Result<T, ToolsError>;
