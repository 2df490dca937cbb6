//! Session error types.

use thiserror::Error;

/// Errors from opening or driving a device shell session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Authentication, network or handshake failure while opening.
    #[error("connection error: {0}")]
    Connection(String),

    /// Write/read failure on an established channel, or the remote closed it.
    #[error("transport error: {0}")]
    Transport(String),

    /// No prompt within the read budget. Carries whatever did arrive.
    #[error("no prompt within {timeout_ms}ms")]
    Timeout { timeout_ms: u64, partial: String },
}

impl SessionError {
    /// Connection lost or never established (as opposed to a slow device).
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Timeout { .. })
    }
}

/// Convenience alias for session results.
pub type SessionResult<T> = Result<T, SessionError>;
