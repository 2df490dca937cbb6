//! Session channel abstraction.
//!
//! `SessionChannel` exposes three transport primitives (`send_raw`, `recv`,
//! `close`). Line sending, banner draining and the paginated read loop are
//! provided on top of them, so every backend gets the same deadline and
//! pagination behavior.

use async_trait::async_trait;
use std::time::Duration;
use tokio::time::Instant;

use np_ios_tools::PromptMatcher;

use crate::config::{Secret, SessionConfig};
use crate::error::{SessionError, SessionResult};

/// How long a single poll waits for data before checking the deadline again.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Pause after requesting the next page so the device can redraw.
pub const PAGE_SETTLE: Duration = Duration::from_millis(300);

/// Keystroke that advances a `--More--` pager.
pub const CONTINUE_KEY: &[u8] = b" ";

const LINE_TERMINATOR: &str = "\n";

/// Opens authenticated interactive shells.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Open a session. Fails with `SessionError::Connection` on
    /// authentication failure, unreachable host or timeout. On success the
    /// device may still be printing its login banner.
    async fn open(
        &self,
        config: &SessionConfig,
        secret: &Secret,
    ) -> SessionResult<Box<dyn SessionChannel>>;
}

/// One live interactive shell on a device.
#[async_trait]
pub trait SessionChannel: Send {
    /// Write raw bytes. `Transport` error if the channel is closed.
    async fn send_raw(&mut self, bytes: &[u8]) -> SessionResult<()>;

    /// Wait up to `wait` for the next chunk. `Ok(None)` means nothing arrived.
    async fn recv(&mut self, wait: Duration) -> SessionResult<Option<Vec<u8>>>;

    /// Close the connection. Idempotent; never fails.
    async fn close(&mut self);

    fn is_closed(&self) -> bool;

    /// Send `text` followed by a line terminator.
    async fn send_line(&mut self, text: &str) -> SessionResult<()> {
        let line = format!("{text}{LINE_TERMINATOR}");
        self.send_raw(line.as_bytes()).await
    }

    /// Discard the login banner and initial prompt.
    ///
    /// Returns once a prompt is seen or `timeout` elapses. Silence is not an
    /// error; only a transport failure is.
    async fn drain_initial(
        &mut self,
        matcher: &dyn PromptMatcher,
        timeout: Duration,
    ) -> SessionResult<String> {
        let deadline = Instant::now() + timeout;
        let mut raw = Vec::new();

        loop {
            let now = Instant::now();
            if now >= deadline {
                tracing::debug!(bytes = raw.len(), "banner drain reached its time limit");
                break;
            }

            let wait = (deadline - now).min(POLL_INTERVAL);
            if let Some(chunk) = self.recv(wait).await? {
                raw.extend_from_slice(&chunk);
                if matcher.looks_finished(&String::from_utf8_lossy(&raw)) {
                    break;
                }
            }
        }

        Ok(String::from_utf8_lossy(&raw).into_owned())
    }

    /// Throw away whatever the device prints until it has been silent for
    /// `quiet`, or until `limit` elapses. Returns the number of bytes
    /// discarded.
    async fn discard_pending(&mut self, quiet: Duration, limit: Duration) -> SessionResult<usize> {
        let deadline = Instant::now() + limit;
        let mut discarded = 0;

        loop {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            match self.recv((deadline - now).min(quiet)).await? {
                Some(chunk) => discarded += chunk.len(),
                None => break,
            }
        }

        if discarded > 0 {
            tracing::debug!(bytes = discarded, "discarded stale output");
        }
        Ok(discarded)
    }

    /// Read until the device prompt reappears.
    ///
    /// Pagination markers are answered with a single space each. `timeout`
    /// bounds the whole call, every page included; on expiry the partial
    /// output is returned inside `SessionError::Timeout`.
    async fn read_until_quiescent(
        &mut self,
        matcher: &dyn PromptMatcher,
        timeout: Duration,
    ) -> SessionResult<String> {
        let deadline = Instant::now() + timeout;
        let mut raw: Vec<u8> = Vec::new();
        // Start of the bytes received since the last continuation
        let mut page_start = 0;
        let mut pages = 0u32;

        loop {
            let now = Instant::now();
            if now >= deadline {
                tracing::debug!(pages, bytes = raw.len(), "read deadline reached");
                return Err(SessionError::Timeout {
                    timeout_ms: timeout.as_millis() as u64,
                    partial: String::from_utf8_lossy(&raw).into_owned(),
                });
            }

            let wait = (deadline - now).min(POLL_INTERVAL);
            let Some(chunk) = self.recv(wait).await? else {
                continue;
            };
            raw.extend_from_slice(&chunk);

            if matcher.has_more_marker(&String::from_utf8_lossy(&raw[page_start..])) {
                pages += 1;
                page_start = raw.len();
                tracing::trace!(pages, "pagination marker, requesting next page");
                self.send_raw(CONTINUE_KEY).await?;

                let remaining = deadline.saturating_duration_since(Instant::now());
                tokio::time::sleep(PAGE_SETTLE.min(remaining)).await;
                continue;
            }

            let text = String::from_utf8_lossy(&raw);
            if matcher.looks_finished(&text) {
                tracing::trace!(pages, bytes = raw.len(), "prompt detected");
                return Ok(text.into_owned());
            }
        }
    }
}
