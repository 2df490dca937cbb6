//! Scripted device for testing.
//!
//! `MockSession` answers each sent line with the next scripted `MockReply`
//! (or an echo plus prompt when the script runs out) and records everything
//! it receives in a shared `MockProbe`, so tests can inspect traffic after
//! the engine has consumed and closed the session. All tests use this instead
//! of a real device so the suite runs anywhere.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

use crate::channel::{CONTINUE_KEY, Connector, SessionChannel};
use crate::config::{Secret, SessionConfig};
use crate::error::{SessionError, SessionResult};

/// Scripted response to one sent command.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// First page is delivered when the command is sent, each further page
    /// when a continuation key arrives.
    Pages(Vec<String>),
    /// Re-delivers the same page on every continuation, forever.
    EndlessPager(String),
    /// Drops the connection once the command is sent.
    Disconnect,
    /// Refuses the write itself.
    SendFails,
    /// `output` is delivered when the command is sent; `late` only once
    /// `after` has passed, like a device finishing a command the reader
    /// already gave up on.
    Late {
        output: String,
        late: String,
        after: Duration,
    },
}

impl MockReply {
    /// Single-page output.
    pub fn output(text: impl Into<String>) -> Self {
        Self::Pages(vec![text.into()])
    }

    pub fn pages<I, S>(pages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Pages(pages.into_iter().map(Into::into).collect())
    }

    /// No output at all.
    pub fn silence() -> Self {
        Self::Pages(Vec::new())
    }
}

#[derive(Debug, Default)]
struct ProbeState {
    sent_lines: Vec<String>,
    continuations: usize,
    opens: usize,
    closes: usize,
}

/// Shared view of mock traffic.
#[derive(Debug, Clone, Default)]
pub struct MockProbe(Arc<Mutex<ProbeState>>);

impl MockProbe {
    fn state(&self) -> MutexGuard<'_, ProbeState> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Lines sent with `send_line`, terminator stripped.
    pub fn sent_lines(&self) -> Vec<String> {
        self.state().sent_lines.clone()
    }

    /// Continuation keys sent in answer to pagination markers.
    pub fn continuations(&self) -> usize {
        self.state().continuations
    }

    pub fn opens(&self) -> usize {
        self.state().opens
    }

    /// Effective closes (repeat `close` calls are not counted).
    pub fn closes(&self) -> usize {
        self.state().closes
    }
}

enum ActiveReply {
    Pages(VecDeque<String>),
    Endless(String),
}

/// Scripted interactive shell.
pub struct MockSession {
    probe: MockProbe,
    prompt: String,
    replies: VecDeque<MockReply>,
    active: Option<ActiveReply>,
    pending: VecDeque<Vec<u8>>,
    delayed: VecDeque<(Instant, String)>,
    chunk_size: Option<usize>,
    drop_after_pending: bool,
    /// Handed out by a connector.
    opened: bool,
    closed: bool,
    disconnected: bool,
}

impl MockSession {
    /// Session whose unscripted commands echo back followed by `Router#`.
    pub fn new() -> Self {
        Self {
            probe: MockProbe::default(),
            prompt: "Router#".into(),
            replies: VecDeque::new(),
            active: None,
            pending: VecDeque::new(),
            delayed: VecDeque::new(),
            chunk_size: None,
            drop_after_pending: false,
            opened: false,
            closed: false,
            disconnected: false,
        }
    }

    /// Prompt used for unscripted commands.
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    /// Text waiting to be read before any command is sent.
    pub fn with_banner(mut self, banner: impl AsRef<str>) -> Self {
        self.enqueue(banner.as_ref().as_bytes());
        self
    }

    /// Drop the connection once the banner has been read.
    pub fn disconnect_after_banner(mut self) -> Self {
        self.drop_after_pending = true;
        self
    }

    /// Scripted replies, consumed one per sent line.
    pub fn with_replies(mut self, replies: impl IntoIterator<Item = MockReply>) -> Self {
        self.replies.extend(replies);
        self
    }

    /// Deliver output in chunks of at most `size` bytes (may split UTF-8
    /// sequences and markers across reads).
    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = Some(size.max(1));
        self
    }

    pub fn probe(&self) -> MockProbe {
        self.probe.clone()
    }

    fn enqueue(&mut self, bytes: &[u8]) {
        match self.chunk_size {
            Some(size) => self.pending.extend(bytes.chunks(size).map(<[u8]>::to_vec)),
            None if !bytes.is_empty() => self.pending.push_back(bytes.to_vec()),
            None => {}
        }
    }

    fn next_page(&mut self) {
        let page = match self.active.as_mut() {
            Some(ActiveReply::Pages(pages)) => pages.pop_front(),
            Some(ActiveReply::Endless(page)) => Some(page.clone()),
            None => None,
        };
        if let Some(page) = page {
            self.enqueue(page.as_bytes());
        }
    }

    fn accept_line(&mut self, line: &str) -> SessionResult<()> {
        let reply = self
            .replies
            .pop_front()
            .unwrap_or_else(|| MockReply::output(format!("{line}\r\n{}", self.prompt)));

        match reply {
            MockReply::Pages(pages) => {
                self.active = Some(ActiveReply::Pages(pages.into()));
                self.next_page();
            }
            MockReply::EndlessPager(page) => {
                self.active = Some(ActiveReply::Endless(page));
                self.next_page();
            }
            MockReply::Disconnect => {
                self.pending.clear();
                self.drop_after_pending = true;
            }
            MockReply::SendFails => {
                self.disconnected = true;
                return Err(SessionError::Transport("broken pipe".into()));
            }
            MockReply::Late {
                output,
                late,
                after,
            } => {
                self.active = None;
                self.enqueue(output.as_bytes());
                self.delayed.push_back((Instant::now() + after, late));
            }
        }
        Ok(())
    }

    /// Move delayed output that is due by `now` into the read queue.
    fn release_due(&mut self, now: Instant) {
        while let Some((due, _)) = self.delayed.front() {
            if *due > now {
                break;
            }
            if let Some((_, text)) = self.delayed.pop_front() {
                self.enqueue(text.as_bytes());
            }
        }
    }
}

impl Default for MockSession {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionChannel for MockSession {
    async fn send_raw(&mut self, bytes: &[u8]) -> SessionResult<()> {
        if self.closed || self.disconnected {
            return Err(SessionError::Transport("channel is closed".into()));
        }

        if bytes == CONTINUE_KEY {
            self.probe.state().continuations += 1;
            self.next_page();
            return Ok(());
        }

        let text = String::from_utf8_lossy(bytes);
        let line = text.trim_end_matches(['\r', '\n']).to_string();
        self.probe.state().sent_lines.push(line.clone());
        self.accept_line(&line)
    }

    async fn recv(&mut self, wait: Duration) -> SessionResult<Option<Vec<u8>>> {
        if self.closed || self.disconnected {
            return Err(SessionError::Transport("channel is closed".into()));
        }

        self.release_due(Instant::now());
        if let Some(chunk) = self.pending.pop_front() {
            return Ok(Some(chunk));
        }

        if self.drop_after_pending && self.delayed.is_empty() {
            self.disconnected = true;
            return Err(SessionError::Transport("connection reset by device".into()));
        }

        let wake = Instant::now() + wait;
        match self.delayed.front() {
            Some((due, _)) if *due <= wake => {
                let due = *due;
                tokio::time::sleep_until(due).await;
                self.release_due(due);
                Ok(self.pending.pop_front())
            }
            _ => {
                tokio::time::sleep(wait).await;
                Ok(None)
            }
        }
    }

    async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.probe.state().closes += 1;
    }

    fn is_closed(&self) -> bool {
        self.closed || self.disconnected
    }
}

/// Mirrors `SshSession`: an opened session dropped without `close` is
/// closed anyway, and counted once.
impl Drop for MockSession {
    fn drop(&mut self) {
        if self.opened && !self.closed {
            self.closed = true;
            self.probe.state().closes += 1;
        }
    }
}

/// Hands out scripted sessions, or fails like an unreachable device.
pub struct MockConnector {
    sessions: Mutex<VecDeque<MockSession>>,
    failure: Option<String>,
    probe: MockProbe,
}

impl MockConnector {
    /// Connector that yields `session` on the first `open`.
    pub fn new(session: MockSession) -> Self {
        let probe = session.probe();
        Self {
            sessions: Mutex::new(VecDeque::from([session])),
            failure: None,
            probe,
        }
    }

    /// Connector whose every `open` fails with `SessionError::Connection`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            sessions: Mutex::new(VecDeque::new()),
            failure: Some(message.into()),
            probe: MockProbe::default(),
        }
    }

    /// Probe of the first scripted session (also counts failed opens).
    pub fn probe(&self) -> MockProbe {
        self.probe.clone()
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn open(
        &self,
        config: &SessionConfig,
        _secret: &Secret,
    ) -> SessionResult<Box<dyn SessionChannel>> {
        self.probe.state().opens += 1;

        if let Some(message) = &self.failure {
            return Err(SessionError::Connection(format!("{}: {message}", config.host)));
        }

        let mut session = self
            .sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .ok_or_else(|| SessionError::Connection("no scripted session left".into()))?;
        session.opened = true;
        Ok(Box::new(session))
    }
}
