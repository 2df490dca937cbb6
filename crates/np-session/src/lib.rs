//! Interactive device shell sessions for NetPilot.
//!
//! `SessionChannel` trait with send/recv/close primitives and the
//! deadline-bounded `read_until_quiescent` built on top of them. Two impls:
//! - `SshSession`: russh interactive shell with a PTY, opened by `SshConnector`
//! - `MockSession`: scripted device (in `mock.rs`), opened by `MockConnector`

pub mod channel;
pub mod config;
pub mod error;
pub mod mock;
pub mod ssh;

pub use channel::{Connector, SessionChannel};
pub use config::{Secret, SessionConfig};
pub use error::{SessionError, SessionResult};
pub use mock::{MockConnector, MockProbe, MockReply, MockSession};
pub use ssh::{SshConnector, SshSession};
