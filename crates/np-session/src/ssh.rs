//! SSH interactive shell backend (russh).
//!
//! Opening happens in three bounded steps: TCP connect (connect timeout),
//! SSH handshake (banner timeout), password auth (auth timeout). The shell
//! runs on a PTY so the device behaves as it would for a human operator,
//! including `--More--` pagination.

use async_trait::async_trait;
use russh::client::{self, Handle, Msg};
use russh::{Channel, ChannelMsg, Disconnect};
use russh_keys::key;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::channel::{Connector, SessionChannel};
use crate::config::{Secret, SessionConfig};
use crate::error::{SessionError, SessionResult};

/// Client-side handler. Host keys are accepted and logged; trust policy is
/// left to the deployment.
struct DeviceHandler {
    host: String,
}

#[async_trait]
impl client::Handler for DeviceHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &key::PublicKey,
    ) -> Result<bool, Self::Error> {
        tracing::debug!(
            host = %self.host,
            fingerprint = %server_public_key.fingerprint(),
            "accepting device host key"
        );
        Ok(true)
    }
}

/// Opens `SshSession`s.
#[derive(Debug, Clone, Default)]
pub struct SshConnector;

impl SshConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Connector for SshConnector {
    async fn open(
        &self,
        config: &SessionConfig,
        secret: &Secret,
    ) -> SessionResult<Box<dyn SessionChannel>> {
        let session = SshSession::open(config, secret).await?;
        Ok(Box::new(session))
    }
}

/// Interactive shell over SSH.
pub struct SshSession {
    /// Taken by `close`, or by `Drop` when `close` never ran.
    handle: Option<Handle<DeviceHandler>>,
    channel: Channel<Msg>,
    host: String,
    /// `close` has run.
    closed: bool,
    /// Remote sent EOF/close or the connection dropped.
    remote_gone: bool,
}

impl SshSession {
    /// Connect, authenticate and start a PTY shell.
    pub async fn open(config: &SessionConfig, secret: &Secret) -> SessionResult<Self> {
        let addr = (config.host.as_str(), config.port);

        let stream = timeout(config.connect_timeout(), TcpStream::connect(addr))
            .await
            .map_err(|_| {
                SessionError::Connection(format!(
                    "connect to {}:{} timed out after {}s",
                    config.host, config.port, config.connect_timeout_secs
                ))
            })?
            .map_err(|e| {
                SessionError::Connection(format!("{}:{}: {e}", config.host, config.port))
            })?;

        let ssh_config = Arc::new(client::Config::default());
        let handler = DeviceHandler {
            host: config.host.clone(),
        };

        let mut handle = timeout(
            config.banner_timeout(),
            client::connect_stream(ssh_config, stream, handler),
        )
        .await
        .map_err(|_| {
            SessionError::Connection(format!(
                "SSH handshake timed out after {}s",
                config.banner_timeout_secs
            ))
        })?
        .map_err(|e| SessionError::Connection(format!("SSH handshake failed: {e}")))?;

        let authenticated = timeout(
            config.auth_timeout(),
            handle.authenticate_password(config.username.as_str(), secret.expose()),
        )
        .await
        .map_err(|_| {
            SessionError::Connection(format!(
                "authentication timed out after {}s",
                config.auth_timeout_secs
            ))
        })?
        .map_err(|e| SessionError::Connection(format!("authentication failed: {e}")))?;

        if !authenticated {
            disconnect(&handle, &config.host).await;
            return Err(SessionError::Connection(format!(
                "authentication rejected for user {}",
                config.username
            )));
        }

        match start_shell(&handle, config).await {
            Ok(channel) => {
                tracing::info!(host = %config.host, port = config.port, "shell session open");
                Ok(Self {
                    handle: Some(handle),
                    channel,
                    host: config.host.clone(),
                    closed: false,
                    remote_gone: false,
                })
            }
            Err(e) => {
                disconnect(&handle, &config.host).await;
                Err(e)
            }
        }
    }
}

async fn start_shell(
    handle: &Handle<DeviceHandler>,
    config: &SessionConfig,
) -> SessionResult<Channel<Msg>> {
    let shell_err = |e: russh::Error| SessionError::Connection(format!("shell setup failed: {e}"));

    let mut channel = handle.channel_open_session().await.map_err(shell_err)?;
    channel
        .request_pty(
            false,
            &config.term,
            config.term_width,
            config.term_height,
            0,
            0,
            &[],
        )
        .await
        .map_err(shell_err)?;
    channel.request_shell(false).await.map_err(shell_err)?;
    Ok(channel)
}

async fn disconnect(handle: &Handle<DeviceHandler>, host: &str) {
    if let Err(e) = handle
        .disconnect(Disconnect::ByApplication, "", "en")
        .await
    {
        tracing::debug!(host = %host, error = %e, "disconnect failed");
    }
}

#[async_trait]
impl SessionChannel for SshSession {
    async fn send_raw(&mut self, bytes: &[u8]) -> SessionResult<()> {
        if self.closed || self.remote_gone {
            return Err(SessionError::Transport("channel is closed".into()));
        }
        self.channel.data(bytes).await.map_err(|e| {
            self.remote_gone = true;
            SessionError::Transport(format!("write failed: {e}"))
        })
    }

    async fn recv(&mut self, wait: Duration) -> SessionResult<Option<Vec<u8>>> {
        if self.closed || self.remote_gone {
            return Err(SessionError::Transport("channel is closed".into()));
        }

        match timeout(wait, self.channel.wait()).await {
            Err(_) => Ok(None),
            Ok(Some(ChannelMsg::Data { data })) => Ok(Some(data.to_vec())),
            Ok(Some(ChannelMsg::ExtendedData { data, .. })) => Ok(Some(data.to_vec())),
            Ok(Some(ChannelMsg::Eof | ChannelMsg::Close)) | Ok(None) => {
                self.remote_gone = true;
                tracing::warn!(host = %self.host, "device closed the channel");
                Err(SessionError::Transport("channel closed by device".into()))
            }
            Ok(Some(_)) => Ok(None),
        }
    }

    async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        if !self.remote_gone {
            if let Err(e) = self.channel.eof().await {
                tracing::debug!(host = %self.host, error = %e, "channel eof failed");
            }
        }
        if let Some(handle) = self.handle.take() {
            disconnect(&handle, &self.host).await;
        }
        tracing::info!(host = %self.host, "shell session closed");
    }

    fn is_closed(&self) -> bool {
        self.closed || self.remote_gone
    }
}

impl Drop for SshSession {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        let Some(handle) = self.handle.take() else {
            return;
        };
        self.closed = true;

        tracing::warn!(host = %self.host, "session dropped without close, disconnecting");
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let host = std::mem::take(&mut self.host);
                runtime.spawn(async move {
                    disconnect(&handle, &host).await;
                });
            }
            // no runtime left to send the disconnect; dropping the handle
            // still tears down the transport
            Err(_) => drop(handle),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn refused_connection_is_connection_error() {
        // Bind then drop a listener to get a port nothing is listening on
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let mut config = SessionConfig::new("127.0.0.1", "admin");
        config.port = port;
        config.connect_timeout_secs = 2;

        let result = SshConnector::new()
            .open(&config, &Secret::new("wrong"))
            .await;
        assert!(matches!(result, Err(SessionError::Connection(_))));
    }

    #[tokio::test]
    async fn silent_server_times_out_in_handshake() {
        // Accepts TCP but never speaks SSH
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        let mut config = SessionConfig::new("127.0.0.1", "admin");
        config.port = port;
        config.banner_timeout_secs = 1;

        let result = SshSession::open(&config, &Secret::new("cisco")).await;
        match result {
            Err(SessionError::Connection(msg)) => assert!(msg.contains("handshake")),
            Err(other) => panic!("expected connection error, got {other:?}"),
            Ok(_) => panic!("expected connection error, got a session"),
        }
        server.abort();
    }
}
