use std::fmt;
use std::time::Duration;

use serde::Deserialize;
use zeroize::Zeroizing;

/// Device connection settings, loadable from TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Device hostname or IP address.
    pub host: String,
    /// SSH port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Login username.
    pub username: String,
    /// TCP connect timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// SSH banner/handshake timeout in seconds.
    #[serde(default = "default_banner_timeout")]
    pub banner_timeout_secs: u64,
    /// Password authentication timeout in seconds.
    #[serde(default = "default_auth_timeout")]
    pub auth_timeout_secs: u64,
    /// Total budget for one command's output, all pages included.
    #[serde(default = "default_read_timeout")]
    pub read_timeout_secs: u64,
    /// How long to wait for the login banner to settle.
    #[serde(default = "default_drain_timeout")]
    pub drain_timeout_secs: u64,
    /// Quiet period required before each command is sent. Output that
    /// arrives during it belongs to an earlier command and is discarded.
    #[serde(default = "default_settle")]
    pub settle_ms: u64,
    /// PTY terminal type.
    #[serde(default = "default_term")]
    pub term: String,
    /// PTY width in columns. Only affects wrapping.
    #[serde(default = "default_term_width")]
    pub term_width: u32,
    /// PTY height in rows.
    #[serde(default = "default_term_height")]
    pub term_height: u32,
}

fn default_port() -> u16 {
    22
}
fn default_connect_timeout() -> u64 {
    15
}
fn default_banner_timeout() -> u64 {
    20
}
fn default_auth_timeout() -> u64 {
    20
}
fn default_read_timeout() -> u64 {
    20
}
fn default_drain_timeout() -> u64 {
    5
}
fn default_settle() -> u64 {
    200
}
fn default_term() -> String {
    "vt100".into()
}
fn default_term_width() -> u32 {
    200
}
fn default_term_height() -> u32 {
    1000
}

impl SessionConfig {
    /// Config for `host` with every tunable at its default.
    pub fn new(host: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: default_port(),
            username: username.into(),
            connect_timeout_secs: default_connect_timeout(),
            banner_timeout_secs: default_banner_timeout(),
            auth_timeout_secs: default_auth_timeout(),
            read_timeout_secs: default_read_timeout(),
            drain_timeout_secs: default_drain_timeout(),
            settle_ms: default_settle(),
            term: default_term(),
            term_width: default_term_width(),
            term_height: default_term_height(),
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn banner_timeout(&self) -> Duration {
        Duration::from_secs(self.banner_timeout_secs)
    }

    pub fn auth_timeout(&self) -> Duration {
        Duration::from_secs(self.auth_timeout_secs)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    pub fn drain_timeout(&self) -> Duration {
        Duration::from_secs(self.drain_timeout_secs)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

/// Device password. Wiped from memory on drop, never printed.
#[derive(Clone)]
pub struct Secret(Zeroizing<String>);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(Zeroizing::new(value.into()))
    }

    pub fn expose(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}
