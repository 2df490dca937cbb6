//! NetPilot configuration, loadable from TOML.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use np_ios_tools::{
    DEFAULT_DANGER_KEYWORDS, DEFAULT_MORE_MARKER, DangerClassifier, RegexPromptMatcher, Sanitizer,
    ToolsResult,
};
use np_protocol::{DANGER_SENTINEL, DEFAULT_MAX_OUTPUT_CHARS, DEFAULT_MAX_RECORDS};
use np_session::{Secret, SessionConfig};

use crate::error::ConfigError;
use crate::generator::ChatCompletionsConfig;

/// Top-level configuration for the `netpilot` binary.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Target device.
    pub device: DeviceConfig,
    /// Command generator endpoint. Defaults to DeepSeek when absent.
    #[serde(default)]
    pub generator: ChatCompletionsConfig,
    #[serde(default)]
    pub safety: SafetyConfig,
    #[serde(default)]
    pub history: HistoryConfig,
}

impl AppConfig {
    /// Load config from a TOML file path.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }
}

/// Device session settings plus where to find the password.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceConfig {
    #[serde(flatten)]
    pub session: SessionConfig,
    /// Environment variable holding the device password.
    #[serde(default = "default_password_env")]
    pub password_env: String,
}

fn default_password_env() -> String {
    "NETPILOT_DEVICE_PASSWORD".into()
}

impl DeviceConfig {
    /// Read the device password from `password_env`.
    pub fn password(&self) -> Result<Secret, ConfigError> {
        match std::env::var(&self.password_env) {
            Ok(value) if !value.is_empty() => Ok(Secret::new(value)),
            _ => Err(ConfigError::MissingPassword(self.password_env.clone())),
        }
    }
}

/// Command screening settings.
#[derive(Debug, Clone, Deserialize)]
pub struct SafetyConfig {
    /// Marker the generator puts on commands that must never be sent.
    #[serde(default = "default_sentinel")]
    pub sentinel: String,
    /// Substrings that flag a command as dangerous (warn-only).
    #[serde(default = "default_keywords")]
    pub keywords: Vec<String>,
    /// Pagination marker answered with a space during reads.
    #[serde(default = "default_more_marker")]
    pub more_marker: String,
}

fn default_sentinel() -> String {
    DANGER_SENTINEL.into()
}
fn default_keywords() -> Vec<String> {
    DEFAULT_DANGER_KEYWORDS.iter().map(|k| k.to_string()).collect()
}
fn default_more_marker() -> String {
    DEFAULT_MORE_MARKER.into()
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            sentinel: default_sentinel(),
            keywords: default_keywords(),
            more_marker: default_more_marker(),
        }
    }
}

impl SafetyConfig {
    pub fn sanitizer(&self) -> ToolsResult<Sanitizer> {
        Sanitizer::new(DangerClassifier::new(&self.keywords)).with_sentinel(&self.sentinel)
    }

    pub fn prompt_matcher(&self) -> ToolsResult<RegexPromptMatcher> {
        RegexPromptMatcher::new().with_more_marker(&self.more_marker)
    }
}

/// Execution history settings.
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryConfig {
    #[serde(default = "default_history_path")]
    pub path: PathBuf,
    #[serde(default = "default_max_records")]
    pub max_records: usize,
    /// Rendered output kept per record, in characters.
    #[serde(default = "default_max_output_chars")]
    pub max_output_chars: usize,
}

fn default_history_path() -> PathBuf {
    PathBuf::from("netpilot_history.json")
}
fn default_max_records() -> usize {
    DEFAULT_MAX_RECORDS
}
fn default_max_output_chars() -> usize {
    DEFAULT_MAX_OUTPUT_CHARS
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            path: default_history_path(),
            max_records: default_max_records(),
            max_output_chars: default_max_output_chars(),
        }
    }
}
