//! Natural-language to IOS command generation.
//!
//! `ChatCompletionsSource` calls an OpenAI-compatible `/chat/completions`
//! endpoint (DeepSeek by default) and returns the model's raw command text.
//! Screening that text is the sanitizer's job, not this module's.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{GenerationError, GenerationResult};

/// Instructions sent ahead of every operator request.
const SYSTEM_PROMPT: &str = r#"You are a Cisco IOS network engineer. Convert the operator's request into the exact IOS CLI commands that carry it out.

Rules:
1. Return only valid IOS commands, no explanations and no markdown.
2. One command per line.
3. Put a line containing only #DANGER immediately before any command that reloads, erases, deletes or otherwise disrupts the device.
4. Include every mode transition needed (enable, configure terminal, interface ..., exit, end).

Example request: restart the core switch
Example output:
#DANGER
reload"#;

/// Produces raw, unscreened command text for a natural-language request.
#[async_trait]
pub trait CommandSource: Send + Sync {
    async fn generate(&self, request: &str) -> GenerationResult<String>;
}

/// Configuration for an OpenAI-compatible chat completions endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionsConfig {
    /// Full URL of the chat completions endpoint.
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Environment variable holding the bearer token.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_api_url() -> String {
    "https://api.deepseek.com/v1/chat/completions".into()
}
fn default_model() -> String {
    "deepseek-chat".into()
}
fn default_api_key_env() -> String {
    "DEEPSEEK_API_KEY".into()
}
fn default_timeout_secs() -> u64 {
    15
}
fn default_temperature() -> f32 {
    0.1
}

impl Default for ChatCompletionsConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_timeout_secs(),
            temperature: default_temperature(),
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    stream: bool,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

/// Chat completions response (only fields we need).
#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Client for an OpenAI-compatible chat completions endpoint.
pub struct ChatCompletionsSource {
    client: reqwest::Client,
    config: ChatCompletionsConfig,
    api_key: String,
}

impl ChatCompletionsSource {
    /// Build a client using an explicit API key.
    pub fn new(config: ChatCompletionsConfig, api_key: impl Into<String>) -> GenerationResult<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(GenerationError::MissingApiKey(config.api_key_env.clone()));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GenerationError::Client(e.to_string()))?;

        Ok(Self {
            client,
            config,
            api_key,
        })
    }

    /// Build a client reading the API key from `config.api_key_env`.
    pub fn from_env(config: ChatCompletionsConfig) -> GenerationResult<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .map_err(|_| GenerationError::MissingApiKey(config.api_key_env.clone()))?;
        Self::new(config, api_key)
    }

    pub fn config(&self) -> &ChatCompletionsConfig {
        &self.config
    }
}

#[async_trait]
impl CommandSource for ChatCompletionsSource {
    async fn generate(&self, request: &str) -> GenerationResult<String> {
        let body = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: request,
                },
            ],
            temperature: self.config.temperature,
            stream: false,
        };

        let response = self
            .client
            .post(&self.config.api_url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = %status, "command generator returned non-success");
            return Err(GenerationError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::Decode(e.to_string()))?;

        let content = chat
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| GenerationError::Decode("no choices in response".into()))?;

        let commands = strip_code_fences(&content);
        if commands.trim().is_empty() {
            return Err(GenerationError::Empty);
        }

        tracing::debug!(
            model = %self.config.model,
            lines = commands.lines().count(),
            "commands generated"
        );
        Ok(commands)
    }
}

/// Remove markdown fence lines (```` ``` ```` or ```` ```cisco ````) that
/// models wrap code in despite instructions.
fn strip_code_fences(content: &str) -> String {
    content
        .lines()
        .filter(|line| !line.trim_start().starts_with("```"))
        .collect::<Vec<_>>()
        .join("\n")
}
