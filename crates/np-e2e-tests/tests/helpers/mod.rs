//! Shared test harness for E2E integration tests.
//!
//! Wires a wiremock chat completions server, the real sanitizer, the
//! execution engine over a scripted `MockSession`, and a history store in a
//! temp directory, exercising real code paths across all crate boundaries.

#![allow(dead_code)]

use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use np_agent::config::SafetyConfig;
use np_agent::{ChatCompletionsConfig, ChatCompletionsSource, CommandSource, ExecutionEngine};
use np_agent::{GenerationError, HistoryStore};
use np_ios_tools::{RegexPromptMatcher, Sanitizer};
use np_protocol::{CommandBatch, Transcript};
use np_session::{Connector, MockConnector, MockProbe, MockSession, Secret, SessionConfig};

pub const COMPLETIONS_PATH: &str = "/v1/chat/completions";

/// End-to-end harness: generator mock + sanitizer + engine + history.
pub struct TestHarness {
    /// Stand-in for the DeepSeek API.
    pub server: MockServer,
    pub source: ChatCompletionsSource,
    pub sanitizer: Sanitizer,
    pub matcher: RegexPromptMatcher,
    pub session_config: SessionConfig,
    pub history: HistoryStore,
    _history_dir: TempDir,
}

impl TestHarness {
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        let source = ChatCompletionsSource::new(
            ChatCompletionsConfig {
                api_url: format!("{}{COMPLETIONS_PATH}", server.uri()),
                timeout_secs: 5,
                ..ChatCompletionsConfig::default()
            },
            "sk-e2e",
        )
        .unwrap();

        let safety = SafetyConfig::default();
        let mut session_config = SessionConfig::new("192.168.1.1", "admin");
        session_config.drain_timeout_secs = 1;
        session_config.read_timeout_secs = 1;
        session_config.settle_ms = 50;

        let history_dir = tempfile::tempdir().unwrap();
        let history = HistoryStore::new(history_dir.path().join("netpilot_history.json"));

        Self {
            server,
            source,
            sanitizer: safety.sanitizer().unwrap(),
            matcher: safety.prompt_matcher().unwrap(),
            session_config,
            history,
            _history_dir: history_dir,
        }
    }

    /// Make the generator answer every request with `content`.
    pub async fn mock_completion(&self, content: &str) {
        let body = serde_json::json!({
            "id": "chatcmpl-e2e",
            "object": "chat.completion",
            "model": "deepseek-chat",
            "choices": [{
                "index": 0,
                "message": { "role": "assistant", "content": content },
                "finish_reason": "stop"
            }]
        });
        Mock::given(method("POST"))
            .and(path(COMPLETIONS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&self.server)
            .await;
    }

    /// Make the generator fail with `status`.
    pub async fn mock_generator_error(&self, status: u16) {
        Mock::given(method("POST"))
            .and(path(COMPLETIONS_PATH))
            .respond_with(ResponseTemplate::new(status).set_body_string("upstream error"))
            .mount(&self.server)
            .await;
    }

    /// Natural-language request → screened batch.
    pub async fn generate(&self, request: &str) -> Result<CommandBatch, GenerationError> {
        let raw = self.source.generate(request).await?;
        Ok(self.sanitizer.sanitize(&raw))
    }

    /// Run `batch` through the engine against `session`, recording history.
    pub async fn execute(&self, batch: &CommandBatch, session: MockSession) -> (Transcript, MockProbe) {
        let probe = session.probe();
        let connector = MockConnector::new(session);
        let transcript = self.execute_with(&connector, batch).await;
        (transcript, probe)
    }

    pub async fn execute_with(&self, connector: &dyn Connector, batch: &CommandBatch) -> Transcript {
        let engine = ExecutionEngine::new(connector, &self.matcher);
        let transcript = engine
            .run(&self.session_config, &Secret::new("cisco"), batch)
            .await;
        self.history.append(&transcript).await.unwrap();
        transcript
    }
}

/// A device that has finished logging in and sits at `prompt`.
pub fn device(prompt: &str) -> MockSession {
    MockSession::new()
        .with_banner(format!("\r\nUser Access Verification\r\n\r\n{prompt}"))
        .with_prompt(prompt)
}
