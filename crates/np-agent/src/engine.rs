//! Drives one `CommandBatch` over one device session.
//!
//! Opens a session through a `Connector`, drains the login banner, then sends
//! each executable command and reads until the prompt comes back. Anything the
//! device prints between commands is discarded before the next send. A read
//! timeout is recorded and the batch moves on; a connection or transport
//! failure ends the batch. Either way the session is closed exactly once and
//! the caller gets a `Transcript`, never an error.

use tokio::time::Instant;

use np_ios_tools::PromptMatcher;
use np_protocol::{
    BatchFailure, CommandBatch, CommandOutcome, EngineState, Phase, Transcript, TranscriptEntry,
};
use np_session::{Connector, Secret, SessionChannel, SessionConfig, SessionError};

/// Runs command batches against a device.
///
/// Holds no per-batch state, so one engine can run any number of batches
/// (one at a time per device).
pub struct ExecutionEngine<'a> {
    connector: &'a dyn Connector,
    matcher: &'a dyn PromptMatcher,
}

impl<'a> ExecutionEngine<'a> {
    pub fn new(connector: &'a dyn Connector, matcher: &'a dyn PromptMatcher) -> Self {
        Self { connector, matcher }
    }

    /// Execute `batch` on the device described by `config`.
    ///
    /// A batch with nothing executable never opens a connection.
    pub async fn run(
        &self,
        config: &SessionConfig,
        secret: &Secret,
        batch: &CommandBatch,
    ) -> Transcript {
        let start = Instant::now();
        let mut transcript = Transcript::new(&config.host);

        if batch.executable_count() == 0 {
            transcript.skipped = batch.len();
            transcript.final_state = EngineState::Done;
            tracing::info!(
                host = %config.host,
                skipped = transcript.skipped,
                "no executable commands, not connecting"
            );
            return transcript;
        }

        tracing::info!(
            host = %config.host,
            batch_id = %transcript.batch_id,
            commands = batch.executable_count(),
            "batch starting"
        );

        let mut session = match self.connector.open(config, secret).await {
            Ok(session) => session,
            Err(e) => {
                let failure = BatchFailure {
                    phase: Phase::Connect,
                    command: None,
                    message: e.to_string(),
                };
                return finish(transcript, Err(failure), start);
            }
        };

        let result = self
            .drive(session.as_mut(), config, batch, &mut transcript)
            .await;
        session.close().await;

        finish(transcript, result, start)
    }

    async fn drive(
        &self,
        session: &mut dyn SessionChannel,
        config: &SessionConfig,
        batch: &CommandBatch,
        transcript: &mut Transcript,
    ) -> Result<(), BatchFailure> {
        enter(transcript, EngineState::Draining);
        let banner = session
            .drain_initial(self.matcher, config.drain_timeout())
            .await
            .map_err(|e| failure(Phase::Drain, None, &e))?;
        tracing::debug!(bytes = banner.len(), "banner drained");
        enter(transcript, EngineState::Ready);

        for command in batch {
            if !command.is_executable() {
                transcript.skipped += 1;
                tracing::debug!(command = %command.text, disposition = ?command.disposition, "skipped");
                continue;
            }

            enter(transcript, EngineState::Sending);
            let stale = session
                .discard_pending(config.settle(), config.drain_timeout())
                .await
                .map_err(|e| failure(Phase::Send, Some(&command.text), &e))?;
            if stale > 0 {
                tracing::warn!(
                    command = %command.text,
                    bytes = stale,
                    "device output arrived between commands, discarded"
                );
            }
            session
                .send_line(&command.text)
                .await
                .map_err(|e| failure(Phase::Send, Some(&command.text), &e))?;

            enter(transcript, EngineState::AwaitingPrompt);
            let sent_at = Instant::now();
            let read = session
                .read_until_quiescent(self.matcher, config.read_timeout())
                .await;
            let latency_ms = sent_at.elapsed().as_millis() as u64;

            let (output, outcome) = match read {
                Ok(output) => (output, CommandOutcome::Completed),
                Err(SessionError::Timeout {
                    timeout_ms,
                    partial,
                }) => {
                    tracing::warn!(
                        command = %command.text,
                        timeout_ms,
                        partial_bytes = partial.len(),
                        "no prompt before read deadline, continuing"
                    );
                    (partial, CommandOutcome::TimedOut)
                }
                Err(e) => return Err(failure(Phase::Read, Some(&command.text), &e)),
            };

            tracing::info!(command = %command.text, latency_ms, ?outcome, "command finished");
            transcript.entries.push(TranscriptEntry {
                command: command.clone(),
                output,
                outcome,
                latency_ms,
            });
            enter(transcript, EngineState::Ready);
        }

        Ok(())
    }
}

fn enter(transcript: &mut Transcript, state: EngineState) {
    tracing::trace!(from = %transcript.final_state, to = %state, "engine state");
    transcript.final_state = state;
}

fn failure(phase: Phase, command: Option<&str>, error: &SessionError) -> BatchFailure {
    BatchFailure {
        phase,
        command: command.map(str::to_string),
        message: error.to_string(),
    }
}

fn finish(
    mut transcript: Transcript,
    result: Result<(), BatchFailure>,
    start: Instant,
) -> Transcript {
    transcript.elapsed_ms = start.elapsed().as_millis() as u64;

    match result {
        Ok(()) => {
            enter(&mut transcript, EngineState::Done);
            tracing::info!(
                host = %transcript.host,
                entries = transcript.entries.len(),
                timed_out = transcript.timed_out().count(),
                elapsed_ms = transcript.elapsed_ms,
                "batch done"
            );
        }
        Err(failure) => {
            enter(&mut transcript, EngineState::Failed);
            tracing::error!(
                host = %transcript.host,
                entries = transcript.entries.len(),
                error = %failure,
                "batch failed"
            );
            transcript.failure = Some(failure);
        }
    }
    transcript
}
