//! E2E tests for failure handling across the pipeline.

mod helpers;

use helpers::{TestHarness, device};
use np_agent::GenerationError;
use np_protocol::{CommandOutcome, EngineState, Phase};
use np_session::{MockConnector, MockReply};

/// Wrong credentials fail the batch at connect; nothing is sent.
#[tokio::test]
async fn e2e_rejected_credentials() {
    let h = TestHarness::start().await;
    h.mock_completion("show version\nshow clock").await;

    let batch = h.generate("version and time").await.unwrap();
    let connector = MockConnector::failing("authentication rejected for user admin");
    let transcript = h.execute_with(&connector, &batch).await;

    assert_eq!(transcript.final_state, EngineState::Failed);
    assert!(transcript.entries.is_empty());
    let failure = transcript.failure.as_ref().unwrap();
    assert_eq!(failure.phase, Phase::Connect);
    assert!(failure.to_string().starts_with("connect failed: "));

    let records = h.history.load().await;
    assert_eq!(records.len(), 1);
    assert!(!records[0].succeeded);
}

/// A command that never returns to the prompt is recorded as timed out and
/// the rest of the batch still runs.
#[tokio::test]
async fn e2e_timeout_is_not_fatal() {
    let h = TestHarness::start().await;
    h.mock_completion("show clock\nping 10.255.255.1 repeat 100000\nshow users")
        .await;

    let batch = h.generate("clock, long ping, users").await.unwrap();
    let session = device("Router#").with_replies([
        MockReply::output("show clock\r\n*10:00:00 UTC\r\nRouter#"),
        MockReply::output("Sending 100000, 100-byte ICMP Echos to 10.255.255.1\r\n....."),
        MockReply::output("show users\r\n*  1 vty 0  admin\r\nRouter#"),
    ]);
    let (transcript, probe) = h.execute(&batch, session).await;

    assert_eq!(transcript.final_state, EngineState::Done);
    assert_eq!(probe.sent_lines().len(), 3);
    let outcomes: Vec<_> = transcript.entries.iter().map(|e| e.outcome).collect();
    assert_eq!(
        outcomes,
        [
            CommandOutcome::Completed,
            CommandOutcome::TimedOut,
            CommandOutcome::Completed
        ]
    );
    assert!(transcript.entries[1].output.contains("ICMP Echos"));
    assert!(transcript.render().contains("[timed out after"));
}

/// Device drops the session mid-batch: remaining commands are abandoned,
/// the session is closed once, and the failure names the command.
#[tokio::test]
async fn e2e_connection_lost_mid_batch() {
    let h = TestHarness::start().await;
    h.mock_completion("show clock\nreload in 1\nshow version").await;

    let batch = h.generate("schedule a reload").await.unwrap();
    let session = device("Router#").with_replies([
        MockReply::output("show clock\r\n*10:00:00 UTC\r\nRouter#"),
        MockReply::Disconnect,
    ]);
    let (transcript, probe) = h.execute(&batch, session).await;

    assert_eq!(transcript.final_state, EngineState::Failed);
    let failure = transcript.failure.as_ref().unwrap();
    assert_eq!(failure.phase, Phase::Read);
    assert_eq!(failure.command.as_deref(), Some("reload in 1"));
    assert_eq!(transcript.entries.len(), 1);
    assert_eq!(probe.sent_lines(), ["show clock", "reload in 1"]);
    assert_eq!(probe.closes(), 1);
}

/// Generator outage surfaces as an error before any device contact.
#[tokio::test]
async fn e2e_generator_outage() {
    let h = TestHarness::start().await;
    h.mock_generator_error(503).await;

    let result = h.generate("show version").await;
    assert!(matches!(
        result,
        Err(GenerationError::Status { status: 503, .. })
    ));
    assert!(h.history.load().await.is_empty());
}

/// History stays bounded over many batches.
#[tokio::test]
async fn e2e_history_is_bounded() {
    let h = TestHarness::start().await;
    h.mock_completion("show clock").await;

    let batch = h.generate("time").await.unwrap();
    let mut last_id = None;
    for _ in 0..12 {
        let (transcript, _) = h.execute(&batch, device("Router#")).await;
        last_id = Some(transcript.batch_id);
    }

    let records = h.history.load().await;
    assert_eq!(records.len(), 10);
    assert_eq!(records[9].batch_id, last_id);
}
