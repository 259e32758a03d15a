//! End-to-end turn behaviour through [`AcpBackend`] over a fake transport
//!
//! Every test pauses tokio's clock, so the quiet-period and drain-timeout
//! windows elapse instantly and deterministically.

mod common;

use std::time::Duration;

use tokio::time::{sleep, Instant};
use tokio_test::assert_ok;

use acp_bridge::{
    AcpBackend, AgentMessage, BackendOptions, BridgeError, ContentBlock, SessionId, StopReason,
};

use common::{
    end_turn_reply, fake_transport, init_logging, kinds, test_options, text_chunk, tool_call,
    tool_done,
};

#[tokio::test(start_paused = true)]
async fn trailing_tool_updates_are_consolidated_before_the_final_text() {
    init_logging();
    let (transport, mut agent) = fake_transport();
    let backend = AcpBackend::new(transport, test_options());
    let session = SessionId::new("sess-1");

    let agent_task = tokio::spawn(async move {
        let request = agent.requests.recv().await.expect("no prompt request");
        assert_eq!(request.method, "session/prompt");
        assert_eq!(request.params["sessionId"], "sess-1");
        assert_eq!(request.params["prompt"][0]["text"], "read the README");

        // Narrative text streams first, then the reply resolves while the
        // tool activity is still in flight.
        agent.send_update("sess-1", text_chunk("Reading the project README."));
        sleep(Duration::from_millis(2)).await;
        request
            .respond
            .send(end_turn_reply())
            .expect("bridge dropped the reply channel");
        sleep(Duration::from_millis(3)).await;
        agent.send_update("sess-1", tool_call("tc-1", "Read README.md"));
        sleep(Duration::from_millis(5)).await;
        agent.send_update("sess-1", tool_done("tc-1"));
    });

    let mut messages = Vec::new();
    let reply = backend
        .prompt(
            &session,
            vec![ContentBlock::text("read the README")],
            |m| messages.push(m),
        )
        .await
        .expect("prompt failed");

    assert_eq!(reply.stop_reason, StopReason::EndTurn);
    assert_eq!(
        kinds(&messages),
        vec!["tool_call", "tool_result", "text", "turn_complete"],
        "got: {messages:?}"
    );
    match &messages[2] {
        AgentMessage::Text { text } => assert_eq!(text, "Reading the project README."),
        other => panic!("expected text, got {other:?}"),
    }
    agent_task.await.expect("agent task panicked");
}

#[tokio::test(start_paused = true)]
async fn latest_text_chunk_wins() {
    init_logging();
    let (transport, mut agent) = fake_transport();
    let backend = AcpBackend::new(transport, test_options());
    let session = SessionId::new("sess-1");

    let agent_task = tokio::spawn(async move {
        let request = agent.requests.recv().await.expect("no prompt request");
        agent.send_update("sess-1", text_chunk("Working on it."));
        sleep(Duration::from_millis(2)).await;
        agent.send_update("sess-1", text_chunk("Done: updated two files."));
        request.respond.send(end_turn_reply()).ok();
    });

    let mut messages = Vec::new();
    backend
        .prompt(&session, vec![ContentBlock::text("go")], |m| {
            messages.push(m);
        })
        .await
        .expect("prompt failed");

    assert_eq!(kinds(&messages), vec!["text", "turn_complete"]);
    match &messages[0] {
        AgentMessage::Text { text } => assert_eq!(text, "Done: updated two files."),
        other => panic!("expected text, got {other:?}"),
    }
    agent_task.await.expect("agent task panicked");
}

#[tokio::test(start_paused = true)]
async fn quiet_turn_flushes_after_the_quiet_period_not_the_full_drain() {
    init_logging();
    let (transport, mut agent) = fake_transport();
    let backend = AcpBackend::new(transport, test_options());
    let session = SessionId::new("sess-1");

    let agent_task = tokio::spawn(async move {
        let request = agent.requests.recv().await.expect("no prompt request");
        agent.send_update("sess-1", text_chunk("ok"));
        request.respond.send(end_turn_reply()).ok();
    });

    let started = Instant::now();
    let mut messages = Vec::new();
    backend
        .prompt(&session, vec![ContentBlock::text("go")], |m| {
            messages.push(m);
        })
        .await
        .expect("prompt failed");
    let elapsed = started.elapsed();

    // One 30ms quiet window, nowhere near the 1000ms drain cap.
    assert!(elapsed >= Duration::from_millis(30), "elapsed {elapsed:?}");
    assert!(elapsed < Duration::from_millis(200), "elapsed {elapsed:?}");
    assert_eq!(kinds(&messages), vec!["text", "turn_complete"]);
    agent_task.await.expect("agent task panicked");
}

#[tokio::test(start_paused = true)]
async fn endless_trailing_updates_cannot_stall_the_turn_past_the_drain_deadline() {
    init_logging();
    let (transport, mut agent) = fake_transport();
    let backend = AcpBackend::new(transport, test_options());
    let session = SessionId::new("sess-1");

    let agent_task = tokio::spawn(async move {
        let request = agent.requests.recv().await.expect("no prompt request");
        request.respond.send(end_turn_reply()).ok();
        // Keep resetting the quiet timer well past the drain deadline.
        for i in 0..100u32 {
            sleep(Duration::from_millis(20)).await;
            agent.send_update("sess-1", tool_call(&format!("tc-{i}"), "Busy"));
        }
    });

    let started = Instant::now();
    let mut messages = Vec::new();
    backend
        .prompt(&session, vec![ContentBlock::text("go")], |m| {
            messages.push(m);
        })
        .await
        .expect("prompt failed");
    let elapsed = started.elapsed();

    assert!(elapsed >= Duration::from_millis(1000), "elapsed {elapsed:?}");
    assert!(elapsed < Duration::from_millis(1200), "elapsed {elapsed:?}");
    assert_eq!(
        messages.last().map(|m| matches!(m, AgentMessage::TurnComplete { .. })),
        Some(true)
    );
    agent_task.abort();
}

#[tokio::test(start_paused = true)]
async fn failed_prompt_drains_tool_activity_then_surfaces_the_error() {
    init_logging();
    let (transport, mut agent) = fake_transport();
    let backend = AcpBackend::new(transport, test_options());
    let session = SessionId::new("sess-1");

    let agent_task = tokio::spawn(async move {
        let request = agent.requests.recv().await.expect("no prompt request");
        agent.send_update("sess-1", tool_call("tc-1", "Run tests"));
        sleep(Duration::from_millis(2)).await;
        agent.send_update("sess-1", tool_done("tc-1"));
        request
            .respond
            .send(Err(BridgeError::transport("agent crashed")))
            .ok();
    });

    let mut messages = Vec::new();
    let err = backend
        .prompt(&session, vec![ContentBlock::text("go")], |m| {
            messages.push(m);
        })
        .await
        .expect_err("prompt should fail");

    assert!(matches!(err, BridgeError::Transport(_)), "got {err:?}");
    // Tool activity observed before the failure is still delivered; no
    // turn_complete is synthesized for a failed turn.
    assert_eq!(kinds(&messages), vec!["tool_call", "tool_result"]);
    agent_task.await.expect("agent task panicked");
}

#[tokio::test(start_paused = true)]
async fn second_prompt_on_a_busy_session_is_rejected() {
    init_logging();
    let (transport, mut agent) = fake_transport();
    let backend = AcpBackend::new(transport, test_options());
    let session = SessionId::new("sess-1");

    let first = {
        let backend = backend.clone();
        let session = session.clone();
        tokio::spawn(async move {
            backend
                .prompt(&session, vec![ContentBlock::text("first")], |_| {})
                .await
        })
    };
    // Let the first prompt register its turn before racing the second one.
    let request = agent.requests.recv().await.expect("no prompt request");

    let err = backend
        .prompt(&session, vec![ContentBlock::text("second")], |_| {})
        .await
        .expect_err("second prompt should be rejected");
    assert!(matches!(err, BridgeError::TurnActive(_)), "got {err:?}");

    request.respond.send(end_turn_reply()).ok();
    first
        .await
        .expect("first prompt panicked")
        .expect("first prompt failed");
}

#[tokio::test(start_paused = true)]
async fn updates_for_sessions_without_an_active_turn_are_dropped() {
    init_logging();
    let (transport, mut agent) = fake_transport();
    let backend = AcpBackend::new(transport, test_options());
    let session = SessionId::new("sess-1");

    // Stale activity from a session nobody is prompting.
    agent.send_update("sess-ghost", tool_call("tc-9", "Old business"));
    tokio::task::yield_now().await;

    let agent_task = tokio::spawn(async move {
        let request = agent.requests.recv().await.expect("no prompt request");
        agent.send_update("sess-1", text_chunk("fresh turn"));
        request.respond.send(end_turn_reply()).ok();
    });

    let mut messages = Vec::new();
    backend
        .prompt(&session, vec![ContentBlock::text("go")], |m| {
            messages.push(m);
        })
        .await
        .expect("prompt failed");

    // Only the active turn's messages come through.
    assert_eq!(kinds(&messages), vec!["text", "turn_complete"]);
    agent_task.await.expect("agent task panicked");
}

#[tokio::test(start_paused = true)]
async fn new_session_parses_the_session_id_from_the_reply() -> anyhow::Result<()> {
    init_logging();
    let (transport, mut agent) = fake_transport();
    let backend = AcpBackend::new(transport, BackendOptions::default());

    let agent_task = tokio::spawn(async move {
        let request = agent.requests.recv().await.expect("no session/new request");
        assert_eq!(request.method, "session/new");
        assert_eq!(request.params["cwd"], "/tmp/project");
        assert!(request.params["mcpServers"].as_array().is_some());
        request
            .respond
            .send(Ok(serde_json::json!({ "sessionId": "sess-42" })))
            .ok();
    });

    let session = assert_ok!(backend.new_session(std::path::Path::new("/tmp/project")).await);
    assert_eq!(session.as_str(), "sess-42");
    agent_task.await?;
    Ok(())
}
