//! Shared test harness: an in-memory transport driven from the test body
//!
//! The test plays the agent: it receives top-level requests through
//! [`AgentHandle::requests`] and pushes notifications and permission requests
//! through [`AgentHandle::incoming`].

#![allow(dead_code)]

use tokio::sync::{mpsc, oneshot};

use acp_bridge::error::{BridgeError, Result};
use acp_bridge::transport::{Incoming, Transport};
use acp_bridge::{
    ContentBlock, PermissionOption, PermissionOptionKind, PermissionReply, PermissionRequest,
    SessionId, SessionNotification, SessionUpdate, ToolCallDescriptor, ToolCallId,
    ToolCallStatus,
};

/// One top-level request captured by the fake transport
pub struct FakeRequest {
    pub method: String,
    pub params: serde_json::Value,
    pub respond: oneshot::Sender<Result<serde_json::Value>>,
}

/// The agent side of the fake transport
pub struct AgentHandle {
    pub incoming: mpsc::UnboundedSender<Incoming>,
    pub requests: mpsc::UnboundedReceiver<FakeRequest>,
}

/// In-memory transport for tests
pub struct FakeTransport {
    requests_tx: mpsc::UnboundedSender<FakeRequest>,
    incoming_rx: Option<mpsc::UnboundedReceiver<Incoming>>,
}

/// Build a connected fake transport and its agent-side handle
pub fn fake_transport() -> (FakeTransport, AgentHandle) {
    let (requests_tx, requests_rx) = mpsc::unbounded_channel();
    let (incoming_tx, incoming_rx) = mpsc::unbounded_channel();
    (
        FakeTransport {
            requests_tx,
            incoming_rx: Some(incoming_rx),
        },
        AgentHandle {
            incoming: incoming_tx,
            requests: requests_rx,
        },
    )
}

impl Transport for FakeTransport {
    async fn send_request(&self, method: &str, params: serde_json::Value) -> Result<serde_json::Value> {
        let (respond, response_rx) = oneshot::channel();
        self.requests_tx
            .send(FakeRequest {
                method: method.to_string(),
                params,
                respond,
            })
            .map_err(|_| BridgeError::transport("agent went away"))?;
        response_rx
            .await
            .map_err(|_| BridgeError::transport("request dropped without a response"))?
    }

    fn take_incoming(&mut self) -> mpsc::UnboundedReceiver<Incoming> {
        self.incoming_rx.take().expect("incoming channel already taken")
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

impl AgentHandle {
    /// Push a session update notification
    pub fn send_update(&self, session: &str, update: SessionUpdate) {
        self.incoming
            .send(Incoming::Update(SessionNotification {
                session_id: SessionId::new(session),
                update,
            }))
            .expect("bridge dropped the incoming channel");
    }

    /// Push a permission request, returning the channel carrying the reply
    pub fn send_permission(
        &self,
        session: &str,
        tool_call: &str,
    ) -> oneshot::Receiver<PermissionReply> {
        let (reply, reply_rx) = oneshot::channel();
        self.incoming
            .send(Incoming::Permission {
                request: permission_request(session, tool_call),
                reply,
            })
            .expect("bridge dropped the incoming channel");
        reply_rx
    }
}

/// A text chunk carrying the turn's cumulative final text
pub fn text_chunk(text: &str) -> SessionUpdate {
    SessionUpdate::AgentMessageChunk {
        content: ContentBlock::text(text),
    }
}

/// A tool call announcement
pub fn tool_call(id: &str, title: &str) -> SessionUpdate {
    SessionUpdate::ToolCall {
        tool_call_id: ToolCallId::new(id),
        title: title.to_string(),
        kind: None,
        raw_input: Some(serde_json::json!({ "path": "README.md" })),
        status: ToolCallStatus::InProgress,
    }
}

/// A successful completion for a previously announced tool call
pub fn tool_done(id: &str) -> SessionUpdate {
    SessionUpdate::ToolCallUpdate {
        tool_call_id: ToolCallId::new(id),
        status: Some(ToolCallStatus::Completed),
        raw_output: Some(serde_json::json!({ "ok": true })),
    }
}

/// A permission request for `tool_call` in `session` offering `allow_once`
pub fn permission_request(session: &str, tool_call: &str) -> PermissionRequest {
    PermissionRequest {
        session_id: SessionId::new(session),
        tool_call: ToolCallDescriptor {
            tool_call_id: ToolCallId::new(tool_call),
            title: Some("Run".to_string()),
            kind: Some("execute".to_string()),
            raw_input: Some(serde_json::json!({ "command": "echo hello" })),
        },
        options: vec![PermissionOption {
            option_id: "allow_once".to_string(),
            name: "Allow once".to_string(),
            kind: PermissionOptionKind::AllowOnce,
        }],
    }
}

/// The reply value for a normally completed turn
pub fn end_turn_reply() -> Result<serde_json::Value> {
    Ok(serde_json::json!({ "stopReason": "end_turn" }))
}

/// Short string tags for a delivered message sequence
pub fn kinds(messages: &[acp_bridge::AgentMessage]) -> Vec<&'static str> {
    use acp_bridge::AgentMessage;
    messages
        .iter()
        .map(|m| match m {
            AgentMessage::ToolCall { .. } => "tool_call",
            AgentMessage::ToolResult { .. } => "tool_result",
            AgentMessage::Text { .. } => "text",
            AgentMessage::TurnComplete { .. } => "turn_complete",
            AgentMessage::PermissionRequest { .. } => "permission_request",
        })
        .collect()
}

/// Timing configuration mirroring the windows the integration tests assume
pub fn test_options() -> acp_bridge::BackendOptions {
    acp_bridge::BackendOptions::builder()
        .update_quiet_period(std::time::Duration::from_millis(30))
        .update_drain_timeout(std::time::Duration::from_millis(1000))
        .pre_prompt_quiet_period(std::time::Duration::from_millis(1))
        .pre_prompt_drain_timeout(std::time::Duration::from_millis(50))
        .build()
}

/// Initialize test logging once per binary
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
