//! `AcpBackend` constructor and public API methods

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Deserialize;
use tokio::sync::{mpsc, oneshot};

use crate::config::BackendOptions;
use crate::consolidate;
use crate::error::{BridgeError, Result};
use crate::permissions::{PermissionBroker, PermissionKey};
use crate::transport::{METHOD_SESSION_NEW, METHOD_SESSION_PROMPT, Transport};
use crate::types::content::ContentBlock;
use crate::types::identifiers::SessionId;
use crate::types::messages::AgentMessage;
use crate::types::permissions::{PermissionDecision, PermissionRequest};
use crate::types::updates::PromptReply;

use super::{AcpBackend, TurnMap};

/// Removes the turn's routing entry even if the prompt future is dropped
/// mid-flight, so the session never gets stuck with a phantom active turn.
struct TurnGuard {
    turns: TurnMap,
    session_id: SessionId,
}

impl Drop for TurnGuard {
    fn drop(&mut self) {
        self.turns.lock().remove(&self.session_id);
    }
}

impl<T: Transport> AcpBackend<T> {
    /// Create a new backend over `transport`
    ///
    /// Takes the transport's incoming channel and spawns the dispatcher task;
    /// the dispatcher exits when the transport closes its channel.
    pub fn new(mut transport: T, options: BackendOptions) -> Self {
        let incoming = transport.take_incoming();
        let turns: TurnMap = Arc::new(Mutex::new(HashMap::new()));
        let broker = Arc::new(PermissionBroker::new());

        tokio::spawn(Self::dispatcher_task(
            incoming,
            turns.clone(),
            broker.clone(),
        ));

        Self {
            transport: Arc::new(transport),
            turns,
            broker,
            timing: options.timing,
        }
    }

    /// Create a new agent session rooted at `cwd`
    ///
    /// # Errors
    /// Returns the transport error if the request fails, or a parse error if
    /// the reply has no session id.
    pub async fn new_session(&self, cwd: &Path) -> Result<SessionId> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct NewSessionReply {
            session_id: SessionId,
        }

        let params = serde_json::json!({
            "cwd": cwd,
            "mcpServers": [],
        });
        let value = self.transport.send_request(METHOD_SESSION_NEW, params).await?;
        let reply: NewSessionReply = serde_json::from_value(value.clone()).map_err(|e| {
            BridgeError::message_parse(format!("invalid session/new reply: {e}"), Some(value))
        })?;
        log::debug!("created session {}", reply.session_id);
        Ok(reply.session_id)
    }

    /// Run one turn: send `content` to the agent and deliver every resulting
    /// [`AgentMessage`] to `on_message`, strictly in order, ending with
    /// exactly one `turn_complete` (or the transport error after a
    /// best-effort drain).
    ///
    /// At most one turn may be in flight per session.
    ///
    /// # Errors
    /// `BridgeError::TurnActive` if the session already has a turn in flight;
    /// the underlying transport error if the top-level request fails.
    pub async fn prompt<F>(
        &self,
        session_id: &SessionId,
        content: Vec<ContentBlock>,
        mut on_message: F,
    ) -> Result<PromptReply>
    where
        F: FnMut(AgentMessage) + Send,
    {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        {
            let mut turns = self.turns.lock();
            if turns.contains_key(session_id) {
                return Err(BridgeError::turn_active(session_id.clone()));
            }
            turns.insert(session_id.clone(), event_tx);
        }
        let _guard = TurnGuard {
            turns: self.turns.clone(),
            session_id: session_id.clone(),
        };

        let (reply_tx, reply_rx) = oneshot::channel();
        let transport = self.transport.clone();
        let params = serde_json::json!({
            "sessionId": session_id,
            "prompt": content,
        });
        tokio::spawn(async move {
            let result = match transport.send_request(METHOD_SESSION_PROMPT, params).await {
                Ok(value) => serde_json::from_value::<PromptReply>(value.clone()).map_err(|e| {
                    BridgeError::message_parse(
                        format!("invalid session/prompt reply: {e}"),
                        Some(value),
                    )
                }),
                Err(err) => Err(err),
            };
            // The engine may have finished already (drain deadline); nothing
            // to do if nobody is listening.
            let _ = reply_tx.send(result);
        });

        let result = consolidate::run_turn(
            session_id,
            event_rx,
            reply_rx,
            &self.timing,
            &mut on_message,
        )
        .await;

        // The turn is over; nothing will answer permission requests that are
        // still open for this session.
        let cancelled = self.broker.cancel_session(session_id);
        if cancelled > 0 {
            log::debug!(
                "cancelled {cancelled} pending permission request(s) for session {session_id}"
            );
        }

        result
    }

    /// Register the single subscriber invoked for each incoming permission
    /// request
    ///
    /// The handler runs inline on the dispatcher task and may call
    /// [`respond_to_permission`](Self::respond_to_permission) synchronously.
    pub fn on_permission_request<F>(&self, handler: F)
    where
        F: Fn(PermissionRequest) + Send + Sync + 'static,
    {
        self.broker.set_subscriber(Arc::new(handler));
    }

    /// Submit a decision for a previously surfaced permission request
    ///
    /// A decision for an unknown or already-resolved request is logged and
    /// ignored, never raised to the caller.
    ///
    /// # Errors
    /// Currently always returns `Ok`; kept as `Result` so transport-level
    /// failures can surface here without an API break.
    pub fn respond_to_permission(
        &self,
        session_id: &SessionId,
        request: &PermissionRequest,
        decision: PermissionDecision,
    ) -> Result<()> {
        let key =
            PermissionKey::from_parts(session_id.clone(), request.tool_call.tool_call_id.clone());
        match self.broker.resolve(&key, decision) {
            Ok(()) => Ok(()),
            Err(err @ BridgeError::Correlation(_)) => {
                log::warn!("ignoring permission decision: {err}");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    /// Close the backend: cancel pending permission requests and close the
    /// transport
    ///
    /// Every still-open permission request replies to the agent with a
    /// cancelled outcome rather than being abandoned.
    ///
    /// # Errors
    /// Returns error if transport cleanup fails
    pub async fn close(&self) -> Result<()> {
        let cancelled = self.broker.cancel_all();
        if cancelled > 0 {
            log::debug!("cancelled {cancelled} pending permission request(s) at shutdown");
        }
        self.transport.close().await
    }
}
