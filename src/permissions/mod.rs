//! Permission correlation
//!
//! The agent can ask "may I do X" mid-turn and must get exactly one answer
//! back, regardless of whether the caller answers before, during, or long
//! after the question is surfaced. The broker keys in-flight requests by a
//! [`PermissionKey`] derived from stable semantic fields of the request, not
//! by the transport's request id, which may be absent.
//!
//! The core invariant is registration-before-notification: the pending entry
//! is stored **before** the subscriber callback runs, so a fully synchronous
//! response invoked inline from the handler always finds a live entry.

use std::collections::HashMap;

use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::error::{BridgeError, Result};
use crate::types::identifiers::{SessionId, ToolCallId};
use crate::types::permissions::{PermissionDecision, PermissionHandler, PermissionRequest};

/// Correlation key for one in-flight permission request
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PermissionKey {
    session_id: SessionId,
    tool_call_id: ToolCallId,
}

impl PermissionKey {
    /// Derive the key from a request's semantic fields
    #[must_use]
    pub fn derive(request: &PermissionRequest) -> Self {
        Self::from_parts(
            request.session_id.clone(),
            request.tool_call.tool_call_id.clone(),
        )
    }

    /// Build a key directly from its parts
    #[must_use]
    pub fn from_parts(session_id: SessionId, tool_call_id: ToolCallId) -> Self {
        Self {
            session_id,
            tool_call_id,
        }
    }

    /// The session this key belongs to
    #[must_use]
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }
}

impl std::fmt::Display for PermissionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.session_id, self.tool_call_id)
    }
}

/// Registry of in-flight permission requests plus the single subscriber slot
pub struct PermissionBroker {
    pending: Mutex<HashMap<PermissionKey, oneshot::Sender<PermissionDecision>>>,
    subscriber: Mutex<Option<PermissionHandler>>,
}

impl PermissionBroker {
    /// Create an empty broker
    #[must_use]
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
            subscriber: Mutex::new(None),
        }
    }

    /// Register the single subscriber invoked for each incoming request
    ///
    /// Replaces any previously registered handler.
    pub fn set_subscriber(&self, handler: PermissionHandler) {
        *self.subscriber.lock() = Some(handler);
    }

    /// Get a clone of the registered subscriber, if any
    #[must_use]
    pub fn subscriber(&self) -> Option<PermissionHandler> {
        self.subscriber.lock().clone()
    }

    /// Store a pending entry for `key` and return the decision channel
    ///
    /// Must be called before the subscriber is notified. A duplicate key
    /// replaces the previous entry; the old waiter observes a cancellation.
    pub fn register(&self, key: PermissionKey) -> oneshot::Receiver<PermissionDecision> {
        let (tx, rx) = oneshot::channel();
        if self.pending.lock().insert(key.clone(), tx).is_some() {
            log::debug!("permission {key} re-registered; previous entry cancelled");
        }
        rx
    }

    /// Resolve the entry for `key` with `decision` and remove it
    ///
    /// # Errors
    /// Returns `BridgeError::Correlation` if the key is unknown, already
    /// resolved, or the request path is no longer waiting. Callers treat this
    /// as a local error, never fatal.
    pub fn resolve(&self, key: &PermissionKey, decision: PermissionDecision) -> Result<()> {
        let entry = self.pending.lock().remove(key);
        match entry {
            Some(tx) => tx.send(decision).map_err(|_| {
                BridgeError::correlation(format!("permission {key} is no longer waiting"))
            }),
            None => Err(BridgeError::correlation(format!(
                "no pending permission request for {key}"
            ))),
        }
    }

    /// Cancel every pending entry for `session_id`, returning the count
    ///
    /// Dropping the senders makes each waiting request path observe a
    /// cancellation and synthesize a cancelled outcome for the agent.
    pub fn cancel_session(&self, session_id: &SessionId) -> usize {
        let mut pending = self.pending.lock();
        let before = pending.len();
        pending.retain(|key, _| key.session_id() != session_id);
        before - pending.len()
    }

    /// Cancel every pending entry, returning the count
    pub fn cancel_all(&self) -> usize {
        let mut pending = self.pending.lock();
        let count = pending.len();
        pending.clear();
        count
    }

    /// Number of entries currently pending
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.lock().len()
    }
}

impl Default for PermissionBroker {
    fn default() -> Self {
        Self::new()
    }
}
