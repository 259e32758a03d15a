//! Backend façade for driving one agent over a transport
//!
//! The backend orchestrates one turn per session: it sends the top-level
//! `session/prompt` request, runs the consolidation engine concurrently
//! against inbound notifications for that session, and resolves only once
//! both the top-level reply and the drained trailing updates are accounted
//! for.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                       AcpBackend                         │
//! │                                                          │
//! │  ┌──────────────────┐       ┌────────────────────────┐   │
//! │  │  Dispatcher Task │       │  prompt() (per call)   │   │
//! │  │                  │       │                        │   │
//! │  │ • routes updates │──────▶│ • consolidation engine │   │
//! │  │   to turn chans  │ turn  │ • delivers ordered     │   │
//! │  │ • registers then │ chan  │   AgentMessages to the │   │
//! │  │   surfaces perm  │       │   caller's sink        │   │
//! │  │   requests       │       └────────────────────────┘   │
//! │  └────────┬─────────┘                                    │
//! │           │ incoming          ┌─────────────────────┐    │
//! │      ┌────┴───────┐           │  PermissionBroker   │    │
//! │      │  Transport │           │  (keyed registry)   │    │
//! │      └────────────┘           └─────────────────────┘    │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! **Key design points:**
//! - The dispatcher takes the incoming receiver once at construction and
//!   never holds a lock while reading.
//! - Per-turn state is exclusively owned by the engine running inside
//!   `prompt`; the routing map and permission registry are the only shared
//!   state, both behind short synchronous locks.
//! - Permission entries are registered before the subscriber is notified, so
//!   a synchronous decision from inside the handler always lands.
//!
//! # Example
//!
//! ```no_run
//! use acp_bridge::{AcpBackend, AgentMessage, BackendOptions, ContentBlock, SessionId};
//! # use acp_bridge::transport::Transport;
//! # async fn example<T: Transport>(transport: T) -> Result<(), Box<dyn std::error::Error>> {
//! let backend = AcpBackend::new(transport, BackendOptions::default());
//!
//! backend.on_permission_request({
//!     let backend = backend.clone();
//!     move |request| {
//!         // Answering synchronously from inside the handler is safe.
//!         let session_id = request.session_id.clone();
//!         let decision = acp_bridge::PermissionDecision::selected("allow_once");
//!         let _ = backend.respond_to_permission(&session_id, &request, decision);
//!     }
//! });
//!
//! let session = SessionId::new("session-1");
//! let reply = backend
//!     .prompt(&session, vec![ContentBlock::text("hello")], |message| {
//!         if let AgentMessage::Text { text } = &message {
//!             log::info!("agent: {text}");
//!         }
//!     })
//!     .await?;
//! log::info!("turn finished: {:?}", reply.stop_reason);
//! # Ok(())
//! # }
//! ```

mod backend_impl;
mod tasks;

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::config::DrainTiming;
use crate::consolidate::TurnEvent;
use crate::permissions::PermissionBroker;
use crate::transport::Transport;
use crate::types::identifiers::SessionId;

/// Routing table from session to its active turn's event channel
pub(crate) type TurnMap = Arc<Mutex<HashMap<SessionId, mpsc::UnboundedSender<TurnEvent>>>>;

/// Backend façade driving one agent process over a [`Transport`]
///
/// Cheap to clone; clones share the transport, the permission broker and the
/// turn routing table.
pub struct AcpBackend<T: Transport> {
    /// Transport to the agent process
    transport: Arc<T>,
    /// Active turn channel per session (at most one in-flight turn each)
    turns: TurnMap,
    /// In-flight permission request registry
    broker: Arc<PermissionBroker>,
    /// Timing configuration for turn consolidation
    timing: DrainTiming,
}

impl<T: Transport> Clone for AcpBackend<T> {
    fn clone(&self) -> Self {
        Self {
            transport: self.transport.clone(),
            turns: self.turns.clone(),
            broker: self.broker.clone(),
            timing: self.timing,
        }
    }
}
