//! # ACP turn-consolidation bridge
//!
//! This crate drives a long-running external coding agent through an
//! asynchronous, bidirectional protocol. The supervisor issues a single "run
//! a turn" request; the agent replies once with a top-level result but,
//! concurrently, streams an unbounded sequence of fine-grained notifications:
//! text fragments, tool-call lifecycle events, and unsolicited permission
//! requests whose arrival is not synchronized with the top-level reply.
//!
//! The bridge turns that racy, unordered stream plus one top-level reply into
//! a single, deterministically ordered, finite sequence of
//! [`AgentMessage`]s per turn, detects the true end of the turn with a
//! quiet-period timer capped by an absolute drain deadline, and correlates
//! out-of-band permission requests with responses that may be produced before
//! the request is even considered outstanding.
//!
//! ## Quick start
//!
//! ```no_run
//! use acp_bridge::{AcpBackend, AgentMessage, BackendOptions, ContentBlock};
//! # use acp_bridge::transport::Transport;
//!
//! # async fn example<T: Transport>(transport: T) -> Result<(), Box<dyn std::error::Error>> {
//! let backend = AcpBackend::new(transport, BackendOptions::default());
//!
//! let session = backend.new_session(std::path::Path::new(".")).await?;
//! let _reply = backend
//!     .prompt(&session, vec![ContentBlock::text("fix the failing test")], |message| {
//!         match message {
//!             AgentMessage::ToolCall { title, .. } => log::info!("running: {title}"),
//!             AgentMessage::Text { text } => log::info!("agent: {text}"),
//!             AgentMessage::TurnComplete { stop_reason } => {
//!                 log::info!("done: {stop_reason:?}");
//!             }
//!             _ => {}
//!         }
//!     })
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Guarantees
//!
//! For every turn, messages reach the sink strictly in order: all
//! `tool_call`/`tool_result` events in arrival order, then at most one final
//! `text`, then exactly one `turn_complete`. Tool events are forwarded the
//! moment they arrive; the final text is deferred until trailing activity
//! goes quiet, so a "final answer" always reads as following the tool work
//! that produced it. A drain deadline bounds the wait, so a turn never hangs
//! even if the agent stops emitting.
//!
//! Permission requests are registered before they are surfaced, so a decision
//! submitted synchronously from inside the
//! [`on_permission_request`](AcpBackend::on_permission_request) handler is
//! never lost. Every request gets exactly one reply; entries still open when
//! the turn or the backend ends reply with a cancelled outcome.
//!
//! ## Architecture
//!
//! - [`types`]: identifiers, content blocks, updates, messages, permissions
//! - [`message`]: parsing of inbound `session/update` payloads
//! - [`transport`]: the [`Transport`](transport::Transport) seam; the wire
//!   protocol and process supervision live outside this crate
//! - [`backend`]: the [`AcpBackend`] façade and its dispatcher task
//! - [`permissions`]: the keyed permission registry
//! - [`config`]: per-instance quiet-period/drain-timeout settings
//! - [`error`]: error types and handling

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod config;
pub mod error;
pub mod message;
pub mod permissions;
pub mod transport;
pub mod types;

mod consolidate;

// Re-export commonly used types for a flat public API
pub use backend::AcpBackend;
pub use config::{BackendOptions, BackendOptionsBuilder, DrainTiming};
pub use error::{BridgeError, Result};
pub use message::{parse_notification, parse_update};
pub use permissions::{PermissionBroker, PermissionKey};
pub use transport::{Incoming, Transport};

pub use types::content::ContentBlock;
pub use types::identifiers::{SessionId, ToolCallId};
pub use types::messages::{AgentMessage, ToolCallRecord};
pub use types::permissions::{
    PermissionDecision, PermissionHandler, PermissionOption, PermissionOptionKind,
    PermissionReply, PermissionRequest, ToolCallDescriptor,
};
pub use types::updates::{
    PromptReply, SessionNotification, SessionUpdate, StopReason, ToolCallStatus,
};

/// Version of the bridge
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
