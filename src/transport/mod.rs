//! Transport seam for communicating with the agent process
//!
//! The wire protocol, process supervision and JSON-RPC framing live outside
//! this crate. A transport adapter implements [`Transport`] and feeds inbound
//! traffic through the [`Incoming`] channel; the bridge only ever sees typed
//! notifications and permission requests with a ready-made reply channel.
//!
//! Transport-level request ids stay inside the adapter. They are deliberately
//! not used for permission correlation, since a permission request may arrive
//! without one; see [`PermissionKey`](crate::permissions::PermissionKey).

use tokio::sync::{mpsc, oneshot};

use crate::error::Result;
use crate::types::permissions::{PermissionReply, PermissionRequest};
use crate::types::updates::SessionNotification;

/// Method name for starting a turn
pub const METHOD_SESSION_PROMPT: &str = "session/prompt";

/// Method name for creating a session
pub const METHOD_SESSION_NEW: &str = "session/new";

/// One inbound item pushed by the agent
#[derive(Debug)]
pub enum Incoming {
    /// An asynchronous session update
    Update(SessionNotification),
    /// A permission request expecting a synchronous-style reply value
    ///
    /// The adapter owns the transport envelope, including requests delivered
    /// without a transport-level request id; the bridge answers through the
    /// supplied channel exactly once.
    Permission {
        /// The request details
        request: PermissionRequest,
        /// Reply channel back to the agent
        reply: oneshot::Sender<PermissionReply>,
    },
}

/// Duplex channel to the agent process
///
/// Implementations must be cancel-safe on `send_request`: dropping the future
/// must not corrupt the connection.
pub trait Transport: Send + Sync + 'static {
    /// Send a top-level request and await its result
    ///
    /// # Errors
    /// Fails with a transport error on disconnect or protocol violation.
    fn send_request(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> impl std::future::Future<Output = Result<serde_json::Value>> + Send;

    /// Take the inbound channel
    ///
    /// Called exactly once by the backend at construction; the receiver is
    /// consumed by the dispatcher task. The channel closing signals that the
    /// transport has ended.
    fn take_incoming(&mut self) -> mpsc::UnboundedReceiver<Incoming>;

    /// Close the transport and clean up resources
    ///
    /// # Errors
    /// Returns error if cleanup fails
    fn close(&self) -> impl std::future::Future<Output = Result<()>> + Send;
}
