//! Background tasks for `AcpBackend`
//!
//! The dispatcher is the single reader of the transport's incoming channel.
//! It routes session updates to the active turn for their session and walks
//! permission requests through register -> notify-subscriber -> reply,
//! preserving the registration-before-notification invariant.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use crate::consolidate::TurnEvent;
use crate::permissions::{PermissionBroker, PermissionKey};
use crate::transport::{Incoming, Transport};
use crate::types::permissions::{PermissionDecision, PermissionReply};

use super::{AcpBackend, TurnMap};

impl<T: Transport> AcpBackend<T> {
    /// Dispatcher task: routes inbound items from the transport
    pub(super) async fn dispatcher_task(
        mut incoming: mpsc::UnboundedReceiver<Incoming>,
        turns: TurnMap,
        broker: Arc<PermissionBroker>,
    ) {
        while let Some(item) = incoming.recv().await {
            match item {
                Incoming::Update(notification) => {
                    let turns = turns.lock();
                    match turns.get(&notification.session_id) {
                        Some(tx) => {
                            // The turn may be tearing down concurrently; a
                            // send failure is equivalent to no active turn.
                            let _ = tx.send(TurnEvent::Update(notification.update));
                        }
                        None => {
                            log::debug!(
                                "dropping update for session {} with no active turn",
                                notification.session_id
                            );
                        }
                    }
                }
                Incoming::Permission { request, reply } => {
                    // Register first: a fully synchronous subscriber response
                    // must find a live entry to resolve.
                    let key = PermissionKey::derive(&request);
                    let decision_rx = broker.register(key.clone());

                    match broker.subscriber() {
                        Some(handler) => handler(request.clone()),
                        None => log::warn!(
                            "permission request {key} has no subscriber; it will wait until cancelled"
                        ),
                    }

                    // Surface through the turn's ordered stream as well, if
                    // one is active for this session.
                    if let Some(tx) = turns.lock().get(&request.session_id) {
                        let _ = tx.send(TurnEvent::Permission(request));
                    }

                    tokio::spawn(permission_reply_task(key, decision_rx, reply));
                }
            }
        }
        log::debug!("transport incoming channel closed; dispatcher exiting");
    }
}

/// Waits on one pending permission entry and relays the outcome to the
/// transport's reply channel, exactly once.
///
/// A dropped entry (session end, shutdown, re-registration) synthesizes a
/// cancelled outcome so the agent is never left waiting indefinitely.
async fn permission_reply_task(
    key: PermissionKey,
    decision_rx: oneshot::Receiver<PermissionDecision>,
    reply: oneshot::Sender<PermissionReply>,
) {
    let outcome = match decision_rx.await {
        Ok(decision) => decision,
        Err(_) => {
            log::debug!("permission {key} cancelled without a decision");
            PermissionDecision::Cancelled
        }
    };
    if reply.send(PermissionReply { outcome }).is_err() {
        log::debug!("transport dropped the reply channel for permission {key}");
    }
}
