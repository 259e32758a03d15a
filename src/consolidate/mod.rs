//! Update consolidation engine
//!
//! Converts a live stream of session updates plus a future top-level reply
//! into one ordered burst of [`AgentMessage`]s per turn. Tool-call lifecycle
//! events are forwarded the moment they arrive so progress UIs stay live;
//! the final narrative text is held back until the engine is confident no
//! further tool activity is forthcoming, so the user-visible order never
//! contradicts the agent's own causal story.
//!
//! States: `Collecting` (before the top-level reply) -> `Draining` (reply
//! arrived, waiting for trailing updates to go quiet) -> `Flushed` (terminal).
//! The quiet timer re-arms on every qualifying update; the drain deadline is
//! set once on entering `Draining` and never extended, so a turn can never
//! hang if the agent keeps emitting.
//!
//! All turn state is owned by the single task running [`run_turn`]; the sink
//! is therefore never invoked concurrently with itself for the same session.

use std::cmp;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, sleep, sleep_until};
use uuid::Uuid;

use crate::config::DrainTiming;
use crate::error::{BridgeError, Result};
use crate::types::content::ContentBlock;
use crate::types::identifiers::SessionId;
use crate::types::messages::{AgentMessage, ToolCallRecord};
use crate::types::permissions::PermissionRequest;
use crate::types::updates::{PromptReply, SessionUpdate, ToolCallStatus};

/// One event routed to an active turn by the dispatcher
#[derive(Debug)]
pub(crate) enum TurnEvent {
    /// A session update for this turn
    Update(SessionUpdate),
    /// A permission request surfaced while this turn is active
    Permission(PermissionRequest),
}

/// Per-turn state, exclusively owned by the engine for the turn's duration
struct TurnState {
    turn_id: Uuid,
    records: HashMap<crate::types::identifiers::ToolCallId, ToolCallRecord>,
    pending_text: Option<String>,
    flushed: bool,
}

impl TurnState {
    fn new(turn_id: Uuid) -> Self {
        Self {
            turn_id,
            records: HashMap::new(),
            pending_text: None,
            flushed: false,
        }
    }

    /// Ingest one update, forwarding tool events immediately and buffering
    /// text. Returns whether the update counted as turn activity (and should
    /// re-arm the quiet timer).
    fn apply<F>(&mut self, update: SessionUpdate, sink: &mut F) -> bool
    where
        F: FnMut(AgentMessage) + Send,
    {
        match update {
            SessionUpdate::AgentMessageChunk {
                content: ContentBlock::Text { text },
            } => {
                // The protocol delivers cumulative final text, not deltas:
                // latest write wins into the single pending buffer.
                self.pending_text = Some(text);
                true
            }
            SessionUpdate::ToolCall {
                tool_call_id,
                title,
                kind: _,
                raw_input,
                status,
            } => {
                if let Some(record) = self.records.get(&tool_call_id) {
                    if record.status.is_terminal() {
                        log::debug!(
                            "turn {}: ignoring tool_call for finished call {tool_call_id}",
                            self.turn_id
                        );
                        return false;
                    }
                }
                let record = ToolCallRecord {
                    id: tool_call_id.clone(),
                    title: title.clone(),
                    raw_input: raw_input.clone(),
                    status,
                    raw_output: None,
                };
                self.records.insert(tool_call_id.clone(), record);
                sink(AgentMessage::ToolCall {
                    id: tool_call_id,
                    title,
                    raw_input,
                    status,
                });
                true
            }
            SessionUpdate::ToolCallUpdate {
                tool_call_id,
                status,
                raw_output,
            } => {
                let turn_id = self.turn_id;
                let record = match self.records.entry(tool_call_id.clone()) {
                    Entry::Occupied(entry) => entry.into_mut(),
                    Entry::Vacant(entry) => {
                        // An update for a call we never saw announced.
                        // Synthesize the announcement so every tool_result
                        // still has a preceding tool_call.
                        log::debug!(
                            "turn {turn_id}: synthesizing tool_call for unannounced call {tool_call_id}"
                        );
                        sink(AgentMessage::ToolCall {
                            id: tool_call_id.clone(),
                            title: tool_call_id.as_str().to_string(),
                            raw_input: None,
                            status: ToolCallStatus::InProgress,
                        });
                        entry.insert(ToolCallRecord {
                            id: tool_call_id.clone(),
                            title: tool_call_id.as_str().to_string(),
                            raw_input: None,
                            status: ToolCallStatus::InProgress,
                            raw_output: None,
                        })
                    }
                };
                if record.status.is_terminal() {
                    log::debug!(
                        "turn {}: ignoring update for finished call {tool_call_id}",
                        self.turn_id
                    );
                    return false;
                }
                if let Some(status) = status {
                    record.status = status;
                }
                if let Some(raw_output) = raw_output {
                    record.raw_output = Some(raw_output);
                }
                sink(AgentMessage::ToolResult {
                    id: tool_call_id,
                    status: record.status,
                    raw_output: record.raw_output.clone(),
                });
                true
            }
            SessionUpdate::Other(value) => {
                log::debug!(
                    "turn {}: ignoring unconsolidated update variant {:?}",
                    self.turn_id,
                    value.get("sessionUpdate")
                );
                false
            }
        }
    }

    /// Emit the buffered text (if any) and exactly one `turn_complete`, then
    /// mark the turn flushed. A turn flushes at most once.
    fn flush<F>(&mut self, reply: PromptReply, sink: &mut F)
    where
        F: FnMut(AgentMessage) + Send,
    {
        if self.flushed {
            log::debug!("turn {}: flush requested twice", self.turn_id);
            return;
        }
        self.flushed = true;
        if let Some(text) = self.pending_text.take() {
            if !text.is_empty() {
                sink(AgentMessage::Text { text });
            }
        }
        sink(AgentMessage::TurnComplete {
            stop_reason: reply.stop_reason,
        });
    }
}

/// Run one turn to completion.
///
/// Consumes turn events from `events` and the top-level reply from
/// `reply_rx`, delivering every produced [`AgentMessage`] to `sink` strictly
/// in order. Resolves with the top-level reply once the trailing updates are
/// accounted for, or with the transport error after a best-effort drain.
pub(crate) async fn run_turn<F>(
    session_id: &SessionId,
    mut events: mpsc::UnboundedReceiver<TurnEvent>,
    mut reply_rx: oneshot::Receiver<Result<PromptReply>>,
    timing: &DrainTiming,
    sink: &mut F,
) -> Result<PromptReply>
where
    F: FnMut(AgentMessage) + Send,
{
    let turn_id = Uuid::new_v4();
    log::debug!("turn {turn_id}: started for session {session_id}");

    let mut state = TurnState::new(turn_id);
    let mut events_open = true;

    // Collecting: forward tool events as they arrive, buffer text, wait for
    // the top-level reply. The pre-reply timer pair bounds bookkeeping only;
    // nothing here ends the turn except the reply (or its loss).
    let pre_quiet = sleep(timing.pre_prompt_quiet_period);
    tokio::pin!(pre_quiet);
    let pre_drain = sleep_until(Instant::now() + timing.pre_prompt_drain_timeout);
    tokio::pin!(pre_drain);
    let mut pre_quiet_armed = true;
    let mut pre_drain_armed = true;

    let reply = loop {
        tokio::select! {
            reply = &mut reply_rx => break reply,
            maybe = events.recv(), if events_open => match maybe {
                Some(TurnEvent::Update(update)) => {
                    if state.apply(update, sink) {
                        pre_quiet
                            .as_mut()
                            .reset(Instant::now() + timing.pre_prompt_quiet_period);
                        pre_quiet_armed = true;
                    }
                }
                Some(TurnEvent::Permission(request)) => {
                    sink(AgentMessage::PermissionRequest { request });
                }
                None => events_open = false,
            },
            () = &mut pre_quiet, if pre_quiet_armed => {
                pre_quiet_armed = false;
                log::trace!("turn {turn_id}: updates settled before the prompt reply");
            }
            () = &mut pre_drain, if pre_drain_armed => {
                pre_drain_armed = false;
                log::warn!(
                    "turn {turn_id}: prompt reply still outstanding after {:?}",
                    timing.pre_prompt_drain_timeout
                );
            }
        }
    };

    match reply {
        Ok(Ok(reply)) => {
            log::debug!(
                "turn {turn_id}: reply resolved ({:?}), draining trailing updates",
                reply.stop_reason
            );
            drain_trailing(
                &mut state,
                &mut events,
                &mut events_open,
                timing.update_quiet_period,
                timing.update_drain_timeout,
                sink,
            )
            .await;
            state.flush(reply, sink);
            log::debug!("turn {turn_id}: flushed");
            Ok(reply)
        }
        Ok(Err(err)) => {
            // The request itself failed. Drain already-buffered tool activity
            // with the pre-reply pair so partial progress is not lost, then
            // surface the error as the turn's terminal outcome.
            log::warn!("turn {turn_id}: prompt request failed: {err}");
            drain_trailing(
                &mut state,
                &mut events,
                &mut events_open,
                timing.pre_prompt_quiet_period,
                timing.pre_prompt_drain_timeout,
                sink,
            )
            .await;
            if state.pending_text.is_some() {
                log::warn!("turn {turn_id}: dropping buffered text after request failure");
            }
            Err(err)
        }
        Err(_) => {
            log::warn!("turn {turn_id}: prompt request ended without a reply");
            drain_trailing(
                &mut state,
                &mut events,
                &mut events_open,
                timing.pre_prompt_quiet_period,
                timing.pre_prompt_drain_timeout,
                sink,
            )
            .await;
            Err(BridgeError::transport(
                "prompt request ended without a reply",
            ))
        }
    }
}

/// Draining: wait for the quiet period to elapse with no new updates, capped
/// by an absolute deadline that is set once and never extended.
async fn drain_trailing<F>(
    state: &mut TurnState,
    events: &mut mpsc::UnboundedReceiver<TurnEvent>,
    events_open: &mut bool,
    quiet_period: Duration,
    drain_timeout: Duration,
    sink: &mut F,
) where
    F: FnMut(AgentMessage) + Send,
{
    if !*events_open {
        return;
    }

    let deadline = Instant::now() + drain_timeout;
    let quiet = sleep_until(cmp::min(Instant::now() + quiet_period, deadline));
    tokio::pin!(quiet);

    loop {
        tokio::select! {
            () = &mut quiet => {
                if Instant::now() >= deadline {
                    log::debug!(
                        "turn {}: drain timeout reached with updates still arriving",
                        state.turn_id
                    );
                }
                break;
            }
            maybe = events.recv() => match maybe {
                Some(TurnEvent::Update(update)) => {
                    if state.apply(update, sink) {
                        quiet
                            .as_mut()
                            .reset(cmp::min(Instant::now() + quiet_period, deadline));
                    }
                }
                Some(TurnEvent::Permission(request)) => {
                    // A question, not progress: surfaced in order but it does
                    // not re-arm the quiet timer.
                    sink(AgentMessage::PermissionRequest { request });
                }
                None => {
                    *events_open = false;
                    break;
                }
            },
        }
    }
}
