//! Inbound session-update types
//!
//! A `session/update` notification carries one [`SessionUpdate`] for one
//! session. Updates arrive unordered relative to the top-level `session/prompt`
//! reply; the consolidation engine imposes the delivery order.

use serde::Deserialize;

use super::content::ContentBlock;
use super::identifiers::{SessionId, ToolCallId};

/// One `session/update` notification from the agent
#[derive(Debug, Clone)]
pub struct SessionNotification {
    /// Session the update belongs to
    pub session_id: SessionId,
    /// The update payload
    pub update: SessionUpdate,
}

/// Lifecycle status of a tool call
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCallStatus {
    /// The tool call is running
    InProgress,
    /// The tool call finished successfully
    Completed,
    /// The tool call finished with an error
    Failed,
}

impl ToolCallStatus {
    /// Whether this status is terminal; a record transitions to a terminal
    /// status at most once and is then immutable.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// A tagged session-update variant
///
/// Variants the bridge does not consolidate are preserved untouched in
/// [`SessionUpdate::Other`].
#[derive(Debug, Clone)]
pub enum SessionUpdate {
    /// Cumulative final text for the turn; the latest chunk wins
    AgentMessageChunk {
        /// Chunk content
        content: ContentBlock,
    },
    /// A tool call was announced
    ToolCall {
        /// Tool-call identifier, unique within the turn
        tool_call_id: ToolCallId,
        /// Human-readable title
        title: String,
        /// Tool kind hint (read, edit, execute, ...)
        kind: Option<String>,
        /// Raw tool input
        raw_input: Option<serde_json::Value>,
        /// Initial status
        status: ToolCallStatus,
    },
    /// An already-announced tool call changed state
    ToolCallUpdate {
        /// Tool-call identifier being updated
        tool_call_id: ToolCallId,
        /// New status, if it changed
        status: Option<ToolCallStatus>,
        /// Raw tool output, if any was produced
        raw_output: Option<serde_json::Value>,
    },
    /// Any other update variant, passed through unmodified
    Other(serde_json::Value),
}

/// Stop reason reported by the top-level `session/prompt` reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The agent finished its turn normally
    EndTurn,
    /// The model hit its token budget
    MaxTokens,
    /// The turn-request budget was exhausted
    MaxTurnRequests,
    /// The agent refused the request
    Refusal,
    /// The turn was cancelled
    Cancelled,
    /// Any stop reason this crate does not know about
    #[serde(other)]
    Other,
}

/// The top-level reply to `session/prompt`
///
/// Draining starts when this reply resolves, regardless of the stop reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptReply {
    /// Why the agent stopped
    pub stop_reason: StopReason,
}
