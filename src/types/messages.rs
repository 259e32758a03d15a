//! Outbound message types
//!
//! [`AgentMessage`] is the only externally observable output of a turn. For a
//! given turn every `tool_call` precedes the `tool_result`s for the same id,
//! which precede the single final `text` (if any), which precedes exactly one
//! `turn_complete`.

use serde::{Deserialize, Serialize};

use super::identifiers::ToolCallId;
use super::permissions::PermissionRequest;
use super::updates::{StopReason, ToolCallStatus};

/// A consolidated message delivered to the caller's sink, in order
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentMessage {
    /// A tool call was announced
    #[serde(rename_all = "camelCase")]
    ToolCall {
        /// Tool-call identifier
        id: ToolCallId,
        /// Human-readable title
        title: String,
        /// Raw tool input
        #[serde(skip_serializing_if = "Option::is_none")]
        raw_input: Option<serde_json::Value>,
        /// Status at announcement time
        status: ToolCallStatus,
    },
    /// A tool call changed state or produced output
    #[serde(rename_all = "camelCase")]
    ToolResult {
        /// Tool-call identifier
        id: ToolCallId,
        /// Status after the update
        status: ToolCallStatus,
        /// Raw tool output, if any
        #[serde(skip_serializing_if = "Option::is_none")]
        raw_output: Option<serde_json::Value>,
    },
    /// The turn's final narrative text, at most one per turn
    Text {
        /// Text content
        text: String,
    },
    /// Terminal marker, exactly one per successfully completed turn
    #[serde(rename_all = "camelCase")]
    TurnComplete {
        /// Why the agent stopped
        stop_reason: StopReason,
    },
    /// An unsolicited permission request surfaced mid-turn
    PermissionRequest {
        /// The request details
        request: PermissionRequest,
    },
}

/// Per-turn bookkeeping for one tool call
///
/// Created on the first `tool_call` for an id, mutated in place by matching
/// `tool_call_update`s, never removed during the turn. Once the status is
/// terminal the record is immutable and further updates are discarded.
#[derive(Debug, Clone)]
pub struct ToolCallRecord {
    /// Tool-call identifier, unique within the turn
    pub id: ToolCallId,
    /// Human-readable title
    pub title: String,
    /// Raw tool input as announced
    pub raw_input: Option<serde_json::Value>,
    /// Current status
    pub status: ToolCallStatus,
    /// Raw tool output from the latest update
    pub raw_output: Option<serde_json::Value>,
}
