//! Permission-related type definitions
//!
//! The agent may ask "may I do X" mid-turn via a `session/request_permission`
//! call. The request may arrive without a transport-level request id, so
//! correlation is keyed off stable semantic fields instead; see
//! [`PermissionKey`](crate::permissions::PermissionKey).

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::identifiers::{SessionId, ToolCallId};

/// Descriptor of the tool call a permission request is about
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallDescriptor {
    /// Tool-call identifier
    pub tool_call_id: ToolCallId,
    /// Human-readable title
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Tool kind hint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Raw tool input
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_input: Option<serde_json::Value>,
}

/// Broad classes of selectable permission outcomes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionOptionKind {
    /// Allow this call only
    AllowOnce,
    /// Allow this and future matching calls
    AllowAlways,
    /// Reject this call only
    RejectOnce,
    /// Reject this and future matching calls
    RejectAlways,
}

/// One selectable outcome offered by a permission request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionOption {
    /// Identifier to echo back in the decision
    pub option_id: String,
    /// Display name
    pub name: String,
    /// Outcome class
    pub kind: PermissionOptionKind,
}

/// A permission request surfaced by the agent mid-turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionRequest {
    /// Session the request belongs to
    pub session_id: SessionId,
    /// The tool call asking for permission
    pub tool_call: ToolCallDescriptor,
    /// Selectable outcomes
    pub options: Vec<PermissionOption>,
}

/// The caller's decision for one permission request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PermissionDecision {
    /// An option was selected
    #[serde(rename_all = "camelCase")]
    Selected {
        /// The chosen option id
        option_id: String,
    },
    /// The request was cancelled without a selection
    Cancelled,
}

impl PermissionDecision {
    /// Convenience constructor for selecting an option
    pub fn selected(option_id: impl Into<String>) -> Self {
        Self::Selected {
            option_id: option_id.into(),
        }
    }
}

/// The reply value handed back to the transport for a permission request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionReply {
    /// The decision, wrapped in the protocol's `{ outcome: ... }` envelope
    pub outcome: PermissionDecision,
}

/// Subscriber callback invoked for each incoming permission request
///
/// The handler runs inline on the dispatcher; it may call
/// [`respond_to_permission`](crate::backend::AcpBackend::respond_to_permission)
/// synchronously before returning.
pub type PermissionHandler = Arc<dyn Fn(PermissionRequest) + Send + Sync>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decision_wire_shape_matches_protocol() {
        let reply = PermissionReply {
            outcome: PermissionDecision::selected("allow_once"),
        };
        let value = serde_json::to_value(&reply).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "outcome": { "outcome": "selected", "optionId": "allow_once" }
            })
        );

        let cancelled = PermissionReply {
            outcome: PermissionDecision::Cancelled,
        };
        let value = serde_json::to_value(&cancelled).unwrap();
        assert_eq!(value, serde_json::json!({ "outcome": { "outcome": "cancelled" } }));
    }

    #[test]
    fn request_deserializes_from_camel_case_wire_form() {
        let request: PermissionRequest = serde_json::from_value(serde_json::json!({
            "sessionId": "session-1",
            "toolCall": {
                "toolCallId": "tool-1",
                "title": "Run",
                "kind": "execute",
                "rawInput": { "command": "echo hello" }
            },
            "options": [
                { "optionId": "allow_once", "name": "Allow once", "kind": "allow_once" }
            ]
        }))
        .unwrap();

        assert_eq!(request.session_id.as_str(), "session-1");
        assert_eq!(request.tool_call.tool_call_id.as_str(), "tool-1");
        assert_eq!(request.options[0].kind, PermissionOptionKind::AllowOnce);
    }
}
