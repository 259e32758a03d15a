//! Parser for `session/update` notification payloads
//!
//! The update object is tagged by its `sessionUpdate` field. Known variants
//! are parsed into typed [`SessionUpdate`]s; unknown variants (plans, mode
//! changes, command lists, ...) are preserved untouched as
//! [`SessionUpdate::Other`] so nothing is lost in transit.

use serde::Deserialize;

use crate::error::{BridgeError, Result};
use crate::types::content::ContentBlock;
use crate::types::identifiers::{SessionId, ToolCallId};
use crate::types::updates::{SessionNotification, SessionUpdate, ToolCallStatus};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChunkFields {
    content: ContentBlock,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ToolCallFields {
    tool_call_id: ToolCallId,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    kind: Option<String>,
    #[serde(default)]
    raw_input: Option<serde_json::Value>,
    #[serde(default = "default_status")]
    status: ToolCallStatus,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ToolCallUpdateFields {
    tool_call_id: ToolCallId,
    #[serde(default)]
    status: Option<ToolCallStatus>,
    #[serde(default)]
    raw_output: Option<serde_json::Value>,
}

const fn default_status() -> ToolCallStatus {
    ToolCallStatus::InProgress
}

/// Parse a raw update object into a typed [`SessionUpdate`]
///
/// # Errors
/// Returns `BridgeError::MessageParse` if a known variant is structurally
/// malformed. Unknown variants never error; they pass through as `Other`.
pub fn parse_update(value: serde_json::Value) -> Result<SessionUpdate> {
    let tag = value
        .get("sessionUpdate")
        .and_then(serde_json::Value::as_str)
        .map(str::to_owned);

    match tag.as_deref() {
        Some("agent_message_chunk") => {
            // Non-text chunk content is not consolidated; pass it through.
            let is_text = value
                .get("content")
                .and_then(|c| c.get("type"))
                .and_then(serde_json::Value::as_str)
                == Some("text");
            if !is_text {
                return Ok(SessionUpdate::Other(value));
            }
            let fields: ChunkFields = from_tagged_value(value)?;
            Ok(SessionUpdate::AgentMessageChunk {
                content: fields.content,
            })
        }
        Some("tool_call") => {
            let fields: ToolCallFields = from_tagged_value(value)?;
            let title = fields
                .title
                .unwrap_or_else(|| fields.tool_call_id.as_str().to_string());
            Ok(SessionUpdate::ToolCall {
                tool_call_id: fields.tool_call_id,
                title,
                kind: fields.kind,
                raw_input: fields.raw_input,
                status: fields.status,
            })
        }
        Some("tool_call_update") => {
            let fields: ToolCallUpdateFields = from_tagged_value(value)?;
            Ok(SessionUpdate::ToolCallUpdate {
                tool_call_id: fields.tool_call_id,
                status: fields.status,
                raw_output: fields.raw_output,
            })
        }
        _ => Ok(SessionUpdate::Other(value)),
    }
}

fn from_tagged_value<T: serde::de::DeserializeOwned>(value: serde_json::Value) -> Result<T> {
    serde_json::from_value(value.clone()).map_err(|e| {
        BridgeError::message_parse(format!("Failed to parse session update: {e}"), Some(value))
    })
}

/// Parse a full `session/update` notification params object
///
/// # Errors
/// Returns `BridgeError::MessageParse` if the envelope lacks a session id or
/// an update object, or if a known update variant is malformed.
pub fn parse_notification(value: serde_json::Value) -> Result<SessionNotification> {
    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Envelope {
        session_id: SessionId,
        update: serde_json::Value,
    }

    let envelope: Envelope = serde_json::from_value(value.clone()).map_err(|e| {
        BridgeError::message_parse(format!("Failed to parse session notification: {e}"), Some(value))
    })?;

    Ok(SessionNotification {
        session_id: envelope.session_id,
        update: parse_update(envelope.update)?,
    })
}
