//! Content block types shared by prompts and message chunks

use serde::{Deserialize, Serialize};

/// A single content block as carried by prompts and `agent_message_chunk`
/// updates.
///
/// Only text blocks participate in turn consolidation; other block kinds are
/// left to the transport adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Plain text content
    Text {
        /// Text content
        text: String,
    },
}

impl ContentBlock {
    /// Convenience constructor for a text block
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }
}
