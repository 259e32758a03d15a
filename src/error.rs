//! Error types for the ACP bridge

use thiserror::Error;

use crate::types::identifiers::SessionId;

/// Main error type for the ACP bridge
#[derive(Error, Debug)]
pub enum BridgeError {
    /// Transport layer error (request failed or connection lost)
    #[error("Transport error: {0}")]
    Transport(String),

    /// A permission decision referenced an unknown or already-resolved key
    #[error("Correlation error: {0}")]
    Correlation(String),

    /// A prompt was issued for a session that already has a turn in flight
    #[error("Session {0:?} already has an active turn")]
    TurnActive(SessionId),

    /// Message parse error with optional raw data
    #[error("Message parse error: {message}")]
    MessageParse {
        /// Error message
        message: String,
        /// Raw payload that failed to parse
        data: Option<serde_json::Value>,
    },

    /// JSON decode error
    #[error("JSON decode error: {0}")]
    JsonDecode(#[from] serde_json::Error),

    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The bridge has been closed
    #[error("Bridge is closed")]
    Closed,
}

/// Result type alias for bridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;

impl BridgeError {
    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a correlation error
    pub fn correlation(msg: impl Into<String>) -> Self {
        Self::Correlation(msg.into())
    }

    /// Create a turn-active error
    #[must_use]
    pub fn turn_active(session_id: SessionId) -> Self {
        Self::TurnActive(session_id)
    }

    /// Create a message parse error
    pub fn message_parse(msg: impl Into<String>, data: Option<serde_json::Value>) -> Self {
        Self::MessageParse {
            message: msg.into(),
            data,
        }
    }
}
