//! Core type definitions for the bridge
//!
//! Organized by concern: identifiers, content blocks, inbound updates,
//! outbound messages, and permission types.

pub mod content;
pub mod identifiers;
pub mod messages;
pub mod permissions;
pub mod updates;

pub use content::ContentBlock;
pub use identifiers::{SessionId, ToolCallId};
pub use messages::{AgentMessage, ToolCallRecord};
pub use permissions::{
    PermissionDecision, PermissionHandler, PermissionOption, PermissionOptionKind,
    PermissionReply, PermissionRequest, ToolCallDescriptor,
};
pub use updates::{PromptReply, SessionNotification, SessionUpdate, StopReason, ToolCallStatus};
