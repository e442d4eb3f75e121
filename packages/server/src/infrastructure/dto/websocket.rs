//! WebSocket frame DTOs.

use serde::{Deserialize, Serialize};

/// Close codes sent when a connection is rejected or shut down.
///
/// 4401 and 4403 keep authentication and authorization failures distinguishable.
pub mod close_code {
    /// Server is shutting down
    pub const GOING_AWAY: u16 = 1001;
    /// Unexpected server-side failure during the handshake
    pub const INTERNAL_ERROR: u16 = 1011;
    /// Credential missing, malformed or expired
    pub const AUTHENTICATION_FAILED: u16 = 4401;
    /// Authenticated user is not a participant of the chat
    pub const FORBIDDEN: u16 = 4403;
    /// Chat does not exist
    pub const CHAT_NOT_FOUND: u16 = 4404;
}

/// Frame type discriminator for outbound frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameType {
    Message,
    Error,
}

/// Inbound frame sent by a client
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InboundFrame {
    pub text: String,
}

/// Outbound chat message, identical for every member of the room (sender included)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessageFrame {
    pub r#type: FrameType,
    pub message_id: i64,
    pub chat_id: i64,
    pub author_id: i64,
    pub author_name: String,
    pub text: String,
    /// RFC 3339 (UTC)
    pub created_at: String,
}

/// Error reported to the sender only
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorFrame {
    pub r#type: FrameType,
    pub code: String,
    pub detail: String,
}

impl ErrorFrame {
    pub fn storage_error(detail: impl Into<String>) -> Self {
        Self {
            r#type: FrameType::Error,
            code: "storage_error".to_string(),
            detail: detail.into(),
        }
    }
}
