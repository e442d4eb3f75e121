//! Conversion logic from domain entities to DTOs.

use crate::domain::{ChatSummary, ConnectionEntry, Message, RoomSnapshot, UserIdentity};
use crate::infrastructure::dto::{http, websocket as ws};

// ========================================
// Domain Entity → WebSocket DTO
// ========================================

impl ws::ChatMessageFrame {
    /// Build the broadcast frame for a persisted message and its author
    pub fn from_message(message: &Message, author: &UserIdentity) -> Self {
        Self {
            r#type: ws::FrameType::Message,
            message_id: message.id.value(),
            chat_id: message.chat_id.value(),
            author_id: message.author_id.value(),
            author_name: author.name.clone(),
            text: message.text.as_str().to_string(),
            created_at: message.created_at.to_rfc3339(),
        }
    }
}

// ========================================
// Domain Entity → HTTP DTO
// ========================================

impl From<&Message> for http::MessageDto {
    fn from(message: &Message) -> Self {
        Self {
            id: message.id.value(),
            chat_id: message.chat_id.value(),
            author_id: message.author_id.value(),
            text: message.text.as_str().to_string(),
            created_at: message.created_at.to_rfc3339(),
        }
    }
}

impl From<&ChatSummary> for http::ChatSummaryDto {
    fn from(summary: &ChatSummary) -> Self {
        Self {
            id: summary.chat.id.value(),
            product_id: summary.chat.product_id.value(),
            buyer_id: summary.chat.buyer_id.value(),
            seller_id: summary.chat.seller_id.value(),
            created_at: summary.chat.created_at.to_rfc3339(),
            last_message: summary
                .last_message
                .as_ref()
                .map(|message| message.text.as_str().to_string()),
        }
    }
}

impl From<&ConnectionEntry> for http::RoomMemberDto {
    fn from(entry: &ConnectionEntry) -> Self {
        Self {
            entry_id: entry.id.to_string(),
            user_id: entry.user.id.value(),
            name: entry.user.name.clone(),
            joined_at: entry.joined_at.to_rfc3339(),
        }
    }
}

impl From<&RoomSnapshot> for http::RoomSummaryDto {
    fn from(room: &RoomSnapshot) -> Self {
        Self {
            chat_id: room.chat_id.value(),
            members: room.members.iter().map(http::RoomMemberDto::from).collect(),
        }
    }
}
