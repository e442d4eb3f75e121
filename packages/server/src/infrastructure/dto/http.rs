//! HTTP API response DTOs.

use serde::{Deserialize, Serialize};

/// One persisted message in a chat history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageDto {
    pub id: i64,
    pub chat_id: i64,
    pub author_id: i64,
    pub text: String,
    pub created_at: String,
}

/// One row of the "my chats" listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSummaryDto {
    pub id: i64,
    pub product_id: i64,
    pub buyer_id: i64,
    pub seller_id: i64,
    pub created_at: String,
    pub last_message: Option<String>,
}

/// Live member of a room
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomMemberDto {
    pub entry_id: String,
    pub user_id: i64,
    pub name: String,
    pub joined_at: String,
}

/// Live room with its connected members
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSummaryDto {
    pub chat_id: i64,
    pub members: Vec<RoomMemberDto>,
}
