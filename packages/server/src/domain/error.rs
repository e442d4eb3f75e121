//! ドメイン層のエラー型

use thiserror::Error;

use super::value_object::{ChatId, EntryId, UserId};

/// 値オブジェクトの検証エラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    #[error("message text must not be empty")]
    EmptyMessage,

    #[error("message text exceeds {max} characters (got {actual})")]
    MessageTooLong { max: usize, actual: usize },
}

/// ChatStore / UserDirectory のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("chat {0} not found")]
    ChatNotFound(ChatId),

    #[error("user {user_id} is not a participant of chat {chat_id}")]
    NotParticipant { chat_id: ChatId, user_id: UserId },

    #[error("invalid chat: {0}")]
    InvalidChat(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// IdentityVerifier のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerifyError {
    #[error("credential is missing")]
    MissingCredential,

    #[error("invalid or expired token: {0}")]
    InvalidToken(String),

    #[error("user {0} not found")]
    UnknownUser(UserId),

    #[error("user directory failed: {0}")]
    Directory(String),
}

/// 個々の接続への配送失敗
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    #[error("connection {0} is closed")]
    ChannelClosed(EntryId),
}
