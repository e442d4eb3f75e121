//! UseCase 層のエラー型

use thiserror::Error;

use crate::domain::{ChatId, StoreError, UserId, ValueError, VerifyError};

/// MembershipGuard の判定結果（拒否）
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthorizeError {
    #[error("chat {0} not found")]
    NotFound(ChatId),

    #[error("user {user_id} is not a participant of chat {chat_id}")]
    Forbidden { chat_id: ChatId, user_id: UserId },

    #[error("membership lookup failed: {0}")]
    Storage(String),
}

/// ルームへの接続（ハンドシェイク）の失敗
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectError {
    #[error("authentication failed: {0}")]
    Authentication(VerifyError),

    #[error("authorization failed: {0}")]
    Authorization(AuthorizeError),
}

/// メッセージ送信（Broadcaster）の失敗
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PublishError {
    #[error("invalid message: {0}")]
    InvalidMessage(ValueError),

    #[error("failed to persist message: {0}")]
    StorageError(StoreError),

    #[error("failed to encode message frame: {0}")]
    Encoding(String),
}

/// メッセージ履歴取得の失敗
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HistoryError {
    #[error("authentication failed: {0}")]
    Authentication(VerifyError),

    #[error("authorization failed: {0}")]
    Authorization(AuthorizeError),

    #[error("store failed: {0}")]
    Storage(String),
}

/// 自分のチャット一覧取得の失敗
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ListChatsError {
    #[error("authentication failed: {0}")]
    Authentication(VerifyError),

    #[error("store failed: {0}")]
    Storage(String),
}
