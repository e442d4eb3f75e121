//! UseCase: チャットへの参加資格の判定
//!
//! 認証済みのユーザーがチャットの buyer / seller であるかを判定します。
//! 読み取り専用で、判定結果はキャッシュしません（接続のたびに再判定）。

use std::sync::Arc;

use crate::domain::{Chat, ChatId, ChatStore, UserIdentity};

use super::error::AuthorizeError;

pub struct MembershipGuard {
    store: Arc<dyn ChatStore>,
}

impl MembershipGuard {
    pub fn new(store: Arc<dyn ChatStore>) -> Self {
        Self { store }
    }

    /// ユーザーがチャットに参加できるかを判定し、許可された場合はチャットを返す
    pub async fn authorize(
        &self,
        user: &UserIdentity,
        chat_id: ChatId,
    ) -> Result<Chat, AuthorizeError> {
        let chat = self
            .store
            .get_chat(chat_id)
            .await
            .map_err(|e| AuthorizeError::Storage(e.to_string()))?
            .ok_or(AuthorizeError::NotFound(chat_id))?;

        if !self.store.is_participant(&chat, &user.id) {
            return Err(AuthorizeError::Forbidden {
                chat_id,
                user_id: user.id,
            });
        }

        Ok(chat)
    }
}
