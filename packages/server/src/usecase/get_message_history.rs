//! UseCase: チャットのメッセージ履歴取得
//!
//! WebSocket のハンドシェイクと同じ認証・参加資格の判定を行い、
//! 永続化順（= ルーム内の配送順）でメッセージを返します。

use std::sync::Arc;

use crate::domain::{ChatId, ChatStore, IdentityVerifier, Message};

use super::{authenticate::authenticate, error::HistoryError, membership_guard::MembershipGuard};

pub struct GetMessageHistoryUseCase {
    verifier: Arc<dyn IdentityVerifier>,
    guard: Arc<MembershipGuard>,
    store: Arc<dyn ChatStore>,
}

impl GetMessageHistoryUseCase {
    pub fn new(
        verifier: Arc<dyn IdentityVerifier>,
        guard: Arc<MembershipGuard>,
        store: Arc<dyn ChatStore>,
    ) -> Self {
        Self {
            verifier,
            guard,
            store,
        }
    }

    pub async fn execute(
        &self,
        chat_id: ChatId,
        credential: Option<&str>,
    ) -> Result<Vec<Message>, HistoryError> {
        let user = authenticate(self.verifier.as_ref(), credential)
            .await
            .map_err(HistoryError::Authentication)?;
        self.guard
            .authorize(&user, chat_id)
            .await
            .map_err(HistoryError::Authorization)?;

        self.store
            .list_messages(chat_id)
            .await
            .map_err(|e| HistoryError::Storage(e.to_string()))
    }
}
