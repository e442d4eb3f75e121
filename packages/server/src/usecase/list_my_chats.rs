//! UseCase: 自分が参加しているチャットの一覧取得

use std::sync::Arc;

use crate::domain::{ChatStore, ChatSummary, IdentityVerifier};

use super::{authenticate::authenticate, error::ListChatsError};

pub struct ListMyChatsUseCase {
    verifier: Arc<dyn IdentityVerifier>,
    store: Arc<dyn ChatStore>,
}

impl ListMyChatsUseCase {
    pub fn new(verifier: Arc<dyn IdentityVerifier>, store: Arc<dyn ChatStore>) -> Self {
        Self { verifier, store }
    }

    /// buyer または seller として参加しているチャット（新しい順、最新メッセージ付き）
    pub async fn execute(
        &self,
        credential: Option<&str>,
    ) -> Result<Vec<ChatSummary>, ListChatsError> {
        let user = authenticate(self.verifier.as_ref(), credential)
            .await
            .map_err(ListChatsError::Authentication)?;

        self.store
            .list_chats_for_user(user.id)
            .await
            .map_err(|e| ListChatsError::Storage(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::VerifyError,
        usecase::testing::{Fixture, UnavailableStore},
    };

    #[tokio::test]
    async fn test_list_my_chats() {
        // テスト項目: 参加しているチャットだけが返される
        // given (前提条件):
        let fixture = Fixture::new().await;
        let usecase = ListMyChatsUseCase::new(Arc::new(fixture.verifier()), fixture.store.clone());

        // when (操作):
        let alice_chats = usecase.execute(Some("token-alice")).await.unwrap();
        let dave_chats = usecase.execute(Some("token-dave")).await.unwrap();

        // then (期待する結果):
        assert_eq!(alice_chats.len(), 1);
        assert_eq!(alice_chats[0].chat, fixture.chat);
        assert_eq!(alice_chats[0].last_message, None);
        assert!(dave_chats.is_empty());
    }

    #[tokio::test]
    async fn test_list_my_chats_errors() {
        // テスト項目: 不正なトークンは認証エラー、ストアの障害は Storage エラー
        // given (前提条件):
        let fixture = Fixture::new().await;
        let usecase = ListMyChatsUseCase::new(Arc::new(fixture.verifier()), Arc::new(UnavailableStore));

        // when (操作):
        let forged = usecase.execute(Some("forged")).await;
        let unavailable = usecase.execute(Some("token-alice")).await;

        // then (期待する結果):
        assert!(matches!(
            forged,
            Err(ListChatsError::Authentication(VerifyError::InvalidToken(_)))
        ));
        assert!(matches!(unavailable, Err(ListChatsError::Storage(_))));
    }
}
