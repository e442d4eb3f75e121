//! ユースケースのテスト用フィクスチャ

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    domain::{
        Chat, ChatId, ChatStore, ChatSummary, Message, MessageText, MockIdentityVerifier,
        ProductId, StoreError, UserId, UserIdentity, VerifyError,
    },
    infrastructure::{registry::InMemoryConnectionRegistry, store::InMemoryChatStore},
};

/// alice (buyer) と bob (seller) のチャット 1 件、および第三者 dave
pub struct Fixture {
    pub store: Arc<InMemoryChatStore>,
    pub registry: Arc<InMemoryConnectionRegistry>,
    pub alice: UserIdentity,
    pub bob: UserIdentity,
    pub dave: UserIdentity,
    pub chat: Chat,
}

impl Fixture {
    pub async fn new() -> Self {
        let store = Arc::new(InMemoryChatStore::new());
        let alice = store.insert_user("alice").await;
        let bob = store.insert_user("bob").await;
        let dave = store.insert_user("dave").await;
        let chat = store
            .start_chat(alice.id, bob.id, ProductId::new(1))
            .await
            .unwrap();
        Self {
            store,
            registry: Arc::new(InMemoryConnectionRegistry::new()),
            alice,
            bob,
            dave,
            chat,
        }
    }

    /// トークン `token-<name>` を受け付ける verifier
    pub fn verifier(&self) -> MockIdentityVerifier {
        let users = vec![self.alice.clone(), self.bob.clone(), self.dave.clone()];
        let mut verifier = MockIdentityVerifier::new();
        verifier.expect_verify().returning(move |credential| {
            users
                .iter()
                .find(|user| format!("token-{}", user.name) == credential)
                .cloned()
                .ok_or_else(|| VerifyError::InvalidToken("signature mismatch".to_string()))
        });
        verifier
    }
}

/// 全ての操作が失敗するストア
pub struct UnavailableStore;

#[async_trait]
impl ChatStore for UnavailableStore {
    async fn get_chat(&self, _chat_id: ChatId) -> Result<Option<Chat>, StoreError> {
        Err(unavailable())
    }

    async fn start_chat(
        &self,
        _buyer_id: UserId,
        _seller_id: UserId,
        _product_id: ProductId,
    ) -> Result<Chat, StoreError> {
        Err(unavailable())
    }

    async fn create_message(
        &self,
        _chat_id: ChatId,
        _author_id: UserId,
        _text: MessageText,
    ) -> Result<Message, StoreError> {
        Err(unavailable())
    }

    async fn list_messages(&self, _chat_id: ChatId) -> Result<Vec<Message>, StoreError> {
        Err(unavailable())
    }

    async fn list_chats_for_user(&self, _user_id: UserId) -> Result<Vec<ChatSummary>, StoreError> {
        Err(unavailable())
    }
}

fn unavailable() -> StoreError {
    StoreError::Unavailable("database is locked".to_string())
}
