//! InMemory ChatStore 実装
//!
//! ドメイン層が定義する ChatStore / UserDirectory trait の具体的な実装。
//! HashMap をインメモリ DB として使用します。
//!
//! ID は 1 から順に採番し、メッセージの `created_at` はチャット内で
//! 単調非減少になるよう直前のメッセージの時刻で下限を取ります。

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use agora_shared::time::{Clock, SystemClock};
use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{
    Chat, ChatId, ChatStore, ChatSummary, Message, MessageId, MessageText, ProductId, StoreError,
    Timestamp, UserDirectory, UserId, UserIdentity,
};

#[derive(Default)]
struct StoreState {
    users: HashMap<UserId, UserIdentity>,
    chats: BTreeMap<ChatId, Chat>,
    /// Key: チャット ID, Value: 永続化順のメッセージ
    messages: HashMap<ChatId, Vec<Message>>,
    last_user_id: i64,
    last_chat_id: i64,
    last_message_id: i64,
}

/// インメモリ ChatStore 実装
pub struct InMemoryChatStore {
    state: Mutex<StoreState>,
    clock: Arc<dyn Clock>,
}

impl InMemoryChatStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(StoreState::default()),
            clock,
        }
    }

    /// ユーザーを登録する（登録処理自体はこのサーバーの責務外。シード・テスト用）
    pub async fn insert_user(&self, name: &str) -> UserIdentity {
        let mut state = self.state.lock().await;
        state.last_user_id += 1;
        let user = UserIdentity::new(UserId::new(state.last_user_id), name);
        state.users.insert(user.id, user.clone());
        user
    }
}

impl Default for InMemoryChatStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatStore for InMemoryChatStore {
    async fn get_chat(&self, chat_id: ChatId) -> Result<Option<Chat>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.chats.get(&chat_id).cloned())
    }

    async fn start_chat(
        &self,
        buyer_id: UserId,
        seller_id: UserId,
        product_id: ProductId,
    ) -> Result<Chat, StoreError> {
        if buyer_id == seller_id {
            return Err(StoreError::InvalidChat(
                "buyer and seller must be different users".to_string(),
            ));
        }

        let mut state = self.state.lock().await;
        for user_id in [buyer_id, seller_id] {
            if !state.users.contains_key(&user_id) {
                return Err(StoreError::InvalidChat(format!("user {user_id} does not exist")));
            }
        }

        if let Some(existing) = state.chats.values().find(|chat| {
            chat.buyer_id == buyer_id && chat.seller_id == seller_id && chat.product_id == product_id
        }) {
            return Ok(existing.clone());
        }

        state.last_chat_id += 1;
        let chat = Chat {
            id: ChatId::new(state.last_chat_id),
            buyer_id,
            seller_id,
            product_id,
            created_at: Timestamp::new(self.clock.now_millis()),
        };
        state.chats.insert(chat.id, chat.clone());
        Ok(chat)
    }

    async fn create_message(
        &self,
        chat_id: ChatId,
        author_id: UserId,
        text: MessageText,
    ) -> Result<Message, StoreError> {
        let mut state = self.state.lock().await;
        let chat = state
            .chats
            .get(&chat_id)
            .ok_or(StoreError::ChatNotFound(chat_id))?;
        if !self.is_participant(chat, &author_id) {
            return Err(StoreError::NotParticipant {
                chat_id,
                user_id: author_id,
            });
        }

        let floor = state
            .messages
            .get(&chat_id)
            .and_then(|messages| messages.last())
            .map(|last| last.created_at.value())
            .unwrap_or(i64::MIN);
        let created_at = Timestamp::new(self.clock.now_millis().max(floor));

        state.last_message_id += 1;
        let message = Message {
            id: MessageId::new(state.last_message_id),
            chat_id,
            author_id,
            text,
            created_at,
        };
        state
            .messages
            .entry(chat_id)
            .or_default()
            .push(message.clone());

        Ok(message)
    }

    async fn list_messages(&self, chat_id: ChatId) -> Result<Vec<Message>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.messages.get(&chat_id).cloned().unwrap_or_default())
    }

    async fn list_chats_for_user(&self, user_id: UserId) -> Result<Vec<ChatSummary>, StoreError> {
        let state = self.state.lock().await;
        let mut summaries: Vec<ChatSummary> = state
            .chats
            .values()
            .filter(|chat| chat.has_participant(&user_id))
            .map(|chat| ChatSummary {
                chat: chat.clone(),
                last_message: state
                    .messages
                    .get(&chat.id)
                    .and_then(|messages| messages.last())
                    .cloned(),
            })
            .collect();

        // Newest chat first
        summaries.sort_by(|a, b| {
            b.chat
                .created_at
                .cmp(&a.chat.created_at)
                .then(b.chat.id.cmp(&a.chat.id))
        });

        Ok(summaries)
    }
}

#[async_trait]
impl UserDirectory for InMemoryChatStore {
    async fn find_user(&self, user_id: UserId) -> Result<Option<UserIdentity>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.users.get(&user_id).cloned())
    }
}
