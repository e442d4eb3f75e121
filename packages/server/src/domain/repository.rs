//! Repository trait 定義
//!
//! ドメイン層が必要とするデータアクセスのインターフェースを定義します。
//! 具体的な実装は Infrastructure 層が提供します（依存性の逆転）。

use async_trait::async_trait;

use super::{
    ChatId, MessageText, ProductId, StoreError, UserId,
    entity::{Chat, ChatSummary, Message, UserIdentity},
};

/// チャットとメッセージの永続ストア
///
/// `create_message` がルーム内順序の直列化点です。採番される ID と
/// `created_at` はチャット内で単調非減少でなければなりません。
#[async_trait]
pub trait ChatStore: Send + Sync {
    /// チャットを取得（存在しなければ `None`）
    async fn get_chat(&self, chat_id: ChatId) -> Result<Option<Chat>, StoreError>;

    /// ユーザーがチャットの参加者（buyer または seller）か
    fn is_participant(&self, chat: &Chat, user_id: &UserId) -> bool {
        chat.has_participant(user_id)
    }

    /// (buyer, seller, product) のチャットを取得、なければ作成
    async fn start_chat(
        &self,
        buyer_id: UserId,
        seller_id: UserId,
        product_id: ProductId,
    ) -> Result<Chat, StoreError>;

    /// メッセージを永続化し、ID と作成時刻を採番する
    async fn create_message(
        &self,
        chat_id: ChatId,
        author_id: UserId,
        text: MessageText,
    ) -> Result<Message, StoreError>;

    /// チャットのメッセージを永続化順に取得
    async fn list_messages(&self, chat_id: ChatId) -> Result<Vec<Message>, StoreError>;

    /// ユーザーが参加しているチャットを新しい順に取得（最新メッセージ付き）
    async fn list_chats_for_user(&self, user_id: UserId) -> Result<Vec<ChatSummary>, StoreError>;
}

/// ユーザー ID から表示名などを引くディレクトリ
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_user(&self, user_id: UserId) -> Result<Option<UserIdentity>, StoreError>;
}
