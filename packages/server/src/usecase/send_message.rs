//! UseCase: メッセージ送信処理（Broadcaster）
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - SendMessageUseCase::execute() メソッド
//! - 検証 → 永続化 → スナップショット → 全メンバーへの配送 の順序
//!
//! ### なぜこのテストが必要か
//! - 永続化されたメッセージだけが配送されることを保証
//! - 送信者自身にも同じフレームが届くことを確認
//! - 同じルームへの並行送信が全メンバーに同じ順序で届くことを保証
//!
//! ### どのような状況を想定しているか
//! - 正常系：2 人のルームでの送信
//! - 異常系：空メッセージ、ストアの障害
//! - エッジケース：writer が既に終了しているメンバー（配送失敗）
//!
//! ## 順序の保証
//!
//! ルームごとの publish ロック（`tokio::sync::Mutex`）で永続化から配送までを
//! 直列化します。別のルームへの送信は並行に進みます。使われなくなったロックは
//! 送信の完了時に取り除かれます。

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};

use crate::{
    domain::{ChatId, ChatStore, ConnectionEntry, ConnectionRegistry, Message, MessageText},
    infrastructure::dto::websocket::ChatMessageFrame,
};

use super::error::PublishError;

type PublishLock = Arc<tokio::sync::Mutex<()>>;

/// 送信結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishOutcome {
    /// 永続化されたメッセージ
    pub message: Message,
    /// 配送できたエントリ数（送信者を含む）
    pub delivered: usize,
    /// 配送に失敗し、レジストリから外したエントリ数
    pub dropped: usize,
}

/// メッセージ送信のユースケース
pub struct SendMessageUseCase {
    /// ChatStore（メッセージの永続化）
    store: Arc<dyn ChatStore>,
    /// ConnectionRegistry（配送先のスナップショット）
    registry: Arc<dyn ConnectionRegistry>,
    /// Key: チャット ID, Value: そのルームの publish ロック
    publish_locks: Mutex<HashMap<ChatId, PublishLock>>,
}

impl SendMessageUseCase {
    pub fn new(store: Arc<dyn ChatStore>, registry: Arc<dyn ConnectionRegistry>) -> Self {
        Self {
            store,
            registry,
            publish_locks: Mutex::new(HashMap::new()),
        }
    }

    /// メッセージ送信を実行
    ///
    /// # Arguments
    ///
    /// * `sender` - 送信者の接続エントリ
    /// * `raw_text` - クライアントから受け取った本文（前後の空白は取り除かれる）
    ///
    /// # Returns
    ///
    /// * `Ok(PublishOutcome)` - 永続化と配送の結果
    /// * `Err(PublishError)` - 検証または永続化の失敗（何も配送されない）
    pub async fn execute(
        &self,
        sender: &ConnectionEntry,
        raw_text: &str,
    ) -> Result<PublishOutcome, PublishError> {
        // 1. 検証
        let text = MessageText::new(raw_text).map_err(PublishError::InvalidMessage)?;

        let room_lock = self.room_lock(sender.chat_id);
        let outcome = {
            let _publishing = room_lock.lock().await;
            self.persist_and_fan_out(sender, text).await
        };
        drop(room_lock);
        self.prune_lock(sender.chat_id);

        outcome
    }

    /// publish ロックを保持した状態で呼ばれる
    async fn persist_and_fan_out(
        &self,
        sender: &ConnectionEntry,
        text: MessageText,
    ) -> Result<PublishOutcome, PublishError> {
        // 2. 永続化
        let message = self
            .store
            .create_message(sender.chat_id, sender.user.id, text)
            .await
            .map_err(PublishError::StorageError)?;

        let frame = ChatMessageFrame::from_message(&message, &sender.user);
        let payload =
            serde_json::to_string(&frame).map_err(|e| PublishError::Encoding(e.to_string()))?;

        // 3. スナップショット
        let members = self.registry.members(sender.chat_id);

        // 4. 配送（送信者を含む全メンバー）
        let mut delivered = 0;
        let mut failed = Vec::new();
        for member in &members {
            match member.deliver(&payload) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    tracing::warn!("Dropping member of room {}: {}", sender.chat_id, e);
                    failed.push(member);
                }
            }
        }

        // 5. 配送に失敗したエントリを外す
        for member in &failed {
            self.registry.leave(member);
        }

        tracing::debug!(
            "Message {} in room {} delivered to {} of {} members",
            message.id,
            sender.chat_id,
            delivered,
            members.len()
        );

        Ok(PublishOutcome {
            message,
            delivered,
            dropped: failed.len(),
        })
    }

    fn room_lock(&self, chat_id: ChatId) -> PublishLock {
        let mut locks = self
            .publish_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        locks.entry(chat_id).or_default().clone()
    }

    /// 誰も使っていないロックを取り除く
    fn prune_lock(&self, chat_id: ChatId) {
        let mut locks = self
            .publish_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if locks
            .get(&chat_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&chat_id);
        }
    }

    #[cfg(test)]
    fn active_lock_count(&self) -> usize {
        self.publish_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
