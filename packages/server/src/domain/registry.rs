//! ConnectionRegistry trait 定義
//!
//! ## 責務
//!
//! - ルーム（チャット ID）ごとに、現在開いている接続とそのユーザーを保持する
//! - join / leave / members（スナップショット）/ drain を提供する
//!
//! ## 設計ノート
//!
//! `leave` は `RoomMembership` の `Drop` から呼ばれるため同期メソッドです。
//! 実装はロックを `.await` をまたいで保持してはいけません。

use std::sync::Arc;

use tokio::sync::mpsc;

use super::{ChatId, EntryId, Timestamp, entity::UserIdentity, error::DeliveryError};

/// 接続の writer タスクへ送る指示
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushMessage {
    /// シリアライズ済みのフレームを送信
    Text(String),
    /// close フレームを送信して writer を終了
    Close { code: u16, reason: String },
}

/// 接続ごとの送信チャンネル
pub type PusherChannel = mpsc::UnboundedSender<PushMessage>;

/// ルームに登録された 1 つの接続
#[derive(Debug, Clone)]
pub struct ConnectionEntry {
    pub id: EntryId,
    pub chat_id: ChatId,
    pub user: UserIdentity,
    pub joined_at: Timestamp,
    sender: PusherChannel,
}

impl ConnectionEntry {
    pub fn new(
        chat_id: ChatId,
        user: UserIdentity,
        sender: PusherChannel,
        joined_at: Timestamp,
    ) -> Self {
        Self {
            id: EntryId::generate(),
            chat_id,
            user,
            joined_at,
            sender,
        }
    }

    /// フレームをこの接続に配送する
    pub fn deliver(&self, payload: &str) -> Result<(), DeliveryError> {
        self.sender
            .send(PushMessage::Text(payload.to_string()))
            .map_err(|_| DeliveryError::ChannelClosed(self.id))
    }

    /// 接続を閉じるよう writer に指示する
    pub fn close(&self, code: u16, reason: &str) -> Result<(), DeliveryError> {
        self.sender
            .send(PushMessage::Close {
                code,
                reason: reason.to_string(),
            })
            .map_err(|_| DeliveryError::ChannelClosed(self.id))
    }
}

/// ある時点のルームの状態
#[derive(Debug, Clone)]
pub struct RoomSnapshot {
    pub chat_id: ChatId,
    pub members: Vec<ConnectionEntry>,
}

pub trait ConnectionRegistry: Send + Sync {
    /// 接続をルームに登録する（同一ユーザーの複数エントリを許容）
    fn join(&self, chat_id: ChatId, user: UserIdentity, sender: PusherChannel) -> ConnectionEntry;

    /// 接続を登録解除する（冪等）。実際に削除した場合のみ `true`
    fn leave(&self, entry: &ConnectionEntry) -> bool;

    /// ルームのメンバーのコピー
    fn members(&self, chat_id: ChatId) -> Vec<ConnectionEntry>;

    /// メンバーが 1 人以上いるルームのコピー
    fn rooms(&self) -> Vec<RoomSnapshot>;

    /// 全ルームの接続数
    fn connection_count(&self) -> usize;

    /// 全接続を閉じて登録解除する（シャットダウン用）。解除した数を返す
    fn drain(&self) -> usize;
}

/// ルームへの参加を表すスコープ付きガード
///
/// 生成時に `join` し、`Drop` で必ず 1 回だけ `leave` します
/// （通常終了・エラー・panic・タスクの abort のいずれでも）。
pub struct RoomMembership {
    entry: ConnectionEntry,
    registry: Arc<dyn ConnectionRegistry>,
}

impl RoomMembership {
    pub fn acquire(
        registry: Arc<dyn ConnectionRegistry>,
        chat_id: ChatId,
        user: UserIdentity,
        sender: PusherChannel,
    ) -> Self {
        let entry = registry.join(chat_id, user, sender);
        Self { entry, registry }
    }

    pub fn entry(&self) -> &ConnectionEntry {
        &self.entry
    }
}

impl Drop for RoomMembership {
    fn drop(&mut self) {
        if self.registry.leave(&self.entry) {
            tracing::debug!(
                "Entry {} of user {} released from room {}",
                self.entry.id,
                self.entry.user.id,
                self.entry.chat_id
            );
        }
    }
}
