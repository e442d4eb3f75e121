//! InMemory ConnectionRegistry 実装
//!
//! ## 責務
//!
//! - ルームごとの接続エントリ（送信チャンネル付き）を管理
//! - Broadcaster にメンバーのスナップショットを提供
//!
//! ## 設計ノート
//!
//! ルームのマップ全体を 1 つの `std::sync::Mutex` で保護します。
//! クリティカルセクションはコピーと挿入・削除だけで、`.await` を含みません。
//! 空になったルームはマップから取り除かれます。

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use agora_shared::time::{Clock, SystemClock};

use crate::{
    domain::{
        ChatId, ConnectionEntry, ConnectionRegistry, PusherChannel, RoomSnapshot, Timestamp,
        UserIdentity,
    },
    infrastructure::dto::websocket::close_code,
};

/// インメモリ ConnectionRegistry 実装
///
/// プロセス起動時は空で、シャットダウン時に `drain` で空に戻ります。
pub struct InMemoryConnectionRegistry {
    /// Key: チャット ID, Value: join 順のエントリ
    rooms: Mutex<HashMap<ChatId, Vec<ConnectionEntry>>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryConnectionRegistry {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            rooms: Mutex::new(HashMap::new()),
            clock,
        }
    }

    fn lock_rooms(&self) -> MutexGuard<'_, HashMap<ChatId, Vec<ConnectionEntry>>> {
        self.rooms.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for InMemoryConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionRegistry for InMemoryConnectionRegistry {
    fn join(&self, chat_id: ChatId, user: UserIdentity, sender: PusherChannel) -> ConnectionEntry {
        let entry = ConnectionEntry::new(
            chat_id,
            user,
            sender,
            Timestamp::new(self.clock.now_millis()),
        );

        let mut rooms = self.lock_rooms();
        let members = rooms.entry(chat_id).or_default();
        members.push(entry.clone());
        tracing::debug!(
            "Entry {} of user {} joined room {} ({} members)",
            entry.id,
            entry.user.id,
            chat_id,
            members.len()
        );

        entry
    }

    fn leave(&self, entry: &ConnectionEntry) -> bool {
        let mut rooms = self.lock_rooms();
        let Some(members) = rooms.get_mut(&entry.chat_id) else {
            return false;
        };
        let Some(position) = members.iter().position(|member| member.id == entry.id) else {
            return false;
        };

        members.remove(position);
        if members.is_empty() {
            rooms.remove(&entry.chat_id);
            tracing::debug!("Room {} is now empty", entry.chat_id);
        }
        true
    }

    fn members(&self, chat_id: ChatId) -> Vec<ConnectionEntry> {
        self.lock_rooms().get(&chat_id).cloned().unwrap_or_default()
    }

    fn rooms(&self) -> Vec<RoomSnapshot> {
        let mut snapshots: Vec<RoomSnapshot> = self
            .lock_rooms()
            .iter()
            .map(|(chat_id, members)| RoomSnapshot {
                chat_id: *chat_id,
                members: members.clone(),
            })
            .collect();

        // Sort by chat_id for consistent ordering
        snapshots.sort_by_key(|room| room.chat_id);
        snapshots
    }

    fn connection_count(&self) -> usize {
        self.lock_rooms().values().map(Vec::len).sum()
    }

    fn drain(&self) -> usize {
        let drained: Vec<ConnectionEntry> = {
            let mut rooms = self.lock_rooms();
            rooms.drain().flat_map(|(_, members)| members).collect()
        };

        for entry in &drained {
            // writer が既に終了している接続は閉じる必要がない
            if entry
                .close(close_code::GOING_AWAY, "server shutting down")
                .is_err()
            {
                tracing::debug!("Entry {} was already closed", entry.id);
            }
        }

        drained.len()
    }
}
