//! Server state and connection management.

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use tokio::sync::Notify;

use crate::usecase::{
    ConnectParticipantUseCase, DisconnectParticipantUseCase, GetMessageHistoryUseCase,
    GetRoomsUseCase, ListMyChatsUseCase, SendMessageUseCase,
};

/// Shared application state
pub struct AppState {
    /// ConnectParticipantUseCase（ルーム接続のユースケース）
    pub connect_participant_usecase: Arc<ConnectParticipantUseCase>,
    /// DisconnectParticipantUseCase（切断のユースケース）
    pub disconnect_participant_usecase: Arc<DisconnectParticipantUseCase>,
    /// SendMessageUseCase（メッセージ送信のユースケース）
    pub send_message_usecase: Arc<SendMessageUseCase>,
    /// GetMessageHistoryUseCase（履歴取得のユースケース）
    pub get_message_history_usecase: Arc<GetMessageHistoryUseCase>,
    /// ListMyChatsUseCase（チャット一覧取得のユースケース）
    pub list_my_chats_usecase: Arc<ListMyChatsUseCase>,
    /// GetRoomsUseCase（ルーム一覧取得のユースケース）
    pub get_rooms_usecase: Arc<GetRoomsUseCase>,
    /// 実行中の WebSocket セッション
    pub sessions: SessionTracker,
}

/// 実行中の WebSocket セッション数
///
/// アップグレード済みの接続は axum の graceful shutdown の対象外のため、
/// シャットダウン時はここでセッションの終了を待ちます。
#[derive(Clone, Default)]
pub struct SessionTracker {
    inner: Arc<TrackerInner>,
}

#[derive(Default)]
struct TrackerInner {
    active: AtomicUsize,
    idle: Notify,
}

impl SessionTracker {
    pub fn track(&self) -> SessionToken {
        self.inner.active.fetch_add(1, Ordering::SeqCst);
        SessionToken {
            inner: self.inner.clone(),
        }
    }

    pub fn active(&self) -> usize {
        self.inner.active.load(Ordering::SeqCst)
    }

    /// 全セッションが終了するまで待つ。タイムアウトした場合は `false`
    pub async fn wait_idle(&self, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, async {
            loop {
                let notified = self.inner.idle.notified();
                if self.active() == 0 {
                    return;
                }
                notified.await;
            }
        })
        .await
        .is_ok()
    }
}

/// セッションの終了時に drop される
pub struct SessionToken {
    inner: Arc<TrackerInner>,
}

impl Drop for SessionToken {
    fn drop(&mut self) {
        if self.inner.active.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.inner.idle.notify_waiters();
        }
    }
}
