//! UseCase: 接続の切断処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - DisconnectParticipantUseCase::execute() / disconnect_all() メソッド
//!
//! ### なぜこのテストが必要か
//! - 切断後にレジストリへエントリが残らないことを保証
//! - シャットダウン時に全接続へ close が送られることを確認

use std::sync::Arc;

use crate::domain::{ConnectionRegistry, RoomMembership};

/// 切断のユースケース
pub struct DisconnectParticipantUseCase {
    /// ConnectionRegistry（接続中のエントリ）
    registry: Arc<dyn ConnectionRegistry>,
}

impl DisconnectParticipantUseCase {
    pub fn new(registry: Arc<dyn ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// 接続を登録解除する
    ///
    /// # Returns
    ///
    /// ルームに残っているエントリ数
    pub fn execute(&self, membership: RoomMembership) -> usize {
        let entry = membership.entry().clone();
        drop(membership);

        let remaining = self.registry.members(entry.chat_id).len();
        tracing::info!(
            "User {} left room {} ({} connections remaining)",
            entry.user.id,
            entry.chat_id,
            remaining
        );
        remaining
    }

    /// 全接続を閉じる（シャットダウン時）
    ///
    /// # Returns
    ///
    /// 閉じた接続数
    pub fn disconnect_all(&self) -> usize {
        let drained = self.registry.drain();
        tracing::info!("Closed {} connections for shutdown", drained);
        drained
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::PushMessage, infrastructure::dto::websocket::close_code, usecase::testing::Fixture,
    };
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_disconnect_participant() {
        // テスト項目: 切断すると残りのエントリ数が返される
        // given (前提条件):
        let fixture = Fixture::new().await;
        let usecase = DisconnectParticipantUseCase::new(fixture.registry.clone());
        let (tx_a, _rx_a) = mpsc::unbounded_channel();
        let (tx_b, _rx_b) = mpsc::unbounded_channel();
        let alice = RoomMembership::acquire(
            fixture.registry.clone(),
            fixture.chat.id,
            fixture.alice.clone(),
            tx_a,
        );
        let _bob = RoomMembership::acquire(
            fixture.registry.clone(),
            fixture.chat.id,
            fixture.bob.clone(),
            tx_b,
        );

        // when (操作):
        let remaining = usecase.execute(alice);

        // then (期待する結果):
        assert_eq!(remaining, 1);
        assert_eq!(fixture.registry.members(fixture.chat.id)[0].user, fixture.bob);
    }

    #[tokio::test]
    async fn test_disconnect_last_participant_removes_room() {
        // テスト項目: 最後の接続が切断されるとルームが消える
        // given (前提条件):
        let fixture = Fixture::new().await;
        let usecase = DisconnectParticipantUseCase::new(fixture.registry.clone());
        let (tx, _rx) = mpsc::unbounded_channel();
        let alice = RoomMembership::acquire(
            fixture.registry.clone(),
            fixture.chat.id,
            fixture.alice.clone(),
            tx,
        );

        // when (操作):
        let remaining = usecase.execute(alice);

        // then (期待する結果):
        assert_eq!(remaining, 0);
        assert!(fixture.registry.rooms().is_empty());
    }

    #[tokio::test]
    async fn test_disconnect_all_sends_going_away() {
        // テスト項目: disconnect_all で全接続に 1001 の close が送られる
        // given (前提条件):
        let fixture = Fixture::new().await;
        let usecase = DisconnectParticipantUseCase::new(fixture.registry.clone());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _alice = RoomMembership::acquire(
            fixture.registry.clone(),
            fixture.chat.id,
            fixture.alice.clone(),
            tx,
        );

        // when (操作):
        let drained = usecase.disconnect_all();

        // then (期待する結果):
        assert_eq!(drained, 1);
        assert_eq!(fixture.registry.connection_count(), 0);
        assert!(matches!(
            rx.try_recv(),
            Ok(PushMessage::Close { code, .. }) if code == close_code::GOING_AWAY
        ));
    }
}
