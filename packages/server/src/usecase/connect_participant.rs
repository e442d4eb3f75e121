//! UseCase: ルームへの接続（ハンドシェイク）
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - ConnectParticipantUseCase::execute() メソッド
//! - 認証 → 参加資格の判定 → レジストリへの登録 の順序
//!
//! ### なぜこのテストが必要か
//! - 拒否された接続がレジストリに残らないことを保証
//! - 同一ユーザーの複数接続が独立したエントリになることを確認
//!
//! ### どのような状況を想定しているか
//! - 正常系：buyer / seller の接続
//! - 異常系：資格情報なし・不正なトークン・非参加者・存在しないチャット

use std::sync::Arc;

use crate::domain::{ChatId, ConnectionRegistry, IdentityVerifier, PusherChannel, RoomMembership};

use super::{authenticate::authenticate, error::ConnectError, membership_guard::MembershipGuard};

/// ルーム接続のユースケース
pub struct ConnectParticipantUseCase {
    /// IdentityVerifier（資格情報の検証）
    verifier: Arc<dyn IdentityVerifier>,
    /// MembershipGuard（参加資格の判定）
    guard: Arc<MembershipGuard>,
    /// ConnectionRegistry（接続中のエントリ）
    registry: Arc<dyn ConnectionRegistry>,
}

impl ConnectParticipantUseCase {
    pub fn new(
        verifier: Arc<dyn IdentityVerifier>,
        guard: Arc<MembershipGuard>,
        registry: Arc<dyn ConnectionRegistry>,
    ) -> Self {
        Self {
            verifier,
            guard,
            registry,
        }
    }

    /// ハンドシェイクを実行
    ///
    /// # Arguments
    ///
    /// * `chat_id` - 接続先のチャット
    /// * `credential` - bearer token（無い場合は `None`）
    /// * `sender` - この接続の writer へのチャンネル
    ///
    /// # Returns
    ///
    /// * `Ok(RoomMembership)` - 登録済みのエントリ。drop すると登録解除される
    /// * `Err(ConnectError)` - 拒否（レジストリは変更されない）
    pub async fn execute(
        &self,
        chat_id: ChatId,
        credential: Option<&str>,
        sender: PusherChannel,
    ) -> Result<RoomMembership, ConnectError> {
        // 1. 認証
        let user = authenticate(self.verifier.as_ref(), credential)
            .await
            .map_err(ConnectError::Authentication)?;

        // 2. 参加資格の判定
        self.guard
            .authorize(&user, chat_id)
            .await
            .map_err(ConnectError::Authorization)?;

        // 3. レジストリに登録
        let membership = RoomMembership::acquire(self.registry.clone(), chat_id, user, sender);
        tracing::info!(
            "User {} ({}) joined room {} as entry {}",
            membership.entry().user.id,
            membership.entry().user.name,
            chat_id,
            membership.entry().id
        );

        Ok(membership)
    }
}
