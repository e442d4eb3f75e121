//! IdentityVerifier trait 定義
//!
//! 資格情報（bearer token）を認証済みユーザーに変換します。
//! トークンの発行（ログイン）はこのサーバーの責務外です。

use async_trait::async_trait;

use super::{entity::UserIdentity, error::VerifyError};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// 資格情報を検証し、ユーザーを返す
    async fn verify(&self, credential: &str) -> Result<UserIdentity, VerifyError>;
}
