//! UseCase: 資格情報の検証

use crate::domain::{IdentityVerifier, UserIdentity, VerifyError};

/// 資格情報（bearer token）を検証してユーザーを返す
///
/// 資格情報が無い、または空文字列の場合は `MissingCredential`。
pub async fn authenticate(
    verifier: &dyn IdentityVerifier,
    credential: Option<&str>,
) -> Result<UserIdentity, VerifyError> {
    match credential.map(str::trim) {
        Some(token) if !token.is_empty() => verifier.verify(token).await,
        _ => Err(VerifyError::MissingCredential),
    }
}
