//! JWT (HS256) による IdentityVerifier 実装
//!
//! `sub` クレームにユーザー ID（10 進数の文字列）を持つトークンを検証し、
//! UserDirectory からユーザーを引き当てます。

use std::sync::Arc;

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::domain::{IdentityVerifier, UserDirectory, UserId, UserIdentity, VerifyError};

/// JWT Claims
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    /// 有効期限 (Unix timestamp, 秒)
    pub exp: i64,
}

pub struct JwtIdentityVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
    directory: Arc<dyn UserDirectory>,
}

impl JwtIdentityVerifier {
    pub fn new(secret: &str, directory: Arc<dyn UserDirectory>) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
            directory,
        }
    }
}

#[async_trait]
impl IdentityVerifier for JwtIdentityVerifier {
    async fn verify(&self, credential: &str) -> Result<UserIdentity, VerifyError> {
        let claims = decode::<Claims>(credential, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|err| VerifyError::InvalidToken(err.to_string()))?;

        let user_id = claims
            .sub
            .parse::<i64>()
            .map(UserId::new)
            .map_err(|_| VerifyError::InvalidToken(format!("malformed subject '{}'", claims.sub)))?;

        match self.directory.find_user(user_id).await {
            Ok(Some(user)) => Ok(user),
            Ok(None) => Err(VerifyError::UnknownUser(user_id)),
            Err(err) => Err(VerifyError::Directory(err.to_string())),
        }
    }
}

/// トークンを発行する（ログインはこのサーバーの責務外。開発用シード・テスト用）
pub fn issue_token(
    secret: &str,
    user_id: UserId,
    ttl_secs: i64,
) -> Result<String, jsonwebtoken::errors::Error> {
    let exp = chrono::Utc::now() + chrono::Duration::seconds(ttl_secs);
    let claims = Claims {
        sub: user_id.to_string(),
        exp: exp.timestamp(),
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}
