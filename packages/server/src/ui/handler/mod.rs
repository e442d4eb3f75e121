//! HTTP and WebSocket handlers.

mod http;
mod websocket;

pub use http::{debug_rooms, get_message_history, health_check, list_my_chats};
pub use websocket::websocket_handler;

use axum::http::{HeaderMap, header::AUTHORIZATION};

/// `Authorization: Bearer <token>` からトークンを取り出す（スキーム名は大文字小文字を区別しない）
fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("Bearer") {
        return None;
    }
    non_blank(token)
}

/// WebSocket 接続の資格情報: `token` クエリを優先し、空なら Authorization ヘッダー
fn session_credential(query_token: Option<&str>, headers: &HeaderMap) -> Option<String> {
    query_token.and_then(non_blank).or_else(|| bearer_token(headers))
}

/// 空白だけの値は無いものとして扱う
fn non_blank(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}
