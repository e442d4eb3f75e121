//! WebSocket connection handlers.
//!
//! 1 接続 = 1 ルームセッション。状態は次のように遷移します。
//!
//! ```text
//! Connecting → Authenticating → Authorized → Active → Closed
//!                    └──────────────┴──→ Rejected
//! ```
//!
//! 拒否はアップグレード後に close コード付きで通知します（4401 / 4403 / 4404 / 1011）。

use std::{fmt, sync::Arc};

use axum::{
    extract::{
        Path, Query, State,
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade},
    },
    http::HeaderMap,
    response::IntoResponse,
};
use futures_util::{
    sink::SinkExt,
    stream::{SplitSink, SplitStream, StreamExt},
};
use serde::Deserialize;
use tokio::{sync::mpsc, task::JoinHandle};

use crate::{
    domain::{ChatId, ConnectionEntry, PushMessage, RoomMembership, VerifyError},
    infrastructure::dto::websocket::{ErrorFrame, InboundFrame, close_code},
    ui::state::AppState,
    usecase::{AuthorizeError, ConnectError, PublishError},
};

use super::session_credential;

/// Query parameters for WebSocket connection
#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    pub token: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    Authenticating,
    Active,
    Closed,
    Rejected,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Authenticating => "authenticating",
            SessionState::Active => "active",
            SessionState::Closed => "closed",
            SessionState::Rejected => "rejected",
        };
        f.write_str(name)
    }
}

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Path(chat_id): Path<i64>,
    Query(query): Query<ConnectQuery>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let credential = session_credential(query.token.as_deref(), &headers);
    let chat_id = ChatId::new(chat_id);

    ws.on_upgrade(move |socket| handle_socket(socket, state, chat_id, credential))
}

/// 拒否理由に対応する close コード
fn rejection_close_code(err: &ConnectError) -> u16 {
    match err {
        ConnectError::Authentication(VerifyError::Directory(_)) => close_code::INTERNAL_ERROR,
        ConnectError::Authentication(_) => close_code::AUTHENTICATION_FAILED,
        ConnectError::Authorization(AuthorizeError::NotFound(_)) => close_code::CHAT_NOT_FOUND,
        ConnectError::Authorization(AuthorizeError::Forbidden { .. }) => close_code::FORBIDDEN,
        ConnectError::Authorization(AuthorizeError::Storage(_)) => close_code::INTERNAL_ERROR,
    }
}

fn rejection_reason(err: &ConnectError) -> &'static str {
    match err {
        ConnectError::Authentication(VerifyError::Directory(_)) => "internal error",
        ConnectError::Authentication(_) => "authentication failed",
        ConnectError::Authorization(AuthorizeError::NotFound(_)) => "chat not found",
        ConnectError::Authorization(AuthorizeError::Forbidden { .. }) => "forbidden",
        ConnectError::Authorization(AuthorizeError::Storage(_)) => "internal error",
    }
}

fn close_message(code: u16, reason: impl Into<String>) -> Message {
    let reason: String = reason.into();
    Message::Close(Some(CloseFrame {
        code,
        reason: reason.into(),
    }))
}

/// Spawns a task that receives frames from the rx channel and pushes them to the WebSocket sender.
///
/// The task ends after sending a close frame, or when the client can no longer be written to.
fn pusher_loop(
    mut rx: mpsc::UnboundedReceiver<PushMessage>,
    mut sender: SplitSink<WebSocket, Message>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(push) = rx.recv().await {
            match push {
                PushMessage::Text(json) => {
                    if sender.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                }
                PushMessage::Close { code, reason } => {
                    let _ = sender.send(close_message(code, reason)).await;
                    break;
                }
            }
        }
    })
}

async fn handle_socket(
    socket: WebSocket,
    state: Arc<AppState>,
    chat_id: ChatId,
    credential: Option<String>,
) {
    let _session = state.sessions.track();
    let (mut sender, receiver) = socket.split();
    let (tx, rx) = mpsc::unbounded_channel();

    tracing::debug!("Room {} session {}", chat_id, SessionState::Authenticating);
    let membership = match state
        .connect_participant_usecase
        .execute(chat_id, credential.as_deref(), tx)
        .await
    {
        Ok(membership) => membership,
        Err(e) => {
            tracing::warn!(
                "Room {} session {}: {}",
                chat_id,
                SessionState::Rejected,
                e
            );
            let code = rejection_close_code(&e);
            if let Err(e) = sender
                .send(close_message(code, rejection_reason(&e)))
                .await
            {
                tracing::debug!("Failed to send close frame: {}", e);
            }
            return;
        }
    };
    tracing::debug!("Room {} session {}", chat_id, SessionState::Active);

    let send_task = pusher_loop(rx, sender);
    read_loop(&state, membership.entry(), receiver, send_task).await;

    // RoomMembership の drop で登録解除される
    state.disconnect_participant_usecase.execute(membership);
    tracing::debug!("Room {} session {}", chat_id, SessionState::Closed);
}

/// Reads client frames until the client goes away or the writer stops.
///
/// A frame is handled to completion before the next one is read, so a publish
/// in progress always finishes before the session is torn down.
async fn read_loop(
    state: &AppState,
    entry: &ConnectionEntry,
    mut receiver: SplitStream<WebSocket>,
    mut send_task: JoinHandle<()>,
) {
    loop {
        tokio::select! {
            frame = receiver.next() => match frame {
                Some(Ok(Message::Text(text))) => handle_text(state, entry, text.as_str()).await,
                Some(Ok(Message::Binary(_))) => {
                    tracing::warn!("Dropping binary frame from entry {}", entry.id);
                }
                Some(Ok(Message::Close(_))) | None => {
                    tracing::info!("User {} closed connection to room {}", entry.user.id, entry.chat_id);
                    break;
                }
                // Ping/pong is handled automatically by the WebSocket protocol
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::debug!("WebSocket error on entry {}: {}", entry.id, e);
                    break;
                }
            },
            _ = &mut send_task => {
                tracing::debug!("Writer of entry {} stopped", entry.id);
                break;
            }
        }
    }

    send_task.abort();
}

async fn handle_text(state: &AppState, entry: &ConnectionEntry, text: &str) {
    let frame = match serde_json::from_str::<InboundFrame>(text) {
        Ok(frame) => frame,
        Err(e) => {
            tracing::warn!("Dropping malformed frame from entry {}: {}", entry.id, e);
            return;
        }
    };

    match state.send_message_usecase.execute(entry, &frame.text).await {
        Ok(outcome) => {
            tracing::info!(
                "User {} sent message {} to room {} ({} delivered, {} dropped)",
                entry.user.id,
                outcome.message.id,
                entry.chat_id,
                outcome.delivered,
                outcome.dropped
            );
        }
        Err(PublishError::InvalidMessage(e)) => {
            tracing::debug!("Dropping invalid message from entry {}: {}", entry.id, e);
        }
        Err(PublishError::StorageError(e)) => {
            tracing::error!("Failed to persist message in room {}: {}", entry.chat_id, e);
            // 送信者にだけ通知する
            let notice = ErrorFrame::storage_error("message could not be saved");
            match serde_json::to_string(&notice) {
                Ok(json) => {
                    if let Err(e) = entry.deliver(&json) {
                        tracing::debug!("Failed to report storage error: {}", e);
                    }
                }
                Err(e) => tracing::error!("Failed to encode error frame: {}", e),
            }
        }
        Err(PublishError::Encoding(e)) => {
            tracing::error!("Failed to encode message frame: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UserId;

    #[test]
    fn test_rejection_close_codes() {
        // テスト項目: 拒否理由ごとの close コード
        // given (前提条件):
        let cases = [
            (
                ConnectError::Authentication(VerifyError::MissingCredential),
                close_code::AUTHENTICATION_FAILED,
            ),
            (
                ConnectError::Authentication(VerifyError::UnknownUser(UserId::new(9))),
                close_code::AUTHENTICATION_FAILED,
            ),
            (
                ConnectError::Authentication(VerifyError::Directory("down".to_string())),
                close_code::INTERNAL_ERROR,
            ),
            (
                ConnectError::Authorization(AuthorizeError::NotFound(ChatId::new(1))),
                close_code::CHAT_NOT_FOUND,
            ),
            (
                ConnectError::Authorization(AuthorizeError::Forbidden {
                    chat_id: ChatId::new(1),
                    user_id: UserId::new(4),
                }),
                close_code::FORBIDDEN,
            ),
            (
                ConnectError::Authorization(AuthorizeError::Storage("down".to_string())),
                close_code::INTERNAL_ERROR,
            ),
        ];

        for (err, expected) in cases {
            // when (操作):
            let code = rejection_close_code(&err);

            // then (期待する結果):
            assert_eq!(code, expected, "{err}");
        }
    }
}
