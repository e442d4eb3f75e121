//! HTTP API endpoint handlers.

use std::{fmt, sync::Arc};

use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
};

use crate::{
    domain::{ChatId, VerifyError},
    infrastructure::dto::http::{ChatSummaryDto, MessageDto, RoomSummaryDto},
    ui::state::AppState,
    usecase::{AuthorizeError, HistoryError, ListChatsError},
};

use super::bearer_token;

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Chats where the bearer is buyer or seller, newest first
pub async fn list_my_chats(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<ChatSummaryDto>>, StatusCode> {
    let credential = bearer_token(&headers);
    match state
        .list_my_chats_usecase
        .execute(credential.as_deref())
        .await
    {
        // Domain Model から DTO への変換
        Ok(chats) => Ok(Json(chats.iter().map(ChatSummaryDto::from).collect())),
        Err(e) => Err(reject("list my chats", list_status_for(&e), &e)),
    }
}

/// Message history of a chat in persistence order
pub async fn get_message_history(
    State(state): State<Arc<AppState>>,
    Path(chat_id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<Vec<MessageDto>>, StatusCode> {
    let credential = bearer_token(&headers);
    match state
        .get_message_history_usecase
        .execute(ChatId::new(chat_id), credential.as_deref())
        .await
    {
        Ok(messages) => Ok(Json(messages.iter().map(MessageDto::from).collect())),
        Err(e) => Err(reject("get message history", history_status_for(&e), &e)),
    }
}

/// Debug endpoint listing live rooms and their connected members
pub async fn debug_rooms(State(state): State<Arc<AppState>>) -> Json<Vec<RoomSummaryDto>> {
    let rooms = state.get_rooms_usecase.execute();
    Json(rooms.iter().map(RoomSummaryDto::from).collect())
}

fn reject(operation: &str, status: StatusCode, err: &dyn fmt::Display) -> StatusCode {
    if status.is_server_error() {
        tracing::error!("Failed to {}: {}", operation, err);
    } else {
        tracing::debug!("Rejected {}: {}", operation, err);
    }
    status
}

fn history_status_for(err: &HistoryError) -> StatusCode {
    match err {
        HistoryError::Authentication(VerifyError::Directory(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        HistoryError::Authentication(_) => StatusCode::UNAUTHORIZED,
        HistoryError::Authorization(AuthorizeError::NotFound(_)) => StatusCode::NOT_FOUND,
        HistoryError::Authorization(AuthorizeError::Forbidden { .. }) => StatusCode::FORBIDDEN,
        HistoryError::Authorization(AuthorizeError::Storage(_)) | HistoryError::Storage(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn list_status_for(err: &ListChatsError) -> StatusCode {
    match err {
        ListChatsError::Authentication(VerifyError::Directory(_)) | ListChatsError::Storage(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        ListChatsError::Authentication(_) => StatusCode::UNAUTHORIZED,
    }
}
