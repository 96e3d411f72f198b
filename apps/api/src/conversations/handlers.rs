use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{ChatMessage, Conversation, UserId};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct SaveConversationRequest {
    pub user_id: UserId,
    pub messages: Vec<ChatMessage>,
    pub model: Option<String>,
}

/// POST /api/v1/conversations
pub async fn handle_save(
    State(state): State<AppState>,
    Json(req): Json<SaveConversationRequest>,
) -> Result<(StatusCode, Json<Conversation>), AppError> {
    let conversation = state
        .conversations
        .save(req.user_id, req.messages, req.model)
        .await?;
    Ok((StatusCode::CREATED, Json(conversation)))
}

/// GET /api/v1/conversations/:id
pub async fn handle_get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Conversation>, AppError> {
    let conversation = state
        .conversations
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Conversation {id} not found")))?;
    Ok(Json(conversation))
}

/// GET /api/v1/users/:id/conversations
pub async fn handle_list_by_user(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
) -> Result<Json<Vec<Conversation>>, AppError> {
    Ok(Json(state.conversations.list_by_user(user_id).await?))
}
