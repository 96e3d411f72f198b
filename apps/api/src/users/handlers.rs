use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::llm_client::{is_available_model, AVAILABLE_MODELS};
use crate::models::{User, UserId, UserNote, UserProfile, UserUpdate};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub id: UserId,
    #[serde(flatten)]
    pub profile: UserProfile,
}

#[derive(Serialize)]
pub struct UserIdsResponse {
    pub ids: Vec<UserId>,
}

#[derive(Deserialize)]
pub struct NoteRequest {
    pub text: String,
}

fn user_not_found(id: UserId) -> AppError {
    AppError::NotFound(format!("User {id} not found"))
}

/// POST /api/v1/users
pub async fn handle_register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<User>, AppError> {
    let user = state.users.register(req.id, req.profile).await?;
    Ok(Json(user))
}

/// GET /api/v1/users
pub async fn handle_list_ids(State(state): State<AppState>) -> Result<Json<UserIdsResponse>, AppError> {
    let ids = state.users.list_ids().await?;
    Ok(Json(UserIdsResponse { ids }))
}

/// GET /api/v1/users/:id
pub async fn handle_get_user(
    State(state): State<AppState>,
    Path(id): Path<UserId>,
) -> Result<Json<User>, AppError> {
    let user = state.users.get(id).await?.ok_or_else(|| user_not_found(id))?;
    Ok(Json(user))
}

/// PATCH /api/v1/users/:id
pub async fn handle_update_user(
    State(state): State<AppState>,
    Path(id): Path<UserId>,
    Json(changes): Json<UserUpdate>,
) -> Result<Json<User>, AppError> {
    if let Some(model) = changes.selected_model.as_deref() {
        if !is_available_model(model) {
            return Err(AppError::Validation(format!(
                "unknown model '{model}', expected one of: {}",
                AVAILABLE_MODELS.join(", ")
            )));
        }
    }
    let user = state
        .users
        .update(id, changes)
        .await?
        .ok_or_else(|| user_not_found(id))?;
    Ok(Json(user))
}

/// POST /api/v1/users/:id/notes
pub async fn handle_add_note(
    State(state): State<AppState>,
    Path(id): Path<UserId>,
    Json(req): Json<NoteRequest>,
) -> Result<Json<UserNote>, AppError> {
    let note = state
        .users
        .add_note(id, &req.text)
        .await?
        .ok_or_else(|| user_not_found(id))?;
    Ok(Json(note))
}
