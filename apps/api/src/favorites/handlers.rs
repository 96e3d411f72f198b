use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::errors::AppError;
use crate::models::{Favorite, FavoriteSource, UserId};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct AddFavoriteRequest {
    pub text: String,
    #[serde(flatten)]
    pub source: FavoriteSource,
}

/// POST /api/v1/users/:id/favorites
pub async fn handle_add(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    Json(req): Json<AddFavoriteRequest>,
) -> Result<(StatusCode, Json<Favorite>), AppError> {
    let favorite = state.favorites.add(user_id, &req.text, req.source).await?;
    Ok((StatusCode::CREATED, Json(favorite)))
}

/// GET /api/v1/users/:id/favorites
pub async fn handle_list_by_user(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
) -> Result<Json<Vec<Favorite>>, AppError> {
    Ok(Json(state.favorites.list_by_user(user_id).await?))
}
