use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::errors::AppError;
use crate::models::{ReplyAuthor, Ticket, TicketStatus, UserId};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CreateTicketRequest {
    pub user_id: UserId,
    pub user_name: String,
    pub message: String,
}

#[derive(Deserialize)]
pub struct StatusQuery {
    pub status: Option<TicketStatus>,
}

#[derive(Deserialize)]
pub struct ReplyRequest {
    pub message: String,
    /// Replies arrive through the admin surface unless stated otherwise.
    #[serde(default = "default_author")]
    pub author: ReplyAuthor,
}

fn default_author() -> ReplyAuthor {
    ReplyAuthor::Admin
}

fn found(id: &str, ticket: Option<Ticket>) -> Result<Json<Ticket>, AppError> {
    ticket
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Ticket {id} not found")))
}

/// POST /api/v1/tickets
pub async fn handle_create(
    State(state): State<AppState>,
    Json(req): Json<CreateTicketRequest>,
) -> Result<(StatusCode, Json<Ticket>), AppError> {
    let ticket = state
        .tickets
        .create(req.user_id, &req.user_name, &req.message)
        .await?;
    Ok((StatusCode::CREATED, Json(ticket)))
}

/// GET /api/v1/tickets?status=open
pub async fn handle_list(
    State(state): State<AppState>,
    Query(params): Query<StatusQuery>,
) -> Result<Json<Vec<Ticket>>, AppError> {
    Ok(Json(state.tickets.list(params.status).await?))
}

/// GET /api/v1/tickets/:id
pub async fn handle_get(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Ticket>, AppError> {
    found(&id, state.tickets.get(&id).await?)
}

/// POST /api/v1/tickets/:id/replies
pub async fn handle_reply(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ReplyRequest>,
) -> Result<Json<Ticket>, AppError> {
    found(&id, state.tickets.add_reply(&id, &req.message, req.author).await?)
}

/// POST /api/v1/tickets/:id/close
pub async fn handle_close(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Ticket>, AppError> {
    found(&id, state.tickets.close(&id).await?)
}

/// POST /api/v1/tickets/:id/reopen
pub async fn handle_reopen(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Ticket>, AppError> {
    found(&id, state.tickets.reopen(&id).await?)
}

/// POST /api/v1/tickets/:id/progress
pub async fn handle_start_progress(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Ticket>, AppError> {
    found(&id, state.tickets.start_progress(&id).await?)
}

/// GET /api/v1/users/:id/tickets
pub async fn handle_list_by_user(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
) -> Result<Json<Vec<Ticket>>, AppError> {
    Ok(Json(state.tickets.list_by_user(user_id).await?))
}
