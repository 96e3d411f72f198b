pub mod auth;
pub mod backups;
pub mod health;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::state::AppState;
use crate::{chat, conversations, favorites, stats, tickets, users};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Stats & maintenance
        .route("/api/v1/stats", get(stats::handlers::handle_stats))
        .route("/api/v1/stats/counters", get(stats::handlers::handle_counters))
        .route("/api/v1/backups", post(backups::handle_backup))
        // Users
        .route(
            "/api/v1/users",
            get(users::handlers::handle_list_ids).post(users::handlers::handle_register),
        )
        .route(
            "/api/v1/users/:id",
            get(users::handlers::handle_get_user).patch(users::handlers::handle_update_user),
        )
        .route("/api/v1/users/:id/notes", post(users::handlers::handle_add_note))
        .route(
            "/api/v1/users/:id/favorites",
            get(favorites::handlers::handle_list_by_user).post(favorites::handlers::handle_add),
        )
        .route(
            "/api/v1/users/:id/conversations",
            get(conversations::handlers::handle_list_by_user),
        )
        .route(
            "/api/v1/users/:id/tickets",
            get(tickets::handlers::handle_list_by_user),
        )
        // Conversations
        .route("/api/v1/conversations", post(conversations::handlers::handle_save))
        .route("/api/v1/conversations/:id", get(conversations::handlers::handle_get))
        // Tickets
        .route(
            "/api/v1/tickets",
            get(tickets::handlers::handle_list).post(tickets::handlers::handle_create),
        )
        .route("/api/v1/tickets/:id", get(tickets::handlers::handle_get))
        .route("/api/v1/tickets/:id/replies", post(tickets::handlers::handle_reply))
        .route("/api/v1/tickets/:id/close", post(tickets::handlers::handle_close))
        .route("/api/v1/tickets/:id/reopen", post(tickets::handlers::handle_reopen))
        .route(
            "/api/v1/tickets/:id/progress",
            post(tickets::handlers::handle_start_progress),
        )
        // Chat proxy
        .route("/api/v1/chat", post(chat::handlers::handle_chat))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_admin_token,
        ))
        // Unauthenticated
        .route("/health", get(health::health_handler))
        .with_state(state)
}
