use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::chat::prompts::system_prompt;
use crate::errors::AppError;
use crate::llm_client::is_available_model;
use crate::models::{ChatMessage, User, UserId, UserProfile};
use crate::state::AppState;

/// Earlier turns beyond this are dropped before the call.
const MAX_HISTORY: usize = 20;

#[derive(Deserialize)]
pub struct ChatRequest {
    pub user_id: UserId,
    pub profile: UserProfile,
    pub message: String,
    #[serde(default)]
    pub history: Vec<ChatMessage>,
    /// Overrides the user's selected model for this turn.
    pub model: Option<String>,
    /// Persist the exchange as a conversation record.
    #[serde(default)]
    pub save: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub reply: String,
    pub model: String,
    pub conversation_id: Option<Uuid>,
}

/// POST /api/v1/chat
/// Registers the sender, folds the message into their profile, proxies the
/// turn to the model and optionally saves the exchange.
pub async fn handle_chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    let text = req.message.trim();
    if text.is_empty() {
        return Err(AppError::Validation("message must not be empty".into()));
    }
    if let Some(model) = req.model.as_deref() {
        if !is_available_model(model) {
            return Err(AppError::Validation(format!("unknown model '{model}'")));
        }
    }

    let registered = state.users.register(req.user_id, req.profile).await?;
    let user = state
        .users
        .observe_message(req.user_id, text)
        .await?
        .unwrap_or(registered);
    let model = pick_model(req.model, &user, &state.config.groq_model);

    let skip = req.history.len().saturating_sub(MAX_HISTORY);
    let mut messages: Vec<ChatMessage> = req.history.into_iter().skip(skip).collect();
    messages.push(ChatMessage::user(text));

    let reply = state
        .llm
        .complete(&model, &system_prompt(&user), &messages)
        .await?;

    let conversation_id = if req.save {
        messages.push(ChatMessage::assistant(reply.clone()));
        match state
            .conversations
            .save(req.user_id, messages, Some(model.clone()))
            .await
        {
            Ok(conversation) => Some(conversation.id),
            Err(e) => {
                warn!("Could not save conversation for {}: {e}", req.user_id);
                None
            }
        }
    } else {
        None
    };

    Ok(Json(ChatResponse {
        reply,
        model,
        conversation_id,
    }))
}

/// Request override, then the user's choice, then the configured default.
fn pick_model(requested: Option<String>, user: &User, default: &str) -> String {
    requested
        .or_else(|| user.selected_model.clone().filter(|m| is_available_model(m)))
        .unwrap_or_else(|| default.to_string())
}
