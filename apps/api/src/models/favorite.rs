use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::user::UserId;

/// Display text is cut to this many characters; `full_text` keeps the rest.
pub const MAX_DISPLAY_CHARS: usize = 500;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Favorite {
    /// `"{user_id}-{fav_id}"`.
    pub id: String,
    pub user_id: UserId,
    pub text: String,
    pub full_text: String,
    pub context: FavoriteContext,
    pub metadata: FavoriteMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FavoriteContext {
    pub timestamp: DateTime<Utc>,
    pub conversation_id: Option<Uuid>,
    pub model: Option<String>,
    pub topic: Option<String>,
    pub sentiment: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FavoriteMetadata {
    /// Characters in the full text.
    pub length: usize,
    pub word_count: usize,
    pub hash: String,
}

/// Caller-supplied context for a new favorite.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FavoriteSource {
    pub conversation_id: Option<Uuid>,
    pub model: Option<String>,
}
