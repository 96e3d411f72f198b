use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Telegram user id.
pub type UserId = i64;

pub const INITIAL_INTERACTION_SCORE: u32 = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub first_name: String,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub language_code: String,
    /// Chat model chosen by the user; `None` means the configured default.
    pub selected_model: Option<String>,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub message_count: u64,
    pub command_count: u64,
    pub favorite_count: u64,
    pub ticket_count: u64,
    pub interaction_score: u32,
    /// Running mean of per-message sentiment, in [-1, 1].
    pub sentiment_score: f64,
    pub topics: BTreeSet<String>,
    pub patterns: BTreeMap<String, Value>,
    /// Hash of the identity fields.
    pub vector: String,
    /// 1 at creation, +1 per profile update.
    pub temporal_version: u64,
    pub metadata: BTreeMap<String, Value>,
    #[serde(default)]
    pub notes: Vec<UserNote>,
}

/// Identity fields supplied by the chat platform on every interaction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserProfile {
    pub first_name: String,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub language_code: Option<String>,
}

/// Partial update; `None` leaves a field untouched. Metadata is merged key
/// by key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub language_code: Option<String>,
    pub selected_model: Option<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserNote {
    pub id: Uuid,
    pub text: String,
    pub created_at: DateTime<Utc>,
}
