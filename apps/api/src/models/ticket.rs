use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::user::UserId;

pub const TICKET_ID_PREFIX: &str = "TKT-";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Open,
    InProgress,
    Closed,
}

impl TicketStatus {
    pub fn can_transition_to(self, next: TicketStatus) -> bool {
        use TicketStatus::*;
        matches!(
            (self, next),
            (Open, InProgress) | (Open, Closed) | (InProgress, Closed) | (InProgress, Open) | (Closed, Open)
        )
    }

    pub fn is_closed(self) -> bool {
        self == TicketStatus::Closed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Urgent,
    High,
    Medium,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Technical,
    Billing,
    Feature,
    Account,
    General,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyAuthor {
    User,
    Admin,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketReply {
    pub message: String,
    pub author: ReplyAuthor,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketAnalysis {
    pub complexity: Complexity,
    pub requires_attention: bool,
    pub suggested_response: String,
    pub estimated_resolution: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: String,
    pub user_id: UserId,
    pub user_name: String,
    pub message: String,
    pub status: TicketStatus,
    pub priority: Priority,
    pub category: Category,
    pub sentiment: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Set iff `status` is `Closed`.
    pub closed_at: Option<DateTime<Utc>>,
    pub replies: Vec<TicketReply>,
    pub tags: Vec<String>,
    pub analysis: TicketAnalysis,
}
