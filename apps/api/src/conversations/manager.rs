use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::analysis::{detect_topics, fingerprint, sentiment_score};
use crate::models::{ChatMessage, Conversation, UserId};
use crate::store::{Counter, EntityKind, Store, StoreError, StoreResult};

#[derive(Clone)]
pub struct ConversationManager {
    store: Arc<Store>,
}

impl ConversationManager {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    /// Always writes a new record; conversations are never updated.
    pub async fn save(
        &self,
        user_id: UserId,
        messages: Vec<ChatMessage>,
        model: Option<String>,
    ) -> StoreResult<Conversation> {
        if messages.is_empty() {
            return Err(StoreError::Validation("conversation has no messages".into()));
        }

        let bodies: Vec<&str> = messages.iter().map(|m| m.content.as_str()).collect();
        let joined = bodies.join(" ");
        let conversation = Conversation {
            id: Uuid::new_v4(),
            user_id,
            fingerprint: fingerprint(&bodies),
            sentiment: sentiment_score(&joined),
            topics: detect_topics(&joined),
            messages,
            model,
            created_at: Utc::now(),
        };

        self.store
            .put(EntityKind::Conversations, &conversation.id.to_string(), &conversation)
            .await?;
        self.store.counters().incr(Counter::Conversations);
        Ok(conversation)
    }

    pub async fn get(&self, id: Uuid) -> StoreResult<Option<Conversation>> {
        self.store.get(EntityKind::Conversations, &id.to_string()).await
    }

    /// Newest first; equal timestamps order by id.
    pub async fn list_by_user(&self, user_id: UserId) -> StoreResult<Vec<Conversation>> {
        let mut conversations: Vec<Conversation> = self
            .store
            .scan::<Conversation>(EntityKind::Conversations)
            .await?
            .into_iter()
            .filter(|c| c.user_id == user_id)
            .collect();
        conversations.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(conversations)
    }
}
