use std::sync::Arc;

use chrono::Utc;
use tracing::warn;
use uuid::Uuid;

use crate::analysis::{content_hash, detect_topics, sentiment_score};
use crate::models::favorite::MAX_DISPLAY_CHARS;
use crate::models::{Favorite, FavoriteContext, FavoriteMetadata, FavoriteSource, UserId};
use crate::store::{Counter, EntityKind, Store, StoreError, StoreResult};
use crate::users::UserManager;

#[derive(Clone)]
pub struct FavoriteManager {
    store: Arc<Store>,
    users: UserManager,
}

impl FavoriteManager {
    pub fn new(store: Arc<Store>, users: UserManager) -> Self {
        Self { store, users }
    }

    /// Writes the favorite, then bumps the owner's `favorite_count`.
    ///
    /// If the bump fails the favorite file is removed again, so the counter
    /// never exceeds the number of favorite files. An unknown owner keeps the
    /// favorite without a counter to bump.
    pub async fn add(&self, user_id: UserId, text: &str, source: FavoriteSource) -> StoreResult<Favorite> {
        let full_text = text.trim();
        if full_text.is_empty() {
            return Err(StoreError::Validation("favorite text must not be empty".into()));
        }

        let favorite = build_favorite(user_id, full_text, source);
        self.store
            .put(EntityKind::Favorites, &favorite.id, &favorite)
            .await?;

        match self.users.increment_favorites(user_id).await {
            Ok(Some(_)) => {}
            Ok(None) => warn!("Favorite {} saved for unknown user {user_id}", favorite.id),
            Err(e) => {
                if let Err(undo) = self.store.remove(EntityKind::Favorites, &favorite.id).await {
                    warn!("Could not roll back favorite {}: {undo}", favorite.id);
                }
                return Err(e);
            }
        }

        self.store.counters().incr(Counter::Favorites);
        Ok(favorite)
    }

    pub async fn get(&self, id: &str) -> StoreResult<Option<Favorite>> {
        self.store.get(EntityKind::Favorites, id).await
    }

    /// Scans the whole favorites directory, filtered by owner prefix.
    /// Newest first.
    pub async fn list_by_user(&self, user_id: UserId) -> StoreResult<Vec<Favorite>> {
        let prefix = format!("{user_id}-");
        let mut favorites: Vec<Favorite> = self
            .store
            .scan_prefix(EntityKind::Favorites, &prefix)
            .await?;
        favorites.sort_by(|a, b| {
            b.context
                .timestamp
                .cmp(&a.context.timestamp)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(favorites)
    }
}

fn build_favorite(user_id: UserId, full_text: &str, source: FavoriteSource) -> Favorite {
    let fav_id = Uuid::new_v4().simple().to_string();
    Favorite {
        id: format!("{user_id}-{}", &fav_id[..12]),
        user_id,
        text: full_text.chars().take(MAX_DISPLAY_CHARS).collect(),
        full_text: full_text.to_string(),
        context: FavoriteContext {
            timestamp: Utc::now(),
            conversation_id: source.conversation_id,
            model: source.model,
            topic: detect_topics(full_text).into_iter().next(),
            sentiment: sentiment_score(full_text),
        },
        metadata: FavoriteMetadata {
            length: full_text.chars().count(),
            word_count: full_text.split_whitespace().count(),
            hash: content_hash(full_text),
        },
    }
}
