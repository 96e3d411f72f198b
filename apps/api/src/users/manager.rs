use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::analysis::{detect_topics, fingerprint, sentiment_score};
use crate::models::user::INITIAL_INTERACTION_SCORE;
use crate::models::{User, UserId, UserNote, UserProfile, UserUpdate};
use crate::store::{Counter, EntityKind, Store, StoreError, StoreResult};

const DEFAULT_LANGUAGE: &str = "en";
const MAX_NOTE_CHARS: usize = 2_000;

/// Creates and mutates user records. Every read-modify-write holds the
/// user's lock.
#[derive(Clone)]
pub struct UserManager {
    store: Arc<Store>,
}

impl UserManager {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    pub async fn get(&self, id: UserId) -> StoreResult<Option<User>> {
        self.store.get(EntityKind::Users, &id.to_string()).await
    }

    /// First sighting creates the record; later sightings bump `last_seen`
    /// and `message_count`.
    pub async fn register(&self, id: UserId, profile: UserProfile) -> StoreResult<User> {
        let key = id.to_string();
        let _guard = self.store.lock(EntityKind::Users, &key).await;

        let user = match self.store.get::<User>(EntityKind::Users, &key).await? {
            Some(mut user) => {
                user.message_count += 1;
                touch(&mut user);
                user
            }
            None => {
                let user = new_user(id, profile);
                self.store.counters().incr(Counter::Users);
                info!("Registered user {id}");
                user
            }
        };
        self.store.put(EntityKind::Users, &key, &user).await?;
        Ok(user)
    }

    /// Merges `changes`, refreshes `last_seen`, bumps `temporal_version`.
    /// Unknown users yield `None`; nothing is created.
    pub async fn update(&self, id: UserId, changes: UserUpdate) -> StoreResult<Option<User>> {
        if let Some(code) = &changes.language_code {
            validate_language_code(code)?;
        }
        if changes.first_name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(StoreError::Validation("first_name must not be empty".into()));
        }

        self.modify(id, |user| {
            let UserUpdate {
                first_name,
                last_name,
                username,
                language_code,
                selected_model,
                metadata,
            } = changes;
            if let Some(v) = first_name {
                user.first_name = v;
            }
            if let Some(v) = last_name {
                user.last_name = Some(v);
            }
            if let Some(v) = username {
                user.username = Some(v);
            }
            if let Some(v) = language_code {
                user.language_code = v;
            }
            if let Some(v) = selected_model {
                user.selected_model = Some(v);
            }
            user.metadata.extend(metadata);
            user.vector = identity_vector(user.id, &user.first_name, user.username.as_deref());
            user.temporal_version += 1;
        })
        .await
    }

    pub async fn record_command(&self, id: UserId) -> StoreResult<Option<User>> {
        self.modify(id, |user| user.command_count += 1).await
    }

    /// Folds a message into the running sentiment and observed topics.
    pub async fn observe_message(&self, id: UserId, text: &str) -> StoreResult<Option<User>> {
        let score = sentiment_score(text);
        let topics = detect_topics(text);
        self.modify(id, |user| {
            user.sentiment_score = (user.sentiment_score + score) / 2.0;
            user.topics.extend(topics);
            user.interaction_score = user.interaction_score.saturating_add(1);
        })
        .await
    }

    pub async fn add_note(&self, id: UserId, text: &str) -> StoreResult<Option<UserNote>> {
        let text = text.trim();
        if text.is_empty() {
            return Err(StoreError::Validation("note must not be empty".into()));
        }
        let note = UserNote {
            id: Uuid::new_v4(),
            text: text.chars().take(MAX_NOTE_CHARS).collect(),
            created_at: Utc::now(),
        };
        let user = self.modify(id, |user| user.notes.push(note.clone())).await?;
        Ok(user.map(|_| note))
    }

    pub async fn increment_favorites(&self, id: UserId) -> StoreResult<Option<User>> {
        self.modify(id, |user| user.favorite_count += 1).await
    }

    pub async fn increment_tickets(&self, id: UserId) -> StoreResult<Option<User>> {
        self.modify(id, |user| user.ticket_count += 1).await
    }

    /// Every registered user id; the broadcast target list.
    pub async fn list_ids(&self) -> StoreResult<Vec<UserId>> {
        let mut ids: Vec<UserId> = self
            .store
            .records()
            .list(EntityKind::Users)
            .await?
            .iter()
            .filter_map(|id| id.parse().ok())
            .collect();
        ids.sort_unstable();
        Ok(ids)
    }

    async fn modify(&self, id: UserId, f: impl FnOnce(&mut User)) -> StoreResult<Option<User>> {
        let key = id.to_string();
        let _guard = self.store.lock(EntityKind::Users, &key).await;
        let Some(mut user) = self.store.get::<User>(EntityKind::Users, &key).await? else {
            return Ok(None);
        };
        f(&mut user);
        touch(&mut user);
        self.store.put(EntityKind::Users, &key, &user).await?;
        Ok(Some(user))
    }
}

fn new_user(id: UserId, profile: UserProfile) -> User {
    let language_code = profile
        .language_code
        .filter(|c| validate_language_code(c).is_ok())
        .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());
    let now = Utc::now();
    User {
        id,
        vector: identity_vector(id, &profile.first_name, profile.username.as_deref()),
        first_name: profile.first_name,
        last_name: profile.last_name,
        username: profile.username,
        language_code,
        selected_model: None,
        first_seen: now,
        last_seen: now,
        message_count: 0,
        command_count: 0,
        favorite_count: 0,
        ticket_count: 0,
        interaction_score: INITIAL_INTERACTION_SCORE,
        sentiment_score: 0.0,
        topics: Default::default(),
        patterns: Default::default(),
        temporal_version: 1,
        metadata: Default::default(),
        notes: Vec::new(),
    }
}

fn touch(user: &mut User) {
    user.last_seen = Utc::now().max(user.first_seen);
}

fn identity_vector(id: UserId, first_name: &str, username: Option<&str>) -> String {
    fingerprint(&[&id.to_string(), first_name, username.unwrap_or("")])
}

/// IETF-ish: 2-8 ASCII letters, optional `-region`.
fn validate_language_code(code: &str) -> StoreResult<()> {
    let valid = !code.is_empty()
        && code.len() <= 16
        && code.split('-').all(|part| {
            (2..=8).contains(&part.len()) && part.chars().all(|c| c.is_ascii_alphanumeric())
        });
    if valid {
        Ok(())
    } else {
        Err(StoreError::Validation(format!("invalid language code '{code}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_support::temp_store;

    fn profile(name: &str) -> UserProfile {
        UserProfile {
            first_name: name.to_string(),
            username: Some(name.to_lowercase()),
            language_code: Some("ru".into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_unregistered_user_is_none() {
        let (_dir, store) = temp_store().await;
        let users = UserManager::new(store);
        assert!(users.get(404).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_register_creates_then_bumps() {
        let (_dir, store) = temp_store().await;
        let users = UserManager::new(store.clone());

        let created = users.register(7, profile("Ada")).await.unwrap();
        assert_eq!(created.message_count, 0);
        assert_eq!(created.interaction_score, INITIAL_INTERACTION_SCORE);
        assert_eq!(created.temporal_version, 1);
        assert_eq!(created.language_code, "ru");
        assert_eq!(created.first_seen, created.last_seen);

        let again = users.register(7, profile("Ada")).await.unwrap();
        assert_eq!(again.message_count, 1);
        assert!(again.last_seen >= again.first_seen);
        assert_eq!(again.first_seen, created.first_seen);
        assert_eq!(store.counters().snapshot().users, 1);
    }

    #[tokio::test]
    async fn test_invalid_language_falls_back_to_default() {
        let (_dir, store) = temp_store().await;
        let users = UserManager::new(store);
        let mut p = profile("Bob");
        p.language_code = Some("!!".into());
        assert_eq!(users.register(1, p).await.unwrap().language_code, DEFAULT_LANGUAGE);
    }

    #[tokio::test]
    async fn test_temporal_version_counts_updates() {
        let (_dir, store) = temp_store().await;
        let users = UserManager::new(store);
        users.register(3, profile("Cy")).await.unwrap();

        let n = 5;
        for i in 0..n {
            let changes = UserUpdate {
                username: Some(format!("cy{i}")),
                ..Default::default()
            };
            users.update(3, changes).await.unwrap().unwrap();
        }
        // interaction bumps are not profile revisions
        users.record_command(3).await.unwrap();
        users.observe_message(3, "hello").await.unwrap();

        let user = users.get(3).await.unwrap().unwrap();
        assert_eq!(user.temporal_version, 1 + n);
        assert_eq!(user.username.as_deref(), Some("cy4"));
        assert_eq!(user.command_count, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_readers_do_not_lose_updates() {
        let (_dir, store) = temp_store().await;
        let users = UserManager::new(store.clone());

        for id in 0..100 {
            users.register(id, profile("Eve")).await.unwrap();
            store.cache().invalidate(&EntityKind::Users.cache_key(&id.to_string()));

            let readers: Vec<_> = (0..4)
                .map(|_| {
                    let users = users.clone();
                    tokio::spawn(async move { users.get(id).await.unwrap() })
                })
                .collect();
            let writer = {
                let users = users.clone();
                tokio::spawn(async move {
                    let changes = UserUpdate {
                        username: Some("first".into()),
                        ..Default::default()
                    };
                    users.update(id, changes).await.unwrap()
                })
            };
            for reader in readers {
                reader.await.unwrap();
            }
            writer.await.unwrap();

            let changes = UserUpdate {
                username: Some("second".into()),
                ..Default::default()
            };
            let user = users.update(id, changes).await.unwrap().unwrap();
            assert_eq!(user.temporal_version, 3, "user {id} lost an update");
        }
    }

    #[tokio::test]
    async fn test_update_unknown_user_creates_nothing() {
        let (_dir, store) = temp_store().await;
        let users = UserManager::new(store.clone());
        let result = users.update(99, UserUpdate::default()).await.unwrap();
        assert!(result.is_none());
        assert!(store.records().list(EntityKind::Users).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_rejects_bad_language() {
        let (_dir, store) = temp_store().await;
        let users = UserManager::new(store);
        users.register(3, profile("Cy")).await.unwrap();
        let err = users
            .update(
                3,
                UserUpdate {
                    language_code: Some("x".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[tokio::test]
    async fn test_update_merges_metadata_and_refreshes_vector() {
        let (_dir, store) = temp_store().await;
        let users = UserManager::new(store);
        let created = users.register(5, profile("Eve")).await.unwrap();

        let mut metadata = std::collections::BTreeMap::new();
        metadata.insert("plan".to_string(), serde_json::json!("pro"));
        let updated = users
            .update(
                5,
                UserUpdate {
                    first_name: Some("Evelyn".into()),
                    selected_model: Some("llama-3.1-8b-instant".into()),
                    metadata,
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.metadata["plan"], "pro");
        assert_eq!(updated.selected_model.as_deref(), Some("llama-3.1-8b-instant"));
        assert_ne!(updated.vector, created.vector);
    }

    #[tokio::test]
    async fn test_observe_message_tracks_sentiment_and_topics() {
        let (_dir, store) = temp_store().await;
        let users = UserManager::new(store);
        users.register(8, profile("Dan")).await.unwrap();
        let user = users
            .observe_message(8, "I love this python code")
            .await
            .unwrap()
            .unwrap();
        assert!((user.sentiment_score - 0.5).abs() < 1e-9);
        assert!(user.topics.contains("tech"));
        assert_eq!(user.interaction_score, INITIAL_INTERACTION_SCORE + 1);
    }

    #[tokio::test]
    async fn test_notes_and_list_ids() {
        let (_dir, store) = temp_store().await;
        let users = UserManager::new(store);
        users.register(20, profile("A")).await.unwrap();
        users.register(10, profile("B")).await.unwrap();

        let note = users.add_note(10, "  buy milk ").await.unwrap().unwrap();
        assert_eq!(note.text, "buy milk");
        assert!(users.add_note(11, "x").await.unwrap().is_none());
        assert!(users.add_note(10, "   ").await.is_err());

        assert_eq!(users.list_ids().await.unwrap(), vec![10, 20]);
        assert_eq!(users.get(10).await.unwrap().unwrap().notes.len(), 1);
    }
}
