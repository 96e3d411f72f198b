//! Aggregator: cross-entity statistics computed by enumerating every record
//! of each kind on every call, plus reconciliation of the live counters.
//!
//! The projections are naive multipliers, not forecasts.

use std::sync::Arc;

use chrono::{DateTime, Duration, Timelike, Utc};
use serde::Serialize;
use tracing::info;

use crate::models::{Conversation, Favorite, Priority, ReplyAuthor, Ticket, TicketStatus, User};
use crate::store::{CounterSnapshot, EntityKind, Store, StoreResult};

const USER_GROWTH: f64 = 1.1;
const TICKET_GROWTH: f64 = 1.05;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UserStats {
    pub total: u64,
    pub active_24h: u64,
    pub active_7d: u64,
    pub new_24h: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TicketStats {
    pub total: u64,
    pub open: u64,
    pub in_progress: u64,
    pub closed: u64,
    /// Urgent tickets that are not closed.
    pub urgent: u64,
    /// Mean minutes from creation to the first admin reply, over tickets
    /// that have one.
    pub avg_first_reply_minutes: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FavoriteStats {
    pub total: u64,
    pub avg_per_user: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConversationStats {
    pub total: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Projections {
    pub next_week_users: f64,
    pub next_day_tickets: f64,
    pub peak_hour: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stats {
    pub generated_at: DateTime<Utc>,
    pub users: UserStats,
    pub tickets: TicketStats,
    pub favorites: FavoriteStats,
    pub conversations: ConversationStats,
    pub projections: Projections,
}

#[derive(Clone)]
pub struct Aggregator {
    store: Arc<Store>,
}

impl Aggregator {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    pub async fn stats(&self) -> StoreResult<Stats> {
        let users: Vec<User> = self.store.scan(EntityKind::Users).await?;
        let tickets: Vec<Ticket> = self.store.scan(EntityKind::Tickets).await?;
        let favorites = self.store.scan::<Favorite>(EntityKind::Favorites).await?.len() as u64;
        let conversations = self
            .store
            .scan::<Conversation>(EntityKind::Conversations)
            .await?
            .len() as u64;
        Ok(compute_stats(&users, &tickets, favorites, conversations, Utc::now()))
    }

    pub fn counters(&self) -> CounterSnapshot {
        self.store.counters().snapshot()
    }

    /// Replaces the live counters with totals from a full scan.
    pub async fn reconcile(&self) -> StoreResult<CounterSnapshot> {
        let before = self.store.counters().snapshot();
        let tickets: Vec<Ticket> = self.store.scan(EntityKind::Tickets).await?;
        let records = self.store.records();
        let snapshot = CounterSnapshot {
            users: records.list(EntityKind::Users).await?.len() as u64,
            conversations: records.list(EntityKind::Conversations).await?.len() as u64,
            favorites: records.list(EntityKind::Favorites).await?.len() as u64,
            tickets: tickets.len() as u64,
            open_tickets: tickets.iter().filter(|t| !t.status.is_closed()).count() as u64,
        };
        self.store.counters().reset(snapshot);
        if before != snapshot {
            info!("Counters reconciled: {before:?} -> {snapshot:?}");
        }
        Ok(snapshot)
    }
}

pub fn compute_stats(
    users: &[User],
    tickets: &[Ticket],
    favorites: u64,
    conversations: u64,
    now: DateTime<Utc>,
) -> Stats {
    let user_stats = user_stats(users, now);
    let ticket_stats = ticket_stats(tickets);
    let avg_per_user = if user_stats.total == 0 {
        0.0
    } else {
        favorites as f64 / user_stats.total as f64
    };

    Stats {
        generated_at: now,
        projections: Projections {
            next_week_users: user_stats.total as f64 * USER_GROWTH,
            next_day_tickets: ticket_stats.total as f64 * TICKET_GROWTH,
            peak_hour: (now.hour() + 1) % 24,
        },
        users: user_stats,
        tickets: ticket_stats,
        favorites: FavoriteStats {
            total: favorites,
            avg_per_user,
        },
        conversations: ConversationStats {
            total: conversations,
        },
    }
}

fn user_stats(users: &[User], now: DateTime<Utc>) -> UserStats {
    let day_ago = now - Duration::hours(24);
    let week_ago = now - Duration::hours(168);
    let mut stats = UserStats {
        total: users.len() as u64,
        ..Default::default()
    };
    for user in users {
        stats.active_24h += u64::from(user.last_seen >= day_ago);
        stats.active_7d += u64::from(user.last_seen >= week_ago);
        stats.new_24h += u64::from(user.first_seen >= day_ago);
    }
    stats
}

fn ticket_stats(tickets: &[Ticket]) -> TicketStats {
    let mut stats = TicketStats {
        total: tickets.len() as u64,
        ..Default::default()
    };
    let mut reply_minutes = Vec::new();

    for ticket in tickets {
        match ticket.status {
            TicketStatus::Open => stats.open += 1,
            TicketStatus::InProgress => stats.in_progress += 1,
            TicketStatus::Closed => stats.closed += 1,
        }
        if ticket.priority == Priority::Urgent && !ticket.status.is_closed() {
            stats.urgent += 1;
        }
        if let Some(reply) = ticket.replies.iter().find(|r| r.author == ReplyAuthor::Admin) {
            let elapsed = reply.timestamp - ticket.created_at;
            reply_minutes.push(elapsed.num_seconds().max(0) as f64 / 60.0);
        }
    }

    if !reply_minutes.is_empty() {
        stats.avg_first_reply_minutes =
            Some(reply_minutes.iter().sum::<f64>() / reply_minutes.len() as f64);
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::favorites::FavoriteManager;
    use crate::models::{FavoriteSource, TicketReply, UserProfile};
    use crate::store::test_support::temp_store;
    use crate::tickets::TicketManager;
    use crate::users::UserManager;
    use chrono::TimeZone;

    fn user(id: i64, first_seen: DateTime<Utc>, last_seen: DateTime<Utc>) -> User {
        User {
            id,
            first_name: "U".into(),
            last_name: None,
            username: None,
            language_code: "en".into(),
            selected_model: None,
            first_seen,
            last_seen,
            message_count: 0,
            command_count: 0,
            favorite_count: 0,
            ticket_count: 0,
            interaction_score: 100,
            sentiment_score: 0.0,
            topics: Default::default(),
            patterns: Default::default(),
            vector: String::new(),
            temporal_version: 1,
            metadata: Default::default(),
            notes: Vec::new(),
        }
    }

    fn ticket(status: TicketStatus, priority: Priority, created_at: DateTime<Utc>) -> Ticket {
        let derived = crate::analysis::triage("question");
        Ticket {
            id: "TKT-00000000".into(),
            user_id: 1,
            user_name: "U".into(),
            message: "question".into(),
            status,
            priority,
            category: derived.category,
            sentiment: 0.0,
            created_at,
            updated_at: created_at,
            closed_at: status.is_closed().then_some(created_at),
            replies: Vec::new(),
            tags: Vec::new(),
            analysis: derived.analysis,
        }
    }

    #[test]
    fn test_user_windows() {
        let now = Utc.with_ymd_and_hms(2024, 5, 10, 22, 30, 0).unwrap();
        let users = vec![
            user(1, now - Duration::hours(1), now - Duration::hours(1)),
            user(2, now - Duration::days(30), now - Duration::hours(48)),
            user(3, now - Duration::days(30), now - Duration::days(10)),
        ];
        let stats = compute_stats(&users, &[], 6, 2, now);
        assert_eq!(
            stats.users,
            UserStats {
                total: 3,
                active_24h: 1,
                active_7d: 2,
                new_24h: 1,
            }
        );
        assert!((stats.favorites.avg_per_user - 2.0).abs() < 1e-9);
        assert_eq!(stats.conversations.total, 2);
        assert!((stats.projections.next_week_users - 3.3).abs() < 1e-9);
        assert_eq!(stats.projections.peak_hour, 23);
    }

    #[test]
    fn test_peak_hour_wraps_at_midnight() {
        let now = Utc.with_ymd_and_hms(2024, 5, 10, 23, 5, 0).unwrap();
        assert_eq!(compute_stats(&[], &[], 0, 0, now).projections.peak_hour, 0);
    }

    #[test]
    fn test_ticket_breakdown_and_reply_latency() {
        let now = Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap();
        let mut answered = ticket(TicketStatus::Open, Priority::Urgent, now);
        answered.replies.push(TicketReply {
            message: "me too".into(),
            author: ReplyAuthor::User,
            timestamp: now + Duration::minutes(1),
        });
        answered.replies.push(TicketReply {
            message: "on it".into(),
            author: ReplyAuthor::Admin,
            timestamp: now + Duration::minutes(30),
        });
        let tickets = vec![
            answered,
            ticket(TicketStatus::InProgress, Priority::High, now),
            ticket(TicketStatus::Closed, Priority::Urgent, now),
        ];

        let stats = compute_stats(&[], &tickets, 0, 0, now).tickets;
        assert_eq!((stats.total, stats.open, stats.in_progress, stats.closed), (3, 1, 1, 1));
        assert_eq!(stats.urgent, 1);
        assert_eq!(stats.avg_first_reply_minutes, Some(30.0));
    }

    #[test]
    fn test_empty_store_has_no_reply_latency() {
        let stats = compute_stats(&[], &[], 0, 0, Utc::now());
        assert_eq!(stats.tickets.avg_first_reply_minutes, None);
        assert_eq!(stats.favorites.avg_per_user, 0.0);
    }

    #[tokio::test]
    async fn test_stats_over_store_and_reconcile() {
        let (_dir, store) = temp_store().await;
        let users = UserManager::new(store.clone());
        let tickets = TicketManager::new(store.clone(), users.clone());
        let favorites = FavoriteManager::new(store.clone(), users.clone());

        let profile = UserProfile {
            first_name: "Ada".into(),
            ..Default::default()
        };
        users.register(1, profile).await.unwrap();
        favorites.add(1, "nice answer", FavoriteSource::default()).await.unwrap();
        let t = tickets.create(1, "Ada", "urgent: payment failed").await.unwrap();
        tickets.create(1, "Ada", "another question").await.unwrap();
        tickets.close(&t.id).await.unwrap();

        let aggregator = Aggregator::new(store.clone());
        let stats = aggregator.stats().await.unwrap();
        assert_eq!(stats.users.total, 1);
        assert_eq!(stats.favorites.total, 1);
        assert_eq!((stats.tickets.open, stats.tickets.closed), (1, 1));
        assert_eq!(stats.tickets.urgent, 0);

        // simulate drift
        store.counters().reset(CounterSnapshot::default());
        let snapshot = aggregator.reconcile().await.unwrap();
        assert_eq!(
            snapshot,
            CounterSnapshot {
                users: 1,
                conversations: 0,
                favorites: 1,
                tickets: 2,
                open_tickets: 1,
            }
        );
        assert_eq!(aggregator.counters(), snapshot);
    }
}
