use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::analysis::triage;
use crate::models::ticket::TICKET_ID_PREFIX;
use crate::models::{Priority, ReplyAuthor, Ticket, TicketReply, TicketStatus, UserId};
use crate::store::{Counter, EntityKind, Store, StoreError, StoreResult};
use crate::users::UserManager;

const MAX_MESSAGE_CHARS: usize = 4_000;

#[derive(Clone)]
pub struct TicketManager {
    store: Arc<Store>,
    users: UserManager,
}

impl TicketManager {
    pub fn new(store: Arc<Store>, users: UserManager) -> Self {
        Self { store, users }
    }

    /// Opens a ticket with derived priority, category, sentiment, tags and
    /// analysis. The owner's `ticket_count` bump is best-effort.
    pub async fn create(&self, user_id: UserId, user_name: &str, message: &str) -> StoreResult<Ticket> {
        let message = validate_message(message)?;
        let derived = triage(&message);
        let now = Utc::now();
        let ticket = Ticket {
            id: new_ticket_id(),
            user_id,
            user_name: user_name.trim().to_string(),
            message,
            status: TicketStatus::Open,
            priority: derived.priority,
            category: derived.category,
            sentiment: derived.sentiment,
            created_at: now,
            updated_at: now,
            closed_at: None,
            replies: Vec::new(),
            tags: derived.tags,
            analysis: derived.analysis,
        };

        self.store.put(EntityKind::Tickets, &ticket.id, &ticket).await?;
        self.store.counters().incr(Counter::Tickets);
        self.store.counters().incr(Counter::OpenTickets);
        info!(
            "Ticket {} opened by {user_id} ({:?}/{:?})",
            ticket.id, ticket.priority, ticket.category
        );

        match self.users.increment_tickets(user_id).await {
            Ok(_) => {}
            Err(e) => warn!("Ticket {}: could not bump ticket_count for {user_id}: {e}", ticket.id),
        }
        Ok(ticket)
    }

    /// Unknown or malformed ids yield `None`.
    pub async fn get(&self, id: &str) -> StoreResult<Option<Ticket>> {
        if !is_ticket_id(id) {
            return Ok(None);
        }
        self.store.get(EntityKind::Tickets, id).await
    }

    /// Appends a reply. Unknown ids yield `None` and nothing is written.
    pub async fn add_reply(&self, id: &str, message: &str, author: ReplyAuthor) -> StoreResult<Option<Ticket>> {
        let message = validate_message(message)?;
        self.modify(id, |ticket| {
            let now = Utc::now();
            ticket.replies.push(TicketReply {
                message,
                author,
                timestamp: now,
            });
            ticket.updated_at = now.max(ticket.created_at);
            Ok(())
        })
        .await
    }

    pub async fn close(&self, id: &str) -> StoreResult<Option<Ticket>> {
        self.transition(id, TicketStatus::Closed).await
    }

    pub async fn reopen(&self, id: &str) -> StoreResult<Option<Ticket>> {
        self.transition(id, TicketStatus::Open).await
    }

    pub async fn start_progress(&self, id: &str) -> StoreResult<Option<Ticket>> {
        self.transition(id, TicketStatus::InProgress).await
    }

    /// Triage order: urgent first, then oldest first.
    pub async fn list(&self, status: Option<TicketStatus>) -> StoreResult<Vec<Ticket>> {
        let mut tickets: Vec<Ticket> = self
            .store
            .scan::<Ticket>(EntityKind::Tickets)
            .await?
            .into_iter()
            .filter(|t| status.map_or(true, |s| t.status == s))
            .collect();
        tickets.sort_by(|a, b| {
            priority_rank(a.priority)
                .cmp(&priority_rank(b.priority))
                .then(a.created_at.cmp(&b.created_at))
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(tickets)
    }

    /// Newest first.
    pub async fn list_by_user(&self, user_id: UserId) -> StoreResult<Vec<Ticket>> {
        let mut tickets: Vec<Ticket> = self
            .store
            .scan::<Ticket>(EntityKind::Tickets)
            .await?
            .into_iter()
            .filter(|t| t.user_id == user_id)
            .collect();
        tickets.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(tickets)
    }

    async fn transition(&self, id: &str, next: TicketStatus) -> StoreResult<Option<Ticket>> {
        let mut was_closed = false;
        let updated = self
            .modify(id, |ticket| {
                if !ticket.status.can_transition_to(next) {
                    return Err(StoreError::Validation(format!(
                        "ticket {} cannot move from {:?} to {next:?}",
                        ticket.id, ticket.status
                    )));
                }
                was_closed = ticket.status.is_closed();
                let now = Utc::now();
                ticket.closed_at = next.is_closed().then_some(now);
                ticket.status = next;
                ticket.updated_at = now.max(ticket.created_at);
                Ok(())
            })
            .await?;

        let Some(ticket) = updated else {
            return Ok(None);
        };
        match (was_closed, next.is_closed()) {
            (false, true) => self.store.counters().decr(Counter::OpenTickets),
            (true, false) => self.store.counters().incr(Counter::OpenTickets),
            _ => {}
        }
        info!("Ticket {} is now {:?}", ticket.id, ticket.status);
        Ok(Some(ticket))
    }

    async fn modify(
        &self,
        id: &str,
        f: impl FnOnce(&mut Ticket) -> StoreResult<()>,
    ) -> StoreResult<Option<Ticket>> {
        if !is_ticket_id(id) {
            return Ok(None);
        }
        let _guard = self.store.lock(EntityKind::Tickets, id).await;
        let Some(mut ticket) = self.store.get::<Ticket>(EntityKind::Tickets, id).await? else {
            return Ok(None);
        };
        f(&mut ticket)?;
        self.store.put(EntityKind::Tickets, id, &ticket).await?;
        Ok(Some(ticket))
    }
}

fn new_ticket_id() -> String {
    let raw = Uuid::new_v4().simple().to_string().to_uppercase();
    format!("{TICKET_ID_PREFIX}{}", &raw[..8])
}

pub fn is_ticket_id(id: &str) -> bool {
    id.strip_prefix(TICKET_ID_PREFIX)
        .is_some_and(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_alphanumeric()))
}

fn priority_rank(priority: Priority) -> u8 {
    match priority {
        Priority::Urgent => 0,
        Priority::High => 1,
        Priority::Medium => 2,
    }
}

fn validate_message(message: &str) -> StoreResult<String> {
    let message = message.trim();
    if message.is_empty() {
        return Err(StoreError::Validation("message must not be empty".into()));
    }
    Ok(message.chars().take(MAX_MESSAGE_CHARS).collect())
}
