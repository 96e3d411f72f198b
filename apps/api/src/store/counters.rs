use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Counter {
    Users,
    Conversations,
    Favorites,
    Tickets,
    /// Tickets not yet closed (open or in progress).
    OpenTickets,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterSnapshot {
    pub users: u64,
    pub conversations: u64,
    pub favorites: u64,
    pub tickets: u64,
    pub open_tickets: u64,
}

/// Totals maintained incrementally by the entity managers. Drift is
/// corrected by `reset` from a full directory scan during cleanup.
#[derive(Debug, Default)]
pub struct Counters {
    users: AtomicU64,
    conversations: AtomicU64,
    favorites: AtomicU64,
    tickets: AtomicU64,
    open_tickets: AtomicU64,
}

impl Counters {
    fn slot(&self, counter: Counter) -> &AtomicU64 {
        match counter {
            Counter::Users => &self.users,
            Counter::Conversations => &self.conversations,
            Counter::Favorites => &self.favorites,
            Counter::Tickets => &self.tickets,
            Counter::OpenTickets => &self.open_tickets,
        }
    }

    pub fn incr(&self, counter: Counter) {
        self.slot(counter).fetch_add(1, Ordering::Relaxed);
    }

    /// Saturates at zero.
    pub fn decr(&self, counter: Counter) {
        let _ = self
            .slot(counter)
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| v.checked_sub(1));
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            users: self.users.load(Ordering::Relaxed),
            conversations: self.conversations.load(Ordering::Relaxed),
            favorites: self.favorites.load(Ordering::Relaxed),
            tickets: self.tickets.load(Ordering::Relaxed),
            open_tickets: self.open_tickets.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self, to: CounterSnapshot) {
        self.users.store(to.users, Ordering::Relaxed);
        self.conversations.store(to.conversations, Ordering::Relaxed);
        self.favorites.store(to.favorites, Ordering::Relaxed);
        self.tickets.store(to.tickets, Ordering::Relaxed);
        self.open_tickets.store(to.open_tickets, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decr_saturates() {
        let counters = Counters::default();
        counters.decr(Counter::OpenTickets);
        counters.incr(Counter::OpenTickets);
        counters.incr(Counter::Tickets);
        counters.decr(Counter::OpenTickets);
        let snap = counters.snapshot();
        assert_eq!(snap.open_tickets, 0);
        assert_eq!(snap.tickets, 1);
    }

    #[test]
    fn test_reset_overwrites() {
        let counters = Counters::default();
        counters.incr(Counter::Users);
        counters.reset(CounterSnapshot {
            users: 7,
            ..Default::default()
        });
        assert_eq!(counters.snapshot().users, 7);
    }
}
