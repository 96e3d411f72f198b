use std::sync::Arc;

use crate::config::Config;
use crate::conversations::ConversationManager;
use crate::favorites::FavoriteManager;
use crate::llm_client::ChatCompletion;
use crate::stats::Aggregator;
use crate::store::Store;
use crate::tickets::TicketManager;
use crate::users::UserManager;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    pub users: UserManager,
    pub conversations: ConversationManager,
    pub favorites: FavoriteManager,
    pub tickets: TicketManager,
    pub aggregator: Aggregator,
    /// Pluggable so tests can script replies.
    pub llm: Arc<dyn ChatCompletion>,
    pub config: Config,
}

impl AppState {
    /// Wires every manager onto one shared store handle.
    pub fn new(store: Arc<Store>, llm: Arc<dyn ChatCompletion>, config: Config) -> Self {
        let users = UserManager::new(store.clone());
        Self {
            conversations: ConversationManager::new(store.clone()),
            favorites: FavoriteManager::new(store.clone(), users.clone()),
            tickets: TicketManager::new(store.clone(), users.clone()),
            aggregator: Aggregator::new(store.clone()),
            users,
            store,
            llm,
            config,
        }
    }
}
