pub mod analysis;
pub mod background;
pub mod chat;
pub mod config;
pub mod conversations;
pub mod errors;
pub mod favorites;
pub mod llm_client;
pub mod models;
pub mod routes;
pub mod state;
pub mod stats;
pub mod store;
pub mod tickets;
pub mod users;
