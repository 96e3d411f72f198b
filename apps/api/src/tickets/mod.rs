pub mod handlers;
pub mod manager;

pub use manager::TicketManager;
