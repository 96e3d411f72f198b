pub mod conversation;
pub mod favorite;
pub mod ticket;
pub mod user;

pub use conversation::{ChatMessage, Conversation, Role};
pub use favorite::{Favorite, FavoriteContext, FavoriteMetadata, FavoriteSource};
pub use ticket::{
    Category, Complexity, Priority, ReplyAuthor, Ticket, TicketAnalysis, TicketReply, TicketStatus,
};
pub use user::{User, UserId, UserNote, UserProfile, UserUpdate};
