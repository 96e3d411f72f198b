//! Text heuristics behind the derived fields on users, conversations,
//! favorites and tickets. Keyword lists only, deterministic and I/O free.

pub mod fingerprint;
pub mod sentiment;
pub mod topics;
pub mod triage;

pub use fingerprint::{content_hash, fingerprint};
pub use sentiment::sentiment_score;
pub use topics::detect_topics;
pub use triage::{triage, Triage};
