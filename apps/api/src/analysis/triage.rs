//! Ticket triage: priority, category, tags and a canned-response suggestion,
//! all derived from the ticket text by keyword matching.
//!
//! Pure functions of the message. No I/O, no hidden state.

use crate::analysis::sentiment::sentiment_score;
use crate::models::{Category, Complexity, Priority, TicketAnalysis};

pub const MAX_TAGS: usize = 5;

const URGENT_WORDS: &[&str] = &["urgent", "asap", "emergency", "critical", "immediately", "right now"];
const HIGH_WORDS: &[&str] = &["important", "problem", "error", "bug", "not working", "broken", "issue", "failed"];

/// Checked in this order; the first category with a hit wins.
const CATEGORY_KEYWORDS: &[(Category, &[&str])] = &[
    (
        Category::Technical,
        &["error", "bug", "crash", "not working", "broken", "freeze", "glitch", "technical", "doesn't work"],
    ),
    (
        Category::Billing,
        &["payment", "billing", "charge", "refund", "invoice", "price", "subscription", "paid"],
    ),
    (
        Category::Feature,
        &["feature", "add ", "suggest", "would like", "improve", "request", "idea"],
    ),
    (
        Category::Account,
        &["account", "login", "log in", "password", "sign in", "profile", "username"],
    ),
];

const ACK_RESPONSE: &str = "Thank you for your feedback! We're glad we could help.";
const DETAIL_RESPONSE: &str =
    "We're here to help. Could you share more details about what happened and what you expected?";
const GENERIC_RESPONSE: &str =
    "Thank you for contacting support. An administrator will review your request shortly.";

/// Everything derived from a ticket message at creation time.
#[derive(Debug, Clone, PartialEq)]
pub struct Triage {
    pub priority: Priority,
    pub category: Category,
    pub sentiment: f64,
    pub tags: Vec<String>,
    pub analysis: TicketAnalysis,
}

pub fn triage(message: &str) -> Triage {
    let priority = detect_priority(message);
    let sentiment = sentiment_score(message);
    Triage {
        priority,
        category: detect_category(message),
        sentiment,
        tags: extract_tags(message),
        analysis: analyze(message, priority, sentiment),
    }
}

/// Urgent words win over high words; otherwise medium.
pub fn detect_priority(message: &str) -> Priority {
    let text = message.to_lowercase();
    if URGENT_WORDS.iter().any(|w| text.contains(w)) {
        Priority::Urgent
    } else if HIGH_WORDS.iter().any(|w| text.contains(w)) {
        Priority::High
    } else {
        Priority::Medium
    }
}

pub fn detect_category(message: &str) -> Category {
    // Trailing space lets "add " match a final word.
    let text = format!("{} ", message.to_lowercase());
    CATEGORY_KEYWORDS
        .iter()
        .find(|(_, words)| words.iter().any(|w| text.contains(w)))
        .map_or(Category::General, |(category, _)| *category)
}

/// Hashtags first (without `#`), then capitalized words; case-insensitive
/// dedup, at most `MAX_TAGS`.
pub fn extract_tags(message: &str) -> Vec<String> {
    let words: Vec<&str> = message
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric() && c != '#'))
        .collect();

    let hashtags = words
        .iter()
        .filter_map(|w| w.strip_prefix('#'))
        .map(|w| w.trim_start_matches('#'));
    let capitalized = words.iter().copied().filter(|w| {
        w.chars().count() >= 3
            && w.chars().next().is_some_and(char::is_uppercase)
            && w.chars().all(char::is_alphanumeric)
    });

    let mut tags: Vec<String> = Vec::new();
    for tag in hashtags.chain(capitalized) {
        if tag.is_empty() || tags.iter().any(|t| t.eq_ignore_ascii_case(tag)) {
            continue;
        }
        tags.push(tag.to_string());
        if tags.len() == MAX_TAGS {
            break;
        }
    }
    tags
}

pub fn analyze(message: &str, priority: Priority, sentiment: f64) -> TicketAnalysis {
    let word_count = message.split_whitespace().count();
    let complexity = match word_count {
        n if n > 50 => Complexity::High,
        n if n > 20 => Complexity::Medium,
        _ => Complexity::Low,
    };

    let text = message.to_lowercase();
    let suggested_response = if text.contains("thank") {
        ACK_RESPONSE
    } else if text.contains("help") {
        DETAIL_RESPONSE
    } else {
        GENERIC_RESPONSE
    };

    let estimated_resolution = match priority {
        Priority::Urgent => "1-2 hours",
        Priority::High => "4-8 hours",
        Priority::Medium => "24-48 hours",
    };

    TicketAnalysis {
        complexity,
        requires_attention: priority == Priority::Urgent || sentiment < -0.3,
        suggested_response: suggested_response.to_string(),
        estimated_resolution: estimated_resolution.to_string(),
    }
}
