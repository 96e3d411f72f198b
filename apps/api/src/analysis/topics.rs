use super::sentiment::tokenize;

/// Topic label → trigger words. Order is the order labels are reported in.
const TOPIC_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "tech",
        &["code", "programming", "software", "computer", "ai", "algorithm", "app", "rust", "python", "javascript", "server", "database"],
    ),
    (
        "science",
        &["physics", "chemistry", "biology", "research", "experiment", "space", "math", "theory", "science"],
    ),
    (
        "art",
        &["music", "painting", "design", "drawing", "film", "poetry", "art", "photo", "novel"],
    ),
    (
        "business",
        &["market", "startup", "finance", "sales", "investment", "money", "business", "marketing", "company"],
    ),
];

/// Topic labels whose trigger words occur in `text`.
pub fn detect_topics(text: &str) -> Vec<String> {
    let tokens: Vec<String> = tokenize(text).collect();
    TOPIC_KEYWORDS
        .iter()
        .filter(|(_, words)| tokens.iter().any(|t| words.contains(&t.as_str())))
        .map(|(label, _)| label.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_multiple_topics_in_fixed_order() {
        let topics = detect_topics("Our startup writes Python code for biology research");
        assert_eq!(topics, vec!["tech", "science", "business"]);
    }

    #[test]
    fn test_no_topics() {
        assert!(detect_topics("hello there").is_empty());
    }

    #[test]
    fn test_whole_word_match_only() {
        // "aim" must not trigger "ai"
        assert!(detect_topics("my aim is true").is_empty());
    }
}
