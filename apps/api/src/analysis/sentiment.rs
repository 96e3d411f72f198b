//! Keyword sentiment. Counts hits against two fixed word lists; no model.

const POSITIVE_WORDS: &[&str] = &[
    "good", "great", "excellent", "amazing", "awesome", "love", "like", "thanks", "thank",
    "perfect", "happy", "helpful", "nice", "wonderful", "cool",
];

const NEGATIVE_WORDS: &[&str] = &[
    "bad", "terrible", "awful", "hate", "angry", "worst", "useless", "broken", "disappointed",
    "annoying", "horrible", "slow", "wrong", "sad", "poor",
];

/// Lowercased alphanumeric tokens.
pub fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric() && c != '\'')
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

/// `(positive - negative) / (positive + negative)`, in [-1, 1]; 0.0 when no
/// listed word occurs.
pub fn sentiment_score(text: &str) -> f64 {
    let (mut positive, mut negative) = (0u32, 0u32);
    for token in tokenize(text) {
        if POSITIVE_WORDS.contains(&token.as_str()) {
            positive += 1;
        } else if NEGATIVE_WORDS.contains(&token.as_str()) {
            negative += 1;
        }
    }
    let total = positive + negative;
    if total == 0 {
        return 0.0;
    }
    (positive as f64 - negative as f64) / total as f64
}
