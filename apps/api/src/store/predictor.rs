//! Access tracking and next-access prediction.
//!
//! A naive moving-average forecaster: the mean of consecutive inter-access
//! intervals, projected from the last access. Its only consumer is the
//! prefetcher, so a wrong guess costs a wasted read and nothing else.

use std::collections::{HashMap, VecDeque};

use serde::Serialize;

/// Per-key history cap; the oldest timestamps are dropped first.
pub const MAX_ACCESS_HISTORY: usize = 100;
pub const MIN_ACCESSES_FOR_PREDICTION: usize = 10;
pub const MAX_CONFIDENCE: f64 = 0.95;
/// A prediction is imminent when it falls less than this far in the future.
pub const PREFETCH_HORIZON_MS: i64 = 5_000;
pub const PREFETCH_MIN_CONFIDENCE: f64 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Prediction {
    /// Epoch milliseconds.
    pub predicted_access_ms: i64,
    pub confidence: f64,
}

impl Prediction {
    pub fn is_prefetch_candidate(&self, now_ms: i64) -> bool {
        self.predicted_access_ms - now_ms < PREFETCH_HORIZON_MS
            && self.confidence > PREFETCH_MIN_CONFIDENCE
    }
}

/// Predicts the next access from an ordered list of access timestamps (ms).
/// Returns `None` below `MIN_ACCESSES_FOR_PREDICTION` accesses.
pub fn predict_next_access(accesses: &[i64]) -> Option<Prediction> {
    if accesses.len() < MIN_ACCESSES_FOR_PREDICTION {
        return None;
    }
    let intervals = accesses.len() - 1;
    let total: i64 = accesses.windows(2).map(|w| w[1] - w[0]).sum();
    let mean = total as f64 / intervals as f64;
    let last = *accesses.last()?;

    Some(Prediction {
        predicted_access_ms: last + mean.round() as i64,
        confidence: (intervals as f64 / 100.0).min(MAX_CONFIDENCE),
    })
}

/// In-memory access history and the latest prediction per cache key.
/// Never persisted.
#[derive(Debug, Default)]
pub struct AccessTracker {
    patterns: HashMap<String, VecDeque<i64>>,
    predictions: HashMap<String, Prediction>,
}

impl AccessTracker {
    pub fn record_access(&mut self, key: &str, at_ms: i64) {
        let history = self.patterns.entry(key.to_string()).or_default();
        history.push_back(at_ms);
        while history.len() > MAX_ACCESS_HISTORY {
            history.pop_front();
        }
    }

    pub fn history_len(&self, key: &str) -> usize {
        self.patterns.get(key).map_or(0, VecDeque::len)
    }

    pub fn tracked_keys(&self) -> usize {
        self.patterns.len()
    }

    pub fn prediction(&self, key: &str) -> Option<Prediction> {
        self.predictions.get(key).copied()
    }

    /// Recomputes predictions for every key with enough history, overwriting
    /// prior ones. Returns how many keys have a prediction from this pass.
    pub fn refresh_predictions(&mut self) -> usize {
        let mut refreshed = 0;
        for (key, history) in self.patterns.iter_mut() {
            if let Some(prediction) = predict_next_access(history.make_contiguous()) {
                self.predictions.insert(key.clone(), prediction);
                refreshed += 1;
            }
        }
        refreshed
    }

    pub fn prefetch_candidates(&self, now_ms: i64) -> Vec<String> {
        self.predictions
            .iter()
            .filter(|(_, p)| p.is_prefetch_candidate(now_ms))
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Drops history and predictions for keys last accessed before `cutoff_ms`.
    pub fn forget_idle(&mut self, cutoff_ms: i64) -> usize {
        let before = self.patterns.len();
        self.patterns
            .retain(|_, history| history.back().is_some_and(|last| *last >= cutoff_ms));
        let patterns = &self.patterns;
        self.predictions.retain(|key, _| patterns.contains_key(key));
        before - self.patterns.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constant_sequence(start: i64, interval: i64, count: usize) -> Vec<i64> {
        (0..count as i64).map(|i| start + i * interval).collect()
    }

    #[test]
    fn test_no_prediction_below_minimum_history() {
        let seq = constant_sequence(0, 1_000, 9);
        assert!(predict_next_access(&seq).is_none());
    }

    #[test]
    fn test_constant_interval_predicts_last_plus_interval() {
        let seq = constant_sequence(1_700_000_000_000, 1_000, 10);
        let p = predict_next_access(&seq).unwrap();
        assert_eq!(p.predicted_access_ms, seq[9] + 1_000);
        assert!((p.confidence - 0.09).abs() < 1e-9);
    }

    #[test]
    fn test_confidence_is_capped() {
        let seq = constant_sequence(0, 50, 100);
        let p = predict_next_access(&seq).unwrap();
        // 99 intervals -> 0.99, capped
        assert!((p.confidence - MAX_CONFIDENCE).abs() < 1e-9);
    }

    #[test]
    fn test_uneven_intervals_use_mean() {
        let mut seq = constant_sequence(0, 100, 9);
        seq.push(seq[8] + 1_000); // intervals: 8 x 100, 1 x 1000 -> mean 200
        let p = predict_next_access(&seq).unwrap();
        assert_eq!(p.predicted_access_ms, seq[9] + 200);
    }

    #[test]
    fn test_history_is_trimmed_fifo() {
        let mut tracker = AccessTracker::default();
        for t in 0..150 {
            tracker.record_access("users:1", t);
        }
        assert_eq!(tracker.history_len("users:1"), MAX_ACCESS_HISTORY);
        let history = tracker.patterns.get("users:1").unwrap();
        assert_eq!(history.front().copied(), Some(50));
    }

    #[test]
    fn test_prefetch_requires_imminence_and_confidence() {
        let now = 1_000_000;
        let imminent_confident = Prediction {
            predicted_access_ms: now + 1_000,
            confidence: 0.8,
        };
        let imminent_unsure = Prediction {
            predicted_access_ms: now + 1_000,
            confidence: 0.7,
        };
        let distant = Prediction {
            predicted_access_ms: now + 60_000,
            confidence: 0.95,
        };
        assert!(imminent_confident.is_prefetch_candidate(now));
        assert!(!imminent_unsure.is_prefetch_candidate(now));
        assert!(!distant.is_prefetch_candidate(now));
    }

    #[test]
    fn test_refresh_then_candidates() {
        let mut tracker = AccessTracker::default();
        // 80 accesses, 1s apart -> 79 intervals, confidence 0.79
        for t in constant_sequence(0, 1_000, 80) {
            tracker.record_access("tickets:TKT-1", t);
        }
        for t in constant_sequence(0, 1_000, 5) {
            tracker.record_access("users:2", t);
        }
        assert_eq!(tracker.refresh_predictions(), 1);

        let p = tracker.prediction("tickets:TKT-1").unwrap();
        assert_eq!(p.predicted_access_ms, 80_000);
        assert_eq!(tracker.prefetch_candidates(79_000), vec!["tickets:TKT-1".to_string()]);
        assert!(tracker.prefetch_candidates(0).is_empty());
    }

    #[test]
    fn test_forget_idle_drops_stale_keys() {
        let mut tracker = AccessTracker::default();
        for t in constant_sequence(0, 10, 12) {
            tracker.record_access("users:old", t);
        }
        tracker.record_access("users:new", 10_000);
        tracker.refresh_predictions();

        assert_eq!(tracker.forget_idle(5_000), 1);
        assert_eq!(tracker.tracked_keys(), 1);
        assert!(tracker.prediction("users:old").is_none());
    }
}
