//! Two-tier in-memory cache fronting the Record Store.
//!
//! The exact tier holds entities recently read or written. The predictive
//! tier only receives entries from the prefetcher; a hit there promotes the
//! entry into the exact tier. Both tiers are bounded (Moka, TinyLFU).

use moka::sync::Cache;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheTier {
    Exact,
    Predictive,
}

pub struct TieredCache {
    exact: Cache<String, Value>,
    predictive: Cache<String, Value>,
}

impl TieredCache {
    /// The predictive tier gets a quarter of the exact tier's capacity.
    pub fn new(capacity: u64) -> Self {
        Self {
            exact: Cache::new(capacity.max(1)),
            predictive: Cache::new((capacity / 4).max(1)),
        }
    }

    pub fn lookup(&self, key: &str) -> Option<(Value, CacheTier)> {
        if let Some(value) = self.exact.get(key) {
            return Some((value, CacheTier::Exact));
        }
        let value = self.predictive.remove(key)?;
        Some((self.fill(key.to_string(), value), CacheTier::Predictive))
    }

    pub fn insert(&self, key: String, value: Value) {
        self.predictive.invalidate(key.as_str());
        self.exact.insert(key, value);
    }

    /// Caches `value` only if the exact tier has no entry for `key`, and
    /// returns whichever value ends up cached. Readers filling from disk use
    /// this so a concurrent `insert` from a writer is never overwritten.
    pub fn fill(&self, key: String, value: Value) -> Value {
        self.exact.entry(key).or_insert(value).into_value()
    }

    /// Prefetched entries never shadow a fresher exact-tier entry.
    pub fn insert_predicted(&self, key: String, value: Value) {
        if !self.exact.contains_key(key.as_str()) {
            self.predictive.insert(key, value);
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.exact.contains_key(key) || self.predictive.contains_key(key)
    }

    pub fn invalidate(&self, key: &str) {
        self.exact.invalidate(key);
        self.predictive.invalidate(key);
    }

    pub fn clear_predictive(&self) {
        self.predictive.invalidate_all();
    }

    /// Approximate entry counts `(exact, predictive)`.
    pub fn entry_counts(&self) -> (u64, u64) {
        self.exact.run_pending_tasks();
        self.predictive.run_pending_tasks();
        (self.exact.entry_count(), self.predictive.entry_count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_miss_on_empty_cache() {
        let cache = TieredCache::new(16);
        assert!(cache.lookup("users:1").is_none());
    }

    #[test]
    fn test_exact_hit() {
        let cache = TieredCache::new(16);
        cache.insert("users:1".into(), json!({"id": 1}));
        let (value, tier) = cache.lookup("users:1").unwrap();
        assert_eq!(value["id"], 1);
        assert_eq!(tier, CacheTier::Exact);
    }

    #[test]
    fn test_predictive_hit_is_promoted() {
        let cache = TieredCache::new(16);
        cache.insert_predicted("tickets:T".into(), json!({"id": "T"}));

        let (_, tier) = cache.lookup("tickets:T").unwrap();
        assert_eq!(tier, CacheTier::Predictive);

        let (_, tier) = cache.lookup("tickets:T").unwrap();
        assert_eq!(tier, CacheTier::Exact);
    }

    #[test]
    fn test_prefetch_does_not_shadow_exact_entry() {
        let cache = TieredCache::new(16);
        cache.insert("users:1".into(), json!({"v": "fresh"}));
        cache.insert_predicted("users:1".into(), json!({"v": "stale"}));
        let (value, _) = cache.lookup("users:1").unwrap();
        assert_eq!(value["v"], "fresh");
    }

    #[test]
    fn test_fill_keeps_existing_entry() {
        let cache = TieredCache::new(16);
        assert_eq!(cache.fill("users:1".into(), json!({"v": 1})), json!({"v": 1}));

        cache.insert("users:1".into(), json!({"v": 2}));
        let kept = cache.fill("users:1".into(), json!({"v": 1}));
        assert_eq!(kept["v"], 2);
        assert_eq!(cache.lookup("users:1").unwrap().0["v"], 2);
    }

    #[test]
    fn test_invalidate_clears_both_tiers() {
        let cache = TieredCache::new(16);
        cache.insert("users:1".into(), json!(1));
        cache.insert_predicted("users:2".into(), json!(2));
        cache.invalidate("users:1");
        cache.invalidate("users:2");
        assert!(!cache.contains("users:1"));
        assert!(!cache.contains("users:2"));
    }
}
