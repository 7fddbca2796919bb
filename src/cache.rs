//! Cache Layer (§4.D): content-addressed, TTL-aware local cache for
//! normalized upstream responses.

use chrono::{DateTime, Duration, Utc};
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, VecDeque};

use crate::config::CacheConfig;
use crate::types::cache_entry::{CacheEntry, CacheKey};

/// Content-addressed, TTL-aware cache keyed by `(provider_id,
/// scope_fingerprint, vintage)` (§4.D).
///
/// `entries` is a plain map behind a `parking_lot::RwLock`: any number of
/// readers hold the read lock concurrently (§5: "concurrent reads are
/// lock-free" in the sense of never blocking on each other), and only a
/// `put`/eviction takes the exclusive write lock. Recency tracking for
/// eviction lives in a separate `Mutex<VecDeque<_>>` so a read never needs
/// the map's write lock just to record that it happened; a `get` that loses
/// the race for the recency lock simply skips the bump rather than blocking,
/// trading exact LRU order for read concurrency.
pub struct Cache {
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
    recency: Mutex<VecDeque<CacheKey>>,
    capacity: usize,
    grace_period: Duration,
}

impl Cache {
    /// Build a cache from configuration.
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            recency: Mutex::new(VecDeque::new()),
            capacity: config.max_entries.max(1),
            grace_period: Duration::from_std(config.grace_period)
                .unwrap_or_else(|_| Duration::days(14)),
        }
    }

    /// Fetch a cached entry, if present.
    pub fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        let entry = self.entries.read().get(key).cloned();
        if entry.is_some() {
            if let Some(mut recency) = self.recency.try_lock() {
                recency.retain(|k| k != key);
                recency.push_back(key.clone());
            }
        }
        entry
    }

    /// Store an entry, evicting the least-recently-used entry opportunistically
    /// if the cache is at capacity.
    pub fn put(&self, key: CacheKey, entry: CacheEntry) {
        let mut entries = self.entries.write();
        let mut recency = self.recency.lock();
        recency.retain(|k| k != &key);
        recency.push_back(key.clone());
        entries.insert(key, entry);
        while entries.len() > self.capacity {
            let Some(oldest) = recency.pop_front() else { break };
            entries.remove(&oldest);
        }
    }

    /// Whether the entry at `key` is stale against a known release date.
    /// Per §4.D: "missing files are not considered stale" — a cache miss is
    /// not staleness, it's absence, so this returns `false` when there's no
    /// entry to judge.
    pub fn is_stale(&self, key: &CacheKey, release_date: DateTime<Utc>) -> bool {
        match self.get(key) {
            Some(entry) => entry.is_stale(release_date, self.grace_period),
            None => false,
        }
    }

    /// Number of entries currently cached.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.read().len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::cache_entry::UpstreamValidators;
    use crate::types::feature_collection::CollectionProvenance;
    use crate::types::{FeatureCollection, Layer, Scope};

    fn entry() -> CacheEntry {
        CacheEntry {
            collection: FeatureCollection {
                layer: Layer::Congressional,
                scope: Scope::State("10".to_string()),
                records: Vec::new(),
                collection_provenance: CollectionProvenance {
                    provider_id: "tiger".to_string(),
                    query_description: "test".to_string(),
                    cache_hit: false,
                },
            },
            validators: UpstreamValidators::default(),
            fetched_at: Utc::now(),
            size_bytes: 0,
        }
    }

    #[test]
    fn put_then_get_round_trips() {
        let cache = Cache::new(&CacheConfig::default());
        let key = CacheKey::new("tiger", "state:10", 2024);
        cache.put(key.clone(), entry());
        assert!(cache.get(&key).is_some());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn missing_key_is_not_stale() {
        let cache = Cache::new(&CacheConfig::default());
        let key = CacheKey::new("tiger", "state:10", 2024);
        assert!(!cache.is_stale(&key, Utc::now() - Duration::days(400)));
    }

    #[test]
    fn eviction_respects_capacity() {
        let mut config = CacheConfig::default();
        config.max_entries = 1;
        let cache = Cache::new(&config);
        cache.put(CacheKey::new("tiger", "state:10", 2024), entry());
        cache.put(CacheKey::new("tiger", "state:11", 2024), entry());
        assert_eq!(cache.len(), 1);
        assert!(cache.get(&CacheKey::new("tiger", "state:10", 2024)).is_none());
    }
}
