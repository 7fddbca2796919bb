//! `CacheEntry`: the Cache Layer's stored unit (§3, §4.D).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::feature_collection::FeatureCollection;

/// Content-addressed cache key: `(provider_id, scope_fingerprint, vintage)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    /// Extractor/provider identifier.
    pub provider_id: String,
    /// Stable fingerprint of the scope queried (e.g. `scope.label()`, hashed).
    pub scope_fingerprint: String,
    /// Vintage year the fetch targeted.
    pub vintage_year: u16,
}

impl CacheKey {
    /// Construct a key from its components.
    pub fn new(
        provider_id: impl Into<String>,
        scope_fingerprint: impl Into<String>,
        vintage_year: u16,
    ) -> Self {
        Self {
            provider_id: provider_id.into(),
            scope_fingerprint: scope_fingerprint.into(),
            vintage_year,
        }
    }
}

/// Upstream change-signal validators captured alongside a cached response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpstreamValidators {
    /// HTTP `ETag`, if the upstream sent one.
    pub etag: Option<String>,
    /// HTTP `Last-Modified`, if the upstream sent one.
    pub last_modified: Option<DateTime<Utc>>,
    /// Provider-reported total feature count, if available.
    pub total_count: Option<u64>,
}

/// A cached, normalized extraction result plus the metadata needed to judge
/// staleness and detect upstream changes without re-fetching (§4.D).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// The normalized collection as last fetched.
    pub collection: FeatureCollection,
    /// Upstream change signals observed at fetch time.
    pub validators: UpstreamValidators,
    /// When this entry was written.
    pub fetched_at: DateTime<Utc>,
    /// Serialized size in bytes, for cache accounting.
    pub size_bytes: u64,
}

impl CacheEntry {
    /// Whether this entry is stale given a release date + grace period
    /// (§4.D: "for vintage-keyed entries, compare `fetched_at` to the
    /// configured release date + grace period"). Entries with no known
    /// release date are never considered stale by this predicate alone.
    pub fn is_stale(&self, release_date: DateTime<Utc>, grace_period: chrono::Duration) -> bool {
        self.fetched_at < release_date + grace_period
            && Utc::now() >= release_date + grace_period
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::layer::Layer;
    use crate::types::scope::Scope;
    use chrono::Duration;

    fn entry_fetched_at(fetched_at: DateTime<Utc>) -> CacheEntry {
        CacheEntry {
            collection: FeatureCollection {
                layer: Layer::Congressional,
                scope: Scope::State("10".to_string()),
                records: Vec::new(),
                collection_provenance: super::super::feature_collection::CollectionProvenance {
                    provider_id: "tiger".to_string(),
                    query_description: "test".to_string(),
                    cache_hit: false,
                },
            },
            validators: UpstreamValidators::default(),
            fetched_at,
            size_bytes: 0,
        }
    }

    #[test]
    fn stale_when_fetched_before_release_plus_grace_and_grace_has_elapsed() {
        let release_date = Utc::now() - Duration::days(400);
        let entry = entry_fetched_at(Utc::now() - Duration::days(395));
        assert!(entry.is_stale(release_date, Duration::days(14)));
    }

    #[test]
    fn not_stale_when_fetched_after_release_plus_grace() {
        let release_date = Utc::now() - Duration::days(400);
        let entry = entry_fetched_at(Utc::now());
        assert!(!entry.is_stale(release_date, Duration::days(14)));
    }

    #[test]
    fn cache_key_equality_is_componentwise() {
        let a = CacheKey::new("tiger", "state:10", 2024);
        let b = CacheKey::new("tiger", "state:10", 2024);
        let c = CacheKey::new("tiger", "state:11", 2024);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
