//! Extractor Registry (§4.C): a catalog of boundary providers exposing a
//! uniform capability set, plus provider selection for a scope.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::error::Result;
use crate::types::boundary::AuthorityTier;
use crate::types::{FeatureCollection, Layer, Scope};

/// Outcome of `Extractor::health_check`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HealthStatus {
    /// Whether the provider responded to a lightweight probe.
    pub available: bool,
    /// Observed round-trip latency.
    pub latency_ms: u64,
    /// Human-readable issues (degraded but available, deprecation notices, ...).
    pub issues: Vec<String>,
}

/// Static metadata a provider advertises about itself (§4.C).
#[derive(Debug, Clone)]
pub struct ExtractorMetadata {
    /// ISO country code this provider serves.
    pub country_code: String,
    /// Trust ranking of this provider's data.
    pub authority_tier: AuthorityTier,
    /// Layers this provider can extract.
    pub supported_layers: Vec<Layer>,
    /// Expected feature counts, for sanity checks independent of the
    /// Canonical Reference (e.g. a provider-reported catalog size).
    pub expected_counts: BTreeMap<Layer, usize>,
    /// License identifier or URL.
    pub license: String,
    /// How often this provider's data changes (informational).
    pub update_cadence: String,
}

/// Uniform capability set every boundary provider implements (§4.C).
///
/// Grounded in the same shape as an async storage trait: a narrow,
/// `Send + Sync` surface dispatched dynamically at the registry boundary,
/// statically everywhere else (§9 "runtime polymorphism over providers").
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Stable identifier used in cache keys, job task ids, and failure-rate
    /// tracking.
    fn provider_id(&self) -> &str;

    /// Static capability metadata.
    fn metadata(&self) -> &ExtractorMetadata;

    /// Extract a `FeatureCollection` for `scope`. Implementations handling
    /// paginated upstreams must deduplicate features lacking geometry
    /// before returning (§4.C).
    async fn extract(&self, scope: &Scope) -> Result<FeatureCollection>;

    /// Lightweight liveness/latency probe.
    async fn health_check(&self) -> Result<HealthStatus>;

    /// Whether the upstream has changed since `since`. Providers with no
    /// reliable change signal must conservatively return `true` (§4.C, §9
    /// open question).
    async fn has_changed_since(&self, since: DateTime<Utc>) -> bool;
}

/// Whether a provider supports a layer at all.
fn layer_fit(metadata: &ExtractorMetadata, layer: Layer) -> bool {
    metadata.supported_layers.contains(&layer)
}

/// Whether a provider's country matches the jurisdiction being queried.
/// `jurisdiction_fips` is treated as domestic (US) unless it carries an
/// explicit non-numeric country prefix (e.g. `"CA:ON"`).
fn jurisdiction_fit(metadata: &ExtractorMetadata, jurisdiction_fips: &str) -> bool {
    if let Some((country, _)) = jurisdiction_fips.split_once(':') {
        metadata.country_code.eq_ignore_ascii_case(country)
    } else {
        metadata.country_code.eq_ignore_ascii_case("US")
    }
}

/// A catalog of registered extractors plus historical failure-rate tracking
/// used as the final selection tiebreak (§4.C).
pub struct ExtractorRegistry {
    providers: Vec<Arc<dyn Extractor>>,
    failure_rates: RwLock<BTreeMap<String, f64>>,
}

impl ExtractorRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
            failure_rates: RwLock::new(BTreeMap::new()),
        }
    }

    /// Register a provider.
    pub fn register(&mut self, extractor: Arc<dyn Extractor>) {
        self.providers.push(extractor);
    }

    /// Record a task outcome for a provider, updating its running failure
    /// rate with a simple exponential moving average.
    pub fn record_outcome(&self, provider_id: &str, succeeded: bool) {
        const ALPHA: f64 = 0.2;
        let mut rates = self.failure_rates.write();
        let rate = rates.entry(provider_id.to_string()).or_insert(0.0);
        let sample = if succeeded { 0.0 } else { 1.0 };
        *rate = ALPHA * sample + (1.0 - ALPHA) * *rate;
    }

    /// Select the best provider for `(layer, jurisdiction_fips)` per §4.C:
    /// layer fit, then jurisdiction fit, then authority tier (higher
    /// preferred), then freshness proxy (update cadence is informational
    /// only here; freshness in the live sense is the Change Detector's
    /// job), with ties broken by lower historical failure rate.
    pub fn select(&self, layer: Layer, jurisdiction_fips: &str) -> Option<Arc<dyn Extractor>> {
        let rates = self.failure_rates.read();
        self.providers
            .iter()
            .filter(|p| layer_fit(p.metadata(), layer))
            .filter(|p| jurisdiction_fit(p.metadata(), jurisdiction_fips))
            .min_by(|a, b| {
                let a_meta = a.metadata();
                let b_meta = b.metadata();
                // Lower AuthorityTier discriminant = higher trust; prefer it.
                a_meta
                    .authority_tier
                    .cmp(&b_meta.authority_tier)
                    .then_with(|| {
                        let a_rate = rates.get(a.provider_id()).copied().unwrap_or(0.0);
                        let b_rate = rates.get(b.provider_id()).copied().unwrap_or(0.0);
                        a_rate
                            .partial_cmp(&b_rate)
                            .unwrap_or(std::cmp::Ordering::Equal)
                    })
            })
            .cloned()
    }

    /// All registered providers, for `health_check()` fan-out.
    pub fn providers(&self) -> &[Arc<dyn Extractor>] {
        &self.providers
    }
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::feature_collection::CollectionProvenance;

    struct StubExtractor {
        id: String,
        metadata: ExtractorMetadata,
    }

    #[async_trait]
    impl Extractor for StubExtractor {
        fn provider_id(&self) -> &str {
            &self.id
        }

        fn metadata(&self) -> &ExtractorMetadata {
            &self.metadata
        }

        async fn extract(&self, scope: &Scope) -> Result<FeatureCollection> {
            Ok(FeatureCollection {
                layer: Layer::Congressional,
                scope: scope.clone(),
                records: Vec::new(),
                collection_provenance: CollectionProvenance {
                    provider_id: self.id.clone(),
                    query_description: "stub".to_string(),
                    cache_hit: false,
                },
            })
        }

        async fn health_check(&self) -> Result<HealthStatus> {
            Ok(HealthStatus {
                available: true,
                latency_ms: 1,
                issues: Vec::new(),
            })
        }

        async fn has_changed_since(&self, _since: DateTime<Utc>) -> bool {
            true
        }
    }

    fn stub(id: &str, tier: AuthorityTier, layers: Vec<Layer>) -> Arc<dyn Extractor> {
        Arc::new(StubExtractor {
            id: id.to_string(),
            metadata: ExtractorMetadata {
                country_code: "US".to_string(),
                authority_tier: tier,
                supported_layers: layers,
                expected_counts: BTreeMap::new(),
                license: "public-domain".to_string(),
                update_cadence: "annual".to_string(),
            },
        })
    }

    #[test]
    fn selects_highest_authority_tier() {
        let mut registry = ExtractorRegistry::new();
        registry.register(stub("state-gis", AuthorityTier::State, vec![Layer::Congressional]));
        registry.register(stub("tiger", AuthorityTier::Federal, vec![Layer::Congressional]));
        let selected = registry.select(Layer::Congressional, "10").unwrap();
        assert_eq!(selected.provider_id(), "tiger");
    }

    #[test]
    fn filters_by_layer_fit() {
        let mut registry = ExtractorRegistry::new();
        registry.register(stub("county-gis", AuthorityTier::State, vec![Layer::County]));
        assert!(registry.select(Layer::Congressional, "10").is_none());
    }

    #[test]
    fn ties_broken_by_lower_failure_rate() {
        let mut registry = ExtractorRegistry::new();
        registry.register(stub("a", AuthorityTier::Federal, vec![Layer::Congressional]));
        registry.register(stub("b", AuthorityTier::Federal, vec![Layer::Congressional]));
        registry.record_outcome("a", false);
        registry.record_outcome("b", true);
        let selected = registry.select(Layer::Congressional, "10").unwrap();
        assert_eq!(selected.provider_id(), "b");
    }
}
