//! `FeatureCollection`: the transient container produced by extractors (§3).

use serde::{Deserialize, Serialize};

use super::boundary::BoundaryRecord;
use super::layer::Layer;
use super::scope::Scope;

/// Which provider produced a collection, and whether it came from cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionProvenance {
    /// Extractor/provider identifier (§4.C registry key).
    pub provider_id: String,
    /// The upstream query that was issued (opaque to this crate).
    pub query_description: String,
    /// Whether this collection was served from the Cache Layer.
    pub cache_hit: bool,
}

/// An ordered set of `BoundaryRecord`s sharing a layer and scope, produced
/// by a single extractor run. Transient: owned by the Extraction Engine's
/// job until handed to the Validation Pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureCollection {
    /// Layer shared by every record in this collection.
    pub layer: Layer,
    /// Scope this collection was extracted for.
    pub scope: Scope,
    /// The boundary records.
    pub records: Vec<BoundaryRecord>,
    /// Provenance of the extraction itself (distinct from each record's own
    /// `Provenance`, which may differ per-feature for paginated sources).
    pub collection_provenance: CollectionProvenance,
}

impl FeatureCollection {
    /// Number of records in the collection.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the collection has no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Deduplicate features lacking usable geometry, per §4.C `extract`
    /// contract ("must deduplicate features lacking geometry").
    ///
    /// Records whose geometry has zero polygons are dropped entirely
    /// (nothing to dedupe them against); records with valid geometry are
    /// deduplicated by `boundary_id`, keeping the first occurrence.
    pub fn dedupe_and_drop_empty_geometry(&mut self) {
        use std::collections::HashSet;
        self.records.retain(|r| !r.geometry.polygons().is_empty());
        let mut seen = HashSet::new();
        self.records
            .retain(|r| seen.insert(r.boundary_id.clone()));
    }
}
