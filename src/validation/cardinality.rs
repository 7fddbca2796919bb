//! Cardinality validator (§4.F.2): feature count against layer-specific
//! `{min, max, typical[lo, hi]}` bounds.

use crate::types::{FeatureCollection, Issue, Layer, StageResult};

/// Layer-specific feature-count bounds. `typical` is the range most
/// jurisdictions fall in; `min`/`max` are hard sanity bounds across all
/// U.S. jurisdictions at that layer.
#[derive(Debug, Clone, Copy)]
pub struct CardinalityBounds {
    /// Hard minimum (e.g. a single at-large district).
    pub min: usize,
    /// Hard maximum observed across any U.S. jurisdiction.
    pub max: usize,
    /// Typical range's low end.
    pub typical_lo: usize,
    /// Typical range's high end.
    pub typical_hi: usize,
}

/// Bounds for a given layer. These are illustrative calibration points
/// (§9 notes wider calibration is recommended); `CouncilDistrict` typical
/// range is deliberately narrow since it drives the Cincinnati scenario.
pub fn bounds_for(layer: Layer) -> CardinalityBounds {
    match layer {
        Layer::Congressional => CardinalityBounds { min: 1, max: 53, typical_lo: 1, typical_hi: 53 },
        Layer::StateUpper => CardinalityBounds { min: 20, max: 67, typical_lo: 29, typical_hi: 50 },
        Layer::StateLower => CardinalityBounds { min: 40, max: 400, typical_lo: 60, typical_hi: 150 },
        Layer::County => CardinalityBounds { min: 1, max: 254, typical_lo: 10, typical_hi: 100 },
        Layer::Place => CardinalityBounds { min: 1, max: 2000, typical_lo: 1, typical_hi: 500 },
        Layer::CouncilDistrict => CardinalityBounds { min: 1, max: 51, typical_lo: 5, typical_hi: 9 },
        Layer::SchoolUnified
        | Layer::SchoolElementary
        | Layer::SchoolSecondary => CardinalityBounds { min: 1, max: 1000, typical_lo: 1, typical_hi: 300 },
        Layer::SpecialFire
        | Layer::SpecialLibrary
        | Layer::SpecialHospital
        | Layer::SpecialWater
        | Layer::SpecialTransit
        | Layer::SpecialUtility => CardinalityBounds { min: 1, max: 500, typical_lo: 1, typical_hi: 100 },
    }
}

/// Run the cardinality validator.
pub fn validate(collection: &FeatureCollection) -> StageResult {
    let bounds = bounds_for(collection.layer);
    let observed = collection.records.len();

    if observed < bounds.min || observed > bounds.max {
        let ratio = observed as f64 / bounds.typical_hi.max(1) as f64;
        return StageResult::reject(
            "cardinality",
            10,
            vec![Issue::new(
                "cardinality_mismatch",
                format!(
                    "observed {observed} outside [{}, {}] (ratio {ratio:.2})",
                    bounds.min, bounds.max
                ),
            )],
        );
    }

    if observed >= bounds.typical_lo && observed <= bounds.typical_hi {
        StageResult::pass("cardinality", 90)
    } else {
        StageResult::pass("cardinality", 60).with_warnings(vec![crate::types::Warning::new(
            "outside_typical_range",
            format!(
                "observed {observed} outside typical [{}, {}] but within hard bounds",
                bounds.typical_lo, bounds.typical_hi
            ),
        )])
    }
}

/// Observed/typical-high ratio, used by the geographic-bounds validator's
/// `max_feature_count_ratio` check and the Cincinnati remediation hint.
pub fn typical_ratio(layer: Layer, observed: usize) -> f64 {
    let bounds = bounds_for(layer);
    observed as f64 / bounds.typical_hi.max(1) as f64
}
