//! Validation Pipeline (§4.F): seven staged, deterministic validators run in
//! order, short-circuiting at the first rejecting stage.

pub mod cardinality;
pub mod cross_source;
pub mod geoid;
pub mod geographic_bounds;
pub mod name_pattern;
pub mod tessellation;
pub mod topology;

use crate::config::ValidationThresholds;
use crate::reference::CanonicalReference;
use crate::types::geometry::{Point, Polygon};
use crate::types::{AggregatedValidationResult, FeatureCollection};

pub use cardinality::{bounds_for, typical_ratio, CardinalityBounds};
pub use cross_source::{compared_ids, AgreementOutcome};
pub use tessellation::TessellationReport;
pub use topology::{OverlapPolicy, OverlapPolicyTable};

/// Optional inputs that only some stages need. Each is consulted only when
/// the collection's layer makes the corresponding stage relevant; absent
/// context degrades a stage to a passing, middling-confidence result rather
/// than blocking the pipeline (§4.F: "a validator with nothing to check
/// against passes with reduced confidence, it never rejects for lack of
/// data").
#[derive(Debug, Clone, Default)]
pub struct ValidationContext<'a> {
    /// Drives the GEOID validator.
    pub state_fips: Option<&'a str>,
    /// Reference centroid for the geographic-bounds validator.
    pub reference_centroid: Option<Point>,
    /// Per-state school overlap policy for the topology validator.
    pub overlap_policy: Option<&'a OverlapPolicyTable>,
    /// Ground-truth parent-jurisdiction polygon and expected council-district
    /// count. The polygon doubles as the topology validator's gap-check
    /// reference for any `MustTessellate` layer; the expected count is
    /// consulted only by the tessellation-proof validator (`CouncilDistrict`
    /// layer only).
    pub municipal_polygon: Option<(&'a Polygon, usize)>,
    /// A second provider's collection over the same scope, for the
    /// cross-source comparator.
    pub secondary_collection: Option<&'a FeatureCollection>,
}

/// Runs the seven validator stages against a `CanonicalReference` and the
/// configured `ValidationThresholds`.
pub struct ValidationPipeline<'a> {
    reference: &'a CanonicalReference,
    thresholds: ValidationThresholds,
}

impl<'a> ValidationPipeline<'a> {
    /// Construct a pipeline bound to a reference catalog and threshold set.
    pub fn new(reference: &'a CanonicalReference, thresholds: ValidationThresholds) -> Self {
        Self { reference, thresholds }
    }

    /// Run every applicable stage over `collection`, short-circuiting at the
    /// first rejection (§4.F: "stages run in a fixed order; the first
    /// rejecting stage stops the pipeline").
    pub fn run(&self, collection: &FeatureCollection, context: &ValidationContext<'_>) -> AggregatedValidationResult {
        let mut stages = Vec::new();

        let stage = name_pattern::validate(collection);
        let stopped = !stage.pass;
        stages.push(stage);
        if stopped {
            return AggregatedValidationResult::from_stages(stages);
        }

        let stage = cardinality::validate(collection);
        let stopped = !stage.pass;
        stages.push(stage);
        if stopped {
            return AggregatedValidationResult::from_stages(stages);
        }

        if let Some(state_fips) = context.state_fips {
            let stage = geoid::validate(collection, self.reference, state_fips);
            let stopped = !stage.pass;
            stages.push(stage);
            if stopped {
                return AggregatedValidationResult::from_stages(stages);
            }
        }

        if let Some(reference_centroid) = context.reference_centroid {
            let stage = geographic_bounds::validate(
                collection,
                reference_centroid,
                self.thresholds.geographic_bounds_km,
                self.thresholds.max_feature_count_ratio,
            );
            let stopped = !stage.pass;
            stages.push(stage);
            if stopped {
                return AggregatedValidationResult::from_stages(stages);
            }
        }

        let state_fips = context.state_fips.unwrap_or("");
        let empty_table = OverlapPolicyTable::new();
        let table = context.overlap_policy.unwrap_or(&empty_table);
        let parent_polygon = context.municipal_polygon.map(|(polygon, _)| polygon);
        let stage = topology::validate(collection, state_fips, table, parent_polygon);
        let stopped = !stage.pass;
        stages.push(stage);
        if stopped {
            return AggregatedValidationResult::from_stages(stages);
        }

        if let Some((municipal_polygon, expected_count)) = context.municipal_polygon {
            let (stage, _report) = tessellation::validate(
                collection,
                municipal_polygon,
                expected_count,
                self.thresholds.tessellation_coverage_ratio,
                self.thresholds.tessellation_tolerance_m2,
            );
            let stopped = !stage.pass;
            stages.push(stage);
            if stopped {
                return AggregatedValidationResult::from_stages(stages);
            }
        }

        if let Some(secondary) = context.secondary_collection {
            let stage = cross_source::validate(collection, secondary, self.thresholds.min_match_rate);
            stages.push(stage);
        }

        AggregatedValidationResult::from_stages(stages)
    }
}
