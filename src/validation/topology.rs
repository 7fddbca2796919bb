//! Topology validator (§4.F.5): self-intersections, pairwise overlaps, and
//! tessellation gaps, with layer-specific overlap tolerance.

use std::collections::BTreeMap;

use crate::types::{FeatureCollection, Issue, Layer, StageResult};

/// Per-state topology policy for layers whose tessellation rules vary (§9
/// open question: "School-district overlap semantics vary by state").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlapPolicy {
    /// Districts of this layer/state must tessellate (no overlaps allowed).
    MustTessellate,
    /// Overlaps are expected and not penalized (e.g. split elementary and
    /// secondary districts sharing the same ground).
    OverlapsAllowed,
}

/// State-keyed overlap policy table. Unstated states default to
/// `OverlapsAllowed` ("no tessellation required"), per §9 — deliberately
/// permissive until calibrated.
pub type OverlapPolicyTable = BTreeMap<String, OverlapPolicy>;

/// Resolve the overlap policy for a layer/state, consulting the table only
/// for layers whose tessellation rules are state-dependent (school layers);
/// other layers use their fixed `Layer::tessellates_by_default`.
pub fn policy_for(layer: Layer, state_fips: &str, table: &OverlapPolicyTable) -> OverlapPolicy {
    let is_school = matches!(
        layer,
        Layer::SchoolUnified | Layer::SchoolElementary | Layer::SchoolSecondary
    );
    if is_school {
        table
            .get(state_fips)
            .copied()
            .unwrap_or(OverlapPolicy::OverlapsAllowed)
    } else if layer.tessellates_by_default() {
        OverlapPolicy::MustTessellate
    } else {
        OverlapPolicy::OverlapsAllowed
    }
}

/// Approximate overlap check between two polygons' bounding centroids and
/// areas: treats the pair as overlapping if their geometry's `contains_point`
/// test on each other's centroid succeeds. This is a coarse approximation
/// documented as such — a full polygon-clip intersection is out of scope.
fn approximately_overlaps(a: &crate::types::geometry::Geometry, b: &crate::types::geometry::Geometry) -> bool {
    a.contains_point(b.centroid()) || b.contains_point(a.centroid())
}

/// Run the topology validator. `parent_polygon`, when given, is the
/// jurisdiction the collection is meant to tessellate; its absence degrades
/// the gap check (no parent means nothing to measure coverage against).
pub fn validate(
    collection: &FeatureCollection,
    state_fips: &str,
    table: &OverlapPolicyTable,
    parent_polygon: Option<&crate::types::geometry::Polygon>,
) -> StageResult {
    let mut issues = Vec::new();

    for record in &collection.records {
        let self_intersections = record.geometry.self_intersections();
        if self_intersections > 0 {
            issues.push(Issue::for_record(
                "self_intersection",
                format!("{self_intersections} self-intersection(s) detected"),
                record.boundary_id.clone(),
            ));
        }
    }

    let policy = policy_for(collection.layer, state_fips, table);
    if policy == OverlapPolicy::MustTessellate {
        for i in 0..collection.records.len() {
            for j in (i + 1)..collection.records.len() {
                if approximately_overlaps(&collection.records[i].geometry, &collection.records[j].geometry) {
                    issues.push(Issue::new(
                        "overlap",
                        format!(
                            "'{}' and '{}' overlap but layer requires tessellation",
                            collection.records[i].boundary_id, collection.records[j].boundary_id
                        ),
                    ));
                }
            }
        }

        if let Some(parent) = parent_polygon {
            let parent_area = parent.area_m2();
            if parent_area > 0.0 {
                let covered: f64 = collection
                    .records
                    .iter()
                    .map(|r| r.land_area_m2 + r.water_area_m2)
                    .sum();
                let coverage_ratio = (covered / parent_area).min(1.0);
                const GAP_TOLERANCE: f64 = 0.03;
                if coverage_ratio < 1.0 - GAP_TOLERANCE {
                    issues.push(Issue::new(
                        "tessellation_gap",
                        format!("coverage ratio {coverage_ratio:.3} leaves a gap against the parent jurisdiction"),
                    ));
                }
            }
        }
    }

    if issues.is_empty() {
        StageResult::pass("topology", 90)
    } else {
        StageResult::reject("topology", 10, issues)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::boundary::{AuthorityTier, Provenance};
    use crate::types::feature_collection::CollectionProvenance;
    use crate::types::geometry::{Geometry, Point, Polygon, Ring};
    use crate::types::property::FeatureProperties;
    use crate::types::{BoundaryId, BoundaryRecord, Scope};
    use chrono::Utc;

    fn square(cx: f64, cy: f64, half: f64, id: &str, layer: Layer) -> BoundaryRecord {
        let poly = Polygon::new(
            Ring::new(vec![
                Point::new(cx - half, cy - half),
                Point::new(cx + half, cy - half),
                Point::new(cx + half, cy + half),
                Point::new(cx - half, cy + half),
                Point::new(cx - half, cy - half),
            ]),
            vec![],
        );
        BoundaryRecord {
            boundary_id: BoundaryId::new(id),
            layer,
            jurisdiction_fips: "10".to_string(),
            display_name: format!("District {id}"),
            vintage_year: 2024,
            geometry: Geometry::Polygon(poly),
            land_area_m2: 1.0,
            water_area_m2: 0.0,
            provenance: Provenance {
                source_url: "https://example.test".to_string(),
                response_checksum: "a".repeat(64),
                retrieved_at: Utc::now(),
                authority_tier: AuthorityTier::Federal,
            },
            attributes: FeatureProperties::new(),
        }
    }

    fn collection(records: Vec<BoundaryRecord>, layer: Layer) -> FeatureCollection {
        FeatureCollection {
            layer,
            scope: Scope::State("10".to_string()),
            records,
            collection_provenance: CollectionProvenance {
                provider_id: "test".to_string(),
                query_description: "test".to_string(),
                cache_hit: false,
            },
        }
    }

    #[test]
    fn non_overlapping_districts_pass() {
        let records = vec![
            square(0.0, 0.0, 1.0, "a", Layer::Congressional),
            square(3.0, 0.0, 1.0, "b", Layer::Congressional),
        ];
        let c = collection(records, Layer::Congressional);
        let result = validate(&c, "10", &OverlapPolicyTable::new(), None);
        assert!(result.pass);
    }

    #[test]
    fn overlapping_districts_fail_when_tessellation_required() {
        let records = vec![
            square(0.0, 0.0, 1.0, "a", Layer::Congressional),
            square(0.5, 0.0, 1.0, "b", Layer::Congressional),
        ];
        let c = collection(records, Layer::Congressional);
        let result = validate(&c, "10", &OverlapPolicyTable::new(), None);
        assert!(!result.pass);
    }

    #[test]
    fn split_school_districts_may_overlap() {
        let records = vec![
            square(0.0, 0.0, 1.0, "elem", Layer::SchoolElementary),
            square(0.5, 0.0, 1.0, "sec", Layer::SchoolElementary),
        ];
        let c = collection(records, Layer::SchoolElementary);
        let result = validate(&c, "33", &OverlapPolicyTable::new(), None);
        assert!(result.pass);
    }

    #[test]
    fn unstated_state_defaults_to_overlaps_allowed() {
        assert_eq!(
            policy_for(Layer::SchoolUnified, "99", &OverlapPolicyTable::new()),
            OverlapPolicy::OverlapsAllowed
        );
    }

    #[test]
    fn a_gap_against_the_parent_jurisdiction_is_rejected() {
        let parent = Polygon::new(
            Ring::new(vec![
                Point::new(-2.0, -2.0),
                Point::new(2.0, -2.0),
                Point::new(2.0, 2.0),
                Point::new(-2.0, 2.0),
                Point::new(-2.0, -2.0),
            ]),
            vec![],
        );
        // One small district, recorded land area far smaller than the
        // parent's footprint: most of the jurisdiction is uncovered.
        let mut district = square(0.0, 0.0, 1.0, "a", Layer::Congressional);
        district.land_area_m2 = 1.0;
        district.water_area_m2 = 0.0;
        let c = collection(vec![district], Layer::Congressional);
        let result = validate(&c, "10", &OverlapPolicyTable::new(), Some(&parent));
        assert!(!result.pass);
        assert!(result.issues.iter().any(|i| i.kind == "tessellation_gap"));
    }

    #[test]
    fn full_coverage_against_the_parent_passes() {
        let parent = Polygon::new(
            Ring::new(vec![
                Point::new(-1.0, -1.0),
                Point::new(1.0, -1.0),
                Point::new(1.0, 1.0),
                Point::new(-1.0, 1.0),
                Point::new(-1.0, -1.0),
            ]),
            vec![],
        );
        let mut district = square(0.0, 0.0, 1.0, "a", Layer::Congressional);
        district.land_area_m2 = 4.0;
        district.water_area_m2 = 0.0;
        let c = collection(vec![district], Layer::Congressional);
        let result = validate(&c, "10", &OverlapPolicyTable::new(), Some(&parent));
        assert!(result.pass);
    }
}
