//! Tessellation proof validator (§4.F.6): municipal council layer only.
//! Verifies exclusivity, exhaustivity, containment, and cardinality against
//! a ground-truth municipal polygon.

use crate::types::geometry::Polygon;
use crate::types::{FeatureCollection, Issue, StageResult};

/// Detailed per-axiom outcome, returned alongside the `StageResult` so
/// callers can build a precise remediation message (§4.F.6 "failure
/// attributes are returned for remediation messages").
#[derive(Debug, Clone, PartialEq)]
pub struct TessellationReport {
    /// Pairwise interior-disjoint above tolerance.
    pub exclusive: bool,
    /// Coverage ratio >= threshold.
    pub exhaustive: bool,
    /// District union is a subset of the municipal polygon + tolerance.
    pub contained: bool,
    /// Observed count equals expected count.
    pub cardinality_ok: bool,
    /// Computed coverage ratio (land area covered / municipal land area).
    pub coverage_ratio: f64,
}

fn approximately_overlaps(a: &Polygon, b: &Polygon) -> bool {
    a.contains_point(b.centroid()) || b.contains_point(a.centroid())
}

/// Run the tessellation-proof validator.
pub fn validate(
    collection: &FeatureCollection,
    municipal_polygon: &Polygon,
    expected_count: usize,
    coverage_ratio_threshold: f64,
    tolerance_m2: f64,
) -> (StageResult, TessellationReport) {
    let districts: Vec<Polygon> = collection
        .records
        .iter()
        .flat_map(|r| r.geometry.polygons().to_vec())
        .collect();

    // Coarse overlap-area estimate (no real polygon clip is implemented):
    // treat an approximately-overlapping pair as contributing the smaller of
    // the two polygons' areas, and only fail exclusivity once the summed
    // estimate exceeds the configured tolerance.
    let mut overlap_area = 0.0;
    for i in 0..districts.len() {
        for j in (i + 1)..districts.len() {
            if approximately_overlaps(&districts[i], &districts[j]) {
                overlap_area += districts[i].area_m2().min(districts[j].area_m2());
            }
        }
    }
    let exclusive = overlap_area <= tolerance_m2;

    // Exhaustivity accounts for land vs. water area rather than raw polygon
    // vertex area alone, since a district's recorded footprint includes both.
    let district_area: f64 = collection
        .records
        .iter()
        .map(|r| r.land_area_m2 + r.water_area_m2)
        .sum();
    let municipal_area = municipal_polygon.area_m2();
    let coverage_ratio = if municipal_area > 0.0 {
        (district_area / municipal_area).min(1.0)
    } else {
        0.0
    };
    let exhaustive = coverage_ratio >= coverage_ratio_threshold;

    // Containment: a district whose centroid falls outside the municipal
    // polygon contributes its full area as "overshoot"; tolerated up to
    // `tolerance_m2` total, per "district union ⊆ municipal polygon +
    // tolerance".
    let overshoot_area: f64 = districts
        .iter()
        .filter(|d| !municipal_polygon.contains_point(d.centroid()))
        .map(|d| d.area_m2())
        .sum();
    let contained = overshoot_area <= tolerance_m2;

    let cardinality_ok = collection.records.len() == expected_count;

    let report = TessellationReport {
        exclusive,
        exhaustive,
        contained,
        cardinality_ok,
        coverage_ratio,
    };

    let stage = if exclusive && exhaustive && contained && cardinality_ok {
        StageResult::pass("tessellation", 90)
    } else {
        let mut issues = Vec::new();
        if !exclusive {
            issues.push(Issue::new("tessellation_exclusivity", "districts overlap beyond tolerance"));
        }
        if !exhaustive {
            issues.push(Issue::new(
                "tessellation_exhaustivity",
                format!("coverage ratio {coverage_ratio:.3} below threshold {coverage_ratio_threshold:.3}"),
            ));
        }
        if !contained {
            issues.push(Issue::new("tessellation_containment", "district union extends beyond the municipal polygon"));
        }
        if !cardinality_ok {
            issues.push(Issue::new(
                "tessellation_cardinality",
                format!("observed {} districts, expected {expected_count}", collection.records.len()),
            ));
        }
        StageResult::reject("tessellation", 10, issues)
    };

    (stage, report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::boundary::{AuthorityTier, Provenance};
    use crate::types::feature_collection::CollectionProvenance;
    use crate::types::geometry::{Geometry, Point, Ring};
    use crate::types::property::FeatureProperties;
    use crate::types::{BoundaryId, BoundaryRecord, Layer, Scope};
    use chrono::Utc;

    fn square(cx: f64, cy: f64, half: f64, id: &str) -> BoundaryRecord {
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
            layer: Layer::CouncilDistrict,
            jurisdiction_fips: "0666000".to_string(),
            display_name: format!("District {id}"),
            vintage_year: 2024,
            geometry: Geometry::Polygon(poly),
            land_area_m2: 1.0,
            water_area_m2: 0.0,
            provenance: Provenance {
                source_url: "https://example.test".to_string(),
                response_checksum: "a".repeat(64),
                retrieved_at: Utc::now(),
                authority_tier: AuthorityTier::Municipal,
            },
            attributes: FeatureProperties::new(),
        }
    }

    fn collection(records: Vec<BoundaryRecord>) -> FeatureCollection {
        FeatureCollection {
            layer: Layer::CouncilDistrict,
            scope: Scope::Single(BoundaryId::new("0666000")),
            records,
            collection_provenance: CollectionProvenance {
                provider_id: "test".to_string(),
                query_description: "test".to_string(),
                cache_hit: false,
            },
        }
    }

    #[test]
    fn two_quadrants_cover_a_larger_square_with_wrong_cardinality() {
        let municipal = Polygon::new(
            Ring::new(vec![
                Point::new(-2.0, -2.0),
                Point::new(2.0, -2.0),
                Point::new(2.0, 2.0),
                Point::new(-2.0, 2.0),
                Point::new(-2.0, -2.0),
            ]),
            vec![],
        );
        let records = vec![square(-1.0, 0.0, 1.0, "a"), square(1.0, 0.0, 1.0, "b")];
        let c = collection(records);
        let (stage, report) = validate(&c, &municipal, 9, 0.97, 100.0);
        assert!(!stage.pass);
        assert!(!report.cardinality_ok);
    }
}
