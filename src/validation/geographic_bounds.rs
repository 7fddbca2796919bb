//! Geographic-bounds validator (§4.F.4): collection centroid vs. a reference
//! polygon for the scope, plus the `max_feature_count_ratio` sanity check.

use crate::types::geometry::{haversine_km, Point, Polygon};
use crate::types::{FeatureCollection, Issue, StageResult};

use super::cardinality::typical_ratio;

/// Area-weighted centroid across every record's geometry in the collection.
fn collection_centroid(collection: &FeatureCollection) -> Option<Point> {
    if collection.records.is_empty() {
        return None;
    }
    let mut sum_lon = 0.0;
    let mut sum_lat = 0.0;
    let mut n = 0.0;
    for record in &collection.records {
        let c = record.geometry.centroid();
        sum_lon += c.lon;
        sum_lat += c.lat;
        n += 1.0;
    }
    Some(Point::new(sum_lon / n, sum_lat / n))
}

/// Run the geographic-bounds validator.
///
/// `reference_polygon` is the authoritative polygon for the scope (e.g. a
/// Census PLACE boundary); `reference_centroid` is used instead when no
/// full polygon is available. `threshold_km` and `max_ratio` come from
/// `ValidationThresholds`.
pub fn validate(
    collection: &FeatureCollection,
    reference_centroid: Point,
    threshold_km: f64,
    max_ratio: f64,
) -> StageResult {
    let Some(centroid) = collection_centroid(collection) else {
        return StageResult::pass("geographic_bounds", 60);
    };

    let distance_km = haversine_km(centroid, reference_centroid);
    if distance_km > threshold_km {
        return StageResult::reject(
            "geographic_bounds",
            10,
            vec![Issue::new(
                "geographic_bounds",
                format!(
                    "collection centroid is {distance_km:.1} km from the reference scope centroid \
                     (threshold {threshold_km:.1} km)"
                ),
            )],
        );
    }

    let ratio = typical_ratio(collection.layer, collection.records.len());
    if ratio > max_ratio {
        return StageResult::reject(
            "geographic_bounds",
            10,
            vec![Issue::new(
                "feature_count_ratio_exceeded",
                format!("feature count ratio {ratio:.2} exceeds max_feature_count_ratio {max_ratio:.2}"),
            )],
        );
    }

    StageResult::pass("geographic_bounds", 90)
}

/// Reference centroid for a reference polygon, for callers that only have
/// a polygon on hand.
pub fn reference_centroid_of(polygon: &Polygon) -> Point {
    polygon.centroid()
}
