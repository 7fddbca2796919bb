//! Cross-source comparator (§4.F.7): Jaccard agreement between two
//! providers' collections for the same scope, where more than one exists.

use crate::types::geometry::Polygon;
use crate::types::{BoundaryId, FeatureCollection, Issue, StageResult, Warning};

/// Jaccard (intersection-over-union) between two polygons, approximated via
/// their bounding-box overlap area rather than an exact clip — consistent
/// with this module's documented planar approximation (see
/// `types::geometry`'s module doc).
fn jaccard(a: &Polygon, b: &Polygon) -> f64 {
    let (a_min_lon, a_max_lon, a_min_lat, a_max_lat) = bounds(a);
    let (b_min_lon, b_max_lon, b_min_lat, b_max_lat) = bounds(b);

    let ix_min_lon = a_min_lon.max(b_min_lon);
    let ix_max_lon = a_max_lon.min(b_max_lon);
    let ix_min_lat = a_min_lat.max(b_min_lat);
    let ix_max_lat = a_max_lat.min(b_max_lat);

    let iw = (ix_max_lon - ix_min_lon).max(0.0);
    let ih = (ix_max_lat - ix_min_lat).max(0.0);
    let intersection = iw * ih;

    let area_a = (a_max_lon - a_min_lon) * (a_max_lat - a_min_lat);
    let area_b = (b_max_lon - b_min_lon) * (b_max_lat - b_min_lat);
    let union = area_a + area_b - intersection;

    if union <= 0.0 {
        0.0
    } else {
        intersection / union
    }
}

fn bounds(polygon: &Polygon) -> (f64, f64, f64, f64) {
    let pts = &polygon.outer.points;
    let min_lon = pts.iter().map(|p| p.lon).fold(f64::INFINITY, f64::min);
    let max_lon = pts.iter().map(|p| p.lon).fold(f64::NEG_INFINITY, f64::max);
    let min_lat = pts.iter().map(|p| p.lat).fold(f64::INFINITY, f64::min);
    let max_lat = pts.iter().map(|p| p.lat).fold(f64::NEG_INFINITY, f64::max);
    (min_lon, max_lon, min_lat, max_lat)
}

/// Per-boundary Jaccard agreement outcome.
#[derive(Debug, Clone, PartialEq)]
pub enum AgreementOutcome {
    /// >= 0.95: a confirmed match.
    Match(f64),
    /// 0.90 - 0.95: logged as a warning, not a rejection.
    Warn(f64),
    /// < 0.90: a `GeometryMismatch`.
    Mismatch(f64),
}

fn classify(score: f64) -> AgreementOutcome {
    if score >= 0.95 {
        AgreementOutcome::Match(score)
    } else if score >= 0.90 {
        AgreementOutcome::Warn(score)
    } else {
        AgreementOutcome::Mismatch(score)
    }
}

/// Run the cross-source comparator between a primary collection and a
/// secondary-provider collection for the same scope. Boundaries present in
/// only one side are excluded from the match-rate denominator.
pub fn validate(primary: &FeatureCollection, secondary: &FeatureCollection, min_match_rate: f64) -> StageResult {
    let mut issues = Vec::new();
    let mut warnings = Vec::new();
    let mut compared = 0usize;
    let mut matched = 0usize;

    for record in &primary.records {
        let Some(other) = secondary
            .records
            .iter()
            .find(|r| r.boundary_id == record.boundary_id)
        else {
            continue;
        };
        let (Some(a), Some(b)) = (record.geometry.polygons().first(), other.geometry.polygons().first()) else {
            continue;
        };
        compared += 1;
        let score = jaccard(a, b);
        match classify(score) {
            AgreementOutcome::Match(_) => matched += 1,
            AgreementOutcome::Warn(s) => {
                matched += 1;
                warnings.push(Warning::new(
                    "cross_source_low_agreement",
                    format!("'{}' Jaccard {s:.3} in the 0.90-0.95 warning band", record.boundary_id),
                ));
            }
            AgreementOutcome::Mismatch(s) => {
                issues.push(Issue::for_record(
                    "geometry_mismatch",
                    format!("'{}' Jaccard {s:.3} below 0.90", record.boundary_id),
                    record.boundary_id.clone(),
                ));
            }
        }
    }

    if compared == 0 {
        return StageResult::pass("cross_source", 60);
    }

    let match_rate = matched as f64 / compared as f64;
    if match_rate < min_match_rate {
        issues.push(Issue::new(
            "cross_source_match_rate",
            format!("aggregate match rate {match_rate:.3} below {min_match_rate:.3}"),
        ));
        return StageResult::reject("cross_source", 10, issues);
    }

    StageResult::pass("cross_source", 85).with_warnings(warnings)
}

/// Expose the boundary ids that were compared, for diagnostics.
pub fn compared_ids(primary: &FeatureCollection, secondary: &FeatureCollection) -> Vec<BoundaryId> {
    primary
        .records
        .iter()
        .filter(|r| secondary.records.iter().any(|o| o.boundary_id == r.boundary_id))
        .map(|r| r.boundary_id.clone())
        .collect()
}
