//! GEOID validator (§4.F.3): completeness against the Canonical Reference,
//! or pattern conformance for variable-length layers.

use crate::reference::CanonicalReference;
use crate::types::{FeatureCollection, Issue, StageResult};

/// Run the GEOID validator. `state_fips` identifies the Canonical Reference
/// entry this collection should be checked against.
pub fn validate(
    collection: &FeatureCollection,
    reference: &CanonicalReference,
    state_fips: &str,
) -> StageResult {
    let layer = collection.layer;

    if reference.is_variable_length(layer, state_fips) {
        let mut issues = Vec::new();
        for record in &collection.records {
            if reference.matches_pattern(layer, state_fips, record.boundary_id.as_str()) == Some(false) {
                issues.push(Issue::for_record(
                    "geoid_pattern_violation",
                    format!("'{}' does not match the expected GEOID pattern", record.boundary_id),
                    record.boundary_id.clone(),
                ));
            }
        }
        return if issues.is_empty() {
            StageResult::pass("geoid", 90)
        } else {
            StageResult::reject("geoid", 10, issues)
        };
    }

    if reference.expected_geoids(layer, state_fips).is_none() {
        // No reference entry at all for this (layer, state): nothing to
        // check against, pass through with a middling confidence.
        return StageResult::pass("geoid", 60);
    }

    let observed: Vec<String> = collection
        .records
        .iter()
        .map(|r| r.boundary_id.as_str().to_string())
        .collect();
    let completeness = reference.complete(layer, state_fips, &observed);

    if completeness.ok {
        StageResult::pass("geoid", 90)
    } else {
        let mut issues = Vec::new();
        if !completeness.missing.is_empty() {
            issues.push(Issue::new(
                "geoid_missing",
                format!("missing GEOIDs: {}", completeness.missing.join(", ")),
            ));
        }
        if !completeness.extra.is_empty() {
            issues.push(Issue::new(
                "geoid_extra",
                format!("unexpected GEOIDs: {}", completeness.extra.join(", ")),
            ));
        }
        StageResult::reject("geoid", 10, issues)
    }
}
