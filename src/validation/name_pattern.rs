//! Name-pattern validator (§4.F.1): detects semantic misalignment between a
//! layer's expected naming conventions and what was actually extracted.

use regex_lite::Regex;

use crate::types::{FeatureCollection, Issue, Layer, StageResult, Warning};

/// Keywords that, when present in a `display_name`, strongly suggest the
/// collection is the wrong kind of boundary for the requested layer.
fn red_flag_patterns(layer: Layer) -> Vec<&'static str> {
    match layer {
        Layer::CouncilDistrict => vec!["transit", "neighborhood", "precinct", "state senate"],
        Layer::StateUpper | Layer::StateLower => vec!["council district", "ward"],
        Layer::County => vec!["city council", "municipal"],
        _ => vec![],
    }
}

/// Explicit numbered-district / ward / zone patterns are a positive signal
/// that a feature is a genuine district, regardless of layer.
fn green_flag_regex() -> Regex {
    Regex::new(r"(?i)\b(district|ward|zone|precinct)\s*\d+\b").unwrap()
}

/// Run the name-pattern validator over a collection.
pub fn validate(collection: &FeatureCollection) -> StageResult {
    let red_flags = red_flag_patterns(collection.layer);
    let green = green_flag_regex();

    for record in &collection.records {
        let name_lower = record.display_name.to_lowercase();
        for flag in &red_flags {
            if name_lower.contains(flag) {
                return StageResult::reject(
                    "name_pattern",
                    15,
                    vec![Issue::for_record(
                        "name_pattern_red_flag",
                        format!("display_name '{}' matches red-flag pattern '{flag}'", record.display_name),
                        record.boundary_id.clone(),
                    )],
                );
            }
        }
    }

    if collection.records.is_empty() {
        return StageResult::pass("name_pattern", 60);
    }

    let green_matches = collection
        .records
        .iter()
        .filter(|r| green.is_match(&r.display_name))
        .count();
    let green_ratio = green_matches as f64 / collection.records.len() as f64;

    let confidence = if green_ratio >= 0.9 {
        85
    } else if green_ratio >= 0.5 {
        70
    } else {
        60
    };

    let mut result = StageResult::pass("name_pattern", confidence);
    if confidence == 60 {
        result = result.with_warnings(vec![Warning::new(
            "low_green_flag_ratio",
            format!("only {:.0}% of features match an explicit numbered-district pattern", green_ratio * 100.0),
        )]);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::boundary::{AuthorityTier, BoundaryId, Provenance};
    use crate::types::feature_collection::CollectionProvenance;
    use crate::types::geometry::{Geometry, Point, Polygon, Ring};
    use crate::types::property::FeatureProperties;
    use crate::types::Scope;
    use chrono::Utc;

    fn record(id: &str, name: &str) -> crate::types::BoundaryRecord {
        let poly = Polygon::new(
            Ring::new(vec![
                Point::new(0.0, 0.0),
                Point::new(1.0, 0.0),
                Point::new(1.0, 1.0),
                Point::new(0.0, 1.0),
                Point::new(0.0, 0.0),
            ]),
            vec![],
        );
        crate::types::BoundaryRecord {
            boundary_id: BoundaryId::new(id),
            layer: Layer::CouncilDistrict,
            jurisdiction_fips: "0666000".to_string(),
            display_name: name.to_string(),
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

    fn collection(records: Vec<crate::types::BoundaryRecord>) -> FeatureCollection {
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
    fn numbered_districts_pass_with_high_confidence() {
        let c = collection(vec![record("1", "District 1"), record("2", "District 2")]);
        let result = validate(&c);
        assert!(result.pass);
        assert_eq!(result.confidence, 85);
    }

    #[test]
    fn transit_keyword_in_council_scope_rejects() {
        let c = collection(vec![record("1", "Transit Zone A")]);
        let result = validate(&c);
        assert!(!result.pass);
        assert_eq!(result.confidence, 15);
    }
}
