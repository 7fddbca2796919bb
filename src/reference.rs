//! Canonical Reference (§4.A): authoritative expected GEOID data, independent
//! of any upstream provider.

use std::collections::BTreeMap;

use regex_lite::Regex;

use crate::error::{Error, Result};
use crate::types::Layer;

/// Expected GEOID data for a single `(layer, state_fips)` pair.
#[derive(Debug, Clone)]
pub enum ExpectedGeoids {
    /// A fully enumerated set of GEOIDs, in canonical order.
    Enumerated(Vec<String>),
    /// A variable-length/variable-pattern layer (e.g. town-coded state
    /// districts): no enumeration, only a validating regex and a count.
    Variable {
        /// Pattern a well-formed GEOID for this layer/state must match.
        pattern: Regex,
        /// Authoritative expected count, stored explicitly since it cannot
        /// be derived from an enumerated set.
        expected_count: usize,
    },
}

/// Result of `complete()`: what is missing, what is unexpected, and whether
/// the observed set matches the reference exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completeness {
    /// Whether `missing` and `extra` are both empty.
    pub ok: bool,
    /// GEOIDs expected but not observed, in canonical order.
    pub missing: Vec<String>,
    /// GEOIDs observed but not expected, in the order they were observed.
    pub extra: Vec<String>,
}

/// The authoritative, self-validating expected-GEOID catalog.
///
/// §4.A: "At module initialization it self-validates: for every enumerated
/// (layer, state), `|set| == expected_count`. If any mismatch, initialization
/// fails with a fatal configuration error."
pub struct CanonicalReference {
    entries: BTreeMap<(Layer, String), ExpectedGeoids>,
}

impl CanonicalReference {
    /// Build a reference from explicit entries, self-validating as specified.
    pub fn new(entries: BTreeMap<(Layer, String), ExpectedGeoids>) -> Result<Self> {
        for ((layer, state), expected) in &entries {
            if let ExpectedGeoids::Enumerated(geoids) = expected {
                // an enumerated set's own length *is* its expected_count by
                // construction, so the only way this can be wrong is a caller
                // passing duplicate entries.
                let mut sorted = geoids.clone();
                sorted.sort();
                sorted.dedup();
                if sorted.len() != geoids.len() {
                    return Err(Error::Configuration {
                        message: format!(
                            "canonical reference for {layer}/{state} contains duplicate GEOIDs"
                        ),
                    });
                }
            }
        }
        Ok(Self { entries })
    }

    /// Expected GEOIDs for `(layer, state_fips)`, if this reference has an
    /// entry for it.
    pub fn expected_geoids(&self, layer: Layer, state_fips: &str) -> Option<&[String]> {
        match self.entries.get(&(layer, state_fips.to_string()))? {
            ExpectedGeoids::Enumerated(geoids) => Some(geoids.as_slice()),
            ExpectedGeoids::Variable { .. } => None,
        }
    }

    /// Expected feature count for `(layer, state_fips)`, derived from the
    /// enumerated set or read from the explicit count for variable layers.
    pub fn expected_count(&self, layer: Layer, state_fips: &str) -> Option<usize> {
        match self.entries.get(&(layer, state_fips.to_string()))? {
            ExpectedGeoids::Enumerated(geoids) => Some(geoids.len()),
            ExpectedGeoids::Variable { expected_count, .. } => Some(*expected_count),
        }
    }

    /// Whether this layer/state uses a variable-length GEOID pattern instead
    /// of an enumerated set.
    pub fn is_variable_length(&self, layer: Layer, state_fips: &str) -> bool {
        matches!(
            self.entries.get(&(layer, state_fips.to_string())),
            Some(ExpectedGeoids::Variable { .. })
        )
    }

    /// Whether a GEOID matches the variable-length pattern for this layer/state.
    /// Returns `None` if this layer/state is not a variable-length entry.
    pub fn matches_pattern(&self, layer: Layer, state_fips: &str, geoid: &str) -> Option<bool> {
        match self.entries.get(&(layer, state_fips.to_string()))? {
            ExpectedGeoids::Variable { pattern, .. } => Some(pattern.is_match(geoid)),
            ExpectedGeoids::Enumerated(_) => None,
        }
    }

    /// GEOIDs expected but not present in `observed`, in canonical order.
    /// Empty for variable-length layers (nothing to enumerate against).
    pub fn missing(&self, layer: Layer, state_fips: &str, observed: &[String]) -> Vec<String> {
        let Some(expected) = self.expected_geoids(layer, state_fips) else {
            return Vec::new();
        };
        expected
            .iter()
            .filter(|g| !observed.contains(g))
            .cloned()
            .collect()
    }

    /// GEOIDs present in `observed` but not expected, preserving observed order.
    pub fn extra(&self, layer: Layer, state_fips: &str, observed: &[String]) -> Vec<String> {
        let Some(expected) = self.expected_geoids(layer, state_fips) else {
            return Vec::new();
        };
        observed
            .iter()
            .filter(|g| !expected.contains(g))
            .cloned()
            .collect()
    }

    /// Full completeness check against an observed GEOID set.
    pub fn complete(&self, layer: Layer, state_fips: &str, observed: &[String]) -> Completeness {
        let missing = self.missing(layer, state_fips, observed);
        let extra = self.extra(layer, state_fips, observed);
        Completeness {
            ok: missing.is_empty() && extra.is_empty(),
            missing,
            extra,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference_with(layer: Layer, state: &str, geoids: Vec<&str>) -> CanonicalReference {
        let mut entries = BTreeMap::new();
        entries.insert(
            (layer, state.to_string()),
            ExpectedGeoids::Enumerated(geoids.into_iter().map(String::from).collect()),
        );
        CanonicalReference::new(entries).unwrap()
    }

    #[test]
    fn at_large_delaware_expects_single_geoid() {
        let reference = reference_with(Layer::Congressional, "10", vec!["1000"]);
        assert_eq!(reference.expected_count(Layer::Congressional, "10"), Some(1));
        let observed = vec!["1000".to_string()];
        assert!(reference
            .complete(Layer::Congressional, "10", &observed)
            .ok);
    }

    #[test]
    fn missing_and_extra_are_computed_independently() {
        let reference = reference_with(Layer::Congressional, "39", vec!["3901", "3902", "3903"]);
        let observed = vec!["3901".to_string(), "3904".to_string()];
        let completeness = reference.complete(Layer::Congressional, "39", &observed);
        assert_eq!(completeness.missing, vec!["3902", "3903"]);
        assert_eq!(completeness.extra, vec!["3904"]);
        assert!(!completeness.ok);
    }

    #[test]
    fn duplicate_geoids_fail_self_validation() {
        let mut entries = BTreeMap::new();
        entries.insert(
            (Layer::Congressional, "10".to_string()),
            ExpectedGeoids::Enumerated(vec!["1000".to_string(), "1000".to_string()]),
        );
        assert!(CanonicalReference::new(entries).is_err());
    }

    #[test]
    fn variable_length_layer_has_no_enumeration() {
        let mut entries = BTreeMap::new();
        entries.insert(
            (Layer::StateLower, "33".to_string()),
            ExpectedGeoids::Variable {
                pattern: Regex::new(r"^33\d{3}[A-Z]?$").unwrap(),
                expected_count: 400,
            },
        );
        let reference = CanonicalReference::new(entries).unwrap();
        assert!(reference.is_variable_length(Layer::StateLower, "33"));
        assert_eq!(
            reference.expected_geoids(Layer::StateLower, "33"),
            None
        );
        assert_eq!(
            reference.matches_pattern(Layer::StateLower, "33", "33001A"),
            Some(true)
        );
        assert_eq!(
            reference.matches_pattern(Layer::StateLower, "33", "xx001"),
            Some(false)
        );
    }

    #[test]
    fn unknown_layer_state_yields_empty_missing_extra() {
        let reference = reference_with(Layer::Congressional, "10", vec!["1000"]);
        assert!(reference
            .missing(Layer::County, "99", &[])
            .is_empty());
        assert!(reference
            .extra(Layer::County, "99", &["x".to_string()])
            .is_empty());
    }
}
