//! Typed replacement for upstream providers' dynamic property bags.
//!
//! §9 flags "dynamic, untyped feature dictionaries" as a pattern requiring
//! re-architecture: upstream JSON/shapefile attribute tables are modeled as
//! a closed `PropertyValue` tagged union over an ordered `BTreeMap`, never
//! as an untyped blob threaded through the pipeline.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single attribute value from an upstream feature's property table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum PropertyValue {
    /// A text value.
    String(String),
    /// An integer value.
    Int(i64),
    /// A floating-point value.
    Float(f64),
    /// An explicit null/absent value.
    Null,
}

impl PropertyValue {
    /// Borrow as a string, if this is a `String` variant.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Coerce to `i64`, accepting both `Int` and whole-valued `Float`.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            PropertyValue::Int(i) => Some(*i),
            PropertyValue::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            _ => None,
        }
    }
}

/// Ordered, semantic property bag attached to a `BoundaryRecord`.
///
/// `BTreeMap` keeps key order deterministic for canonical hashing (§4.G.6).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureProperties(pub BTreeMap<String, PropertyValue>);

impl FeatureProperties {
    /// An empty property bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an attribute.
    pub fn insert(&mut self, key: impl Into<String>, value: PropertyValue) {
        self.0.insert(key.into(), value);
    }

    /// Look up an attribute by key.
    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        self.0.get(key)
    }

    /// Canonical bytes for the attribute digest (§4.G.6): keys are already
    /// sorted by `BTreeMap` iteration order, serialized as
    /// `key_len || key || tag || value_bytes` per entry.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&(self.0.len() as u32).to_be_bytes());
        for (key, value) in &self.0 {
            bytes.extend_from_slice(&(key.len() as u32).to_be_bytes());
            bytes.extend_from_slice(key.as_bytes());
            match value {
                PropertyValue::String(s) => {
                    bytes.push(0);
                    bytes.extend_from_slice(&(s.len() as u32).to_be_bytes());
                    bytes.extend_from_slice(s.as_bytes());
                }
                PropertyValue::Int(i) => {
                    bytes.push(1);
                    bytes.extend_from_slice(&i.to_be_bytes());
                }
                PropertyValue::Float(f) => {
                    bytes.push(2);
                    bytes.extend_from_slice(&f.to_bits().to_be_bytes());
                }
                PropertyValue::Null => {
                    bytes.push(3);
                }
            }
        }
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_bytes_deterministic_regardless_of_insertion_order() {
        let mut a = FeatureProperties::new();
        a.insert("b", PropertyValue::Int(2));
        a.insert("a", PropertyValue::Int(1));

        let mut b = FeatureProperties::new();
        b.insert("a", PropertyValue::Int(1));
        b.insert("b", PropertyValue::Int(2));

        assert_eq!(a.canonical_bytes(), b.canonical_bytes());
    }

    #[test]
    fn as_int_coerces_whole_float() {
        assert_eq!(PropertyValue::Float(5.0).as_int(), Some(5));
        assert_eq!(PropertyValue::Float(5.5).as_int(), None);
    }
}
