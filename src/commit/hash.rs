//! Pinned leaf/node hash (§4.G, §9 hash-binding invariant).
//!
//! The spec names Poseidon over a field pinned to a downstream ZK circuit's
//! round constants — but that circuit is explicitly out of scope and absent
//! from this repository's dependency stack (see `DESIGN.md`, "Open Question
//! decisions"). This module pins the committed hash to SHA-256 instead,
//! applied byte-for-byte as specified: the algorithm, the encoding, and the
//! byte order are the contract, not an implementation detail. A future
//! circuit integration swaps only this module; `tree.rs` and `proof.rs`
//! above it are hash-agnostic over a `[u8; 32]` digest.

use sha2::{Digest, Sha256};

use crate::types::boundary::BoundaryRecord;
use crate::types::geometry::Geometry;
use crate::types::property::FeatureProperties;

/// A 32-byte digest: a leaf hash, a node hash, or a component digest.
pub type Digest32 = [u8; 32];

/// SHA-256 over the geometry's canonical encoding (§4.G.5).
pub fn geometry_digest(geometry: &Geometry) -> Digest32 {
    Sha256::digest(geometry.canonical_bytes()).into()
}

/// SHA-256 over attributes sorted by key (§4.G.6).
pub fn attribute_digest(attributes: &FeatureProperties) -> Digest32 {
    Sha256::digest(attributes.canonical_bytes()).into()
}

/// SHA-256 over `(source_url || response_checksum || authority_tier)` (§4.G.7).
pub fn provenance_digest(record: &BoundaryRecord) -> Digest32 {
    Sha256::digest(record.provenance.canonical_bytes()).into()
}

/// Canonical leaf-encoding bytes for one `BoundaryRecord` (§4.G):
/// `layer_tag || boundary_id (len-prefixed) || jurisdiction_fips
/// (len-prefixed) || vintage_year (BE u16) || geometry_digest ||
/// attribute_digest || provenance_digest`.
pub fn leaf_encoding_bytes(record: &BoundaryRecord) -> Vec<u8> {
    let mut bytes = Vec::new();
    bytes.push(record.layer.tag());

    let id_bytes = record.boundary_id.as_str().as_bytes();
    bytes.extend_from_slice(&(id_bytes.len() as u32).to_be_bytes());
    bytes.extend_from_slice(id_bytes);

    let fips_bytes = record.jurisdiction_fips.as_bytes();
    bytes.extend_from_slice(&(fips_bytes.len() as u32).to_be_bytes());
    bytes.extend_from_slice(fips_bytes);

    bytes.extend_from_slice(&record.vintage_year.to_be_bytes());

    bytes.extend_from_slice(&geometry_digest(&record.geometry));
    bytes.extend_from_slice(&attribute_digest(&record.attributes));
    bytes.extend_from_slice(&provenance_digest(record));

    bytes
}

/// The committed leaf hash for one `BoundaryRecord`.
pub fn leaf_hash(record: &BoundaryRecord) -> Digest32 {
    Sha256::digest(leaf_encoding_bytes(record)).into()
}

/// The committed interior-node hash: `H(left, right) = SHA256(left || right)`.
pub fn node_hash(left: &Digest32, right: &Digest32) -> Digest32 {
    let mut hasher = Sha256::new();
    hasher.update(left);
    hasher.update(right);
    hasher.finalize().into()
}

/// Render a digest as lowercase hex.
pub fn to_hex(digest: &Digest32) -> String {
    hex::encode(digest)
}

/// Parse a 64-hex digest back into bytes.
pub fn from_hex(s: &str) -> Option<Digest32> {
    let bytes = hex::decode(s).ok()?;
    bytes.try_into().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::boundary::{AuthorityTier, BoundaryId, Provenance};
    use crate::types::geometry::{Point, Polygon, Ring};
    use crate::types::property::FeatureProperties;
    use crate::types::Layer;
    use chrono::{TimeZone, Utc};

    fn fixed_record() -> BoundaryRecord {
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
        BoundaryRecord {
            boundary_id: BoundaryId::new("1000"),
            layer: Layer::Congressional,
            jurisdiction_fips: "10".to_string(),
            display_name: "Delaware at-large".to_string(),
            vintage_year: 2024,
            geometry: Geometry::Polygon(poly),
            land_area_m2: 1.0,
            water_area_m2: 0.0,
            provenance: Provenance {
                source_url: "https://example.test/tiger".to_string(),
                response_checksum: "a".repeat(64),
                retrieved_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
                authority_tier: AuthorityTier::Federal,
            },
            attributes: FeatureProperties::new(),
        }
    }

    /// Fixed input -> fixed output vector, per §9's hash-binding invariant:
    /// this must never change silently. If this test ever needs updating,
    /// every downstream proof consumer has also changed and must be notified.
    #[test]
    fn leaf_hash_fixed_vector() {
        let digest = to_hex(&leaf_hash(&fixed_record()));
        assert_eq!(
            digest,
            "58de800bd4d0fd847c4b9aa7605686c47b3004b42b7f76d90330801676b5d55f",
            "leaf hash encoding drifted from the pinned vector"
        );
    }

    #[test]
    fn node_hash_is_order_sensitive() {
        let a = [1u8; 32];
        let b = [2u8; 32];
        assert_ne!(node_hash(&a, &b), node_hash(&b, &a));
    }

    #[test]
    fn hex_round_trips() {
        let digest = [7u8; 32];
        assert_eq!(from_hex(&to_hex(&digest)), Some(digest));
    }

    #[test]
    fn leaf_hash_changes_with_vintage_year() {
        let mut record = fixed_record();
        let original = leaf_hash(&record);
        record.vintage_year = 2025;
        assert_ne!(leaf_hash(&record), original);
    }
}
