//! Canonical serialization for deterministic, non-cryptographic identifiers.
//!
//! Used for job ids, cache-key fingerprints, and registry fingerprints —
//! anywhere a stable, fast fold of a serializable value is needed but
//! cryptographic collision resistance is not. The Merkle leaf/node hash used
//! for commitments lives in `commit::hash` and is deliberately a separate,
//! pinned algorithm (see `DESIGN.md`'s Open Question on hash binding).
//!
//! ## Determinism guarantees
//!
//! - Stable field order: struct fields serialize in declaration order.
//! - Stable Vec order: vectors serialize in index order.
//! - No HashMap allowed in hashed data: use BTreeMap.

use serde::Serialize;
use xxhash_rust::xxh64::xxh64;

/// Serialize a value to canonical JSON bytes for hashing.
pub fn to_canonical_bytes<T: Serialize>(value: &T) -> Vec<u8> {
    serde_json::to_vec(value).expect("canonical serialization failed")
}

/// Compute the canonical xxh64 fingerprint of a serializable value.
pub fn canonical_hash<T: Serialize>(value: &T) -> u64 {
    let bytes = to_canonical_bytes(value);
    xxh64(&bytes, 0)
}

/// Compute the canonical fingerprint and return it as a fixed-width hex string.
pub fn canonical_hash_hex<T: Serialize>(value: &T) -> String {
    format!("{:016x}", canonical_hash(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct TestStruct {
        name: String,
        value: i32,
    }

    #[test]
    fn test_determinism() {
        let s = TestStruct {
            name: "test".to_string(),
            value: 42,
        };

        let h1 = canonical_hash(&s);
        let h2 = canonical_hash(&s);
        assert_eq!(h1, h2);
    }

    #[test]
    fn test_distinct_values_differ() {
        let a = TestStruct {
            name: "a".to_string(),
            value: 1,
        };
        let b = TestStruct {
            name: "b".to_string(),
            value: 1,
        };
        assert_ne!(canonical_hash(&a), canonical_hash(&b));
    }
}
