//! `Snapshot`: the immutable, committed output of the Merkle Commit Engine (§3, §4.H).

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::boundary::BoundaryId;
use super::layer::Layer;

/// Derive a `snapshot_id` from a root digest, per §3 ("identified by
/// `snapshot_id` (derived from root)").
pub fn snapshot_id_for_root(merkle_root_hex: &str) -> String {
    format!("snap_{merkle_root_hex}")
}

/// One record's placement within a committed tree (§6: `{boundary_id,
/// leaf_index, leaf}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeafPlacement {
    /// The committed record.
    pub boundary_id: BoundaryId,
    /// Index into the tree's leaf row.
    pub leaf_index: u64,
    /// 64-hex leaf hash, so a consumer can verify a proof without
    /// re-deriving the digest from the full `BoundaryRecord`.
    pub leaf: String,
}

/// Immutable, append-only committed set of `BoundaryRecord`s with a Merkle root.
///
/// Invariants (§3): mutating any field after construction invalidates the
/// root; `leaf_indices` is a permutation of `[0, leaf_count)`; `leaf_count <=
/// 2^tree_depth`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// Schema version of the snapshot artifact (§6).
    pub version: u32,
    /// Stable identifier derived from `merkle_root`.
    pub snapshot_id: String,
    /// 64-hex root digest.
    pub merkle_root: String,
    /// `ceil(log2(leaf_count))`, or 0 for a single-leaf tree.
    pub tree_depth: u32,
    /// Number of committed records.
    pub leaf_count: u64,
    /// Records per layer.
    pub layer_counts: BTreeMap<Layer, u64>,
    /// The `AggregatedValidationResult` this commit was produced from.
    pub validation_report_id: String,
    /// Commit timestamp.
    pub generated_at: DateTime<Utc>,
    /// Vintage year of the committed data.
    pub vintage_year: u16,
    /// Prior snapshot this one supersedes, if any (§4.J incremental update).
    pub parent_snapshot_id: Option<String>,
    /// Ordered `{boundary_id, leaf_index, leaf}` records, in commit leaf order.
    pub records: Vec<LeafPlacement>,
}

impl Snapshot {
    /// `leaf_count` must equal the number of placements, and must not
    /// exceed the tree's capacity at `tree_depth`.
    pub fn check_invariants(&self) -> Result<(), String> {
        if self.leaf_count != self.records.len() as u64 {
            return Err(format!(
                "leaf_count {} does not match {} placements",
                self.leaf_count,
                self.records.len()
            ));
        }
        let capacity = 1u64 << self.tree_depth;
        if self.leaf_count > capacity {
            return Err(format!(
                "leaf_count {} exceeds capacity 2^{} = {capacity}",
                self.leaf_count, self.tree_depth
            ));
        }
        let mut indices: Vec<u64> = self.records.iter().map(|p| p.leaf_index).collect();
        indices.sort_unstable();
        indices.dedup();
        if indices.len() != self.records.len() {
            return Err("leaf_index values are not unique".to_string());
        }
        if indices.first() != Some(&0) || indices.last() != Some(&(self.leaf_count - 1)) {
            return Err("leaf indices are not a permutation of [0, leaf_count)".to_string());
        }
        Ok(())
    }

    /// Look up the leaf index committed for a given boundary, if present.
    pub fn leaf_index_of(&self, boundary_id: &BoundaryId) -> Option<u64> {
        self.records
            .iter()
            .find(|p| &p.boundary_id == boundary_id)
            .map(|p| p.leaf_index)
    }
}

/// Lightweight summary of a `Snapshot`, as returned by `SnapshotStore::list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotMeta {
    /// The snapshot's identifier.
    pub snapshot_id: String,
    /// 64-hex root digest.
    pub merkle_root: String,
    /// Number of committed records.
    pub leaf_count: u64,
    /// Commit timestamp.
    pub created_at: DateTime<Utc>,
    /// Vintage year of the committed data.
    pub vintage_year: u16,
    /// Prior snapshot this one supersedes, if any.
    pub parent_snapshot_id: Option<String>,
}

impl From<&Snapshot> for SnapshotMeta {
    fn from(snapshot: &Snapshot) -> Self {
        Self {
            snapshot_id: snapshot.snapshot_id.clone(),
            merkle_root: snapshot.merkle_root.clone(),
            leaf_count: snapshot.leaf_count,
            created_at: snapshot.generated_at,
            vintage_year: snapshot.vintage_year,
            parent_snapshot_id: snapshot.parent_snapshot_id.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot_with_placements(placements: Vec<(&str, u64)>, tree_depth: u32) -> Snapshot {
        Snapshot {
            version: 1,
            snapshot_id: snapshot_id_for_root("deadbeef"),
            merkle_root: "deadbeef".to_string(),
            tree_depth,
            leaf_count: placements.len() as u64,
            layer_counts: BTreeMap::new(),
            validation_report_id: "vr1".to_string(),
            generated_at: Utc::now(),
            vintage_year: 2024,
            parent_snapshot_id: None,
            records: placements
                .into_iter()
                .map(|(id, idx)| LeafPlacement {
                    boundary_id: BoundaryId::new(id),
                    leaf_index: idx,
                    leaf: "a".repeat(64),
                })
                .collect(),
        }
    }

    #[test]
    fn single_leaf_tree_has_depth_zero() {
        let snapshot = snapshot_with_placements(vec![("1000", 0)], 0);
        assert!(snapshot.check_invariants().is_ok());
    }

    #[test]
    fn rejects_non_permutation_indices() {
        let snapshot = snapshot_with_placements(vec![("a", 0), ("b", 2)], 1);
        assert!(snapshot.check_invariants().is_err());
    }

    #[test]
    fn rejects_leaf_count_exceeding_capacity() {
        let mut snapshot = snapshot_with_placements(vec![("a", 0), ("b", 1), ("c", 2)], 1);
        snapshot.leaf_count = 3;
        assert!(snapshot.check_invariants().is_err());
    }

    #[test]
    fn leaf_index_of_finds_placement() {
        let snapshot = snapshot_with_placements(vec![("a", 0), ("b", 1)], 1);
        assert_eq!(snapshot.leaf_index_of(&BoundaryId::new("b")), Some(1));
        assert_eq!(snapshot.leaf_index_of(&BoundaryId::new("z")), None);
    }
}
