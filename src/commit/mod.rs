//! Merkle Commit Engine (§4.G): canonical leaf encoding, tree build, and
//! proof generation/verification, wired together into a commit flow that
//! produces a `Snapshot`.

pub mod hash;
pub mod proof;
pub mod tree;

use std::collections::BTreeMap;

use chrono::Utc;

use crate::types::boundary::BoundaryRecord;
use crate::types::snapshot::{snapshot_id_for_root, Snapshot};

pub use proof::{from_compact, to_compact, verify_proof, CompactProof, MerkleProof};
pub use tree::MerkleTree;

/// Commit a set of already-validated records into a `Snapshot`.
///
/// Idempotent: identical `records` (regardless of order) produce an
/// identical `merkle_root`, identical leaf indices, and identical proofs
/// (§4.G, §8).
pub fn commit(
    records: &[BoundaryRecord],
    validation_report_id: impl Into<String>,
    vintage_year: u16,
    parent_snapshot_id: Option<String>,
) -> Snapshot {
    let tree = MerkleTree::build(records);

    let mut layer_counts = BTreeMap::new();
    for record in records {
        *layer_counts.entry(record.layer).or_insert(0u64) += 1;
    }

    let root_hex = tree.root_hex();
    Snapshot {
        version: 1,
        snapshot_id: snapshot_id_for_root(&root_hex),
        merkle_root: root_hex,
        tree_depth: tree.depth(),
        leaf_count: tree.leaf_count(),
        layer_counts,
        validation_report_id: validation_report_id.into(),
        generated_at: Utc::now(),
        vintage_year,
        parent_snapshot_id,
        records: tree.leaf_placements(),
    }
}

/// Generate a `MerkleProof` for `boundary_id` against a freshly-rebuilt tree
/// over `records`. Callers that already hold a `MerkleTree` should call
/// `tree.proof_for` directly instead of re-building.
pub fn generate_proof(
    records: &[BoundaryRecord],
    boundary_id: &crate::types::BoundaryId,
) -> Option<MerkleProof> {
    MerkleTree::build(records).proof_for(boundary_id)
}
