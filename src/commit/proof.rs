//! Merkle inclusion proofs: generation (via `MerkleTree::proof_for`),
//! verification, and a lossless compact serialization (§4.G).

use serde::{Deserialize, Serialize};

use super::hash::{from_hex, node_hash, to_hex, Digest32};

/// `{ root, leaf, siblings[depth], path_indices[depth] }` (§4.G, §6).
///
/// `path_indices[i] == 0` means the current hash is the left child at level
/// `i`; `1` means right.
#[derive(Debug, Clone, PartialEq)]
pub struct MerkleProof {
    /// The committed root this proof is against.
    pub root: Digest32,
    /// The leaf hash being proven.
    pub leaf: Digest32,
    /// Sibling digest at each level, leaf to root.
    pub siblings: Vec<Digest32>,
    /// Left/right flag at each level, leaf to root.
    pub path_indices: Vec<u8>,
}

/// Verify a proof reconstructs `expected_root` (§4.G, §8).
pub fn verify_proof(proof: &MerkleProof, expected_root: &Digest32) -> bool {
    if proof.siblings.len() != proof.path_indices.len() {
        return false;
    }
    let mut current = proof.leaf;
    for (sibling, path_index) in proof.siblings.iter().zip(&proof.path_indices) {
        current = match path_index {
            0 => node_hash(&current, sibling),
            1 => node_hash(sibling, &current),
            _ => return false,
        };
    }
    current == *expected_root && proof.root == *expected_root
}

/// Hex-serialized, loss-free proof form (§4.G "compact proof", §6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompactProof {
    /// Root, as 64-hex (`r`).
    pub r: String,
    /// Leaf, as 64-hex (`l`).
    pub l: String,
    /// Siblings, as 64-hex each (`s`).
    pub s: Vec<String>,
    /// Path indices (`p`).
    pub p: Vec<u8>,
}

/// Serialize a proof into its compact hex form.
pub fn to_compact(proof: &MerkleProof) -> CompactProof {
    CompactProof {
        r: to_hex(&proof.root),
        l: to_hex(&proof.leaf),
        s: proof.siblings.iter().map(to_hex).collect(),
        p: proof.path_indices.clone(),
    }
}

/// Deserialize a compact proof back into a `MerkleProof`. Returns `None` on
/// malformed hex.
pub fn from_compact(compact: &CompactProof) -> Option<MerkleProof> {
    let root = from_hex(&compact.r)?;
    let leaf = from_hex(&compact.l)?;
    let siblings = compact.s.iter().map(|s| from_hex(s)).collect::<Option<Vec<_>>>()?;
    Some(MerkleProof {
        root,
        leaf,
        siblings,
        path_indices: compact.p.clone(),
    })
}
