//! Snapshot Store (§4.H): append-only named store with parent-chain
//! resolution and cascading delete.

use std::collections::BTreeMap;

use parking_lot::RwLock;

use crate::error::{Error, Result};
use crate::types::{Snapshot, SnapshotMeta};

/// Append-only store of committed `Snapshot`s, keyed by `snapshot_id`.
///
/// Writes are serialized globally behind a single lock (§5: "the Snapshot
/// Store serializes writes globally, append-only log"); reads take the same
/// lock but hold it only for the duration of the lookup.
pub struct SnapshotStore {
    snapshots: RwLock<BTreeMap<String, Snapshot>>,
}

impl SnapshotStore {
    /// An empty store.
    pub fn new() -> Self {
        Self {
            snapshots: RwLock::new(BTreeMap::new()),
        }
    }

    /// Append a snapshot, returning its id. Refuses to overwrite an existing
    /// id (append-only: commits are immutable once written).
    pub fn put(&self, snapshot: Snapshot) -> Result<String> {
        let mut snapshots = self.snapshots.write();
        if snapshots.contains_key(&snapshot.snapshot_id) {
            return Err(Error::CommitConflict {
                message: format!("snapshot '{}' already exists", snapshot.snapshot_id),
            });
        }
        let id = snapshot.snapshot_id.clone();
        snapshots.insert(id.clone(), snapshot);
        Ok(id)
    }

    /// Fetch a snapshot by id.
    pub fn get(&self, snapshot_id: &str) -> Result<Snapshot> {
        self.snapshots
            .read()
            .get(snapshot_id)
            .cloned()
            .ok_or_else(|| Error::NotFound {
                entity: "snapshot".to_string(),
                id: snapshot_id.to_string(),
            })
    }

    /// List every stored snapshot's metadata, in id order.
    pub fn list(&self) -> Vec<SnapshotMeta> {
        self.snapshots.read().values().map(SnapshotMeta::from).collect()
    }

    /// The chain of ancestor snapshot ids, nearest first, ending at the root
    /// (a snapshot with no `parent_snapshot_id`).
    pub fn parent_chain(&self, snapshot_id: &str) -> Result<Vec<String>> {
        let snapshots = self.snapshots.read();
        let mut chain = Vec::new();
        let mut current = snapshots
            .get(snapshot_id)
            .ok_or_else(|| Error::NotFound {
                entity: "snapshot".to_string(),
                id: snapshot_id.to_string(),
            })?;
        while let Some(parent_id) = &current.parent_snapshot_id {
            chain.push(parent_id.clone());
            current = match snapshots.get(parent_id) {
                Some(parent) => parent,
                None => break,
            };
        }
        Ok(chain)
    }

    /// Direct children of `snapshot_id` (snapshots whose `parent_snapshot_id`
    /// equals it).
    fn children_of(&self, snapshot_id: &str) -> Vec<String> {
        self.snapshots
            .read()
            .values()
            .filter(|s| s.parent_snapshot_id.as_deref() == Some(snapshot_id))
            .map(|s| s.snapshot_id.clone())
            .collect()
    }

    /// Delete a snapshot and every downstream-dependent (child) snapshot,
    /// atomically. Per §4.H: deleting a snapshot with children either
    /// cascades or is refused — this store cascades, since a dangling
    /// `parent_snapshot_id` would otherwise break `parent_chain`.
    pub fn delete_cascade(&self, snapshot_id: &str) -> Result<Vec<String>> {
        let mut snapshots = self.snapshots.write();
        if !snapshots.contains_key(snapshot_id) {
            return Err(Error::NotFound {
                entity: "snapshot".to_string(),
                id: snapshot_id.to_string(),
            });
        }

        let mut to_delete = vec![snapshot_id.to_string()];
        let mut frontier = vec![snapshot_id.to_string()];
        while let Some(id) = frontier.pop() {
            let children: Vec<String> = snapshots
                .values()
                .filter(|s| s.parent_snapshot_id.as_deref() == Some(id.as_str()))
                .map(|s| s.snapshot_id.clone())
                .collect();
            for child in children {
                to_delete.push(child.clone());
                frontier.push(child);
            }
        }

        for id in &to_delete {
            snapshots.remove(id);
        }
        Ok(to_delete)
    }

    /// Refuse to delete a snapshot that still has children, for callers that
    /// want the non-cascading variant of §4.H's "or the operation is
    /// refused" wording.
    pub fn delete_if_leaf(&self, snapshot_id: &str) -> Result<()> {
        if !self.children_of(snapshot_id).is_empty() {
            return Err(Error::CommitConflict {
                message: format!("snapshot '{snapshot_id}' has dependent children, refusing delete"),
            });
        }
        let mut snapshots = self.snapshots.write();
        snapshots
            .remove(snapshot_id)
            .map(|_| ())
            .ok_or_else(|| Error::NotFound {
                entity: "snapshot".to_string(),
                id: snapshot_id.to_string(),
            })
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap as Map;

    fn snapshot(id: &str, parent: Option<&str>) -> Snapshot {
        Snapshot {
            version: 1,
            snapshot_id: id.to_string(),
            merkle_root: "a".repeat(64),
            tree_depth: 0,
            leaf_count: 0,
            layer_counts: Map::new(),
            validation_report_id: "vr1".to_string(),
            generated_at: chrono::Utc::now(),
            vintage_year: 2024,
            parent_snapshot_id: parent.map(String::from),
            records: Vec::new(),
        }
    }

    #[test]
    fn put_then_get_round_trips() {
        let store = SnapshotStore::new();
        store.put(snapshot("snap_a", None)).unwrap();
        assert_eq!(store.get("snap_a").unwrap().snapshot_id, "snap_a");
    }

    #[test]
    fn duplicate_put_is_refused() {
        let store = SnapshotStore::new();
        store.put(snapshot("snap_a", None)).unwrap();
        assert!(store.put(snapshot("snap_a", None)).is_err());
    }

    #[test]
    fn parent_chain_walks_to_the_root() {
        let store = SnapshotStore::new();
        store.put(snapshot("snap_a", None)).unwrap();
        store.put(snapshot("snap_b", Some("snap_a"))).unwrap();
        store.put(snapshot("snap_c", Some("snap_b"))).unwrap();
        assert_eq!(store.parent_chain("snap_c").unwrap(), vec!["snap_b", "snap_a"]);
    }

    #[test]
    fn deleting_a_parent_cascades_to_children() {
        let store = SnapshotStore::new();
        store.put(snapshot("snap_a", None)).unwrap();
        store.put(snapshot("snap_b", Some("snap_a"))).unwrap();
        let deleted = store.delete_cascade("snap_a").unwrap();
        assert_eq!(deleted.len(), 2);
        assert!(store.get("snap_a").is_err());
        assert!(store.get("snap_b").is_err());
    }

    #[test]
    fn delete_if_leaf_refuses_when_children_exist() {
        let store = SnapshotStore::new();
        store.put(snapshot("snap_a", None)).unwrap();
        store.put(snapshot("snap_b", Some("snap_a"))).unwrap();
        assert!(store.delete_if_leaf("snap_a").is_err());
        assert!(store.delete_if_leaf("snap_b").is_ok());
    }
}
