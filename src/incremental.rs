//! Incremental Updater (§4.J): merge freshly re-extracted records for an
//! affected sub-scope into a parent snapshot's record set, diff, and
//! re-commit.
//!
//! A `Snapshot` stores only leaf hashes and placements (§3, §6), not full
//! `BoundaryRecord`s, so the caller (the pipeline surface, §6) supplies the
//! parent's full record set alongside the snapshot itself.

use std::collections::{BTreeSet, HashSet};

use crate::change_detector::ChangeDetectionResult;
use crate::commit::hash::leaf_hash;
use crate::types::boundary::BoundaryRecord;
use crate::types::{BoundaryId, Layer, Snapshot};

/// Added/removed/modified boundary ids between a parent snapshot and its
/// incrementally-updated successor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotDiff {
    /// Boundaries present in the new set but absent from the parent.
    pub added: Vec<BoundaryId>,
    /// Boundaries present in the parent but absent from the new set.
    pub removed: Vec<BoundaryId>,
    /// Boundaries present in both but whose leaf hash changed.
    pub modified: Vec<BoundaryId>,
}

impl SnapshotDiff {
    /// Whether nothing changed between the two record sets.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.modified.is_empty()
    }
}

/// Terminal status of an `incremental_update` call (§4.J, §6 `IncrementalResult`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncrementalStatus {
    /// The Change Detector found no changes above `force_refresh` threshold;
    /// no re-extraction or re-commit was performed.
    NoChanges,
    /// Re-extraction ran but produced a bytewise-identical merged set; no
    /// new snapshot was written.
    Unchanged,
    /// A new snapshot was committed with `parent_snapshot_id` set.
    Committed,
}

/// Result of an `incremental_update` call.
#[derive(Debug, Clone)]
pub struct IncrementalResult {
    /// Terminal status.
    pub status: IncrementalStatus,
    /// The resulting root (equal to `previous_root` unless `Committed`).
    pub new_root: String,
    /// The parent snapshot's root.
    pub previous_root: String,
    /// The newly committed snapshot, if `status == Committed`.
    pub snapshot: Option<Snapshot>,
    /// The added/removed/modified diff, absent only for `NoChanges`.
    pub diff: Option<SnapshotDiff>,
}

/// Whether two records commit to the same leaf hash, i.e. are bytewise
/// identical for commitment purposes.
fn records_differ(a: &BoundaryRecord, b: &BoundaryRecord) -> bool {
    leaf_hash(a) != leaf_hash(b)
}

/// Merge freshly re-extracted records for `(affected_layer,
/// affected_jurisdiction)` into `previous`: replace matching `boundary_id`s,
/// drop ones no longer present upstream, keep every unaffected record
/// untouched (§4.J step 3).
pub fn merge_records(
    previous: &[BoundaryRecord],
    affected_layer: Layer,
    affected_jurisdiction: &str,
    fresh: &[BoundaryRecord],
) -> (Vec<BoundaryRecord>, SnapshotDiff) {
    let fresh_by_id: std::collections::BTreeMap<&BoundaryId, &BoundaryRecord> =
        fresh.iter().map(|r| (&r.boundary_id, r)).collect();
    let mut seen_fresh: HashSet<BoundaryId> = HashSet::new();
    let mut merged = Vec::with_capacity(previous.len());
    let mut diff = SnapshotDiff::default();

    for prev in previous {
        if prev.layer == affected_layer && prev.jurisdiction_fips == affected_jurisdiction {
            match fresh_by_id.get(&prev.boundary_id) {
                Some(new_record) => {
                    seen_fresh.insert(prev.boundary_id.clone());
                    if records_differ(prev, new_record) {
                        diff.modified.push(prev.boundary_id.clone());
                    }
                    merged.push((*new_record).clone());
                }
                None => diff.removed.push(prev.boundary_id.clone()),
            }
        } else {
            merged.push(prev.clone());
        }
    }

    for record in fresh {
        if !seen_fresh.contains(&record.boundary_id) {
            diff.added.push(record.boundary_id.clone());
            merged.push(record.clone());
        }
    }

    (merged, diff)
}

/// Run the Incremental Updater over one affected sub-scope (§4.J).
///
/// `change` is the caller's already-computed Change Detector result for the
/// update scope; `fresh` is the result of re-running Extraction + Validation
/// over the affected sub-scope (step 2, performed by the caller so this
/// function stays free of I/O).
pub fn incremental_update(
    parent: &Snapshot,
    previous_records: &[BoundaryRecord],
    change: &ChangeDetectionResult,
    force_refresh: bool,
    affected_layer: Layer,
    affected_jurisdiction: &str,
    fresh: &[BoundaryRecord],
    validation_report_id: impl Into<String>,
) -> IncrementalResult {
    if !change.has_changes && change.confidence >= 0.9 && !force_refresh {
        return IncrementalResult {
            status: IncrementalStatus::NoChanges,
            new_root: parent.merkle_root.clone(),
            previous_root: parent.merkle_root.clone(),
            snapshot: None,
            diff: None,
        };
    }

    let (merged, diff) = merge_records(previous_records, affected_layer, affected_jurisdiction, fresh);

    if diff.is_empty() {
        return IncrementalResult {
            status: IncrementalStatus::Unchanged,
            new_root: parent.merkle_root.clone(),
            previous_root: parent.merkle_root.clone(),
            snapshot: None,
            diff: Some(diff),
        };
    }

    let snapshot = crate::commit::commit(
        &merged,
        validation_report_id,
        parent.vintage_year,
        Some(parent.snapshot_id.clone()),
    );
    IncrementalResult {
        status: IncrementalStatus::Committed,
        new_root: snapshot.merkle_root.clone(),
        previous_root: parent.merkle_root.clone(),
        snapshot: Some(snapshot),
        diff: Some(diff),
    }
}

/// Boundary ids unique to `records`, for callers building their own diff
/// summaries (e.g. across multiple affected sub-scopes in one call).
pub fn boundary_ids(records: &[BoundaryRecord]) -> BTreeSet<BoundaryId> {
    records.iter().map(|r| r.boundary_id.clone()).collect()
}
