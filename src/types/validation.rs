//! Validation Pipeline result types (§3 `ValidationReport`, §4.F).

use serde::{Deserialize, Serialize};

use super::boundary::BoundaryId;

/// A rejection- or review-worthy finding from a validator stage.
///
/// §8 requires "at least one stage reports an `issue` with a non-empty
/// `kind`" for every rejected collection, so `kind` is a plain non-empty
/// string rather than an `Option`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    /// Machine-readable issue kind (e.g. "cardinality_mismatch", "geometry_overlap").
    pub kind: String,
    /// Human-readable description.
    pub message: String,
    /// The specific record this issue concerns, if any (some issues are
    /// collection-wide, e.g. cardinality).
    pub boundary_id: Option<BoundaryId>,
}

impl Issue {
    /// Construct a collection-wide issue.
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
            boundary_id: None,
        }
    }

    /// Construct an issue scoped to a specific record.
    pub fn for_record(
        kind: impl Into<String>,
        message: impl Into<String>,
        boundary_id: BoundaryId,
    ) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
            boundary_id: Some(boundary_id),
        }
    }
}

/// A non-fatal observation from a validator stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Warning {
    /// Machine-readable warning kind.
    pub kind: String,
    /// Human-readable description.
    pub message: String,
}

impl Warning {
    /// Construct a warning.
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }
}

/// The outcome of a single validator stage (§4.F).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageResult {
    /// Stage name (e.g. "name_pattern", "cardinality", "geoid", ...).
    pub name: String,
    /// Whether the stage accepted the collection.
    pub pass: bool,
    /// Confidence score in `[0, 100]`.
    pub confidence: u8,
    /// Rejection-worthy findings.
    pub issues: Vec<Issue>,
    /// Non-fatal observations.
    pub warnings: Vec<Warning>,
}

impl StageResult {
    /// A passing stage result with no issues.
    pub fn pass(name: impl Into<String>, confidence: u8) -> Self {
        Self {
            name: name.into(),
            pass: true,
            confidence,
            issues: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// A rejecting stage result carrying at least one issue.
    pub fn reject(name: impl Into<String>, confidence: u8, issues: Vec<Issue>) -> Self {
        debug_assert!(!issues.is_empty(), "a rejection must carry at least one issue");
        Self {
            name: name.into(),
            pass: false,
            confidence,
            issues,
            warnings: Vec::new(),
        }
    }

    /// Attach warnings in a builder style.
    pub fn with_warnings(mut self, warnings: Vec<Warning>) -> Self {
        self.warnings = warnings;
        self
    }
}

/// The full result of running the Validation Pipeline over one
/// `FeatureCollection` (§4.F).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatedValidationResult {
    /// Whether the collection passed every stage it reached (pipeline
    /// short-circuits on the first rejecting stage).
    pub valid: bool,
    /// `min` of every stage's confidence that actually ran.
    pub confidence: u8,
    /// All issues across every stage that ran.
    pub issues: Vec<Issue>,
    /// All warnings across every stage that ran.
    pub warnings: Vec<Warning>,
    /// Per-stage results, in pipeline order, up to and including the
    /// stage that rejected (if any).
    pub per_stage: Vec<StageResult>,
}

impl AggregatedValidationResult {
    /// Fold a sequence of stage results (already short-circuited by the
    /// caller) into the aggregate.
    pub fn from_stages(stages: Vec<StageResult>) -> Self {
        let valid = stages.iter().all(|s| s.pass);
        let confidence = stages.iter().map(|s| s.confidence).min().unwrap_or(0);
        let issues = stages.iter().flat_map(|s| s.issues.clone()).collect();
        let warnings = stages.iter().flat_map(|s| s.warnings.clone()).collect();
        Self {
            valid,
            confidence,
            issues,
            warnings,
            per_stage: stages,
        }
    }

    /// Commit-eligibility per §4.F: `valid && confidence >= min_confidence`.
    pub fn commit_eligible(&self, min_confidence: u8) -> bool {
        self.valid && self.confidence >= min_confidence
    }
}

/// Per-(snapshot, record) validation outcome, derived from the
/// collection-level `AggregatedValidationResult` that covered this record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    /// The snapshot this report is attached to, once committed.
    pub snapshot_id: Option<String>,
    /// The record this report describes.
    pub boundary_id: BoundaryId,
    /// Whether the record's collection passed overall.
    pub overall_pass: bool,
    /// The collection-level confidence score.
    pub confidence: u8,
    /// Per-validator outcomes, filtered to those relevant to this record.
    pub per_validator: Vec<StageResult>,
}

impl ValidationReport {
    /// Project a collection-level result onto one of its records.
    pub fn for_record(boundary_id: BoundaryId, aggregated: &AggregatedValidationResult) -> Self {
        Self {
            snapshot_id: None,
            boundary_id,
            overall_pass: aggregated.valid,
            confidence: aggregated.confidence,
            per_validator: aggregated.per_stage.clone(),
        }
    }
}
