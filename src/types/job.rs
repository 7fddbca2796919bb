//! `Job`: resumable extraction state machine (§3, §4.K).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::scope::Scope;
use crate::error::ErrorKind;

/// Job lifecycle state (§4.K): `pending -> running -> {partial | committed |
/// validation_failed | extraction_failed}`. `resumed` marks a job that was
/// re-planned from `partial` via `resume_extraction`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Created, not yet dispatched.
    Pending,
    /// Tasks are in flight.
    Running,
    /// Some tasks failed or were cancelled; resumable.
    Partial,
    /// Terminal success: a Snapshot was written.
    Committed,
    /// Terminal failure: the Validation Pipeline rejected the collection(s).
    ValidationFailed,
    /// Terminal failure: extraction could not produce a usable collection.
    ExtractionFailed,
    /// Re-planned from `Partial`; outstanding tasks are being retried.
    Resumed,
}

impl JobState {
    /// Terminal states admit no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobState::Committed | JobState::ValidationFailed | JobState::ExtractionFailed
        )
    }
}

/// Outcome of one (provider, sub-scope) task within a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TaskOutcome {
    /// The task produced a usable `FeatureCollection`.
    Succeeded,
    /// The task failed non-retryably, or exhausted its retries.
    Failed {
        /// Classified error kind.
        kind: ErrorKind,
        /// Human-readable detail.
        message: String,
    },
    /// The task was aborted by a job-level cancel flag.
    Cancelled,
}

/// A single failed task as reported in `ExtractionSummary.failed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedTask {
    /// Stable identifier, usually `scope.label()` plus a provider tag.
    pub task_id: String,
    /// Why it failed.
    pub kind: ErrorKind,
    /// Human-readable detail.
    pub message: String,
}

/// Terminal or partial result of an Extraction Engine run (§4.E contract).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionSummary {
    /// Total boundary records produced across all successful tasks.
    pub total_boundaries: usize,
    /// Number of tasks that succeeded.
    pub successful: usize,
    /// Tasks that failed, with classification.
    pub failed: Vec<FailedTask>,
}

impl ExtractionSummary {
    /// Whether any task failed.
    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }
}

/// A resumable, persisted extraction job (§4.K).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// Stable identifier.
    pub job_id: String,
    /// The scope this job was created to cover.
    pub scope: Scope,
    /// Current lifecycle state.
    pub state: JobState,
    /// Per-task outcomes recorded so far, keyed by task id.
    pub task_outcomes: BTreeMap<String, TaskOutcome>,
    /// The planned task ids, in plan order (not necessarily completion order).
    pub planned_tasks: Vec<String>,
    /// Most recent error observed, if any, outside of a specific task.
    pub last_error: Option<String>,
    /// Cache keys already consulted this job, to avoid duplicate cache
    /// round-trips on resume.
    pub cache_keys_hit: Vec<String>,
}

impl Job {
    /// Construct a new job in the `Pending` state with a plan but no outcomes.
    pub fn new(job_id: impl Into<String>, scope: Scope, planned_tasks: Vec<String>) -> Self {
        Self {
            job_id: job_id.into(),
            scope,
            state: JobState::Pending,
            task_outcomes: BTreeMap::new(),
            planned_tasks,
            last_error: None,
            cache_keys_hit: Vec::new(),
        }
    }

    /// Tasks from the plan that have no recorded outcome yet, i.e. the set
    /// `resume_extraction` should re-dispatch.
    pub fn outstanding_tasks(&self) -> Vec<&str> {
        self.planned_tasks
            .iter()
            .filter(|t| !self.task_outcomes.contains_key(t.as_str()))
            .map(String::as_str)
            .collect()
    }

    /// Record a task's outcome and recompute `state` from the current set of
    /// outcomes (pending if none recorded, running if some outstanding and
    /// none failed, partial if some outstanding and at least one failed,
    /// terminal assignment is left to the caller once the job actually
    /// reaches a terminal disposition — this only tracks in-flight state).
    pub fn record_outcome(&mut self, task_id: impl Into<String>, outcome: TaskOutcome) {
        let failed = matches!(outcome, TaskOutcome::Failed { .. });
        self.task_outcomes.insert(task_id.into(), outcome);
        if self.state.is_terminal() {
            return;
        }
        if self.outstanding_tasks().is_empty() {
            self.state = if self.task_outcomes.values().any(|o| matches!(o, TaskOutcome::Failed { .. })) {
                JobState::Partial
            } else {
                JobState::Running
            };
        } else if failed {
            self.state = JobState::Partial;
        } else {
            self.state = JobState::Running;
        }
    }
}
