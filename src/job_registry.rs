//! Job Registry (§4.K): a shared, lock-guarded map of extraction jobs with
//! resumable state transitions.

use std::collections::BTreeMap;

use parking_lot::RwLock;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::types::{Job, JobState, Scope};

/// Generate a fresh job id.
pub fn new_job_id() -> String {
    format!("job_{}", Uuid::new_v4())
}

/// Shared job state, guarded by a single lock per §5 ("the Job Registry
/// serializes per-job updates"). Reads and writes both take the same lock;
/// contention is expected to be low since a job is mutated only by the
/// Extraction Engine task that owns it.
pub struct JobRegistry {
    jobs: RwLock<BTreeMap<String, Job>>,
}

impl JobRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            jobs: RwLock::new(BTreeMap::new()),
        }
    }

    /// Create and register a new job in the `Pending` state.
    pub fn create(&self, scope: Scope, planned_tasks: Vec<String>) -> Job {
        let job = Job::new(new_job_id(), scope, planned_tasks);
        self.jobs.write().insert(job.job_id.clone(), job.clone());
        job
    }

    /// Fetch a job by id.
    pub fn get(&self, job_id: &str) -> Result<Job> {
        self.jobs
            .read()
            .get(job_id)
            .cloned()
            .ok_or_else(|| Error::NotFound {
                entity: "job".to_string(),
                id: job_id.to_string(),
            })
    }

    /// Overwrite the stored copy of a job, e.g. after an `ExtractionEngine`
    /// run has mutated it in place.
    pub fn put(&self, job: Job) {
        self.jobs.write().insert(job.job_id.clone(), job);
    }

    /// `resume_extraction(job_id)`: re-plan only outstanding tasks from a
    /// `Partial` job, transitioning it to `Resumed` (§4.K). Returns the task
    /// ids the caller should re-dispatch.
    pub fn resume_extraction(&self, job_id: &str) -> Result<Vec<String>> {
        let mut jobs = self.jobs.write();
        let job = jobs.get_mut(job_id).ok_or_else(|| Error::NotFound {
            entity: "job".to_string(),
            id: job_id.to_string(),
        })?;

        if job.state != JobState::Partial {
            return Err(Error::CommitConflict {
                message: format!("job '{job_id}' is not partial (state: {:?}), cannot resume", job.state),
            });
        }

        let outstanding: Vec<String> = job.outstanding_tasks().into_iter().map(String::from).collect();
        job.state = JobState::Resumed;
        Ok(outstanding)
    }
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::types::TaskOutcome;

    #[test]
    fn create_then_get_round_trips() {
        let registry = JobRegistry::new();
        let job = registry.create(Scope::State("10".to_string()), vec!["a".to_string()]);
        assert_eq!(registry.get(&job.job_id).unwrap().job_id, job.job_id);
    }

    #[test]
    fn resume_extraction_requires_partial_state() {
        let registry = JobRegistry::new();
        let job = registry.create(Scope::State("10".to_string()), vec!["a".to_string()]);
        assert!(registry.resume_extraction(&job.job_id).is_err());
    }

    #[test]
    fn resume_extraction_returns_outstanding_tasks_and_transitions_state() {
        let registry = JobRegistry::new();
        let mut job = registry.create(
            Scope::State("10".to_string()),
            vec!["a".to_string(), "b".to_string()],
        );
        job.record_outcome(
            "a",
            TaskOutcome::Failed {
                kind: ErrorKind::UpstreamRejected,
                message: "404".to_string(),
            },
        );
        registry.put(job.clone());

        let outstanding = registry.resume_extraction(&job.job_id).unwrap();
        assert_eq!(outstanding, vec!["b"]);
        assert_eq!(registry.get(&job.job_id).unwrap().state, JobState::Resumed);
    }
}
