//! Extraction Engine (§4.E): bounded-concurrency worker pool over
//! per-(layer, jurisdiction) tasks, with cache-first dispatch, retry/backoff,
//! and Job persistence.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Semaphore;
use tokio::time::timeout;

use crate::cache::Cache;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::progress::{ProgressEvent, ProgressSink};
use crate::registry::ExtractorRegistry;
use crate::types::cache_entry::{CacheEntry, CacheKey, UpstreamValidators};
use crate::types::{ExtractionSummary, FailedTask, FeatureCollection, Job, Layer, Scope, TaskOutcome, ALL_LAYERS};

/// One planned (layer, jurisdiction) unit of extraction work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionTask {
    /// Stable task identifier, `layer:jurisdiction_fips`.
    pub task_id: String,
    /// The layer to extract.
    pub layer: Layer,
    /// The jurisdiction this task targets.
    pub jurisdiction_fips: String,
}

impl ExtractionTask {
    fn new(layer: Layer, jurisdiction_fips: impl Into<String>) -> Self {
        let jurisdiction_fips = jurisdiction_fips.into();
        Self {
            task_id: format!("{}:{}", layer.as_str(), jurisdiction_fips),
            layer,
            jurisdiction_fips,
        }
    }
}

/// Decompose a `Scope` into per-(layer, jurisdiction) tasks using the
/// registry's layer taxonomy (§4.E step 1: "decompose scope into
/// per-(layer, jurisdiction) tasks"). `Scope::Single` carries no jurisdiction
/// to re-derive extraction tasks from and plans empty — it exists for proof
/// lookups, not re-extraction.
pub fn plan_tasks(scope: &Scope) -> Vec<ExtractionTask> {
    let jurisdictions: Vec<String> = match scope {
        Scope::State(fips) => vec![fips.clone()],
        Scope::Region(ids) => ids.clone(),
        Scope::Country(code) if code.eq_ignore_ascii_case("US") => vec!["US".to_string()],
        Scope::Country(code) => vec![format!("{code}:{code}")],
        Scope::Global => vec!["US".to_string()],
        Scope::Layer(layer, fips) => return vec![ExtractionTask::new(*layer, fips.clone())],
        Scope::Single(_) => return Vec::new(),
    };

    jurisdictions
        .into_iter()
        .flat_map(|fips| ALL_LAYERS.iter().map(move |layer| ExtractionTask::new(*layer, fips.clone())))
        .collect()
}

/// Run a single task's extraction with cache-first dispatch, a per-task
/// timeout, and exponential-backoff retry on retryable errors (§4.E steps
/// 2-5).
async fn run_task(
    task: &ExtractionTask,
    registry: &ExtractorRegistry,
    cache: &Cache,
    config: &Config,
    vintage_year: u16,
) -> Result<FeatureCollection> {
    let Some(extractor) = registry.select(task.layer, &task.jurisdiction_fips) else {
        return Err(Error::NotFound {
            entity: "extractor".to_string(),
            id: format!("{}/{}", task.layer, task.jurisdiction_fips),
        });
    };

    let cache_key = CacheKey::new(extractor.provider_id(), task.task_id.clone(), vintage_year);
    if let Some(entry) = cache.get(&cache_key) {
        return Ok(entry.collection);
    }

    let task_scope = Scope::Layer(task.layer, task.jurisdiction_fips.clone());
    let mut last_error: Option<Error> = None;

    for attempt in 0..=config.retry.attempts {
        let attempt_result = timeout(config.timeout_per_task, extractor.extract(&task_scope)).await;

        let outcome = match attempt_result {
            Ok(inner) => inner,
            Err(_) => Err(Error::UpstreamUnavailable {
                source_label: extractor.provider_id().to_string(),
                message: format!("task timed out after {:?}", config.timeout_per_task),
            }),
        };

        match outcome {
            Ok(mut collection) => {
                collection.dedupe_and_drop_empty_geometry();
                registry.record_outcome(extractor.provider_id(), true);
                cache.put(
                    cache_key,
                    CacheEntry {
                        collection: collection.clone(),
                        validators: UpstreamValidators::default(),
                        fetched_at: Utc::now(),
                        size_bytes: 0,
                    },
                );
                return Ok(collection);
            }
            Err(error) => {
                registry.record_outcome(extractor.provider_id(), false);
                if !error.is_retryable() || attempt == config.retry.attempts {
                    return Err(error);
                }
                tokio::time::sleep(config.retry.delay_for(attempt)).await;
                last_error = Some(error);
            }
        }
    }

    // Unreachable in practice: the loop above always returns inside its body.
    Err(last_error.unwrap_or(Error::Cancelled {
        message: "extraction retry loop exited without an outcome".to_string(),
    }))
}

/// Drives the Extraction Engine over a `Scope`, recording outcomes into a
/// `Job` and emitting `ProgressEvent`s as tasks complete (§4.E, §5).
pub struct ExtractionEngine {
    registry: Arc<ExtractorRegistry>,
    cache: Arc<Cache>,
    config: Config,
}

impl ExtractionEngine {
    /// Construct an engine bound to a registry, cache, and configuration.
    pub fn new(registry: Arc<ExtractorRegistry>, cache: Arc<Cache>, config: Config) -> Self {
        Self { registry, cache, config }
    }

    /// Run extraction over `scope`, writing outcomes into `job` as each task
    /// completes and reporting progress through `sink`. Only tasks in
    /// `job.outstanding_tasks()` are dispatched, so calling this again on a
    /// partially-completed job re-plans exactly the outstanding set (§4.E
    /// step 7, §4.K `resume_extraction`).
    pub async fn run(
        &self,
        job: &mut Job,
        vintage_year: u16,
        sink: &ProgressSink,
    ) -> (Vec<FeatureCollection>, ExtractionSummary) {
        let outstanding: Vec<String> = job.outstanding_tasks().into_iter().map(String::from).collect();
        let tasks: Vec<ExtractionTask> = plan_tasks(&job.scope)
            .into_iter()
            .filter(|t| outstanding.contains(&t.task_id))
            .collect();

        let total = job.planned_tasks.len();
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency.max(1)));
        let mut join_set = tokio::task::JoinSet::new();

        for task in tasks {
            let semaphore = Arc::clone(&semaphore);
            let registry = Arc::clone(&self.registry);
            let cache = Arc::clone(&self.cache);
            let config = self.config.clone();
            join_set.spawn(async move {
                let _permit = semaphore.acquire_owned().await.expect("semaphore never closed");
                let result = run_task(&task, &registry, &cache, &config, vintage_year).await;
                (task, result)
            });
        }

        let mut collections = Vec::new();
        let mut summary = ExtractionSummary::default();
        let mut completed = 0usize;

        while let Some(joined) = join_set.join_next().await {
            let (task, result) = match joined {
                Ok(pair) => pair,
                Err(join_error) => {
                    tracing::warn!(%join_error, "extraction task panicked");
                    continue;
                }
            };
            completed += 1;

            match result {
                Ok(collection) => {
                    summary.successful += 1;
                    summary.total_boundaries += collection.len();
                    job.record_outcome(task.task_id.clone(), TaskOutcome::Succeeded);
                    sink(ProgressEvent::TaskCompleted {
                        task_id: task.task_id.clone(),
                        completed,
                        total,
                    });
                    collections.push(collection);
                }
                Err(error) => {
                    let kind = error.kind();
                    summary.failed.push(FailedTask {
                        task_id: task.task_id.clone(),
                        kind,
                        message: error.to_string(),
                    });
                    job.record_outcome(
                        task.task_id.clone(),
                        TaskOutcome::Failed {
                            kind,
                            message: error.to_string(),
                        },
                    );
                    sink(ProgressEvent::TaskFailed {
                        task_id: task.task_id.clone(),
                        kind,
                    });
                    if !self.config.continue_on_error {
                        job.last_error = Some(error.to_string());
                        break;
                    }
                }
            }
        }

        (collections, summary)
    }
}
