//! Programmatic surface (§6): the seven operations every caller drives the
//! system through, composing the Extraction Engine, Validation Pipeline,
//! Merkle Commit Engine, Snapshot Store, Change Detector, Job Registry, and
//! Incremental Updater into single calls with terminal statuses (§7).

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use uuid::Uuid;

use crate::cache::Cache;
use crate::change_detector::{self, ChangeDetectionResult, DetectionMethod};
use crate::commit::hash::Digest32;
use crate::commit::tree::MerkleTree;
use crate::commit::MerkleProof;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::extraction::{self, ExtractionEngine};
use crate::incremental::{self, IncrementalResult, IncrementalStatus, SnapshotDiff};
use crate::job_registry::JobRegistry;
use crate::progress::ProgressSink;
use crate::reference::CanonicalReference;
use crate::registry::ExtractorRegistry;
use crate::snapshot_store::SnapshotStore;
use crate::types::{
    AggregatedValidationResult, BoundaryId, BoundaryRecord, ExtractionSummary, FeatureCollection, Job, JobState,
    Scope, Snapshot,
};
use crate::validation::{ValidationContext, ValidationPipeline};

/// Terminal status of a `Pipeline::extract` / `resume_extraction` call (§7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStatus {
    /// A Snapshot was written.
    Committed,
    /// Every collection was rejected by the Validation Pipeline.
    ValidationFailed,
    /// Extraction aborted before producing a committable collection.
    ExtractionFailed,
}

/// Result of `extract`, `resume_extraction` (§6 `PipelineResult`).
#[derive(Debug, Clone)]
pub struct PipelineResult {
    /// Terminal status.
    pub status: PipelineStatus,
    /// The job that tracked this run.
    pub job_id: String,
    /// The Extraction Engine's summary.
    pub extraction: ExtractionSummary,
    /// The combined Validation Pipeline result, if extraction produced any
    /// collections to validate.
    pub validation: Option<AggregatedValidationResult>,
    /// The committed Snapshot, if `status == Committed`.
    pub commitment: Option<Snapshot>,
}

/// One provider's entry in a `health_check()` response.
#[derive(Debug, Clone)]
pub struct ProviderHealth {
    /// Provider id.
    pub name: String,
    /// Whether the provider responded to the probe.
    pub available: bool,
    /// Observed round-trip latency.
    pub latency_ms: u64,
    /// Human-readable issues.
    pub issues: Vec<String>,
}

/// Result of `health_check()` (§6).
#[derive(Debug, Clone)]
pub struct HealthCheckResult {
    /// Whether every registered provider is available.
    pub healthy: bool,
    /// Per-provider detail.
    pub providers: Vec<ProviderHealth>,
}

fn new_validation_report_id() -> String {
    format!("vr_{}", Uuid::new_v4())
}

/// Wires every standalone component into the programmatic surface §6 names.
/// Holds the long-lived shared state (registry, cache, job/snapshot stores)
/// and the Canonical Reference the Validation Pipeline checks against.
///
/// A Snapshot itself records only leaf hashes and placements, so this struct
/// also keeps each committed snapshot's full record set, needed to rebuild a
/// `MerkleTree` for `generate_proof` and to merge against in
/// `incremental_update`.
pub struct Pipeline {
    registry: Arc<ExtractorRegistry>,
    cache: Arc<Cache>,
    config: Config,
    reference: CanonicalReference,
    jobs: JobRegistry,
    snapshots: SnapshotStore,
    records_by_snapshot: RwLock<BTreeMap<String, Vec<BoundaryRecord>>>,
}

impl Pipeline {
    /// Construct a pipeline bound to a provider registry, cache, config, and
    /// canonical reference.
    pub fn new(registry: Arc<ExtractorRegistry>, cache: Arc<Cache>, config: Config, reference: CanonicalReference) -> Self {
        Self {
            registry,
            cache,
            config,
            reference,
            jobs: JobRegistry::new(),
            snapshots: SnapshotStore::new(),
            records_by_snapshot: RwLock::new(BTreeMap::new()),
        }
    }

    fn validation_pipeline(&self) -> ValidationPipeline<'_> {
        ValidationPipeline::new(&self.reference, self.config.validation)
    }

    fn records_for(&self, snapshot_id: &str) -> Vec<BoundaryRecord> {
        self.records_by_snapshot.read().get(snapshot_id).cloned().unwrap_or_default()
    }

    /// Write `snapshot` to the store, or hand back the already-committed one
    /// if its `snapshot_id` is already present. Since `snapshot_id` is
    /// derived solely from `merkle_root` (§4.G), a matching id means matching
    /// content: re-extracting identical upstream data is a no-op success,
    /// not a conflict (§8 "idempotent re-extraction").
    fn commit_or_reuse(&self, snapshot: Snapshot) -> Result<Snapshot> {
        if let Ok(existing) = self.snapshots.get(&snapshot.snapshot_id) {
            return Ok(existing);
        }
        self.snapshots.put(snapshot.clone())?;
        Ok(snapshot)
    }

    /// Run extraction, validate every produced collection, and commit the
    /// collections that pass (§4.E → §4.F → §4.G).
    pub async fn extract(
        &self,
        scope: Scope,
        vintage_year: u16,
        context: &ValidationContext<'_>,
        sink: &ProgressSink,
    ) -> PipelineResult {
        let planned_task_ids: Vec<String> = extraction::plan_tasks(&scope).into_iter().map(|t| t.task_id).collect();
        let mut job = self.jobs.create(scope, planned_task_ids);

        let engine = ExtractionEngine::new(Arc::clone(&self.registry), Arc::clone(&self.cache), self.config.clone());
        let (collections, summary) = engine.run(&mut job, vintage_year, sink).await;
        self.finalize(job, collections, summary, vintage_year, context)
    }

    /// Re-plan and re-dispatch the outstanding tasks of a `Partial` job
    /// (§4.E step 7, §4.K).
    pub async fn resume_extraction(
        &self,
        job_id: &str,
        vintage_year: u16,
        context: &ValidationContext<'_>,
        sink: &ProgressSink,
    ) -> Result<PipelineResult> {
        self.jobs.resume_extraction(job_id)?;
        let mut job = self.jobs.get(job_id)?;

        let engine = ExtractionEngine::new(Arc::clone(&self.registry), Arc::clone(&self.cache), self.config.clone());
        let (collections, summary) = engine.run(&mut job, vintage_year, sink).await;
        Ok(self.finalize(job, collections, summary, vintage_year, context))
    }

    /// Shared validate-then-commit tail for `extract` and `resume_extraction`.
    fn finalize(
        &self,
        mut job: Job,
        collections: Vec<FeatureCollection>,
        summary: ExtractionSummary,
        vintage_year: u16,
        context: &ValidationContext<'_>,
    ) -> PipelineResult {
        if summary.has_failures() && !self.config.continue_on_error {
            job.state = JobState::ExtractionFailed;
            self.jobs.put(job.clone());
            return PipelineResult {
                status: PipelineStatus::ExtractionFailed,
                job_id: job.job_id,
                extraction: summary,
                validation: None,
                commitment: None,
            };
        }

        let pipeline = self.validation_pipeline();
        let mut all_stages = Vec::new();
        let mut eligible_records = Vec::new();
        for collection in &collections {
            let result = pipeline.run(collection, context);
            all_stages.extend(result.per_stage.clone());
            if result.commit_eligible(self.config.validation.min_confidence) {
                eligible_records.extend(collection.records.clone());
            }
        }
        let validation = AggregatedValidationResult::from_stages(all_stages);

        if eligible_records.is_empty() {
            job.state = JobState::ValidationFailed;
            self.jobs.put(job.clone());
            return PipelineResult {
                status: PipelineStatus::ValidationFailed,
                job_id: job.job_id,
                extraction: summary,
                validation: Some(validation),
                commitment: None,
            };
        }

        let snapshot = crate::commit::commit(&eligible_records, new_validation_report_id(), vintage_year, None);
        match self.commit_or_reuse(snapshot) {
            Ok(committed) => {
                self.records_by_snapshot
                    .write()
                    .insert(committed.snapshot_id.clone(), eligible_records);
                job.state = JobState::Committed;
                self.jobs.put(job.clone());
                PipelineResult {
                    status: PipelineStatus::Committed,
                    job_id: job.job_id,
                    extraction: summary,
                    validation: Some(validation),
                    commitment: Some(committed),
                }
            }
            Err(error) => {
                job.state = JobState::ExtractionFailed;
                job.last_error = Some(error.to_string());
                self.jobs.put(job.clone());
                PipelineResult {
                    status: PipelineStatus::ExtractionFailed,
                    job_id: job.job_id,
                    extraction: summary,
                    validation: Some(validation),
                    commitment: None,
                }
            }
        }
    }

    /// Run the Change Detector across every (layer, jurisdiction) task a
    /// scope decomposes into, folding the per-task verdicts into one result:
    /// `has_changes` if any task changed, confidence the weakest task
    /// reported, `unchanged_regions` the union of unaffected task ids. A
    /// scope with no decomposable tasks (e.g. `Scope::Single`) fails open,
    /// matching a provider with no change signal (§4.I).
    pub fn detect_changes(
        &self,
        scope: &Scope,
        previous: &BTreeMap<String, crate::types::UpstreamValidators>,
        current: &BTreeMap<String, crate::types::UpstreamValidators>,
    ) -> ChangeDetectionResult {
        let tasks = extraction::plan_tasks(scope);
        if tasks.is_empty() {
            return ChangeDetectionResult {
                has_changes: true,
                method: DetectionMethod::FailOpen,
                confidence: 0.0,
                unchanged_regions: Vec::new(),
            };
        }

        let empty = crate::types::UpstreamValidators::default();
        let mut has_changes = false;
        let mut weakest_confidence = 1.0_f64;
        let mut weakest_method = DetectionMethod::ETag;
        let mut unchanged_regions = Vec::new();

        for task in &tasks {
            let task_scope = Scope::Layer(task.layer, task.jurisdiction_fips.clone());
            let prev = previous.get(&task.task_id).unwrap_or(&empty);
            let cur = current.get(&task.task_id).unwrap_or(&empty);
            let result = change_detector::detect(&task_scope, prev, cur);
            has_changes |= result.has_changes;
            if result.confidence <= weakest_confidence {
                weakest_confidence = result.confidence;
                weakest_method = result.method;
            }
            unchanged_regions.extend(result.unchanged_regions);
        }

        ChangeDetectionResult {
            has_changes,
            method: weakest_method,
            confidence: weakest_confidence,
            unchanged_regions,
        }
    }

    /// Incrementally update a committed snapshot over `scope` (§4.J).
    ///
    /// Per task: asks the selected provider whether it changed since the
    /// parent snapshot's `generated_at`; unaffected tasks keep their existing
    /// records untouched, changed tasks are re-extracted, re-validated, and
    /// merged in. Commits once at the end over the accumulated merge, not
    /// once per task.
    pub async fn incremental_update(
        &self,
        parent_snapshot_id: &str,
        scope: &Scope,
        vintage_year: u16,
        force_refresh: bool,
        context: &ValidationContext<'_>,
    ) -> Result<IncrementalResult> {
        let parent = self.snapshots.get(parent_snapshot_id)?;
        let mut merged = self.records_for(parent_snapshot_id);
        let mut diff = SnapshotDiff::default();
        let mut changed_any = false;

        for task in extraction::plan_tasks(scope) {
            let Some(extractor) = self.registry.select(task.layer, &task.jurisdiction_fips) else {
                continue;
            };
            let changed = extractor.has_changed_since(parent.generated_at).await;
            if !changed && !force_refresh {
                continue;
            }
            changed_any = true;

            let task_scope = Scope::Layer(task.layer, task.jurisdiction_fips.clone());
            let Ok(mut fresh) = extractor.extract(&task_scope).await else {
                continue;
            };
            fresh.dedupe_and_drop_empty_geometry();

            let validated = self.validation_pipeline().run(&fresh, context);
            let fresh_records = if validated.commit_eligible(self.config.validation.min_confidence) {
                fresh.records
            } else {
                Vec::new()
            };

            let (next_merged, task_diff) = incremental::merge_records(&merged, task.layer, &task.jurisdiction_fips, &fresh_records);
            merged = next_merged;
            diff.added.extend(task_diff.added);
            diff.removed.extend(task_diff.removed);
            diff.modified.extend(task_diff.modified);
        }

        if !changed_any && !force_refresh {
            return Ok(IncrementalResult {
                status: IncrementalStatus::NoChanges,
                new_root: parent.merkle_root.clone(),
                previous_root: parent.merkle_root.clone(),
                snapshot: None,
                diff: None,
            });
        }

        if diff.is_empty() {
            return Ok(IncrementalResult {
                status: IncrementalStatus::Unchanged,
                new_root: parent.merkle_root.clone(),
                previous_root: parent.merkle_root.clone(),
                snapshot: None,
                diff: Some(diff),
            });
        }

        let snapshot = crate::commit::commit(
            &merged,
            new_validation_report_id(),
            vintage_year,
            Some(parent.snapshot_id.clone()),
        );
        let snapshot = self.commit_or_reuse(snapshot)?;
        self.records_by_snapshot.write().insert(snapshot.snapshot_id.clone(), merged);

        Ok(IncrementalResult {
            status: IncrementalStatus::Committed,
            new_root: snapshot.merkle_root.clone(),
            previous_root: parent.merkle_root.clone(),
            snapshot: Some(snapshot),
            diff: Some(diff),
        })
    }

    /// Probe every registered provider (§6).
    pub async fn health_check(&self) -> HealthCheckResult {
        let mut providers = Vec::new();
        let mut healthy = true;
        for extractor in self.registry.providers() {
            match extractor.health_check().await {
                Ok(status) => {
                    healthy &= status.available;
                    providers.push(ProviderHealth {
                        name: extractor.provider_id().to_string(),
                        available: status.available,
                        latency_ms: status.latency_ms,
                        issues: status.issues,
                    });
                }
                Err(error) => {
                    healthy = false;
                    providers.push(ProviderHealth {
                        name: extractor.provider_id().to_string(),
                        available: false,
                        latency_ms: 0,
                        issues: vec![error.to_string()],
                    });
                }
            }
        }
        HealthCheckResult { healthy, providers }
    }

    /// Rebuild the Merkle tree for a committed snapshot and produce an
    /// inclusion proof for `boundary_id` (§4.G, §6).
    pub fn generate_proof(&self, snapshot_id: &str, boundary_id: &BoundaryId) -> Result<MerkleProof> {
        let records = self.records_for(snapshot_id);
        if records.is_empty() {
            return Err(Error::NotFound {
                entity: "snapshot".to_string(),
                id: snapshot_id.to_string(),
            });
        }
        let tree = MerkleTree::build(&records);
        tree.proof_for(boundary_id).ok_or_else(|| Error::NotFound {
            entity: "boundary".to_string(),
            id: boundary_id.to_string(),
        })
    }

    /// Verify a proof against an expected root (§4.G, §6).
    pub fn verify_proof(&self, proof: &MerkleProof, expected_root: &Digest32) -> bool {
        crate::commit::verify_proof(proof, expected_root)
    }

    /// Look up a job by id.
    pub fn job(&self, job_id: &str) -> Result<Job> {
        self.jobs.get(job_id)
    }

    /// Look up a snapshot by id.
    pub fn snapshot(&self, snapshot_id: &str) -> Result<Snapshot> {
        self.snapshots.get(snapshot_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::noop_sink;
    use crate::registry::{Extractor, ExtractorMetadata, HealthStatus};
    use crate::reference::ExpectedGeoids;
    use crate::types::boundary::{AuthorityTier, Provenance};
    use crate::types::feature_collection::CollectionProvenance;
    use crate::types::geometry::{Geometry, Point, Polygon, Ring};
    use crate::types::property::FeatureProperties;
    use crate::types::Layer;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};

    struct AtLargeExtractor;

    fn at_large_record() -> BoundaryRecord {
        let poly = Polygon::new(
            Ring::new(vec![
                Point::new(0.0, 0.0),
                Point::new(1.0, 0.0),
                Point::new(1.0, 1.0),
                Point::new(0.0, 1.0),
                Point::new(0.0, 0.0),
            ]),
            vec![],
        );
        BoundaryRecord {
            boundary_id: BoundaryId::new("1000"),
            layer: Layer::Congressional,
            jurisdiction_fips: "10".to_string(),
            display_name: "Delaware at-large".to_string(),
            vintage_year: 2024,
            geometry: Geometry::Polygon(poly),
            land_area_m2: 1.0,
            water_area_m2: 0.0,
            provenance: Provenance {
                source_url: "https://example.test/tiger".to_string(),
                response_checksum: "a".repeat(64),
                retrieved_at: Utc::now(),
                authority_tier: AuthorityTier::Federal,
            },
            attributes: FeatureProperties::new(),
        }
    }

    #[async_trait]
    impl Extractor for AtLargeExtractor {
        fn provider_id(&self) -> &str {
            "tiger"
        }

        fn metadata(&self) -> &ExtractorMetadata {
            static METADATA: std::sync::OnceLock<ExtractorMetadata> = std::sync::OnceLock::new();
            METADATA.get_or_init(|| ExtractorMetadata {
                country_code: "US".to_string(),
                authority_tier: AuthorityTier::Federal,
                supported_layers: vec![Layer::Congressional],
                expected_counts: BTreeMap::new(),
                license: "public-domain".to_string(),
                update_cadence: "annual".to_string(),
            })
        }

        async fn extract(&self, scope: &Scope) -> Result<FeatureCollection> {
            Ok(FeatureCollection {
                layer: Layer::Congressional,
                scope: scope.clone(),
                records: vec![at_large_record()],
                collection_provenance: CollectionProvenance {
                    provider_id: "tiger".to_string(),
                    query_description: "at-large test fixture".to_string(),
                    cache_hit: false,
                },
            })
        }

        async fn health_check(&self) -> Result<HealthStatus> {
            Ok(HealthStatus {
                available: true,
                latency_ms: 5,
                issues: Vec::new(),
            })
        }

        async fn has_changed_since(&self, _since: DateTime<Utc>) -> bool {
            false
        }
    }

    fn pipeline() -> Pipeline {
        let mut registry = ExtractorRegistry::new();
        registry.register(Arc::new(AtLargeExtractor));
        let mut entries = BTreeMap::new();
        entries.insert(
            (Layer::Congressional, "10".to_string()),
            ExpectedGeoids::Enumerated(vec!["1000".to_string()]),
        );
        let reference = CanonicalReference::new(entries).unwrap();
        Pipeline::new(
            Arc::new(registry),
            Arc::new(Cache::new(&crate::config::CacheConfig::default())),
            Config::default(),
            reference,
        )
    }

    #[tokio::test]
    async fn extracting_a_well_formed_scope_commits_a_snapshot() {
        let pipeline = pipeline();
        let context = ValidationContext {
            state_fips: Some("10"),
            ..Default::default()
        };
        let result = pipeline
            .extract(Scope::Layer(Layer::Congressional, "10".to_string()), 2024, &context, &noop_sink())
            .await;
        assert_eq!(result.status, PipelineStatus::Committed);
        assert!(result.commitment.is_some());
    }

    #[tokio::test]
    async fn generated_proof_verifies_against_the_committed_root() {
        let pipeline = pipeline();
        let context = ValidationContext {
            state_fips: Some("10"),
            ..Default::default()
        };
        let result = pipeline
            .extract(Scope::Layer(Layer::Congressional, "10".to_string()), 2024, &context, &noop_sink())
            .await;
        let snapshot = result.commitment.unwrap();
        let proof = pipeline.generate_proof(&snapshot.snapshot_id, &BoundaryId::new("1000")).unwrap();
        let root = crate::commit::hash::from_hex(&snapshot.merkle_root).unwrap();
        assert!(pipeline.verify_proof(&proof, &root));
    }

    #[tokio::test]
    async fn incremental_update_with_no_provider_change_reports_no_changes() {
        let pipeline = pipeline();
        let context = ValidationContext {
            state_fips: Some("10"),
            ..Default::default()
        };
        let result = pipeline
            .extract(Scope::Layer(Layer::Congressional, "10".to_string()), 2024, &context, &noop_sink())
            .await;
        let snapshot = result.commitment.unwrap();

        let incremental = pipeline
            .incremental_update(
                &snapshot.snapshot_id,
                &Scope::Layer(Layer::Congressional, "10".to_string()),
                2024,
                false,
                &context,
            )
            .await
            .unwrap();
        assert_eq!(incremental.status, IncrementalStatus::NoChanges);
        assert_eq!(incremental.new_root, incremental.previous_root);
    }

    #[tokio::test]
    async fn health_check_reports_every_registered_provider() {
        let pipeline = pipeline();
        let health = pipeline.health_check().await;
        assert!(health.healthy);
        assert_eq!(health.providers.len(), 1);
        assert_eq!(health.providers[0].name, "tiger");
    }
}
