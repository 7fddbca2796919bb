//! # shadow-atlas
//!
//! A verifiable, content-addressed index of U.S. political boundaries.
//!
//! Shadow Atlas answers one question:
//!
//! > For a given vintage, what is the committed set of congressional,
//! > state-legislative, county, municipal, school, and special-district
//! > boundaries, and can any single record's membership in that set be
//! > proven without re-downloading the whole set?
//!
//! ## Core contract
//!
//! 1. Extract boundary data from upstream providers for a scope (state,
//!    region, country, single layer).
//! 2. Validate each collection through seven deterministic stages.
//! 3. Commit the validated records into a Merkle tree; the root is the
//!    snapshot's identity.
//! 4. Serve per-record inclusion proofs against that root.
//!
//! ## Architecture
//!
//! ```text
//! ExtractorRegistry → ExtractionEngine → ValidationPipeline → Merkle Commit Engine
//!         ↑                  ↓                                       ↓
//!    CanonicalReference   Cache                              SnapshotStore
//!                           ↓
//!                    ChangeDetector → IncrementalUpdater
//! ```
//!
//! ## Determinism guarantees
//!
//! - Same record set (any order) → identical `merkle_root` (§4.G, §8).
//! - Leaf ordering is canonical: by `Layer` enum order, then `boundary_id`.
//! - Proof generation for a given `boundary_id` is deterministic.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cache;
pub mod canonical;
pub mod change_detector;
pub mod commit;
pub mod config;
pub mod error;
pub mod extraction;
pub mod incremental;
pub mod job_registry;
pub mod manifest;
pub mod pipeline;
pub mod progress;
pub mod reference;
pub mod registry;
pub mod snapshot_store;
pub mod types;
pub mod validation;

pub use cache::Cache;
pub use canonical::{canonical_hash, canonical_hash_hex, to_canonical_bytes};
pub use change_detector::{detect as detect_scope_changes, ChangeDetectionResult, DetectionMethod};
pub use commit::{commit, from_compact, to_compact, verify_proof, CompactProof, MerkleProof, MerkleTree};
pub use config::{CacheConfig, Config, IntegrityMode, RetryPolicy, ValidationThresholds};
pub use error::{Error, ErrorKind, Result};
pub use extraction::{plan_tasks, ExtractionEngine, ExtractionTask};
pub use incremental::{merge_records, IncrementalResult, IncrementalStatus, SnapshotDiff};
pub use job_registry::{new_job_id, JobRegistry};
pub use manifest::{IntegrityManifest, ManifestEntry, ManifestKey};
pub use pipeline::{HealthCheckResult, Pipeline, PipelineResult, PipelineStatus, ProviderHealth};
pub use progress::{noop_sink, tracing_sink, ProgressEvent, ProgressSink};
pub use reference::{CanonicalReference, Completeness, ExpectedGeoids};
pub use registry::{Extractor, ExtractorMetadata, ExtractorRegistry, HealthStatus};
pub use snapshot_store::SnapshotStore;
pub use types::{
    AggregatedValidationResult, AuthorityTier, BoundaryId, BoundaryRecord, CacheEntry, CacheKey,
    CollectionProvenance, ExtractionSummary, FailedTask, FeatureCollection, FeatureProperties, Geometry, Issue,
    Job, JobState, Layer, LeafPlacement, Point, Polygon, PropertyValue, Provenance, Ring, Scope, Snapshot,
    SnapshotMeta, StageResult, TaskOutcome, UpstreamValidators, ValidationReport, Warning, ALL_LAYERS,
    MIN_VINTAGE_YEAR,
};
pub use validation::{ValidationContext, ValidationPipeline};

/// Schema version for the Snapshot artifact (§6).
pub const SNAPSHOT_SCHEMA_VERSION: u32 = 1;

/// Minimum vintage year this crate will commit, re-exported at crate root
/// for callers building `extract` options without reaching into `types`.
pub const MIN_SUPPORTED_VINTAGE_YEAR: u16 = types::MIN_VINTAGE_YEAR;
