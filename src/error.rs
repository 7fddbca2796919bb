//! Centralized error taxonomy.
//!
//! `spec.md` §7 defines a shared taxonomy of error *kinds* rather than
//! per-component error types, since several components (extraction,
//! validation, commit) need to agree on the same failure vocabulary when
//! a `PipelineResult` surfaces to a caller. Each variant carries enough
//! structured context to drive `ExtractionSummary.failed[]` and a
//! human-readable remediation hint, per §7 "User-visible behavior".

use thiserror::Error;

/// Machine-readable error category, independent of the specific variant.
///
/// Retryable kinds (`UpstreamUnavailable`) are absorbed by the Extraction
/// Engine's backoff loop and never reach a caller directly; the rest are
/// terminal for the task/collection/job that produced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Bad reference data, broken integrity manifest, or invalid config.
    ConfigurationError,
    /// Network failure, 5xx, or timeout. Retryable.
    UpstreamUnavailable,
    /// HTTP 4xx other than 408/429. Non-retryable.
    UpstreamRejected,
    /// SHA-256 mismatch against the Integrity Manifest. Non-retryable.
    IntegrityFailure,
    /// Malformed upstream response. Non-retryable.
    SchemaRejection,
    /// A validation stage rejected the collection.
    ValidationRejected,
    /// Feature count outside the layer's cardinality bounds.
    CardinalityMismatch,
    /// Geometry failed a topology or validity check.
    GeometryInvalid,
    /// Cross-source Jaccard comparison fell below the match threshold.
    CrossSourceMismatch,
    /// Concurrent writer conflict on a Snapshot or Job.
    CommitConflict,
    /// Requested snapshot/job/record does not exist.
    NotFound,
    /// Operation was cancelled via the job's cancel flag.
    Cancelled,
}

/// Error type shared across all core components.
#[derive(Debug, Error)]
pub enum Error {
    /// Reference data or configuration is internally inconsistent.
    #[error("configuration error: {message}")]
    Configuration {
        /// What failed self-validation.
        message: String,
    },

    /// Upstream provider is unreachable or returned a server error.
    #[error("upstream unavailable: {source_label}: {message}")]
    UpstreamUnavailable {
        /// Provider or URL identifying the upstream.
        source_label: String,
        /// Underlying failure description.
        message: String,
    },

    /// Upstream returned a non-retryable client error.
    #[error("upstream rejected request: {source_label}: HTTP {status}")]
    UpstreamRejected {
        /// Provider or URL identifying the upstream.
        source_label: String,
        /// HTTP status code.
        status: u16,
    },

    /// Archive bytes did not match the pinned SHA-256 checksum.
    #[error("integrity failure for {file_key} (vintage {vintage}): expected {expected}, got {actual}")]
    IntegrityFailure {
        /// Integrity Manifest key.
        file_key: String,
        /// Vintage year.
        vintage: u16,
        /// Expected SHA-256 hex digest.
        expected: String,
        /// Actual SHA-256 hex digest.
        actual: String,
    },

    /// Upstream response could not be parsed into a `FeatureCollection`.
    #[error("schema rejection from {source_label}: {message}")]
    SchemaRejection {
        /// Provider or URL identifying the upstream.
        source_label: String,
        /// Parse failure description.
        message: String,
    },

    /// A validation stage rejected the collection.
    #[error("validation rejected at stage '{stage}': {message} (hint: {remediation})")]
    ValidationRejected {
        /// Name of the stage that rejected the collection.
        stage: String,
        /// Description of the failure.
        message: String,
        /// Human-readable remediation hint (e.g. "wrong granularity").
        remediation: String,
    },

    /// Feature count outside `{min, max}` for the layer.
    #[error("cardinality mismatch: observed {observed}, expected [{min}, {max}] (ratio {ratio:.2})")]
    CardinalityMismatch {
        /// Observed feature count.
        observed: usize,
        /// Layer minimum.
        min: usize,
        /// Layer maximum.
        max: usize,
        /// observed / typical_hi, used for "wrong granularity" remediation text.
        ratio: f64,
    },

    /// Geometry is not a valid closed polygon/multipolygon, or fails topology rules.
    #[error("geometry invalid for {boundary_id}: {message}")]
    GeometryInvalid {
        /// Boundary identifier.
        boundary_id: String,
        /// Description of the violation.
        message: String,
    },

    /// Cross-source agreement fell below `min_match_rate`.
    #[error("cross-source mismatch: match rate {match_rate:.3} below threshold {threshold:.3}")]
    CrossSourceMismatch {
        /// Observed aggregate match rate.
        match_rate: f64,
        /// Configured minimum match rate.
        threshold: f64,
    },

    /// Concurrent writer conflict.
    #[error("commit conflict: {message}")]
    CommitConflict {
        /// Description of the conflicting operation.
        message: String,
    },

    /// Requested entity does not exist.
    #[error("not found: {entity} '{id}'")]
    NotFound {
        /// Entity kind (e.g. "snapshot", "job", "record").
        entity: String,
        /// Requested identifier.
        id: String,
    },

    /// Operation was cancelled.
    #[error("cancelled: {message}")]
    Cancelled {
        /// Context for the cancellation.
        message: String,
    },
}

impl Error {
    /// Classify this error into its machine-readable kind.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Configuration { .. } => ErrorKind::ConfigurationError,
            Error::UpstreamUnavailable { .. } => ErrorKind::UpstreamUnavailable,
            Error::UpstreamRejected { .. } => ErrorKind::UpstreamRejected,
            Error::IntegrityFailure { .. } => ErrorKind::IntegrityFailure,
            Error::SchemaRejection { .. } => ErrorKind::SchemaRejection,
            Error::ValidationRejected { .. } => ErrorKind::ValidationRejected,
            Error::CardinalityMismatch { .. } => ErrorKind::CardinalityMismatch,
            Error::GeometryInvalid { .. } => ErrorKind::GeometryInvalid,
            Error::CrossSourceMismatch { .. } => ErrorKind::CrossSourceMismatch,
            Error::CommitConflict { .. } => ErrorKind::CommitConflict,
            Error::NotFound { .. } => ErrorKind::NotFound,
            Error::Cancelled { .. } => ErrorKind::Cancelled,
        }
    }

    /// Whether the Extraction Engine's backoff loop should retry this error.
    ///
    /// Per §4.E: transient network/5xx/timeout faults are retryable; HTTP
    /// 4xx (except 408/429), integrity failures, and schema rejections are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::UpstreamUnavailable { .. } => true,
            Error::UpstreamRejected { status, .. } => *status == 408 || *status == 429,
            _ => false,
        }
    }

    /// A human-readable remediation hint, used in `PipelineResult` errors.
    pub fn remediation_hint(&self) -> String {
        match self {
            Error::CardinalityMismatch { ratio, .. } if *ratio > 2.0 => format!(
                "wrong granularity — data may be neighborhoods or a finer unit than the \
                 requested layer (observed/typical ratio {ratio:.2})"
            ),
            Error::CardinalityMismatch { .. } => {
                "feature count outside expected range — check scope and vintage".to_string()
            }
            Error::ValidationRejected { remediation, .. } => remediation.clone(),
            Error::IntegrityFailure { .. } => {
                "archive bytes do not match the pinned checksum — re-fetch or re-pin the manifest entry"
                    .to_string()
            }
            Error::CrossSourceMismatch { .. } => {
                "low cross-source agreement — verify both providers target the same vintage and granularity"
                    .to_string()
            }
            other => other.to_string(),
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
