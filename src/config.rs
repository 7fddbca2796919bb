//! Explicit configuration, threaded through constructors.
//!
//! §9 flags "global configuration singletons" as a pattern requiring
//! re-architecture in a systems language. Every knob mentioned in §4/§5 of
//! `spec.md` lives in one of the structs below and is passed explicitly into
//! the engine/pipeline that needs it; nothing here is read implicitly from
//! the environment except via the opt-in `Config::from_env`, mirroring the
//! teacher's `ServiceState::from_env`.

use std::time::Duration;

/// Retry policy for transient extraction faults (§4.E).
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Maximum retry attempts before the task is recorded as failed.
    pub attempts: u32,
    /// Base delay; actual delay is `base_delay * 2^attempt`.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Backoff delay for a given zero-indexed attempt.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(1u32 << attempt.min(20))
    }
}

/// Validation thresholds shared by the pipeline (§4.F).
#[derive(Debug, Clone, Copy)]
pub struct ValidationThresholds {
    /// Minimum confidence for commit-eligibility (default 60).
    pub min_confidence: u8,
    /// Minimum snapshot-level pass rate.
    pub min_pass_rate: f64,
    /// Minimum Jaccard match rate to avoid a cross-source review flag.
    pub min_match_rate: f64,
    /// Geographic-bounds centroid distance threshold, in kilometers.
    pub geographic_bounds_km: f64,
    /// Cardinality sanity ratio: feature count vs `typical.hi * ratio` rejects.
    pub max_feature_count_ratio: f64,
    /// Tessellation exhaustivity coverage ratio threshold.
    pub tessellation_coverage_ratio: f64,
    /// Tolerance (square meters) for exclusivity/containment checks.
    pub tessellation_tolerance_m2: f64,
}

impl Default for ValidationThresholds {
    fn default() -> Self {
        Self {
            min_confidence: 60,
            min_pass_rate: 0.9,
            min_match_rate: 0.9,
            geographic_bounds_km: 50.0,
            max_feature_count_ratio: 3.0,
            tessellation_coverage_ratio: 0.97,
            tessellation_tolerance_m2: 100.0,
        }
    }
}

/// Cache TTL / staleness configuration (§4.D).
#[derive(Debug, Clone, Copy)]
pub struct CacheConfig {
    /// Maximum number of entries held in memory.
    pub max_entries: usize,
    /// Grace period added after an upstream's known release date before an
    /// entry is considered stale.
    pub grace_period: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 4096,
            grace_period: Duration::from_secs(14 * 24 * 3600),
        }
    }
}

/// Whether an empty Integrity Manifest checksum blocks or merely warns (§4.B).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegrityMode {
    /// Refuse to accept files with an unpinned (empty) checksum.
    Strict,
    /// Accept unpinned files but emit a warning.
    Permissive,
}

/// Top-level configuration threaded through the Extraction Engine and
/// downstream pipeline stages.
#[derive(Debug, Clone)]
pub struct Config {
    /// Bounded worker pool size for concurrent extraction tasks (default 5).
    pub concurrency: usize,
    /// If true, failed tasks are recorded and the engine still returns a
    /// partial summary; otherwise the first non-retryable failure aborts.
    pub continue_on_error: bool,
    /// Per-task timeout (default 30s).
    pub timeout_per_task: Duration,
    /// Retry policy for transient faults.
    pub retry: RetryPolicy,
    /// Validation pipeline thresholds.
    pub validation: ValidationThresholds,
    /// Cache layer configuration.
    pub cache: CacheConfig,
    /// Integrity Manifest enforcement mode.
    pub integrity_mode: IntegrityMode,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            concurrency: 5,
            continue_on_error: true,
            timeout_per_task: Duration::from_secs(30),
            retry: RetryPolicy::default(),
            validation: ValidationThresholds::default(),
            cache: CacheConfig::default(),
            integrity_mode: IntegrityMode::Strict,
        }
    }
}

impl Config {
    /// Construct a `Config`, overriding `integrity_mode` from
    /// `SHADOW_ATLAS_PERMISSIVE=1` if present. Never called implicitly by
    /// business logic — callers opt into environment-derived config.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if std::env::var("SHADOW_ATLAS_PERMISSIVE").as_deref() == Ok("1") {
            tracing::warn!(
                "SHADOW_ATLAS_PERMISSIVE=1: integrity manifest gaps will warn, not block"
            );
            config.integrity_mode = IntegrityMode::Permissive;
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_delay_doubles() {
        let policy = RetryPolicy {
            attempts: 5,
            base_delay: Duration::from_millis(100),
        };
        assert_eq!(policy.delay_for(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for(2), Duration::from_millis(400));
    }

    #[test]
    fn default_config_is_strict() {
        let config = Config::default();
        assert_eq!(config.integrity_mode, IntegrityMode::Strict);
        assert_eq!(config.concurrency, 5);
    }
}
