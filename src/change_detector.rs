//! Change Detector (§4.I): priority-ordered change signal comparison,
//! fail-open when no signal is available.

use crate::types::cache_entry::UpstreamValidators;
use crate::types::Scope;

/// Which signal the detector actually used to reach its verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionMethod {
    /// HTTP `ETag` comparison (strongest signal).
    ETag,
    /// HTTP `Last-Modified` comparison.
    LastModified,
    /// Provider-reported total feature count.
    TotalCount,
    /// No signal available at all; conservatively assumes a change.
    FailOpen,
}

/// Outcome of a single change-detection check over a scope (§4.I).
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeDetectionResult {
    /// Whether the scope is believed to have changed since the prior fetch.
    pub has_changes: bool,
    /// Which signal produced the verdict.
    pub method: DetectionMethod,
    /// Confidence in `[0, 1]`; `0.0` for the fail-open case.
    pub confidence: f64,
    /// Sub-scope labels confirmed unchanged, if any (populated by callers
    /// that fan this check out across several sub-scopes; a single-scope
    /// check only ever has 0 or 1 entries).
    pub unchanged_regions: Vec<String>,
}

/// Compare a previously-observed validator snapshot to a freshly-observed
/// one for `scope`, picking the strongest available signal in priority
/// order: ETag, then Last-Modified, then provider-reported total count.
/// Providers supporting none of these fail open (§4.I: "has_changes = true,
/// confidence = 0").
pub fn detect(scope: &Scope, previous: &UpstreamValidators, current: &UpstreamValidators) -> ChangeDetectionResult {
    let (has_changes, method, confidence) = if let (Some(prev), Some(cur)) = (&previous.etag, &current.etag) {
        (prev != cur, DetectionMethod::ETag, 0.99)
    } else if let (Some(prev), Some(cur)) = (previous.last_modified, current.last_modified) {
        (cur > prev, DetectionMethod::LastModified, 0.8)
    } else if let (Some(prev), Some(cur)) = (previous.total_count, current.total_count) {
        (prev != cur, DetectionMethod::TotalCount, 0.5)
    } else {
        (true, DetectionMethod::FailOpen, 0.0)
    };

    let unchanged_regions = if has_changes { Vec::new() } else { vec![scope.label()] };

    ChangeDetectionResult {
        has_changes,
        method,
        confidence,
        unchanged_regions,
    }
}
