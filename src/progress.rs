//! Progress reporting: a single event sink, not ad-hoc closures.
//!
//! §9 flags "callback-heavy progress reporting" as a pattern requiring
//! re-architecture: expose one `on_progress(event)` sink and an event enum,
//! rather than leaking closures through component boundaries. Every stage
//! transition is also emitted as a `tracing` event so progress is visible
//! without wiring a sink at all.

use std::sync::Arc;

/// A progress event emitted during extraction or validation.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// A task began execution.
    TaskStarted {
        /// Task identifier (provider, sub-scope).
        task_id: String,
    },
    /// A task completed successfully.
    TaskCompleted {
        /// Task identifier.
        task_id: String,
        /// Number of tasks completed so far.
        completed: usize,
        /// Total number of planned tasks.
        total: usize,
    },
    /// A task failed terminally (after exhausting retries, if retryable).
    TaskFailed {
        /// Task identifier.
        task_id: String,
        /// Error kind, for coarse-grained UI classification.
        kind: crate::error::ErrorKind,
    },
    /// The pipeline entered a named stage (e.g. a validator name).
    StageEntered {
        /// Stage name.
        stage: String,
    },
}

/// A sink for `ProgressEvent`s. Boxed so callers can pass closures, channel
/// senders, or no-op sinks uniformly.
pub type ProgressSink = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// A sink that logs every event at `tracing::debug!` and otherwise discards it.
pub fn tracing_sink() -> ProgressSink {
    Arc::new(|event: ProgressEvent| {
        tracing::debug!(?event, "progress");
    })
}

/// A sink that does nothing, for callers who only want the `tracing` events
/// emitted directly by components.
pub fn noop_sink() -> ProgressSink {
    Arc::new(|_event: ProgressEvent| {})
}
