//! Concurrent batch scoring of candidate files against one reference.
//!
//! A [`BatchCoordinator`] turns every candidate path into a work item and runs
//! the items on a bounded rayon pool. Items deliver rows to the shared
//! [`ResultSink`] and report through an event channel. Whatever happens to
//! individual files (decode failures, scoring errors, cancellation) the run
//! ends with exactly one [`BatchEvent::Completed`].

use crate::image::CropRect;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

mod coordinator;
mod run;
pub mod sink;
mod work_item;

pub use coordinator::BatchCoordinator;
pub use run::RunHandle;
pub use sink::{ResultSink, SinkStats};

/// Settings shared by every run of a coordinator.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BatchConfig {
    /// Worker threads in the item pool (0 uses rayon's default).
    pub workers: usize,
    /// Crop applied identically to the reference and every candidate.
    pub crop: Option<CropRect>,
}

/// One scored (metric, file) pair.
#[derive(Clone, Debug, PartialEq)]
pub struct ResultRow {
    pub metric: String,
    pub file_name: String,
    pub value: f64,
}

/// Notifications emitted while a run progresses.
#[derive(Clone, Debug, PartialEq)]
pub enum BatchEvent {
    /// A work item finished; `completed` of `total` items are done.
    Progress { completed: usize, total: usize },
    /// A metric was scored for a file.
    Result(ResultRow),
    /// `metrics` results for `file` will never be delivered.
    Skipped { file: String, metrics: usize },
    /// Something went wrong for `file` (empty for run-level problems).
    Error { file: String, message: String },
    /// The run is over; sent exactly once per run.
    Completed(RunSummary),
}

/// Final accounting of a run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Candidate files handed to `start`.
    pub total_files: usize,
    /// `files x metrics` at start.
    pub expected_results: usize,
    /// Results delivered to the sink.
    pub received: usize,
    /// Rows written to disk.
    pub saved: usize,
    /// Delivered results that were not written.
    pub dropped: usize,
    /// Results compensated without delivery.
    pub skipped: usize,
    /// Results still outstanding when the run completed (0 unless a bug).
    pub outstanding: usize,
    /// Error events raised during the run.
    pub errors: usize,
    /// Whether the run was cancelled.
    pub cancelled: bool,
    /// Co-occurrence matrices computed by work items.
    pub glcm_computations: usize,
}

/// Lifecycle of a coordinator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    Completed,
}

/// Cooperative cancellation flag of one run.
#[derive(Clone, Debug, Default)]
pub(crate) struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
