//! Shared state of one batch run.

use crate::batch::sink::ResultSink;
use crate::batch::{BatchEvent, CancelToken, ResultRow, RunSummary};
use crate::trace::{trace_event, trace_warn};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Condvar, Mutex};

/// State shared by the coordinator, every work item and the run handle.
pub(crate) struct Run {
    total_files: usize,
    expected_results: usize,
    active: AtomicUsize,
    finished_items: AtomicUsize,
    errors: AtomicUsize,
    glcm_computations: AtomicUsize,
    completed: AtomicBool,
    cancel: CancelToken,
    sink: Arc<ResultSink>,
    sink_generation: u64,
    events: Sender<BatchEvent>,
    summary: Mutex<Option<RunSummary>>,
    done: Condvar,
}

impl Run {
    pub(crate) fn new(
        total_files: usize,
        expected_results: usize,
        sink: Arc<ResultSink>,
        sink_generation: u64,
        events: Sender<BatchEvent>,
    ) -> Self {
        Self {
            total_files,
            expected_results,
            active: AtomicUsize::new(total_files),
            finished_items: AtomicUsize::new(0),
            errors: AtomicUsize::new(0),
            glcm_computations: AtomicUsize::new(0),
            completed: AtomicBool::new(false),
            cancel: CancelToken::new(),
            sink,
            sink_generation,
            events,
            summary: Mutex::new(None),
            done: Condvar::new(),
        }
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub(crate) fn is_completed(&self) -> bool {
        self.completed.load(Ordering::SeqCst)
    }

    /// Sets the cooperative flag and aborts the sink.
    ///
    /// The abort is tied to this run's sink generation, so a handle that
    /// outlives its run never aborts the sink of a later run.
    pub(crate) fn cancel(&self) {
        if self.is_completed() {
            return;
        }
        self.cancel.cancel();
        self.sink.abort_generation(self.sink_generation);
        trace_event!("run_cancelled", total = self.total_files);
    }

    fn emit(&self, event: BatchEvent) {
        // A dropped receiver only means nobody is listening.
        let _ = self.events.send(event);
    }

    pub(crate) fn deliver(&self, metric: &str, file_name: &str, value: f64) {
        self.sink.handle_result(metric, file_name, value);
        self.emit(BatchEvent::Result(ResultRow {
            metric: metric.to_owned(),
            file_name: file_name.to_owned(),
            value,
        }));
    }

    pub(crate) fn skip(&self, file: &str, metrics: usize) {
        if metrics == 0 {
            return;
        }
        self.sink.decrement_expected_count(metrics);
        self.emit(BatchEvent::Skipped {
            file: file.to_owned(),
            metrics,
        });
    }

    pub(crate) fn error(&self, file: &str, message: String) {
        self.errors.fetch_add(1, Ordering::SeqCst);
        trace_warn!("item_error", file = file, detail = message);
        self.emit(BatchEvent::Error {
            file: file.to_owned(),
            message,
        });
    }

    pub(crate) fn record_glcm(&self) {
        self.glcm_computations.fetch_add(1, Ordering::SeqCst);
    }

    /// Called once per dispatched item after it emitted everything.
    pub(crate) fn item_finished(&self) {
        let completed = self.finished_items.fetch_add(1, Ordering::SeqCst) + 1;
        self.emit(BatchEvent::Progress {
            completed,
            total: self.total_files,
        });
        self.retire(1);
    }

    /// Removes `count` items from the active set; the last one completes the run.
    pub(crate) fn retire(&self, count: usize) {
        if count == 0 {
            return;
        }
        let previous = self.active.fetch_sub(count, Ordering::SeqCst);
        debug_assert!(previous >= count, "more items retired than dispatched");
        if previous == count {
            self.complete();
        }
    }

    /// Fires the completion event; later calls are no-ops.
    pub(crate) fn complete(&self) {
        if self.completed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.sink.close_all();

        let stats = self.sink.stats();
        let summary = RunSummary {
            total_files: self.total_files,
            expected_results: self.expected_results,
            received: stats.received,
            saved: stats.saved,
            dropped: stats.dropped,
            skipped: stats.skipped,
            outstanding: stats.expected_remaining,
            errors: self.errors.load(Ordering::SeqCst),
            cancelled: self.is_cancelled(),
            glcm_computations: self.glcm_computations.load(Ordering::SeqCst),
        };
        trace_event!(
            "run_completed",
            files = summary.total_files,
            saved = summary.saved,
            skipped = summary.skipped,
            errors = summary.errors
        );

        self.emit(BatchEvent::Completed(summary.clone()));
        let mut slot = self
            .summary
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *slot = Some(summary);
        self.done.notify_all();
    }

    fn wait(&self) -> RunSummary {
        let mut slot = self
            .summary
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        loop {
            if let Some(summary) = slot.as_ref() {
                return summary.clone();
            }
            slot = self
                .done
                .wait(slot)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
        }
    }
}

/// Handle to a started run.
#[derive(Clone)]
pub struct RunHandle {
    run: Arc<Run>,
}

impl RunHandle {
    pub(crate) fn new(run: Arc<Run>) -> Self {
        Self { run }
    }

    /// Requests cooperative cancellation and aborts the sink.
    ///
    /// Metrics already being computed run to completion; items skip the rest.
    pub fn cancel(&self) {
        self.run.cancel();
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.run.is_cancelled()
    }

    /// Whether the completion event has fired.
    pub fn is_finished(&self) -> bool {
        self.run.is_completed()
    }

    /// Blocks until the run completes and returns its summary.
    pub fn wait(&self) -> RunSummary {
        self.run.wait()
    }
}
