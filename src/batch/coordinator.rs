//! Orchestration of batch runs on a bounded worker pool.

use crate::batch::run::{Run, RunHandle};
use crate::batch::sink::ResultSink;
use crate::batch::work_item::{MetricSlot, WorkItem};
use crate::batch::{BatchConfig, BatchEvent, RunState};
use crate::image::ImageView;
use crate::registry::MetricRegistry;
use crate::trace::{trace_event, trace_span};
use crate::util::{SimScoreError, SimScoreResult};
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};

/// Runs batches of candidate files against a reference image.
///
/// One run is active at a time. Events of every run go to the receiver
/// returned by [`BatchCoordinator::new`].
pub struct BatchCoordinator {
    registry: Arc<MetricRegistry>,
    sink: Arc<ResultSink>,
    pool: rayon::ThreadPool,
    cfg: BatchConfig,
    events: Sender<BatchEvent>,
    current: Mutex<Option<Arc<Run>>>,
}

impl BatchCoordinator {
    /// Creates a coordinator and the receiving end of its event channel.
    pub fn new(
        registry: Arc<MetricRegistry>,
        sink: Arc<ResultSink>,
        cfg: BatchConfig,
    ) -> SimScoreResult<(Self, Receiver<BatchEvent>)> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(cfg.workers)
            .thread_name(|idx| format!("simscore-worker-{idx}"))
            .build()
            .map_err(|err| SimScoreError::Computation {
                reason: format!("failed to build worker pool: {err}"),
            })?;
        let (events, receiver) = mpsc::channel();
        let coordinator = Self {
            registry,
            sink,
            pool,
            cfg,
            events,
            current: Mutex::new(None),
        };
        Ok((coordinator, receiver))
    }

    /// Registry the coordinator builds engines from.
    pub fn registry(&self) -> &MetricRegistry {
        &self.registry
    }

    /// Sink receiving the results.
    pub fn sink(&self) -> &Arc<ResultSink> {
        &self.sink
    }

    /// Number of threads in the item pool.
    pub fn workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> RunState {
        match self.lock_current().as_ref() {
            None => RunState::Idle,
            Some(run) if run.is_completed() => RunState::Completed,
            Some(_) => RunState::Running,
        }
    }

    fn lock_current(&self) -> std::sync::MutexGuard<'_, Option<Arc<Run>>> {
        self.current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Starts scoring `files` against `reference` with the named metrics.
    ///
    /// The configured crop is applied to the reference here and to each
    /// candidate inside its work item. Duplicate metric names are scored once.
    /// Fails with `Busy` while another run is active.
    pub fn start<S: AsRef<str>>(
        &self,
        reference: ImageView<'_, f32>,
        files: Vec<PathBuf>,
        metrics: &[S],
    ) -> SimScoreResult<RunHandle> {
        let mut current = self.lock_current();
        if matches!(current.as_ref(), Some(run) if !run.is_completed()) {
            return Err(SimScoreError::Busy);
        }

        let reference = reference
            .crop(self.cfg.crop)
            .ok_or(SimScoreError::InvalidReference {
                reason: "reference is empty after crop",
            })?;

        let mut names: Vec<&str> = Vec::with_capacity(metrics.len());
        for name in metrics.iter().map(AsRef::as_ref) {
            if !names.contains(&name) {
                names.push(name);
            }
        }

        let _span = trace_span!("batch_start", files = files.len(), metrics = names.len()).entered();
        let generation = self.sink.prepare()?;

        let total_files = files.len();
        let expected = total_files * names.len();
        let run = Arc::new(Run::new(
            total_files,
            expected,
            Arc::clone(&self.sink),
            generation,
            self.events.clone(),
        ));
        *current = Some(Arc::clone(&run));
        drop(current);

        self.sink.reset_expected_count(expected);
        if total_files == 0 {
            run.complete();
            return Ok(RunHandle::new(run));
        }

        let reference = reference.to_owned_image();
        let mut slots = Vec::with_capacity(names.len());
        for name in names {
            match self.registry.get(name, reference.view()) {
                Ok(Some(engine)) => slots.push(MetricSlot {
                    name: name.to_owned(),
                    engine: Arc::from(engine),
                }),
                Ok(None) => {
                    run.error("", format!("unknown metric: {name}"));
                    run.skip("", total_files);
                }
                Err(err) => {
                    run.error("", format!("{name}: {err}"));
                    run.skip("", total_files);
                }
            }
        }
        let slots: Arc<[MetricSlot]> = slots.into();
        trace_event!("batch_dispatch", files = total_files, metrics = slots.len());

        for (idx, path) in files.into_iter().enumerate() {
            if run.is_cancelled() {
                let remaining = total_files - idx;
                run.skip("", remaining * slots.len());
                run.retire(remaining);
                break;
            }
            let item = WorkItem::new(path, Arc::clone(&slots), self.cfg.crop);
            let run = Arc::clone(&run);
            self.pool.spawn(move || {
                item.run(&run);
                run.item_finished();
            });
        }

        Ok(RunHandle::new(run))
    }

    /// Cancels the active run, if any.
    pub fn cancel(&self) {
        if let Some(run) = self.lock_current().as_ref() {
            run.cancel();
        }
    }
}
