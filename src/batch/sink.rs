//! Thread-safe writer for per-metric result tables.
//!
//! One mutex guards the stream map and every counter, so "open the stream if
//! absent, append a row, decrement the counter" is a single critical section
//! no matter how many workers deliver at once.
//!
//! Counter model: `reset_expected_count(n)` arms the sink for `n` results.
//! Every delivered result and every skip compensation decrements it; the call
//! that brings it to zero reports "all saved", and only that call.
//!
//! Each `prepare` opens a new generation. A run remembers the generation it
//! prepared and aborts through [`ResultSink::abort_generation`], which is a
//! no-op once a later run has prepared the sink.

use crate::trace::{trace_event, trace_warn};
use crate::util::{SimScoreError, SimScoreResult};
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// Header row written to every newly created table.
pub const CSV_HEADER: &str = "FileName,Value";

/// Snapshot of the sink counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SinkStats {
    /// Results still expected before the sink is drained.
    pub expected_remaining: usize,
    /// Results handed to `handle_result`.
    pub received: usize,
    /// Rows actually written.
    pub saved: usize,
    /// Received results that were not written (aborted, unopened stream).
    pub dropped: usize,
    /// Results compensated without delivery.
    pub skipped: usize,
    /// Whether the sink was aborted since the last `prepare`.
    pub aborted: bool,
}

#[derive(Default)]
struct SinkState {
    output_dir: PathBuf,
    // `None` marks a metric whose stream failed to open for this run.
    streams: HashMap<String, Option<BufWriter<File>>>,
    stats: SinkStats,
    drained: bool,
    generation: u64,
}

/// Aggregates results from many workers into `<metric>.csv` files.
#[derive(Default)]
pub struct ResultSink {
    state: Mutex<SinkState>,
}

impl ResultSink {
    /// Creates a sink writing into `output_dir`.
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        let sink = Self::default();
        sink.set_output_dir(output_dir);
        sink
    }

    fn lock(&self) -> MutexGuard<'_, SinkState> {
        // A worker that panicked mid-write leaves plain data behind; keep going.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Sets the directory for subsequent runs.
    pub fn set_output_dir(&self, dir: impl Into<PathBuf>) {
        self.lock().output_dir = dir.into();
    }

    /// Directory tables are written to.
    pub fn output_dir(&self) -> PathBuf {
        self.lock().output_dir.clone()
    }

    /// Path of the table for `metric`.
    pub fn table_path(&self, metric: &str) -> PathBuf {
        table_path(&self.lock().output_dir, metric)
    }

    /// Resets abort and counter state and creates the output directory.
    ///
    /// Streams left open by a previous run are flushed and closed. Returns the
    /// generation this preparation opened.
    pub fn prepare(&self) -> SimScoreResult<u64> {
        let mut state = self.lock();
        close_streams(&mut state);
        state.stats = SinkStats::default();
        state.drained = false;
        state.generation += 1;
        fs::create_dir_all(&state.output_dir).map_err(|err| SimScoreError::OutputOpenFailure {
            path: state.output_dir.display().to_string(),
            reason: err.to_string(),
        })?;
        Ok(state.generation)
    }

    /// Generation opened by the most recent `prepare`.
    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    /// Arms the sink for `count` results.
    pub fn reset_expected_count(&self, count: usize) {
        let mut state = self.lock();
        state.stats.expected_remaining = count;
        state.drained = false;
    }

    /// Compensates `count` results that will never be delivered.
    ///
    /// Returns `true` if this call drained the counter.
    pub fn decrement_expected_count(&self, count: usize) -> bool {
        let mut state = self.lock();
        state.stats.skipped += count;
        decrement(&mut state, count)
    }

    /// Appends one row for `metric` and decrements the counter.
    ///
    /// Returns `true` if this call drained the counter. After `abort` the row
    /// is dropped but still counted.
    pub fn handle_result(&self, metric: &str, file_name: &str, value: f64) -> bool {
        let mut state = self.lock();
        state.stats.received += 1;

        if state.stats.aborted {
            state.stats.dropped += 1;
        } else if write_row(&mut state, metric, file_name, value) {
            state.stats.saved += 1;
        } else {
            state.stats.dropped += 1;
        }

        decrement(&mut state, 1)
    }

    /// Stops accepting rows and closes every stream immediately.
    pub fn abort(&self) {
        let mut state = self.lock();
        abort_locked(&mut state);
    }

    /// Aborts only if no `prepare` happened since `generation` was opened.
    ///
    /// Returns `true` if the sink was aborted by this call.
    pub fn abort_generation(&self, generation: u64) -> bool {
        let mut state = self.lock();
        if state.generation != generation {
            trace_event!(
                "sink_abort_stale",
                requested = generation,
                current = state.generation
            );
            return false;
        }
        abort_locked(&mut state);
        true
    }

    /// Flushes and closes every stream at the end of a run.
    pub fn close_all(&self) {
        let mut state = self.lock();
        close_streams(&mut state);
    }

    /// Whether `abort` was called since the last `prepare`.
    pub fn is_aborted(&self) -> bool {
        self.lock().stats.aborted
    }

    /// Current counters.
    pub fn stats(&self) -> SinkStats {
        self.lock().stats
    }
}

fn table_path(dir: &Path, metric: &str) -> PathBuf {
    dir.join(format!("{metric}.csv"))
}

fn abort_locked(state: &mut SinkState) {
    state.stats.aborted = true;
    close_streams(state);
    trace_event!("sink_aborted", saved = state.stats.saved);
}

fn decrement(state: &mut SinkState, count: usize) -> bool {
    let remaining = &mut state.stats.expected_remaining;
    *remaining = remaining.saturating_sub(count);
    if *remaining == 0 && !state.drained {
        state.drained = true;
        trace_event!("sink_all_saved", saved = state.stats.saved);
        return true;
    }
    false
}

fn write_row(state: &mut SinkState, metric: &str, file_name: &str, value: f64) -> bool {
    if !state.streams.contains_key(metric) {
        let path = table_path(&state.output_dir, metric);
        let stream = match open_table(&path) {
            Ok(stream) => Some(stream),
            Err(err) => {
                trace_warn!("sink_open_failed", metric = metric, error = err);
                None
            }
        };
        state.streams.insert(metric.to_owned(), stream);
    }

    let Some(Some(stream)) = state.streams.get_mut(metric) else {
        return false;
    };
    match writeln!(stream, "{file_name},{value:.6}") {
        Ok(()) => true,
        Err(err) => {
            trace_warn!("sink_write_failed", metric = metric, error = err);
            false
        }
    }
}

fn open_table(path: &Path) -> SimScoreResult<BufWriter<File>> {
    let open_failure = |err: std::io::Error| SimScoreError::OutputOpenFailure {
        path: path.display().to_string(),
        reason: err.to_string(),
    };
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(open_failure)?;
    let is_new = file.metadata().map_err(open_failure)?.len() == 0;
    let mut stream = BufWriter::new(file);
    if is_new {
        writeln!(stream, "{CSV_HEADER}").map_err(open_failure)?;
    }
    Ok(stream)
}

fn close_streams(state: &mut SinkState) {
    for (metric, stream) in state.streams.drain() {
        if let Some(mut stream) = stream {
            if let Err(err) = stream.flush() {
                trace_warn!("sink_flush_failed", metric = metric, error = err);
            }
        }
    }
}
