//! Scoring of one candidate file.

use crate::batch::run::Run;
use crate::glcm::{Glcm, GlcmConfig};
use crate::image::io::load_gray_image;
use crate::image::{CropRect, ImageView, OwnedImage};
use crate::metric::MetricEngine;
use crate::trace::{trace_span, trace_warn};
use crate::util::{SimScoreError, SimScoreResult};
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;

/// A requested metric name bound to the engine built for this run.
pub(crate) struct MetricSlot {
    pub(crate) name: String,
    pub(crate) engine: Arc<dyn MetricEngine>,
}

/// One candidate file and the metrics to score it with.
pub(crate) struct WorkItem {
    path: PathBuf,
    file_name: String,
    metrics: Arc<[MetricSlot]>,
    crop: Option<CropRect>,
}

impl WorkItem {
    pub(crate) fn new(path: PathBuf, metrics: Arc<[MetricSlot]>, crop: Option<CropRect>) -> Self {
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            path,
            file_name,
            metrics,
            crop,
        }
    }

    /// Decodes, crops and scores the file, reporting everything through `run`.
    ///
    /// Every requested metric ends up either delivered or compensated as
    /// skipped; errors never escape the item.
    pub(crate) fn run(&self, run: &Run) {
        let total = self.metrics.len();
        if total == 0 {
            return;
        }
        if run.is_cancelled() {
            run.skip(&self.file_name, total);
            return;
        }

        let _span = trace_span!("work_item", file = self.file_name.as_str()).entered();
        let image = match guarded(|| self.load()) {
            Ok(image) => image,
            Err(SimScoreError::InputEmpty) => {
                trace_warn!("item_empty_after_crop", file = self.file_name);
                run.skip(&self.file_name, total);
                return;
            }
            Err(err) => {
                run.error(&self.file_name, err.to_string());
                run.skip(&self.file_name, total);
                return;
            }
        };

        let mut shared = SharedGlcm::default();
        for (idx, slot) in self.metrics.iter().enumerate() {
            if run.is_cancelled() {
                run.skip(&self.file_name, total - idx);
                return;
            }
            match guarded(|| score_slot(slot, image.view(), &mut shared, run)) {
                Ok(value) => run.deliver(&slot.name, &self.file_name, value),
                Err(err) => {
                    run.error(&self.file_name, format!("{}: {err}", slot.name));
                    run.skip(&self.file_name, total - idx);
                    return;
                }
            }
        }
    }

    fn load(&self) -> SimScoreResult<OwnedImage<f32>> {
        let decoded = load_gray_image(&self.path)?;
        let cropped = decoded
            .view()
            .crop(self.crop)
            .ok_or(SimScoreError::InputEmpty)?;
        Ok(cropped.to_f32())
    }
}

/// Co-occurrence matrix computed at most once per item and configuration.
#[derive(Default)]
struct SharedGlcm {
    cached: Option<(GlcmConfig, Glcm)>,
}

fn score_slot(
    slot: &MetricSlot,
    candidate: ImageView<'_, f32>,
    shared: &mut SharedGlcm,
    run: &Run,
) -> SimScoreResult<f64> {
    let Some(texture) = slot.engine.texture() else {
        return slot.engine.score(candidate);
    };

    let cfg = *texture.glcm_config();
    if let Some((cached_cfg, glcm)) = shared.cached.as_ref() {
        if *cached_cfg == cfg {
            return Ok(texture.score_glcm(glcm));
        }
    }

    let glcm = texture.cooccurrence(candidate)?;
    run.record_glcm();
    let value = texture.score_glcm(&glcm);
    shared.cached = Some((cfg, glcm));
    Ok(value)
}

/// Runs `f`, turning a panic into a `Computation` error.
fn guarded<T>(f: impl FnOnce() -> SimScoreResult<T>) -> SimScoreResult<T> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => {
            let reason = payload
                .downcast_ref::<&str>()
                .map(|s| (*s).to_owned())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "panic during scoring".to_owned());
            Err(SimScoreError::Computation { reason })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::guarded;
    use crate::util::SimScoreError;

    #[test]
    fn guarded_converts_panics() {
        let result: Result<(), _> = guarded(|| panic!("boom"));
        assert_eq!(
            result,
            Err(SimScoreError::Computation {
                reason: "boom".to_owned()
            })
        );
    }

    #[test]
    fn guarded_passes_errors_through() {
        let result: Result<(), _> = guarded(|| Err(SimScoreError::InputEmpty));
        assert_eq!(result, Err(SimScoreError::InputEmpty));
    }
}
