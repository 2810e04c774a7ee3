//! Mean absolute difference between reference and candidate.

use crate::image::resample::downsample_area;
use crate::image::{ImageView, OwnedImage};
use crate::metric::{check_candidate, MetricEngine};
use crate::util::SimScoreResult;

/// Configuration for [`MsvMetric`].
#[derive(Clone, Debug, PartialEq)]
pub struct MsvConfig {
    /// Area downsampling factor applied to both images (1 keeps full size).
    pub factor: usize,
}

impl Default for MsvConfig {
    fn default() -> Self {
        Self { factor: 1 }
    }
}

/// L1 norm of the difference divided by the pixel count.
///
/// Zero for identical images and unbounded above.
pub struct MsvMetric {
    cfg: MsvConfig,
    size: (usize, usize),
    reference: OwnedImage<f32>,
}

impl MsvMetric {
    /// Builds the metric from a reference image.
    pub fn new(reference: ImageView<'_, f32>, cfg: MsvConfig) -> SimScoreResult<Self> {
        let down = downsample_area(reference, cfg.factor)?;
        Ok(Self {
            cfg,
            size: reference.size(),
            reference: down,
        })
    }
}

impl MetricEngine for MsvMetric {
    fn name(&self) -> &str {
        "MSV"
    }

    fn reference_size(&self) -> (usize, usize) {
        self.size
    }

    fn score(&self, candidate: ImageView<'_, f32>) -> SimScoreResult<f64> {
        check_candidate(self.size, candidate)?;
        let down = downsample_area(candidate, self.cfg.factor)?;
        let l1: f64 = self
            .reference
            .data()
            .iter()
            .zip(down.data())
            .map(|(&a, &b)| f64::from((a - b).abs()))
            .sum();
        Ok(l1 / self.reference.data().len() as f64)
    }
}
