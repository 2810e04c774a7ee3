//! Zero-mean normalized cross-correlation at a single alignment.

use crate::image::resample::downsample_area;
use crate::image::{ImageView, OwnedImage};
use crate::metric::gradient::{diagonal_gradient, GradientConfig};
use crate::metric::{check_candidate, MetricEngine};
use crate::util::math::{mean_and_ssd, EPSILON};
use crate::util::{SimScoreError, SimScoreResult};

/// Configuration for [`ZnccMetric`].
#[derive(Clone, Debug, PartialEq)]
pub struct ZnccConfig {
    /// Area downsampling factor.
    pub factor: usize,
    /// Gradient preprocessing; `None` correlates raw intensities.
    pub gradient: Option<GradientConfig>,
}

impl Default for ZnccConfig {
    fn default() -> Self {
        Self {
            factor: 2,
            gradient: Some(GradientConfig::default()),
        }
    }
}

/// ZNCC between the preprocessed reference and candidate, in `[-1, 1]`.
pub struct ZnccMetric {
    cfg: ZnccConfig,
    size: (usize, usize),
    zero_mean: Vec<f64>,
    ssd: f64,
}

impl ZnccMetric {
    /// Builds the metric; a reference with zero variance is rejected.
    pub fn new(reference: ImageView<'_, f32>, cfg: ZnccConfig) -> SimScoreResult<Self> {
        let prepared = preprocess(reference, &cfg)?;
        let (mean, ssd) = mean_and_ssd(prepared.data());
        if ssd / prepared.data().len() as f64 <= EPSILON {
            return Err(SimScoreError::InvalidReference {
                reason: "zero variance",
            });
        }
        let zero_mean = prepared
            .data()
            .iter()
            .map(|&v| f64::from(v) - mean)
            .collect();
        Ok(Self {
            cfg,
            size: reference.size(),
            zero_mean,
            ssd,
        })
    }
}

fn preprocess(img: ImageView<'_, f32>, cfg: &ZnccConfig) -> SimScoreResult<OwnedImage<f32>> {
    match cfg.gradient {
        Some(gradient_cfg) => {
            let gradient = diagonal_gradient(img, gradient_cfg)?;
            downsample_area(gradient.view(), cfg.factor.max(1))
        }
        None => downsample_area(img, cfg.factor.max(1)),
    }
}

impl MetricEngine for ZnccMetric {
    fn name(&self) -> &str {
        "ZNCC"
    }

    fn reference_size(&self) -> (usize, usize) {
        self.size
    }

    fn score(&self, candidate: ImageView<'_, f32>) -> SimScoreResult<f64> {
        check_candidate(self.size, candidate)?;
        let prepared = preprocess(candidate, &self.cfg)?;
        let (mean, ssd) = mean_and_ssd(prepared.data());

        let cross: f64 = self
            .zero_mean
            .iter()
            .zip(prepared.data())
            .map(|(&t, &v)| t * (f64::from(v) - mean))
            .sum();
        let score = cross / (self.ssd * ssd).sqrt();

        // A flat candidate yields 0/0.
        if !score.is_finite() {
            return Ok(0.0);
        }
        Ok(score.clamp(-1.0, 1.0))
    }
}
