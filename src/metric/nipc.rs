//! Normalized inner product of gradient images.

use crate::image::resample::downsample_area;
use crate::image::{ImageView, OwnedImage};
use crate::metric::gradient::{diagonal_gradient, GradientConfig};
use crate::metric::{check_candidate, MetricEngine};
use crate::util::math::{dot, l2_norm, EPSILON};
use crate::util::{SimScoreError, SimScoreResult};

/// Configuration for [`NipcMetric`].
#[derive(Clone, Debug, PartialEq)]
pub struct NipcConfig {
    /// Area downsampling factor applied after the gradient transform.
    pub factor: usize,
    /// Gradient threshold settings.
    pub gradient: GradientConfig,
}

impl Default for NipcConfig {
    fn default() -> Self {
        Self {
            factor: 2,
            gradient: GradientConfig::default(),
        }
    }
}

/// Cosine similarity between the downsampled gradient images.
pub struct NipcMetric {
    cfg: NipcConfig,
    size: (usize, usize),
    reference: OwnedImage<f32>,
    reference_norm: f64,
}

impl NipcMetric {
    /// Builds the metric; a reference with a vanishing gradient is rejected.
    pub fn new(reference: ImageView<'_, f32>, cfg: NipcConfig) -> SimScoreResult<Self> {
        let prepared = preprocess(reference, &cfg)?;
        let reference_norm = l2_norm(prepared.data());
        if reference_norm < EPSILON {
            return Err(SimScoreError::InvalidReference {
                reason: "gradient norm is zero",
            });
        }
        Ok(Self {
            cfg,
            size: reference.size(),
            reference: prepared,
            reference_norm,
        })
    }
}

fn preprocess(img: ImageView<'_, f32>, cfg: &NipcConfig) -> SimScoreResult<OwnedImage<f32>> {
    let gradient = diagonal_gradient(img, cfg.gradient)?;
    downsample_area(gradient.view(), cfg.factor.max(1))
}

impl MetricEngine for NipcMetric {
    fn name(&self) -> &str {
        "NIPC"
    }

    fn reference_size(&self) -> (usize, usize) {
        self.size
    }

    fn score(&self, candidate: ImageView<'_, f32>) -> SimScoreResult<f64> {
        check_candidate(self.size, candidate)?;
        let prepared = preprocess(candidate, &self.cfg)?;
        let norm = l2_norm(prepared.data());
        if norm < EPSILON {
            return Ok(0.0);
        }
        Ok(dot(self.reference.data(), prepared.data()) / (self.reference_norm * norm))
    }
}
