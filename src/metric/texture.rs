//! GLCM texture metrics (correlation and homogeneity).
//!
//! The reference is resized and phase-quantized once at construction. Scoring
//! pairs each reference level with the candidate level at the configured
//! offset; with the default zero offset, identical images give a diagonal
//! matrix and both statistics evaluate to 1.

use crate::glcm::{quantized_phase, Glcm, GlcmConfig};
use crate::image::{ImageView, OwnedImage};
use crate::metric::{check_candidate, MetricEngine, TextureEngine};
use crate::trace::trace_span;
use crate::util::math::{mean_and_ssd, EPSILON};
use crate::util::{SimScoreError, SimScoreResult};

/// Statistic reduced from the co-occurrence matrix.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextureStatistic {
    Correlation,
    Homogeneity,
}

/// Texture metric backed by a reference/candidate co-occurrence matrix.
pub struct TextureMetric {
    statistic: TextureStatistic,
    cfg: GlcmConfig,
    size: (usize, usize),
    reference: OwnedImage<u8>,
}

impl TextureMetric {
    /// Builds the metric; a flat reference is rejected.
    pub fn new(
        reference: ImageView<'_, f32>,
        statistic: TextureStatistic,
        cfg: GlcmConfig,
    ) -> SimScoreResult<Self> {
        cfg.validate()?;
        let resized = cfg.scale.apply(reference)?;
        cfg.check_offset(resized.width(), resized.height())?;
        let (_, ssd) = mean_and_ssd(resized.data());
        if ssd / resized.data().len() as f64 <= EPSILON {
            return Err(SimScoreError::InvalidReference {
                reason: "zero variance",
            });
        }
        let quantized = quantized_phase(resized.view(), cfg.levels)?;
        Ok(Self {
            statistic,
            cfg,
            size: reference.size(),
            reference: quantized,
        })
    }

    /// GLCM correlation metric.
    pub fn correlation(reference: ImageView<'_, f32>, cfg: GlcmConfig) -> SimScoreResult<Self> {
        Self::new(reference, TextureStatistic::Correlation, cfg)
    }

    /// GLCM homogeneity metric.
    pub fn homogeneity(reference: ImageView<'_, f32>, cfg: GlcmConfig) -> SimScoreResult<Self> {
        Self::new(reference, TextureStatistic::Homogeneity, cfg)
    }

    /// The statistic this metric reports.
    pub fn statistic(&self) -> TextureStatistic {
        self.statistic
    }
}

impl MetricEngine for TextureMetric {
    fn name(&self) -> &str {
        match self.statistic {
            TextureStatistic::Correlation => "Correlation",
            TextureStatistic::Homogeneity => "Homogeneity",
        }
    }

    fn reference_size(&self) -> (usize, usize) {
        self.size
    }

    fn score(&self, candidate: ImageView<'_, f32>) -> SimScoreResult<f64> {
        let glcm = self.cooccurrence(candidate)?;
        Ok(self.score_glcm(&glcm))
    }

    fn texture(&self) -> Option<&dyn TextureEngine> {
        Some(self)
    }
}

impl TextureEngine for TextureMetric {
    fn glcm_config(&self) -> &GlcmConfig {
        &self.cfg
    }

    fn cooccurrence(&self, candidate: ImageView<'_, f32>) -> SimScoreResult<Glcm> {
        check_candidate(self.size, candidate)?;
        let _span = trace_span!("texture_cooccurrence", levels = self.cfg.levels).entered();
        let quantized = self.cfg.prepare(candidate)?;
        Ok(Glcm::from_levels(
            self.reference.view(),
            quantized.view(),
            &self.cfg,
        ))
    }

    fn score_glcm(&self, glcm: &Glcm) -> f64 {
        match self.statistic {
            TextureStatistic::Correlation => glcm.correlation(),
            TextureStatistic::Homogeneity => glcm.homogeneity(),
        }
    }
}
