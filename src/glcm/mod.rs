//! Gray-level co-occurrence matrices over phase-spectrum images.
//!
//! A [`Glcm`] is an `L x L` probability table: entry `(i, j)` is the fraction
//! of pixel pairs whose first pixel has level `i` and whose partner, at a fixed
//! offset, has level `j`. The table is built from the quantized phase spectrum
//! of an image rather than raw intensities.
//!
//! [`Glcm::from_image`] pairs an image with itself (classic texture GLCM).
//! [`Glcm::from_levels`] pairs two prepared grids, which is how the texture
//! metrics compare a candidate against the reference.

use crate::image::resample::ScaleStrategy;
use crate::image::{ImageView, OwnedImage};
use crate::trace::trace_span;
use crate::util::math::EPSILON;
use crate::util::{SimScoreError, SimScoreResult};

pub mod accumulate;
pub mod phase;

pub use accumulate::{accumulate_parallel, accumulate_sequential};
pub use phase::{phase_spectrum, quantized_phase};

/// Parameters of a co-occurrence computation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GlcmConfig {
    /// Number of quantization levels (`2..=256`).
    pub levels: usize,
    /// Horizontal offset of the partner pixel.
    pub dx: i32,
    /// Vertical offset of the partner pixel.
    pub dy: i32,
    /// Resize applied before the phase transform.
    pub scale: ScaleStrategy,
}

impl Default for GlcmConfig {
    fn default() -> Self {
        Self {
            levels: 32,
            dx: 0,
            dy: 0,
            scale: ScaleStrategy::ToPowerOfTwo,
        }
    }
}

impl GlcmConfig {
    /// Configuration for single-image texture analysis (right neighbour).
    pub fn neighbour() -> Self {
        Self {
            dx: 1,
            ..Self::default()
        }
    }

    pub(crate) fn validate(&self) -> SimScoreResult<()> {
        if !(2..=256).contains(&self.levels) {
            return Err(SimScoreError::InvalidInput("glcm levels must be in 2..=256"));
        }
        Ok(())
    }

    /// Fails when the offset leaves no pixel pair inside a `width x height` grid.
    pub(crate) fn check_offset(&self, width: usize, height: usize) -> SimScoreResult<()> {
        let fits = |offset: i32, len: usize| (offset.unsigned_abs() as usize) < len;
        if !fits(self.dx, width) || !fits(self.dy, height) {
            return Err(SimScoreError::InvalidInput(
                "glcm offset leaves no pixel pairs",
            ));
        }
        Ok(())
    }

    /// Resizes and quantizes an image into phase levels.
    pub fn prepare(&self, img: ImageView<'_, f32>) -> SimScoreResult<OwnedImage<u8>> {
        self.validate()?;
        let resized = self.scale.apply(img)?;
        self.check_offset(resized.width(), resized.height())?;
        quantized_phase(resized.view(), self.levels)
    }
}

/// Normalized co-occurrence matrix with marginal statistics.
#[derive(Clone, Debug, PartialEq)]
pub struct Glcm {
    levels: usize,
    probs: Vec<f64>,
    pairs: u64,
    mean_x: f64,
    mean_y: f64,
    var_x: f64,
    var_y: f64,
}

impl Glcm {
    /// Classic GLCM of one image: resize, phase-quantize, self co-occurrence.
    pub fn from_image(img: ImageView<'_, f32>, cfg: &GlcmConfig) -> SimScoreResult<Self> {
        let _span = trace_span!("glcm_from_image", levels = cfg.levels).entered();
        let quantized = cfg.prepare(img)?;
        Ok(Self::from_levels(quantized.view(), quantized.view(), cfg))
    }

    /// Builds the matrix from grids that already hold quantized levels.
    pub fn from_levels(
        source: ImageView<'_, u8>,
        target: ImageView<'_, u8>,
        cfg: &GlcmConfig,
    ) -> Self {
        let counts = accumulate_parallel(source, target, cfg.levels, cfg.dx, cfg.dy);
        Self::from_counts(counts, cfg.levels)
    }

    /// Normalizes raw pair counts and derives the marginal statistics.
    ///
    /// When no pair was counted the matrix stays all-zero; correlation then
    /// reads 1.0 and homogeneity 0.0. Configurations reaching the texture
    /// metrics are rejected before that can happen.
    pub fn from_counts(counts: Vec<u64>, levels: usize) -> Self {
        debug_assert_eq!(counts.len(), levels * levels);
        let pairs: u64 = counts.iter().sum();
        let total = pairs as f64;
        let probs = if total > EPSILON {
            counts.iter().map(|&c| c as f64 / total).collect()
        } else {
            vec![0.0; counts.len()]
        };

        let mut glcm = Self {
            levels,
            probs,
            pairs,
            mean_x: 0.0,
            mean_y: 0.0,
            var_x: 0.0,
            var_y: 0.0,
        };
        glcm.compute_statistics();
        glcm
    }

    fn compute_statistics(&mut self) {
        let (mut mean_x, mut mean_y) = (0.0, 0.0);
        for (i, row) in self.probs.chunks_exact(self.levels).enumerate() {
            for (j, &p) in row.iter().enumerate() {
                mean_x += i as f64 * p;
                mean_y += j as f64 * p;
            }
        }

        let (mut var_x, mut var_y) = (0.0, 0.0);
        for (i, row) in self.probs.chunks_exact(self.levels).enumerate() {
            for (j, &p) in row.iter().enumerate() {
                var_x += p * (i as f64 - mean_x).powi(2);
                var_y += p * (j as f64 - mean_y).powi(2);
            }
        }

        self.mean_x = mean_x;
        self.mean_y = mean_y;
        self.var_x = var_x;
        self.var_y = var_y;
    }

    /// Number of quantization levels.
    pub fn levels(&self) -> usize {
        self.levels
    }

    /// Row-major probabilities (`levels * levels`).
    pub fn probabilities(&self) -> &[f64] {
        &self.probs
    }

    /// Probability of the pair `(i, j)`.
    pub fn get(&self, i: usize, j: usize) -> Option<f64> {
        if i >= self.levels || j >= self.levels {
            return None;
        }
        self.probs.get(i * self.levels + j).copied()
    }

    /// Number of pixel pairs that contributed to the matrix.
    pub fn pair_count(&self) -> u64 {
        self.pairs
    }

    /// Sum of all entries (1 when any pair was counted, else 0).
    pub fn total(&self) -> f64 {
        self.probs.iter().sum()
    }

    /// Marginal means `(mu_x, mu_y)`.
    pub fn means(&self) -> (f64, f64) {
        (self.mean_x, self.mean_y)
    }

    /// Marginal variances `(var_x, var_y)`.
    pub fn variances(&self) -> (f64, f64) {
        (self.var_x, self.var_y)
    }

    /// Normalized covariance of the two levels.
    ///
    /// A vanishing variance product is treated as maximal self-similarity and
    /// returns 1.0.
    pub fn correlation(&self) -> f64 {
        let std_product = (self.var_x * self.var_y).sqrt();
        if std_product <= EPSILON {
            return 1.0;
        }
        let mut cov = 0.0;
        for (i, row) in self.probs.chunks_exact(self.levels).enumerate() {
            for (j, &p) in row.iter().enumerate() {
                if p > 0.0 {
                    cov += p * (i as f64 - self.mean_x) * (j as f64 - self.mean_y);
                }
            }
        }
        cov / std_product
    }

    /// Inverse-difference homogeneity, `sum p(i, j) / (1 + |i - j|)`.
    pub fn homogeneity(&self) -> f64 {
        let mut homogeneity = 0.0;
        for (i, row) in self.probs.chunks_exact(self.levels).enumerate() {
            for (j, &p) in row.iter().enumerate() {
                if p > 0.0 {
                    homogeneity += p / (1.0 + i.abs_diff(j) as f64);
                }
            }
        }
        homogeneity
    }
}
