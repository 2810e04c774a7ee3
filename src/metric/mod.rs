//! Similarity and texture metrics scored against a fixed reference image.
//!
//! Every engine is built once from a floating-point reference and then scores
//! any number of candidates of the same size. Engines are immutable after
//! construction, so a single instance is shared across worker threads.

use crate::glcm::{Glcm, GlcmConfig};
use crate::image::ImageView;
use crate::util::{SimScoreError, SimScoreResult};

pub mod gradient;
mod msv;
mod nipc;
mod texture;
mod zncc;

pub use gradient::GradientConfig;
pub use msv::{MsvConfig, MsvMetric};
pub use nipc::{NipcConfig, NipcMetric};
pub use texture::{TextureMetric, TextureStatistic};
pub use zncc::{ZnccConfig, ZnccMetric};

/// Registry name of the mean-absolute-difference metric.
pub const MSV: &str = "MSV";
/// Registry name of the gradient inner-product correlation metric.
pub const NIPC: &str = "NIPC";
/// Registry name of the zero-mean normalized cross-correlation metric.
pub const ZNCC: &str = "ZNCC";
/// Registry name of the GLCM correlation metric.
pub const CORRELATION: &str = "Correlation";
/// Registry name of the GLCM homogeneity metric.
pub const HOMOGENEITY: &str = "Homogeneity";

/// Scores candidates against the reference the engine was built from.
pub trait MetricEngine: Send + Sync {
    /// Short display name of the algorithm.
    fn name(&self) -> &str;

    /// Size of the reference, which every candidate must match.
    fn reference_size(&self) -> (usize, usize);

    /// Scores one candidate image.
    fn score(&self, candidate: ImageView<'_, f32>) -> SimScoreResult<f64>;

    /// Co-occurrence stage of texture metrics, so callers can share one GLCM
    /// between several statistics.
    fn texture(&self) -> Option<&dyn TextureEngine> {
        None
    }
}

/// Texture metrics split into a co-occurrence stage and a statistic stage.
pub trait TextureEngine: Send + Sync {
    /// Configuration of the co-occurrence stage.
    fn glcm_config(&self) -> &GlcmConfig;

    /// Builds the reference/candidate co-occurrence matrix.
    fn cooccurrence(&self, candidate: ImageView<'_, f32>) -> SimScoreResult<Glcm>;

    /// Reduces a co-occurrence matrix to this metric's score.
    fn score_glcm(&self, glcm: &Glcm) -> f64;
}

/// Checks a candidate against the reference size.
pub(crate) fn check_candidate(
    reference: (usize, usize),
    candidate: ImageView<'_, f32>,
) -> SimScoreResult<()> {
    let got = candidate.size();
    if got.0 == 0 || got.1 == 0 {
        return Err(SimScoreError::InputEmpty);
    }
    if got != reference {
        return Err(SimScoreError::InputSizeMismatch {
            expected: reference,
            got,
        });
    }
    Ok(())
}
