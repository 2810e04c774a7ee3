//! SimScore scores batches of candidate images against one reference image.
//!
//! The crate provides intensity, correlation and gradient metrics (MSV, NIPC,
//! ZNCC), GLCM texture metrics computed over the DFT phase spectrum
//! (correlation, homogeneity), a registry that maps metric names to engine
//! factories, and a concurrent batch pipeline that writes one CSV table per
//! metric with exact completion accounting under failures and cancellation.

pub mod batch;
pub mod glcm;
pub mod image;
pub mod metric;
pub mod registry;
mod trace;
pub mod util;

pub use batch::{
    BatchConfig, BatchCoordinator, BatchEvent, ResultRow, ResultSink, RunHandle, RunState,
    RunSummary, SinkStats,
};
pub use glcm::{Glcm, GlcmConfig};
pub use self::image::io;
pub use self::image::resample::ScaleStrategy;
pub use self::image::{CropRect, ImageView, OwnedImage};
pub use metric::{
    GradientConfig, MetricEngine, MsvConfig, MsvMetric, NipcConfig, NipcMetric, TextureEngine,
    TextureMetric, TextureStatistic, ZnccConfig, ZnccMetric,
};
pub use registry::{MetricFactory, MetricRegistry};
pub use util::{SimScoreError, SimScoreResult};
