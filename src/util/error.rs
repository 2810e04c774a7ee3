//! Error types for simscore.

use thiserror::Error;

/// Result alias for simscore operations.
pub type SimScoreResult<T> = std::result::Result<T, SimScoreError>;

/// Errors that can occur while scoring images or running a batch.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum SimScoreError {
    /// Width or height is zero or overflows the buffer size.
    #[error("invalid dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },
    /// The backing buffer is shorter than the view requires.
    #[error("buffer too small: needed {needed}, got {got}")]
    BufferTooSmall { needed: usize, got: usize },
    /// Row stride is smaller than the row width.
    #[error("invalid stride {stride} for width {width}")]
    InvalidStride { width: usize, stride: usize },
    /// A region of interest does not fit inside the image.
    #[error("roi {width}x{height} at ({x}, {y}) is outside {img_width}x{img_height}")]
    RoiOutOfBounds {
        x: usize,
        y: usize,
        width: usize,
        height: usize,
        img_width: usize,
        img_height: usize,
    },
    /// The input data or parameters are invalid.
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    /// The reference image cannot back a metric (flat, black, empty).
    #[error("invalid reference: {reason}")]
    InvalidReference { reason: &'static str },
    /// Candidate size differs from the reference size.
    #[error("input size mismatch: expected {expected:?}, got {got:?}")]
    InputSizeMismatch {
        expected: (usize, usize),
        got: (usize, usize),
    },
    /// Candidate image has no pixels.
    #[error("input image is empty")]
    InputEmpty,
    /// A candidate file could not be read or decoded.
    #[error("failed to decode {path}: {reason}")]
    DecodeFailure { path: String, reason: String },
    /// Scoring failed unexpectedly (including caught panics).
    #[error("computation failed: {reason}")]
    Computation { reason: String },
    /// A candidate directory could not be read.
    #[error("failed to read {path}: {reason}")]
    Io { path: String, reason: String },
    /// A per-metric output file could not be opened.
    #[error("failed to open output {path}: {reason}")]
    OutputOpenFailure { path: String, reason: String },
    /// A run is already active on this coordinator.
    #[error("a batch run is already in progress")]
    Busy,
}
