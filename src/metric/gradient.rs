//! Thresholded diagonal-difference gradient used by NIPC and ZNCC.
//!
//! `G(x, y) = |f(x, y) - f(x+1, y+1)| + |f(x+1, y) - f(x, y+1)|`, defined on
//! a `(width - 1) x (height - 1)` grid. Responses below `ratio * max(G)` are
//! zeroed so flat-field noise does not dominate the correlation.

use crate::image::{ImageView, OwnedImage};
use crate::util::{SimScoreError, SimScoreResult};

/// Configuration for the gradient transform.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GradientConfig {
    /// Fraction of the maximum response below which entries are zeroed.
    pub threshold_ratio: f32,
}

impl Default for GradientConfig {
    fn default() -> Self {
        Self {
            threshold_ratio: 0.02,
        }
    }
}

/// Computes the thresholded diagonal gradient of an image.
pub fn diagonal_gradient(
    src: ImageView<'_, f32>,
    cfg: GradientConfig,
) -> SimScoreResult<OwnedImage<f32>> {
    let (width, height) = src.size();
    if width < 2 || height < 2 {
        return Err(SimScoreError::InvalidDimensions { width, height });
    }

    let out_width = width - 1;
    let out_height = height - 1;
    let mut out = Vec::with_capacity(out_width * out_height);
    let mut max_value = 0.0f32;
    for y in 0..out_height {
        let (Some(row0), Some(row1)) = (src.row(y), src.row(y + 1)) else {
            return Err(SimScoreError::BufferTooSmall {
                needed: (y + 2) * src.stride(),
                got: 0,
            });
        };
        for x in 0..out_width {
            let g = (row0[x] - row1[x + 1]).abs() + (row0[x + 1] - row1[x]).abs();
            max_value = max_value.max(g);
            out.push(g);
        }
    }

    let threshold = cfg.threshold_ratio * max_value;
    for g in out.iter_mut() {
        if *g < threshold {
            *g = 0.0;
        }
    }

    OwnedImage::new(out, out_width, out_height)
}
