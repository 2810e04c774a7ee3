//! Area resampling for floating-point images.
//!
//! Every destination pixel is the average of the source area it covers, with
//! partially covered source pixels weighted by their overlap. For integer
//! factors this reduces to a plain block mean.

use crate::image::{ImageView, OwnedImage};
use crate::util::math::floor_power_of_two;
use crate::util::{SimScoreError, SimScoreResult};

/// Smallest side length produced by [`ScaleStrategy::ToPowerOfTwo`].
pub const MIN_POW2_SIDE: usize = 16;

/// How an image is resized before the phase-spectrum transform.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ScaleStrategy {
    /// Keep the original size.
    None,
    /// Shrink each side to the largest power of two, never below 16 px.
    #[default]
    ToPowerOfTwo,
}

impl ScaleStrategy {
    /// Target size for an image of `width x height`.
    pub fn target_size(self, width: usize, height: usize) -> (usize, usize) {
        match self {
            ScaleStrategy::None => (width, height),
            ScaleStrategy::ToPowerOfTwo => (
                floor_power_of_two(width).max(MIN_POW2_SIDE),
                floor_power_of_two(height).max(MIN_POW2_SIDE),
            ),
        }
    }

    /// Resizes `src` according to the strategy.
    pub fn apply(self, src: ImageView<'_, f32>) -> SimScoreResult<OwnedImage<f32>> {
        let (w, h) = self.target_size(src.width(), src.height());
        if (w, h) == src.size() {
            return Ok(src.to_owned_image());
        }
        resize_area(src, w, h)
    }
}

/// Downsamples by an integer factor (`factor <= 1` copies the image).
///
/// The output size is `(width / factor, height / factor)`, clamped to 1.
pub fn downsample_area(src: ImageView<'_, f32>, factor: usize) -> SimScoreResult<OwnedImage<f32>> {
    if factor <= 1 {
        return Ok(src.to_owned_image());
    }
    let dst_width = (src.width() / factor).max(1);
    let dst_height = (src.height() / factor).max(1);
    resize_area(src, dst_width, dst_height)
}

/// Resizes to an arbitrary size using area averaging.
pub fn resize_area(
    src: ImageView<'_, f32>,
    dst_width: usize,
    dst_height: usize,
) -> SimScoreResult<OwnedImage<f32>> {
    if dst_width == 0 || dst_height == 0 {
        return Err(SimScoreError::InvalidDimensions {
            width: dst_width,
            height: dst_height,
        });
    }

    let x_taps = area_taps(src.width(), dst_width);
    let y_taps = area_taps(src.height(), dst_height);
    let rows: Vec<&[f32]> = src.rows().collect();

    let mut dst = Vec::with_capacity(dst_width * dst_height);
    let mut row_acc = vec![0.0f64; src.width()];
    for taps_y in &y_taps {
        row_acc.iter_mut().for_each(|v| *v = 0.0);
        for &(sy, wy) in taps_y {
            for (acc, &value) in row_acc.iter_mut().zip(rows[sy]) {
                *acc += wy * f64::from(value);
            }
        }
        for taps_x in &x_taps {
            let value: f64 = taps_x.iter().map(|&(sx, wx)| wx * row_acc[sx]).sum();
            dst.push(value as f32);
        }
    }

    Ok(OwnedImage::from_parts(dst, dst_width, dst_height))
}

/// Per destination index, the source indices it covers and their weights.
///
/// Weights for one destination index sum to 1.
fn area_taps(src_len: usize, dst_len: usize) -> Vec<Vec<(usize, f64)>> {
    let scale = src_len as f64 / dst_len as f64;
    (0..dst_len)
        .map(|d| {
            let start = d as f64 * scale;
            let end = start + scale;
            let first = start.floor() as usize;
            let last = (end.ceil() as usize).min(src_len);
            let mut taps = Vec::with_capacity(last.saturating_sub(first));
            for s in first..last {
                let overlap = (end.min(s as f64 + 1.0) - start.max(s as f64)).max(0.0);
                if overlap > 0.0 {
                    taps.push((s, overlap / scale));
                }
            }
            taps
        })
        .collect()
}
