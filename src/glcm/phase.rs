//! Phase spectrum of the 2D DFT, quantized to GLCM levels.
//!
//! The image is zero-padded to a 2·3·5-smooth size, transformed row by row and
//! then column by column, and the per-bin phase angle is cropped back to the
//! original extent. Only the DC bin carries mean brightness, so the phase map
//! is largely insensitive to global brightness changes.

use crate::image::{ImageView, OwnedImage};
use crate::util::math::optimal_dft_size;
use crate::util::{SimScoreError, SimScoreResult};
use rustfft::num_complex::Complex;
use rustfft::FftPlanner;

/// Returns the phase angle (radians, `[-pi, pi]`) of every DFT bin that lies
/// inside the original image extent.
pub fn phase_spectrum(src: ImageView<'_, f32>) -> OwnedImage<f32> {
    let (width, height) = src.size();
    let padded_width = optimal_dft_size(width);
    let padded_height = optimal_dft_size(height);

    let mut buffer = vec![Complex::new(0.0f64, 0.0); padded_width * padded_height];
    for (y, row) in src.rows().enumerate() {
        let base = y * padded_width;
        for (x, &value) in row.iter().enumerate() {
            buffer[base + x] = Complex::new(f64::from(value), 0.0);
        }
    }

    let mut planner = FftPlanner::<f64>::new();
    let row_fft = planner.plan_fft_forward(padded_width);
    row_fft.process(&mut buffer);

    let mut columns = transpose(&buffer, padded_width, padded_height);
    let col_fft = planner.plan_fft_forward(padded_height);
    col_fft.process(&mut columns);

    // `columns` is stored column-major: bin (x, y) lives at x * padded_height + y.
    let mut phase = Vec::with_capacity(width * height);
    for y in 0..height {
        for x in 0..width {
            let bin = columns[x * padded_height + y];
            phase.push(bin.im.atan2(bin.re) as f32);
        }
    }
    OwnedImage::from_parts(phase, width, height)
}

/// Min-max rescales the phase spectrum to integer levels `0..levels`.
///
/// A constant spectrum maps to level 0 everywhere.
pub fn quantized_phase(src: ImageView<'_, f32>, levels: usize) -> SimScoreResult<OwnedImage<u8>> {
    if !(2..=256).contains(&levels) {
        return Err(SimScoreError::InvalidInput("glcm levels must be in 2..=256"));
    }
    let phase = phase_spectrum(src);
    Ok(quantize_min_max(&phase, levels))
}

pub(crate) fn quantize_min_max(img: &OwnedImage<f32>, levels: usize) -> OwnedImage<u8> {
    let (min, max) = img
        .data()
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let range = f64::from(max) - f64::from(min);
    let top = (levels - 1) as f64;
    let scale = if range > f64::EPSILON { top / range } else { 0.0 };

    let data = img
        .data()
        .iter()
        .map(|&v| {
            let level = ((f64::from(v) - f64::from(min)) * scale).round();
            level.clamp(0.0, top) as u8
        })
        .collect();
    OwnedImage::from_parts(data, img.width(), img.height())
}

fn transpose<T: Copy>(data: &[T], width: usize, height: usize) -> Vec<T> {
    let mut out = Vec::with_capacity(data.len());
    for x in 0..width {
        for y in 0..height {
            out.push(data[y * width + x]);
        }
    }
    out
}
