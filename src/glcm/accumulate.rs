//! Joint-histogram accumulation for co-occurrence matrices.
//!
//! Pixel `(x, y)` of the source grid is paired with pixel `(x + dx, y + dy)`
//! of the target grid; pairs whose target falls outside the image are
//! discarded. Levels at or above `levels` are clamped to `levels - 1`.
//!
//! The parallel path splits rows across rayon workers. Each split folds into
//! its own private histogram and the partial histograms are summed in a final
//! reduction, so no slot is ever selected by thread identity. Counts are
//! integers, which makes the result identical to the sequential path.

use crate::image::ImageView;
use rayon::prelude::*;

/// Row-parallel accumulation of raw pair counts (`levels * levels`, row-major).
pub fn accumulate_parallel(
    source: ImageView<'_, u8>,
    target: ImageView<'_, u8>,
    levels: usize,
    dx: i32,
    dy: i32,
) -> Vec<u64> {
    let bins = levels * levels;
    (0..source.height())
        .into_par_iter()
        .fold(
            || vec![0u64; bins],
            |mut hist, y| {
                accumulate_row(source, target, y, levels, dx, dy, &mut hist);
                hist
            },
        )
        .reduce(
            || vec![0u64; bins],
            |mut acc, part| {
                for (a, p) in acc.iter_mut().zip(part) {
                    *a += p;
                }
                acc
            },
        )
}

/// Single-threaded accumulation, used as the reference for the parallel path.
pub fn accumulate_sequential(
    source: ImageView<'_, u8>,
    target: ImageView<'_, u8>,
    levels: usize,
    dx: i32,
    dy: i32,
) -> Vec<u64> {
    let mut hist = vec![0u64; levels * levels];
    for y in 0..source.height() {
        accumulate_row(source, target, y, levels, dx, dy, &mut hist);
    }
    hist
}

fn accumulate_row(
    source: ImageView<'_, u8>,
    target: ImageView<'_, u8>,
    y: usize,
    levels: usize,
    dx: i32,
    dy: i32,
    hist: &mut [u64],
) {
    let Some(ty) = offset_index(y, dy, target.height()) else {
        return;
    };
    let (Some(src_row), Some(tgt_row)) = (source.row(y), target.row(ty)) else {
        return;
    };
    let top = levels - 1;
    for (x, &value) in src_row.iter().enumerate() {
        let Some(tx) = offset_index(x, dx, target.width()) else {
            continue;
        };
        let i = usize::from(value).min(top);
        let j = usize::from(tgt_row[tx]).min(top);
        hist[i * levels + j] += 1;
    }
}

fn offset_index(base: usize, offset: i32, len: usize) -> Option<usize> {
    let shifted = base as i64 + i64::from(offset);
    if shifted < 0 || shifted >= len as i64 {
        return None;
    }
    Some(shifted as usize)
}
