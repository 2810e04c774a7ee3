//! Loading helpers built on the `image` crate.

use crate::image::OwnedImage;
use crate::util::{SimScoreError, SimScoreResult};
use std::path::{Path, PathBuf};

/// File extensions picked up by [`list_candidates`].
pub const CANDIDATE_EXTENSIONS: &[&str] = &["bmp", "png", "jpg", "jpeg"];

/// Creates an owned image from a grayscale image buffer.
pub fn owned_from_gray_image(img: &image::GrayImage) -> SimScoreResult<OwnedImage<u8>> {
    let width = img.width() as usize;
    let height = img.height() as usize;
    OwnedImage::new(img.as_raw().clone(), width, height)
}

/// Creates an owned grayscale image from a dynamic image.
pub fn owned_from_dynamic_image(img: &image::DynamicImage) -> SimScoreResult<OwnedImage<u8>> {
    let gray = img.to_luma8();
    owned_from_gray_image(&gray)
}

/// Loads an image from disk and converts it to an 8-bit grayscale image.
pub fn load_gray_image<P: AsRef<Path>>(path: P) -> SimScoreResult<OwnedImage<u8>> {
    let path = path.as_ref();
    let decode_failure = |reason: String| SimScoreError::DecodeFailure {
        path: path.display().to_string(),
        reason,
    };
    let img = image::open(path).map_err(|err| decode_failure(err.to_string()))?;
    owned_from_dynamic_image(&img).map_err(|err| decode_failure(err.to_string()))
}

/// Lists candidate image files directly inside `dir`, sorted by path.
pub fn list_candidates<P: AsRef<Path>>(dir: P) -> SimScoreResult<Vec<PathBuf>> {
    let dir = dir.as_ref();
    let entries = std::fs::read_dir(dir).map_err(|err| SimScoreError::Io {
        path: dir.display().to_string(),
        reason: err.to_string(),
    })?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && has_candidate_extension(path))
        .collect();
    files.sort();
    Ok(files)
}

fn has_candidate_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            CANDIDATE_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}
