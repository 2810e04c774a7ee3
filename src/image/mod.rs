//! Image views, owned buffers and crop rectangles.
//!
//! `ImageView` is a borrowed 2D view into a 1D buffer with an explicit stride.
//! The stride counts elements between the starts of consecutive rows, so a
//! stride larger than the width represents padded rows. ROI slices are zero-copy
//! views into the same backing slice and retain the original stride.

use crate::util::{SimScoreError, SimScoreResult};

pub mod io;
pub mod resample;

/// Borrowed 2D image view with an explicit stride.
#[derive(Debug)]
pub struct ImageView<'a, T> {
    data: &'a [T],
    width: usize,
    height: usize,
    stride: usize,
}

// A view is a borrowed slice plus geometry, so it copies for any `T`.
impl<T> Clone for ImageView<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ImageView<'_, T> {}

impl<'a, T> ImageView<'a, T> {
    /// Creates a contiguous view with `stride == width`.
    pub fn from_slice(data: &'a [T], width: usize, height: usize) -> SimScoreResult<Self> {
        Self::new(data, width, height, width)
    }

    /// Creates a view with an explicit stride.
    pub fn new(data: &'a [T], width: usize, height: usize, stride: usize) -> SimScoreResult<Self> {
        let needed = required_len(width, height, stride)?;
        if data.len() < needed {
            return Err(SimScoreError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
            stride,
        })
    }

    /// Returns the image width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the image height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns `(width, height)`.
    pub fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Returns the stride in elements between row starts.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Returns the element at `(x, y)` if it is within bounds.
    pub fn get(&self, x: usize, y: usize) -> Option<&'a T> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = y.checked_mul(self.stride)?.checked_add(x)?;
        self.data.get(idx)
    }

    /// Returns a contiguous slice for row `y` with length `width`.
    pub fn row(&self, y: usize) -> Option<&'a [T]> {
        if y >= self.height {
            return None;
        }
        let start = y.checked_mul(self.stride)?;
        let end = start.checked_add(self.width)?;
        self.data.get(start..end)
    }

    /// Iterates over the rows of the view.
    pub fn rows(&self) -> impl Iterator<Item = &'a [T]> + '_ {
        (0..self.height).filter_map(move |y| self.row(y))
    }

    /// Returns a zero-copy ROI view into the same backing buffer.
    pub fn roi(
        &self,
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    ) -> SimScoreResult<ImageView<'a, T>> {
        if width == 0 || height == 0 {
            return Err(SimScoreError::InvalidDimensions { width, height });
        }

        let out_of_bounds = SimScoreError::RoiOutOfBounds {
            x,
            y,
            width,
            height,
            img_width: self.width,
            img_height: self.height,
        };
        let end_x = x.checked_add(width).ok_or_else(|| out_of_bounds.clone())?;
        let end_y = y.checked_add(height).ok_or_else(|| out_of_bounds.clone())?;
        if end_x > self.width || end_y > self.height {
            return Err(out_of_bounds);
        }

        let start = y * self.stride + x;
        let data = self
            .data
            .get(start..)
            .ok_or(SimScoreError::BufferTooSmall {
                needed: start.saturating_add(1),
                got: self.data.len(),
            })?;

        ImageView::new(data, width, height, self.stride)
    }

    /// Applies an optional crop rectangle, clipped to the image bounds.
    ///
    /// Returns `None` when the clipped rectangle is empty.
    pub fn crop(&self, rect: Option<CropRect>) -> Option<ImageView<'a, T>> {
        match rect {
            None => Some(*self),
            Some(rect) => {
                let (x, y, w, h) = rect.clip(self.width, self.height)?;
                self.roi(x, y, w, h).ok()
            }
        }
    }
}

impl<T: Copy> ImageView<'_, T> {
    /// Copies the view into a contiguous owned image.
    pub fn to_owned_image(&self) -> OwnedImage<T> {
        let mut data = Vec::with_capacity(self.width * self.height);
        for row in self.rows() {
            data.extend_from_slice(row);
        }
        OwnedImage {
            data,
            width: self.width,
            height: self.height,
        }
    }
}

impl ImageView<'_, u8> {
    /// Promotes an 8-bit view to a contiguous floating-point image.
    pub fn to_f32(&self) -> OwnedImage<f32> {
        let mut data = Vec::with_capacity(self.width * self.height);
        for row in self.rows() {
            data.extend(row.iter().map(|&v| f32::from(v)));
        }
        OwnedImage {
            data,
            width: self.width,
            height: self.height,
        }
    }
}

/// Owned contiguous image buffer.
#[derive(Clone, Debug, PartialEq)]
pub struct OwnedImage<T> {
    data: Vec<T>,
    width: usize,
    height: usize,
}

impl<T> OwnedImage<T> {
    /// Wraps a row-major buffer of exactly `width * height` elements.
    pub fn new(data: Vec<T>, width: usize, height: usize) -> SimScoreResult<Self> {
        if width == 0 || height == 0 {
            return Err(SimScoreError::InvalidDimensions { width, height });
        }
        let needed = width
            .checked_mul(height)
            .ok_or(SimScoreError::InvalidDimensions { width, height })?;
        if data.len() < needed {
            return Err(SimScoreError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        if data.len() > needed {
            return Err(SimScoreError::InvalidDimensions { width, height });
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Returns a borrowed view of the image.
    pub fn view(&self) -> ImageView<'_, T> {
        ImageView {
            data: &self.data,
            width: self.width,
            height: self.height,
            stride: self.width,
        }
    }

    /// Returns the image width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the image height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns `(width, height)`.
    pub fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Returns the row-major pixel buffer.
    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub(crate) fn from_parts(data: Vec<T>, width: usize, height: usize) -> Self {
        debug_assert_eq!(data.len(), width * height);
        Self {
            data,
            width,
            height,
        }
    }
}

/// Axis-aligned crop rectangle in pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CropRect {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

impl CropRect {
    /// Creates a rectangle.
    pub fn new(x: usize, y: usize, width: usize, height: usize) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Intersects the rectangle with a `width x height` image.
    ///
    /// Returns `(x, y, width, height)` of the intersection or `None` if empty.
    pub fn clip(&self, width: usize, height: usize) -> Option<(usize, usize, usize, usize)> {
        if self.x >= width || self.y >= height {
            return None;
        }
        let w = self.width.min(width - self.x);
        let h = self.height.min(height - self.y);
        if w == 0 || h == 0 {
            return None;
        }
        Some((self.x, self.y, w, h))
    }
}

fn required_len(width: usize, height: usize, stride: usize) -> SimScoreResult<usize> {
    if width == 0 || height == 0 {
        return Err(SimScoreError::InvalidDimensions { width, height });
    }
    if stride < width {
        return Err(SimScoreError::InvalidStride { width, stride });
    }
    let needed = (height - 1)
        .checked_mul(stride)
        .and_then(|v| v.checked_add(width))
        .ok_or(SimScoreError::InvalidDimensions { width, height })?;
    Ok(needed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crop_without_rect_keeps_views_of_any_element_type() {
        let labels: Vec<String> = (0..6).map(|i| format!("p{i}")).collect();
        let view = ImageView::from_slice(&labels, 3, 2).unwrap();
        let same = view.crop(None).unwrap();
        assert_eq!(same.size(), (3, 2));
        assert_eq!(same.get(2, 1).map(String::as_str), Some("p5"));

        let copy = view;
        assert_eq!(copy.row(0).unwrap(), view.row(0).unwrap());
    }

    #[test]
    fn crop_rect_is_clipped_to_the_image() {
        let data: Vec<u8> = (0..20).collect();
        let view = ImageView::from_slice(&data, 5, 4).unwrap();

        let clipped = view.crop(Some(CropRect::new(3, 2, 10, 10))).unwrap();
        assert_eq!(clipped.size(), (2, 2));
        assert_eq!(clipped.stride(), 5);
        assert_eq!(clipped.row(1).unwrap(), &[18, 19]);

        assert!(view.crop(Some(CropRect::new(5, 0, 1, 1))).is_none());
        assert!(view.crop(Some(CropRect::new(0, 0, 0, 3))).is_none());
    }
}
