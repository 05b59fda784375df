//! Shared-ownership image buffers with copy-on-write.
//!
//! An [`Image`] is a row-major interleaved pixel buffer behind an
//! `Arc`. Cloning shares the buffer, which is the mechanism that lets
//! a cache stage and an in-flight filter response hold the same pixels
//! at the same time without copying.
//!
//! The sharing contract: **never mutate through a shared handle**. All
//! write paths go through [`Image::make_mut`], which clones the buffer
//! first if anyone else still holds it. Read-only holders are
//! therefore never surprised.
//!
//! # Memory Layout
//!
//! Pixels are stored row-major, top-to-bottom, channels interleaved:
//!
//! ```text
//! [R G B R G B ...]  <- row 0
//! [R G B R G B ...]  <- row 1
//! ```
//!
//! # Usage
//!
//! ```rust
//! use rawflow_core::ImageHp;
//!
//! let mut img = ImageHp::new(640, 480);
//! img.set_pixel(10, 10, [1000, 2000, 3000]).unwrap();
//!
//! let shared = img.clone();
//! assert!(shared.shares_buffer(&img));
//!
//! // Writing detaches the written-to handle, the clone keeps the
//! // original pixels.
//! img.set_pixel(0, 0, [1, 2, 3]).unwrap();
//! assert!(!shared.shares_buffer(&img));
//! ```

use crate::{Error, PixelComponent, Rect, Result};
use std::sync::Arc;

/// High-precision linear image: 16 bits per channel, RGB.
pub type ImageHp = Image<u16, 3>;

/// Display-precision image: 8 bits per channel, RGB.
pub type Image8 = Image<u8, 3>;

/// Owned image buffer with shared pixel data.
///
/// `Image<T, N>` stores `N`-channel pixels of component type `T` in a
/// contiguous buffer. The buffer lives in an `Arc<Vec<T>>`:
///
/// - `Clone` is cheap and shares pixels
/// - [`make_mut`](Self::make_mut) is the explicit clone-on-first-write
/// - [`shares_buffer`](Self::shares_buffer) tests buffer identity
#[derive(Clone)]
pub struct Image<T: PixelComponent, const N: usize> {
    data: Arc<Vec<T>>,
    width: u32,
    height: u32,
}

impl<T: PixelComponent, const N: usize> Image<T, N> {
    /// Creates a new image filled with zeros.
    pub fn new(width: u32, height: u32) -> Self {
        let len = width as usize * height as usize * N;
        Self {
            data: Arc::new(vec![T::ZERO; len]),
            width,
            height,
        }
    }

    /// Creates an image from existing pixel data.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDimensions`] if `data.len()` is not
    /// exactly `width * height * N`.
    pub fn from_data(width: u32, height: u32, data: Vec<T>) -> Result<Self> {
        let expected = width as usize * height as usize * N;
        if data.len() != expected {
            return Err(Error::invalid_dimensions(
                width,
                height,
                format!("expected {} components, got {}", expected, data.len()),
            ));
        }
        Ok(Self {
            data: Arc::new(data),
            width,
            height,
        })
    }

    /// Creates an image filled with a single pixel value.
    pub fn filled(width: u32, height: u32, pixel: [T; N]) -> Self {
        let count = width as usize * height as usize;
        let mut data = Vec::with_capacity(count * N);
        for _ in 0..count {
            data.extend_from_slice(&pixel);
        }
        Self {
            data: Arc::new(data),
            width,
            height,
        }
    }

    /// Returns the image width in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Returns the image height in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Returns (width, height).
    #[inline]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Returns the number of channels per pixel.
    #[inline]
    pub const fn channels(&self) -> usize {
        N
    }

    /// Returns the full-image rectangle.
    #[inline]
    pub fn bounds(&self) -> Rect {
        Rect::from_size(self.width, self.height)
    }

    /// Returns the raw component slice (read-only).
    #[inline]
    pub fn data(&self) -> &[T] {
        &self.data
    }

    /// Returns one row as a component slice.
    ///
    /// # Panics
    ///
    /// Panics if `y >= height`.
    #[inline]
    pub fn row(&self, y: u32) -> &[T] {
        let w = self.width as usize * N;
        let start = y as usize * w;
        &self.data[start..start + w]
    }

    /// Returns the pixel at (x, y).
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfBounds`] for coordinates outside the image.
    pub fn pixel(&self, x: u32, y: u32) -> Result<[T; N]> {
        if x >= self.width || y >= self.height {
            return Err(Error::out_of_bounds(x, y, self.width, self.height));
        }
        let idx = (y as usize * self.width as usize + x as usize) * N;
        let mut out = [T::ZERO; N];
        out.copy_from_slice(&self.data[idx..idx + N]);
        Ok(out)
    }

    /// Writes the pixel at (x, y), detaching the buffer first if it
    /// is shared.
    pub fn set_pixel(&mut self, x: u32, y: u32, pixel: [T; N]) -> Result<()> {
        if x >= self.width || y >= self.height {
            return Err(Error::out_of_bounds(x, y, self.width, self.height));
        }
        let width = self.width as usize;
        let idx = (y as usize * width + x as usize) * N;
        self.make_mut()[idx..idx + N].copy_from_slice(&pixel);
        Ok(())
    }

    /// Returns a mutable view of the component buffer.
    ///
    /// This is the clone-on-first-write point: if the buffer is shared
    /// with any other handle, it is copied and this handle detaches.
    /// Holders of the old buffer keep seeing the old pixels.
    #[inline]
    pub fn make_mut(&mut self) -> &mut [T] {
        Arc::make_mut(&mut self.data).as_mut_slice()
    }

    /// Returns `true` if both handles point at the same underlying
    /// buffer (no copy has happened between them).
    #[inline]
    pub fn shares_buffer(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }

    /// Extracts a copy of the given region as a new image.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRegion`] if the region escapes the
    /// image bounds.
    pub fn crop(&self, region: Rect) -> Result<Self> {
        if !self.bounds().contains_rect(&region) {
            return Err(Error::invalid_region(
                region.x,
                region.y,
                region.width,
                region.height,
                self.width,
                self.height,
            ));
        }
        let w = region.width as usize;
        let mut data = Vec::with_capacity(w * region.height as usize * N);
        for y in region.y..region.bottom() {
            let start = (y as usize * self.width as usize + region.x as usize) * N;
            data.extend_from_slice(&self.data[start..start + w * N]);
        }
        Self::from_data(region.width, region.height, data)
    }
}

impl<T: PixelComponent + std::fmt::Debug, const N: usize> std::fmt::Debug for Image<T, N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Image")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("channels", &N)
            .field("shared", &(Arc::strong_count(&self.data) > 1))
            .finish()
    }
}
