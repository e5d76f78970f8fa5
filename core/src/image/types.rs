//! The [`Image`] pixel container.

use super::pixel::Pixel;

/// A 2D grid of pixels stored row-major, top row first.
#[derive(Debug, Clone, PartialEq)]
pub struct Image<P: Pixel> {
    width: u32,
    height: u32,
    pixels: Vec<P>,
}

impl<P: Pixel> Image<P> {
    /// Create an image with every pixel zeroed.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![P::zeroed(); width as usize * height as usize],
        }
    }

    /// Create an image from existing pixels.
    ///
    /// # Panics
    ///
    /// Panics if `pixels.len() != width * height`.
    pub fn from_pixels(width: u32, height: u32, pixels: Vec<P>) -> Self {
        assert_eq!(
            pixels.len(),
            width as usize * height as usize,
            "Image::from_pixels: expected {}x{} pixels, got {}",
            width,
            height,
            pixels.len()
        );
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Create an image by copying raw bytes.
    ///
    /// Returns `None` if `bytes` is not exactly `width * height` pixels long.
    pub fn from_bytes(width: u32, height: u32, bytes: &[u8]) -> Option<Self> {
        let mut image = Self::new(width, height);
        let dst: &mut [u8] = bytemuck::cast_slice_mut(&mut image.pixels);
        if dst.len() != bytes.len() {
            return None;
        }
        dst.copy_from_slice(bytes);
        Some(image)
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Number of pixels.
    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    /// True if the image holds no pixels.
    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// Pixel at `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if the coordinate lies outside the image.
    pub fn get(&self, x: u32, y: u32) -> &P {
        &self.pixels[self.offset(x, y)]
    }

    /// Overwrite the pixel at `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if the coordinate lies outside the image.
    pub fn set(&mut self, x: u32, y: u32, pixel: P) {
        let offset = self.offset(x, y);
        self.pixels[offset] = pixel;
    }

    /// Fill every pixel with `pixel`.
    pub fn fill(&mut self, pixel: P) {
        self.pixels.fill(pixel);
    }

    /// All pixels, row-major.
    pub fn pixels(&self) -> &[P] {
        &self.pixels
    }

    /// Raw byte view of the pixel data.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }

    /// Size of the pixel data in bytes.
    pub fn size_bytes(&self) -> usize {
        self.pixels.len() * P::bytes_per_pixel()
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        assert!(
            x < self.width && y < self.height,
            "Image: pixel ({x}, {y}) out of range for {}x{} image",
            self.width,
            self.height
        );
        y as usize * self.width as usize + x as usize
    }
}
