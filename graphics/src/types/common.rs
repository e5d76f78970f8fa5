//! Common types shared across the graphics system.

// ============================================================================
// Clear Color
// ============================================================================

/// RGBA colour written to the colour attachment at the start of each frame.
///
/// Components are normalized floats. The default is transparent black,
/// `{0, 0, 0, 0}`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ClearColor {
    /// Red.
    pub r: f32,
    /// Green.
    pub g: f32,
    /// Blue.
    pub b: f32,
    /// Alpha.
    pub a: f32,
}

impl ClearColor {
    /// Transparent black.
    pub const TRANSPARENT: Self = Self::new(0.0, 0.0, 0.0, 0.0);
    /// Opaque black.
    pub const BLACK: Self = Self::new(0.0, 0.0, 0.0, 1.0);
    /// Opaque white.
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0, 1.0);

    /// Create a clear colour from its components.
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Components as `[r, g, b, a]`.
    pub fn to_array(&self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// Components quantized to 8-bit unsigned normalized values.
    pub fn to_rgba8(&self) -> [u8; 4] {
        self.to_array()
            .map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8)
    }
}

impl From<[f32; 4]> for ClearColor {
    fn from([r, g, b, a]: [f32; 4]) -> Self {
        Self::new(r, g, b, a)
    }
}

// ============================================================================
// Viewport
// ============================================================================

/// Rectangular region of the render target drawn into.
///
/// Uses the `[0, 1]` depth range with the origin in the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// X coordinate of the top-left corner.
    pub x: f32,
    /// Y coordinate of the top-left corner.
    pub y: f32,
    /// Width of the viewport.
    pub width: f32,
    /// Height of the viewport.
    pub height: f32,
    /// Minimum depth value (default: 0.0).
    pub min_depth: f32,
    /// Maximum depth value (default: 1.0).
    pub max_depth: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(0.0, 0.0, 0.0, 0.0)
    }
}

impl Viewport {
    /// Create a new viewport with the standard depth range.
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }

    /// Create a viewport covering a `width` by `height` target.
    pub fn from_dimensions(width: u32, height: u32) -> Self {
        Self::new(0.0, 0.0, width as f32, height as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clear_color_default_is_transparent() {
        assert_eq!(ClearColor::default(), ClearColor::TRANSPARENT);
        assert_eq!(ClearColor::default().to_array(), [0.0; 4]);
    }

    #[test]
    fn test_clear_color_to_rgba8() {
        assert_eq!(ClearColor::WHITE.to_rgba8(), [255; 4]);
        assert_eq!(ClearColor::new(0.5, 2.0, -1.0, 1.0).to_rgba8(), [128, 255, 0, 255]);
    }

    #[test]
    fn test_viewport_from_dimensions() {
        let viewport = Viewport::from_dimensions(800, 600);
        assert_eq!(viewport.width, 800.0);
        assert_eq!(viewport.height, 600.0);
        assert_eq!(viewport.max_depth, 1.0);
    }
}
