//! Per-object surface material properties.
//!
//! [`SurfaceProperties`] is laid out to be uploaded verbatim into a uniform
//! buffer, so it is `#[repr(C)]` and padded to 16 bytes.

use bytemuck::{Pod, Zeroable};

/// Shading parameters read by the object shaders.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct SurfaceProperties {
    /// Specular exponent.
    pub shininess: f32,
    /// Height scale applied when sampling the parallax map.
    pub parallax_map_scale: f32,
    /// Bias added to parallax map samples.
    pub parallax_map_offset: f32,
    /// World-space displacement applied from the displacement map.
    pub displacement_factor: f32,
}

impl Default for SurfaceProperties {
    fn default() -> Self {
        Self {
            shininess: 0.0,
            parallax_map_scale: 0.04,
            parallax_map_offset: -0.5,
            displacement_factor: 0.25,
        }
    }
}

impl SurfaceProperties {
    /// Set the specular exponent.
    pub fn with_shininess(mut self, shininess: f32) -> Self {
        self.shininess = shininess;
        self
    }

    /// Set parallax scale and offset.
    pub fn with_parallax(mut self, scale: f32, offset: f32) -> Self {
        self.parallax_map_scale = scale;
        self.parallax_map_offset = offset;
        self
    }

    /// Set the displacement factor.
    pub fn with_displacement(mut self, factor: f32) -> Self {
        self.displacement_factor = factor;
        self
    }

    /// Byte view for uniform upload.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}
