//! CPU-side image data.
//!
//! Provides the [`Pixel`] trait with its concrete pixel structs and the
//! [`Image`] container used to move pixel data to and from GPU textures.
//!
//! Pixels are generic over their component type, so `PixelRgba<u8>` is the
//! classic 8-bit RGBA pixel and `PixelRgba<f32>` the HDR one. Both the
//! channel layout and the component kind are known at compile time, which is
//! what lets a texture derive its format descriptor from an image alone.

mod pixel;
mod types;

pub use pixel::{
    ChannelLayout, Component, ComponentKind, Pixel, PixelBgra, PixelBgra8, PixelDepth,
    PixelDepthF, PixelR, PixelR8, PixelRF, PixelRg, PixelRg8, PixelRgb, PixelRgb8, PixelRgba,
    PixelRgba8, PixelRgbaF,
};
pub use types::Image;
