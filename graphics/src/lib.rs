//! # Garnet Graphics
//!
//! GPU resource and renderer layer for the Garnet engine.
//!
//! ## Overview
//!
//! This crate provides:
//! - [`GraphicsContext`] - Backend, binding cursor and bindless texture sentinel
//! - [`resources`] - Buffers, vertex objects, textures, render buffers and frames
//! - [`RendererBuilder`] / [`Device`] / [`Renderer`] - Declare, instantiate and draw
//! - [`GpuBackend`] - Backend seam with a dummy (default) and a wgpu implementation
//!
//! Everything here is single-threaded. Binds take `&mut GraphicsContext` so
//! the order of binding calls is explicit in the caller's code.
//!
//! ## Example
//!
//! ```ignore
//! use garnet_graphics::*;
//!
//! let mut device = DeviceBuilder::new().build()?;
//! let mut builder = RendererBuilder::new();
//! builder
//!     .set_shader(ShaderHandle::DEFAULT)
//!     .set_output(OutputTarget::window(1280, 720));
//! let mut renderer = device.create_renderer(&builder)?;
//! device.render(&mut renderer)?;
//! ```

pub mod backend;
pub mod binding;
pub mod context;
pub mod device;
pub mod error;
pub mod renderer;
pub mod resources;
pub mod sentinel;
pub mod shader;
pub mod types;

// Re-export main types for convenience
pub use backend::{BackendType, GpuBackend, dummy::DummyBackend};
pub use binding::{BindingState, MAX_TEXTURE_UNITS};
pub use context::{ContextParameters, GraphicsContext};
pub use device::{Device, DeviceBuilder};
pub use error::GraphicsError;
pub use renderer::{
    BufferKind, BufferResource, DataAccess, InputHandle, OutputTarget, Renderer, RendererBuilder,
    RendererInput, Resource, ResourceHandle, ResourceType, TextureResource,
};
pub use resources::{Buffer, Frame, RenderBuffer, Texture, TextureState, VertexObject};
pub use sentinel::TextureSentinel;
pub use shader::{ShaderBuilder, ShaderHandle, ShaderStage};
pub use types::{
    AttachmentFlags, BindlessTextureHandle, BufferTarget, ClearColor, RenderPassAttachment,
    RenderSettings, TextureDataDescriptor, TextureParameters, VertexFormat,
};

/// Graphics library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the graphics subsystem.
///
/// This should be called before using any graphics functionality.
pub fn init() {
    garnet_core::init();
    log::info!("Garnet Graphics v{} initialized", VERSION);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
