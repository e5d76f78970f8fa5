//! Common types and descriptors for graphics resources.
//!
//! This module contains format enums, binding targets, flags, and the
//! descriptor structs used throughout the graphics system. None of these
//! types own GPU state.

mod buffer;
mod common;
mod render;
mod texture;
mod vertex;

pub use buffer::BufferTarget;
pub use common::{ClearColor, Viewport};
pub use render::{
    AttachmentFlags, CullTarget, DepthTesting, FrameAttachment, RenderPassAttachment,
    RenderSettings,
};
pub use texture::{
    BindlessTextureHandle, MagnificationFilter, MinificationFilter, TextureComponentType,
    TextureDataDescriptor, TextureFormat, TextureInternalFormat, TextureParameters, WrapMode,
};
pub use vertex::{IndexFormat, VertexAttribute, VertexFormat, packed_layout};
