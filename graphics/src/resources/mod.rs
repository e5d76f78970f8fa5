//! GPU resources.
//!
//! This module contains the GPU-owning wrapper types:
//! - [`Buffer`] - GPU linear memory tagged with one [`BufferTarget`]
//! - [`VertexObject`] - Vertex array aggregating optional buffers by index
//! - [`Texture`] - 2D texture with an `Empty -> Sized -> Terminal` lifecycle
//! - [`RenderBuffer`] - Write-only attachment storage
//! - [`Frame`] - Framebuffer with attachments keyed by [`FrameAttachment`]
//!
//! Each wrapper owns exactly one backend object and deletes it when dropped.
//! None of them implement `Clone`; moving a wrapper moves the ownership.
//!
//! [`BufferTarget`]: crate::types::BufferTarget
//! [`FrameAttachment`]: crate::types::FrameAttachment

mod buffer;
mod frame;
mod object;
mod render_buffer;
mod texture;

pub use buffer::Buffer;
pub use frame::{AttachmentTarget, Frame};
pub use object::VertexObject;
pub use render_buffer::RenderBuffer;
pub use texture::{Texture, TextureState};
