//! GPU backend abstraction layer.
//!
//! Every GPU object is referred to by a small integer *name* handed out by
//! the backend. Names are plain copyable identifiers; ownership of the object
//! behind a name lives in the wrapper types of [`crate::resources`], which
//! delete the object when dropped.
//!
//! # Available Backends
//!
//! - `dummy` (default): In-memory backend for testing and development
//! - `wgpu-backend`: Cross-platform backend using wgpu
//!
//! All backend methods take `&self`; backends keep their state behind
//! interior mutability and are shared through `Rc<dyn GpuBackend>` on the
//! thread that created the context.

#[cfg(feature = "wgpu-backend")]
pub mod wgpu_impl;

pub mod dummy;

use std::fmt;
use std::rc::Rc;

use crate::error::GraphicsError;
use crate::shader::ShaderSource;
use crate::types::{
    BindlessTextureHandle, BufferTarget, ClearColor, FrameAttachment, IndexFormat,
    RenderSettings, TextureDataDescriptor, TextureParameters, VertexAttribute, Viewport,
};

macro_rules! gpu_name {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub(crate) u32);

        impl $name {
            /// Raw name value.
            pub fn raw(&self) -> u32 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "#{}"), self.0)
            }
        }
    };
}

gpu_name!(
    /// Name of a GPU buffer.
    BufferName,
    "buffer"
);
gpu_name!(
    /// Name of a vertex array (attribute object).
    VertexArrayName,
    "vertex-array"
);
gpu_name!(
    /// Name of a texture.
    TextureName,
    "texture"
);
gpu_name!(
    /// Name of a render buffer.
    RenderbufferName,
    "renderbuffer"
);
gpu_name!(
    /// Name of a framebuffer.
    FramebufferName,
    "framebuffer"
);
gpu_name!(
    /// Name of a linked shader program.
    ProgramName,
    "program"
);

/// Which backend a context should run on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BackendType {
    /// Best available: wgpu if compiled in and a GPU is found, dummy otherwise.
    #[default]
    Auto,
    /// In-memory dummy backend.
    Dummy,
    /// wgpu backend.
    Wgpu,
}

/// A buffer bound at an indexed binding point for a draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferBinding {
    /// Target the buffer is bound to.
    pub target: BufferTarget,
    /// Binding point index.
    pub binding_point: u32,
    /// Bound buffer.
    pub buffer: BufferName,
}

/// A texture bound to a texture unit for a draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureBinding {
    /// Texture unit.
    pub unit: u32,
    /// Bound texture.
    pub texture: TextureName,
    /// Sampling parameters to use.
    pub parameters: TextureParameters,
}

/// A single draw from one vertex array.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCall {
    /// Interleaved vertex data, if any.
    pub vertex_buffer: Option<BufferName>,
    /// Size of one vertex in bytes.
    pub stride: u32,
    /// Attributes inside a vertex.
    pub attributes: Vec<VertexAttribute>,
    /// Index data and its element type.
    pub index_buffer: Option<(BufferName, IndexFormat)>,
    /// Number of vertices (or indices, when indexed) to draw.
    pub element_count: u32,
}

/// Everything a backend needs to render one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawSubmission {
    /// Target framebuffer; `None` draws into the default framebuffer.
    pub framebuffer: Option<FramebufferName>,
    /// Region drawn into.
    pub viewport: Viewport,
    /// Colour the colour attachment is cleared to.
    pub clear_colour: ClearColor,
    /// Fixed-function state.
    pub settings: RenderSettings,
    /// Program to draw with.
    pub program: ProgramName,
    /// Shader-visible buffers.
    pub buffers: Vec<BufferBinding>,
    /// Sampled textures.
    pub textures: Vec<TextureBinding>,
    /// Draws in submission order.
    pub draws: Vec<DrawCall>,
}

/// GPU backend trait for abstracting different GPU APIs.
pub trait GpuBackend: 'static {
    /// Get the backend name.
    fn name(&self) -> &'static str;

    /// Create a buffer with no data store.
    fn create_buffer(&self, target: BufferTarget) -> Result<BufferName, GraphicsError>;

    /// Replace a buffer's data store with `data`.
    fn write_buffer(&self, buffer: BufferName, data: &[u8]) -> Result<(), GraphicsError>;

    /// Read back a buffer's whole data store.
    ///
    /// This is a blocking operation that waits for the GPU to finish.
    fn read_buffer(&self, buffer: BufferName) -> Result<Vec<u8>, GraphicsError>;

    /// Delete a buffer. Unknown names are ignored.
    fn delete_buffer(&self, buffer: BufferName);

    /// Create a vertex array.
    fn create_vertex_array(&self) -> Result<VertexArrayName, GraphicsError>;

    /// Delete a vertex array. Unknown names are ignored.
    fn delete_vertex_array(&self, vertex_array: VertexArrayName);

    /// Create a texture with no storage.
    fn create_texture(&self) -> Result<TextureName, GraphicsError>;

    /// (Re)allocate a texture's storage. Previous contents are discarded.
    fn allocate_texture(
        &self,
        texture: TextureName,
        descriptor: &TextureDataDescriptor,
    ) -> Result<(), GraphicsError>;

    /// Upload a whole image into an allocated texture.
    fn write_texture(
        &self,
        texture: TextureName,
        descriptor: &TextureDataDescriptor,
        data: &[u8],
    ) -> Result<(), GraphicsError>;

    /// Read back a whole texture.
    fn read_texture(
        &self,
        texture: TextureName,
        descriptor: &TextureDataDescriptor,
    ) -> Result<Vec<u8>, GraphicsError>;

    /// Store sampling parameters on a texture.
    fn set_texture_parameters(&self, texture: TextureName, parameters: &TextureParameters);

    /// Delete a texture. Unknown names are ignored.
    fn delete_texture(&self, texture: TextureName);

    /// Make a texture resident and return its bindless handle.
    fn make_texture_resident(
        &self,
        texture: TextureName,
    ) -> Result<BindlessTextureHandle, GraphicsError>;

    /// Release a texture's residency.
    fn make_texture_non_resident(&self, handle: BindlessTextureHandle);

    /// Create a render buffer with storage described by `descriptor`.
    fn create_renderbuffer(
        &self,
        descriptor: &TextureDataDescriptor,
    ) -> Result<RenderbufferName, GraphicsError>;

    /// Delete a render buffer. Unknown names are ignored.
    fn delete_renderbuffer(&self, renderbuffer: RenderbufferName);

    /// Create an empty framebuffer.
    fn create_framebuffer(&self) -> Result<FramebufferName, GraphicsError>;

    /// Attach a texture to a framebuffer slot.
    fn attach_texture(
        &self,
        framebuffer: FramebufferName,
        attachment: FrameAttachment,
        texture: TextureName,
    ) -> Result<(), GraphicsError>;

    /// Attach a render buffer to a framebuffer slot.
    fn attach_renderbuffer(
        &self,
        framebuffer: FramebufferName,
        attachment: FrameAttachment,
        renderbuffer: RenderbufferName,
    ) -> Result<(), GraphicsError>;

    /// True if the framebuffer can be drawn into.
    fn is_framebuffer_complete(&self, framebuffer: FramebufferName) -> bool;

    /// Delete a framebuffer. Unknown names are ignored.
    fn delete_framebuffer(&self, framebuffer: FramebufferName);

    /// Compile and link a program from its stage sources.
    fn create_program(&self, sources: &[ShaderSource]) -> Result<ProgramName, GraphicsError>;

    /// Delete a program. Unknown names are ignored.
    fn delete_program(&self, program: ProgramName);

    /// Clear the target and execute every draw of a submission.
    fn submit(&self, submission: &DrawSubmission) -> Result<(), GraphicsError>;
}

/// Creates the backend selected by `backend_type`.
///
/// # Errors
///
/// Returns an error if an explicitly requested backend is not compiled in or
/// fails to initialize. [`BackendType::Auto`] never fails; it falls back to the
/// dummy backend.
pub fn create_backend(backend_type: BackendType) -> Result<Rc<dyn GpuBackend>, GraphicsError> {
    match backend_type {
        BackendType::Dummy => {
            log::info!("Using dummy backend");
            Ok(Rc::new(dummy::DummyBackend::new()))
        }
        BackendType::Wgpu => create_wgpu_backend(),
        BackendType::Auto => {
            if has_gpu_backend() {
                match create_wgpu_backend() {
                    Ok(backend) => return Ok(backend),
                    Err(e) => log::warn!("Failed to create wgpu backend: {}", e),
                }
            }
            log::info!("Using dummy backend");
            Ok(Rc::new(dummy::DummyBackend::new()))
        }
    }
}

#[cfg(feature = "wgpu-backend")]
fn create_wgpu_backend() -> Result<Rc<dyn GpuBackend>, GraphicsError> {
    let backend = wgpu_impl::WgpuBackend::new()?;
    log::info!("Using wgpu backend");
    Ok(Rc::new(backend))
}

#[cfg(not(feature = "wgpu-backend"))]
fn create_wgpu_backend() -> Result<Rc<dyn GpuBackend>, GraphicsError> {
    Err(GraphicsError::FeatureNotSupported(
        "crate was built without the `wgpu-backend` feature".to_string(),
    ))
}

/// Check if a real GPU backend is compiled in.
pub fn has_gpu_backend() -> bool {
    cfg!(feature = "wgpu-backend")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_display() {
        assert_eq!(BufferName(3).to_string(), "buffer#3");
        assert_eq!(ProgramName(1).to_string(), "program#1");
    }

    #[test]
    fn test_create_dummy_backend() {
        let backend = create_backend(BackendType::Dummy).unwrap();
        assert_eq!(backend.name(), "Dummy Backend");
    }

    #[cfg(not(feature = "wgpu-backend"))]
    #[test]
    fn test_wgpu_unavailable() {
        assert!(matches!(
            create_backend(BackendType::Wgpu),
            Err(GraphicsError::FeatureNotSupported(_))
        ));
        assert_eq!(
            create_backend(BackendType::Auto).unwrap().name(),
            "Dummy Backend"
        );
    }
}
