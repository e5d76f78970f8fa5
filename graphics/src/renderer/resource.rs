//! CPU-side resource descriptions declared on a [`RendererBuilder`](super::RendererBuilder).
//!
//! A [`Resource`] is a plain value: it holds the bytes to upload and how to
//! bind them, never a live GPU object. The device clones each description
//! into the renderer it creates.

use bytemuck::Pod;
use garnet_core::image::{Image, Pixel};

use crate::types::{BufferTarget, TextureDataDescriptor, TextureParameters};

use super::input::DataAccess;

/// Stable index of a resource declared on a builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceHandle(pub(crate) usize);

impl ResourceHandle {
    /// Position in declaration order.
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Kind of a [`Resource`], used for type-filtered counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceType {
    /// A shader-visible buffer.
    Buffer,
    /// A sampled texture.
    Texture,
}

/// How a buffer resource is exposed to shaders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BufferKind {
    /// Read-only uniform block.
    #[default]
    Uniform,
    /// Shader storage block.
    Storage,
}

impl BufferKind {
    /// Target the GPU buffer is created with.
    pub fn target(&self) -> BufferTarget {
        match self {
            Self::Uniform => BufferTarget::Uniform,
            Self::Storage => BufferTarget::ShaderStorage,
        }
    }
}

/// A buffer bound at a shader binding point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferResource {
    kind: BufferKind,
    binding_point: u32,
    access: DataAccess,
    data: Vec<u8>,
}

impl BufferResource {
    /// Describe a buffer holding `data`.
    pub fn new(kind: BufferKind, binding_point: u32, data: impl Into<Vec<u8>>) -> Self {
        Self {
            kind,
            binding_point,
            access: DataAccess::default(),
            data: data.into(),
        }
    }

    /// Describe a buffer holding a slice of plain-old-data values.
    pub fn from_slice<T: Pod>(kind: BufferKind, binding_point: u32, data: &[T]) -> Self {
        Self::new(kind, binding_point, bytemuck::cast_slice(data).to_vec())
    }

    /// Set whether the renderer may update the contents later.
    pub fn with_access(mut self, access: DataAccess) -> Self {
        self.access = access;
        self
    }

    /// Shader exposure.
    pub fn kind(&self) -> BufferKind {
        self.kind
    }

    /// Binding point inside the kind's namespace.
    pub fn binding_point(&self) -> u32 {
        self.binding_point
    }

    /// Update policy.
    pub fn access(&self) -> DataAccess {
        self.access
    }

    /// Contents.
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// Replace the contents.
    pub fn set_data(&mut self, data: impl Into<Vec<u8>>) {
        self.data = data.into();
    }

    /// Replace the contents with a slice of plain-old-data values.
    pub fn set_slice<T: Pod>(&mut self, data: &[T]) {
        self.set_data(bytemuck::cast_slice(data).to_vec());
    }
}

/// A texture sampled from a texture unit, or through a bindless handle when
/// terminal.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureResource {
    descriptor: TextureDataDescriptor,
    data: Vec<u8>,
    parameters: TextureParameters,
    unit: u32,
    terminal: bool,
}

impl TextureResource {
    /// Describe a texture uploaded from `image` and bound to `unit`.
    pub fn from_image<P: Pixel>(unit: u32, image: &Image<P>) -> Self {
        Self {
            descriptor: TextureDataDescriptor::for_pixel::<P>(image.width(), image.height()),
            data: image.as_bytes().to_vec(),
            parameters: TextureParameters::default(),
            unit,
            terminal: false,
        }
    }

    /// Set sampling parameters.
    pub fn with_parameters(mut self, parameters: TextureParameters) -> Self {
        self.parameters = parameters;
        self
    }

    /// Promote the texture to a bindless handle when the renderer is created.
    /// Terminal textures are not bound to their unit.
    pub fn terminal(mut self) -> Self {
        self.terminal = true;
        self
    }

    /// Shape and format.
    pub fn descriptor(&self) -> &TextureDataDescriptor {
        &self.descriptor
    }

    /// Texel bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// Sampling parameters.
    pub fn parameters(&self) -> &TextureParameters {
        &self.parameters
    }

    /// Texture unit.
    pub fn unit(&self) -> u32 {
        self.unit
    }

    /// True if the texture is addressed through a bindless handle.
    pub fn is_terminal(&self) -> bool {
        self.terminal
    }

    /// Replace the image. The pixel type and size may change.
    pub fn set_image<P: Pixel>(&mut self, image: &Image<P>) {
        self.descriptor = TextureDataDescriptor::for_pixel::<P>(image.width(), image.height());
        self.data = image.as_bytes().to_vec();
    }
}

/// A resource declared on a renderer builder.
#[derive(Debug, Clone, PartialEq)]
pub enum Resource {
    /// Buffer resource.
    Buffer(BufferResource),
    /// Texture resource.
    Texture(TextureResource),
}

impl Resource {
    /// Kind of resource.
    pub fn resource_type(&self) -> ResourceType {
        match self {
            Self::Buffer(_) => ResourceType::Buffer,
            Self::Texture(_) => ResourceType::Texture,
        }
    }

    /// Byte contents.
    pub fn bytes(&self) -> &[u8] {
        match self {
            Self::Buffer(buffer) => buffer.bytes(),
            Self::Texture(texture) => texture.bytes(),
        }
    }

    /// Size of the contents in bytes.
    pub fn size(&self) -> usize {
        self.bytes().len()
    }

    pub fn as_buffer(&self) -> Option<&BufferResource> {
        match self {
            Self::Buffer(buffer) => Some(buffer),
            Self::Texture(_) => None,
        }
    }

    pub fn as_buffer_mut(&mut self) -> Option<&mut BufferResource> {
        match self {
            Self::Buffer(buffer) => Some(buffer),
            Self::Texture(_) => None,
        }
    }

    pub fn as_texture(&self) -> Option<&TextureResource> {
        match self {
            Self::Texture(texture) => Some(texture),
            Self::Buffer(_) => None,
        }
    }

    pub fn as_texture_mut(&mut self) -> Option<&mut TextureResource> {
        match self {
            Self::Texture(texture) => Some(texture),
            Self::Buffer(_) => None,
        }
    }
}

impl From<BufferResource> for Resource {
    fn from(buffer: BufferResource) -> Self {
        Self::Buffer(buffer)
    }
}

impl From<TextureResource> for Resource {
    fn from(texture: TextureResource) -> Self {
        Self::Texture(texture)
    }
}
