//! Vertex inputs declared on a [`RendererBuilder`](super::RendererBuilder).

use bytemuck::Pod;

use crate::types::{IndexFormat, VertexAttribute, VertexFormat, packed_layout};

/// Stable index of an input declared on a builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InputHandle(pub(crate) usize);

impl InputHandle {
    /// Position in declaration order.
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Update policy of renderer data.
///
/// Both policies keep the byte size fixed once the renderer exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DataAccess {
    /// Uploaded once when the renderer is created.
    #[default]
    StaticFixed,
    /// May be re-uploaded between frames with data of the same size.
    DynamicFixed,
}

impl DataAccess {
    /// True if the data may be updated after creation.
    pub fn is_dynamic(&self) -> bool {
        matches!(self, Self::DynamicFixed)
    }
}

/// Interleaved vertex data, optionally indexed, drawn once per frame.
///
/// # Example
///
/// ```ignore
/// let triangle = RendererInput::new(
///     &[[0.0f32, 0.5, 0.0], [-0.5, -0.5, 0.0], [0.5, -0.5, 0.0]],
///     &[VertexFormat::Float32x3],
/// )
/// .with_access(DataAccess::DynamicFixed);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RendererInput {
    vertices: Vec<u8>,
    stride: u32,
    attributes: Vec<VertexAttribute>,
    indices: Option<(Vec<u8>, IndexFormat)>,
    access: DataAccess,
}

impl RendererInput {
    /// Describe vertices whose attributes are packed in `formats` order.
    ///
    /// # Panics
    ///
    /// Panics if `formats` is empty or the vertex bytes are not a whole
    /// number of vertices.
    pub fn new<T: Pod>(vertices: &[T], formats: &[VertexFormat]) -> Self {
        assert!(
            !formats.is_empty(),
            "RendererInput::new: a vertex needs at least one attribute"
        );
        let (attributes, stride) = packed_layout(formats);
        let vertices: Vec<u8> = bytemuck::cast_slice(vertices).to_vec();
        assert!(
            vertices.len() % stride as usize == 0,
            "RendererInput::new: {} bytes is not a multiple of the {stride}-byte vertex",
            vertices.len()
        );
        Self {
            vertices,
            stride,
            attributes,
            indices: None,
            access: DataAccess::default(),
        }
    }

    /// Draw through 16-bit indices.
    pub fn with_indices_u16(mut self, indices: &[u16]) -> Self {
        self.indices = Some((bytemuck::cast_slice(indices).to_vec(), IndexFormat::Uint16));
        self
    }

    /// Draw through 32-bit indices.
    pub fn with_indices(mut self, indices: &[u32]) -> Self {
        self.indices = Some((bytemuck::cast_slice(indices).to_vec(), IndexFormat::Uint32));
        self
    }

    /// Set whether the vertices may be updated later.
    pub fn with_access(mut self, access: DataAccess) -> Self {
        self.access = access;
        self
    }

    /// Vertex bytes.
    pub fn vertices(&self) -> &[u8] {
        &self.vertices
    }

    /// Size of one vertex.
    pub fn stride(&self) -> u32 {
        self.stride
    }

    /// Attribute layout inside a vertex.
    pub fn attributes(&self) -> &[VertexAttribute] {
        &self.attributes
    }

    /// Index bytes and their element type.
    pub fn indices(&self) -> Option<(&[u8], IndexFormat)> {
        self.indices
            .as_ref()
            .map(|(bytes, format)| (bytes.as_slice(), *format))
    }

    /// Update policy.
    pub fn access(&self) -> DataAccess {
        self.access
    }

    /// Number of vertices.
    pub fn vertex_count(&self) -> u32 {
        (self.vertices.len() / self.stride as usize) as u32
    }

    /// Number of vertices or indices one draw consumes.
    pub fn element_count(&self) -> u32 {
        match &self.indices {
            Some((bytes, format)) => (bytes.len() / format.size() as usize) as u32,
            None => self.vertex_count(),
        }
    }

    /// Replace the vertex bytes.
    ///
    /// # Panics
    ///
    /// Panics if the bytes are not a whole number of vertices.
    pub fn set_vertices(&mut self, vertices: &[u8]) {
        assert!(
            vertices.len() % self.stride as usize == 0,
            "RendererInput::set_vertices: {} bytes is not a multiple of the {}-byte vertex",
            vertices.len(),
            self.stride
        );
        self.vertices = vertices.to_vec();
    }
}
