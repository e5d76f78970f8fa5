//! Vertex layout types.

/// Format of a single vertex attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexFormat {
    /// One 32-bit float.
    Float32,
    /// Two 32-bit floats.
    Float32x2,
    /// Three 32-bit floats.
    Float32x3,
    /// Four 32-bit floats.
    Float32x4,
    /// One 32-bit unsigned integer.
    Uint32,
    /// Four 32-bit unsigned integers.
    Uint32x4,
    /// One 32-bit signed integer.
    Sint32,
    /// Four 8-bit unsigned normalized values.
    Unorm8x4,
}

impl VertexFormat {
    /// Size of the attribute in bytes.
    pub fn size(&self) -> u32 {
        match self {
            Self::Float32 | Self::Uint32 | Self::Sint32 | Self::Unorm8x4 => 4,
            Self::Float32x2 => 8,
            Self::Float32x3 => 12,
            Self::Float32x4 | Self::Uint32x4 => 16,
        }
    }
}

/// One attribute of an interleaved vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexAttribute {
    /// Shader input location.
    pub location: u32,
    /// Attribute format.
    pub format: VertexFormat,
    /// Byte offset inside the vertex.
    pub offset: u32,
}

impl VertexAttribute {
    /// Create a vertex attribute.
    pub fn new(location: u32, format: VertexFormat, offset: u32) -> Self {
        Self {
            location,
            format,
            offset,
        }
    }
}

/// Packs attributes back to back, returning them with the resulting stride.
pub fn packed_layout(formats: &[VertexFormat]) -> (Vec<VertexAttribute>, u32) {
    let mut offset = 0;
    let attributes = formats
        .iter()
        .enumerate()
        .map(|(location, format)| {
            let attribute = VertexAttribute::new(location as u32, *format, offset);
            offset += format.size();
            attribute
        })
        .collect();
    (attributes, offset)
}

/// Element type of an index buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IndexFormat {
    /// 16-bit indices.
    Uint16,
    /// 32-bit indices.
    #[default]
    Uint32,
}

impl IndexFormat {
    /// Size of one index in bytes.
    pub fn size(&self) -> u32 {
        match self {
            Self::Uint16 => 2,
            Self::Uint32 => 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packed_layout() {
        let (attributes, stride) = packed_layout(&[
            VertexFormat::Float32x3,
            VertexFormat::Float32x2,
            VertexFormat::Unorm8x4,
        ]);
        assert_eq!(stride, 24);
        assert_eq!(attributes[1], VertexAttribute::new(1, VertexFormat::Float32x2, 12));
        assert_eq!(attributes[2].offset, 20);
    }
}
