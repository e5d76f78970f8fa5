//! Type conversions between Garnet types and wgpu types.

use crate::types::{
    BufferTarget, CullTarget, DepthTesting, MagnificationFilter, MinificationFilter,
    TextureInternalFormat, VertexFormat, WrapMode,
};

/// Convert a buffer target to wgpu buffer usages.
///
/// Every buffer can also be copied from and to, which uploads and readback
/// rely on.
pub fn convert_buffer_usage(target: BufferTarget) -> wgpu::BufferUsages {
    let usage = match target {
        BufferTarget::Array => wgpu::BufferUsages::VERTEX,
        BufferTarget::Index => wgpu::BufferUsages::INDEX,
        BufferTarget::ShaderStorage => wgpu::BufferUsages::STORAGE,
        BufferTarget::Uniform => wgpu::BufferUsages::UNIFORM,
        BufferTarget::DrawIndirect => wgpu::BufferUsages::INDIRECT,
        BufferTarget::CopySource | BufferTarget::CopyDestination => wgpu::BufferUsages::empty(),
    };
    usage | wgpu::BufferUsages::COPY_SRC | wgpu::BufferUsages::COPY_DST
}

/// Convert an internal format to a wgpu format. Three-channel formats have
/// no wgpu equivalent.
pub fn convert_texture_format(format: TextureInternalFormat) -> Option<wgpu::TextureFormat> {
    let format = match format {
        TextureInternalFormat::R8 => wgpu::TextureFormat::R8Unorm,
        TextureInternalFormat::R16 => wgpu::TextureFormat::R16Uint,
        TextureInternalFormat::R32f => wgpu::TextureFormat::R32Float,
        TextureInternalFormat::Rg8 => wgpu::TextureFormat::Rg8Unorm,
        TextureInternalFormat::Rg32f => wgpu::TextureFormat::Rg32Float,
        TextureInternalFormat::Rgb8 => return None,
        TextureInternalFormat::Rgba8 => wgpu::TextureFormat::Rgba8Unorm,
        TextureInternalFormat::Srgba8 => wgpu::TextureFormat::Rgba8UnormSrgb,
        TextureInternalFormat::Rgba16 => wgpu::TextureFormat::Rgba16Uint,
        TextureInternalFormat::Rgba32ui => wgpu::TextureFormat::Rgba32Uint,
        TextureInternalFormat::Rgba32f => wgpu::TextureFormat::Rgba32Float,
        TextureInternalFormat::Bgra8 => wgpu::TextureFormat::Bgra8Unorm,
        TextureInternalFormat::Depth16 => wgpu::TextureFormat::Depth16Unorm,
        TextureInternalFormat::Depth32f => wgpu::TextureFormat::Depth32Float,
    };
    Some(format)
}

/// Convert a minification filter to wgpu's filter and mipmap filter.
pub fn convert_min_filter(filter: MinificationFilter) -> (wgpu::FilterMode, wgpu::MipmapFilterMode) {
    use wgpu::{FilterMode, MipmapFilterMode};
    match filter {
        MinificationFilter::Nearest | MinificationFilter::NearestMipmapNearest => {
            (FilterMode::Nearest, MipmapFilterMode::Nearest)
        }
        MinificationFilter::Linear | MinificationFilter::LinearMipmapNearest => {
            (FilterMode::Linear, MipmapFilterMode::Nearest)
        }
        MinificationFilter::NearestMipmapLinear => (FilterMode::Nearest, MipmapFilterMode::Linear),
        MinificationFilter::LinearMipmapLinear => (FilterMode::Linear, MipmapFilterMode::Linear),
    }
}

/// Convert a magnification filter to a wgpu filter mode.
pub fn convert_mag_filter(filter: MagnificationFilter) -> wgpu::FilterMode {
    match filter {
        MagnificationFilter::Nearest => wgpu::FilterMode::Nearest,
        MagnificationFilter::Linear => wgpu::FilterMode::Linear,
    }
}

/// Convert a wrap mode to a wgpu address mode.
pub fn convert_wrap_mode(mode: WrapMode) -> wgpu::AddressMode {
    match mode {
        // wgpu has no mirror-once mode
        WrapMode::ClampToEdge | WrapMode::MirrorClampToEdge => wgpu::AddressMode::ClampToEdge,
        WrapMode::ClampToBorder => wgpu::AddressMode::ClampToBorder,
        WrapMode::MirroredRepeat => wgpu::AddressMode::MirrorRepeat,
        WrapMode::Repeat => wgpu::AddressMode::Repeat,
    }
}

/// Convert a cull target to a wgpu face. `Both` is handled by skipping the
/// draws entirely.
pub fn convert_cull(cull: CullTarget) -> Option<wgpu::Face> {
    match cull {
        CullTarget::BackFaces => Some(wgpu::Face::Back),
        CullTarget::FrontFaces => Some(wgpu::Face::Front),
        CullTarget::Both | CullTarget::Nothing => None,
    }
}

/// Convert a depth test to a wgpu compare function.
pub fn convert_depth_testing(depth: DepthTesting) -> wgpu::CompareFunction {
    match depth {
        DepthTesting::NeverPass => wgpu::CompareFunction::Never,
        DepthTesting::PassIfDepthIsLess => wgpu::CompareFunction::Less,
        DepthTesting::PassIfDepthIsEqual => wgpu::CompareFunction::Equal,
        DepthTesting::PassIfDepthLessOrEqual => wgpu::CompareFunction::LessEqual,
        DepthTesting::PassIfDepthIsGreater => wgpu::CompareFunction::Greater,
        DepthTesting::PassIfDepthIsNotEqual => wgpu::CompareFunction::NotEqual,
        DepthTesting::PassIfDepthIsGreaterOrEqual => wgpu::CompareFunction::GreaterEqual,
        DepthTesting::AlwaysPass => wgpu::CompareFunction::Always,
    }
}

/// Convert a vertex attribute format to a wgpu vertex format.
pub fn convert_vertex_format(format: VertexFormat) -> wgpu::VertexFormat {
    match format {
        VertexFormat::Float32 => wgpu::VertexFormat::Float32,
        VertexFormat::Float32x2 => wgpu::VertexFormat::Float32x2,
        VertexFormat::Float32x3 => wgpu::VertexFormat::Float32x3,
        VertexFormat::Float32x4 => wgpu::VertexFormat::Float32x4,
        VertexFormat::Uint32 => wgpu::VertexFormat::Uint32,
        VertexFormat::Uint32x4 => wgpu::VertexFormat::Uint32x4,
        VertexFormat::Sint32 => wgpu::VertexFormat::Sint32,
        VertexFormat::Unorm8x4 => wgpu::VertexFormat::Unorm8x4,
    }
}

/// Convert an index format to a wgpu index format.
pub fn convert_index_format(format: crate::types::IndexFormat) -> wgpu::IndexFormat {
    match format {
        crate::types::IndexFormat::Uint16 => wgpu::IndexFormat::Uint16,
        crate::types::IndexFormat::Uint32 => wgpu::IndexFormat::Uint32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_usage_is_copyable() {
        let usage = convert_buffer_usage(BufferTarget::Uniform);
        assert!(usage.contains(wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_SRC));
    }

    #[test]
    fn test_rgb_has_no_wgpu_format() {
        assert_eq!(convert_texture_format(TextureInternalFormat::Rgb8), None);
        assert_eq!(
            convert_texture_format(TextureInternalFormat::Depth32f),
            Some(wgpu::TextureFormat::Depth32Float)
        );
    }
}
