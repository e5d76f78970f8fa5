//! Texture types and descriptors.

use garnet_core::image::{ChannelLayout, Pixel};

pub use garnet_core::image::ComponentKind as TextureComponentType;

/// Opaque bindless texture handle.
///
/// Obtained from a terminal texture and meant to be written into uniform or
/// shader-storage data so shaders can sample the texture without a bound unit.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindlessTextureHandle(pub u64);

impl BindlessTextureHandle {
    /// Raw handle value.
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// How the GPU stores texels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum TextureInternalFormat {
    /// 8-bit red.
    R8,
    /// 16-bit red.
    R16,
    /// 32-bit float red.
    R32f,
    /// 8-bit red/green.
    Rg8,
    /// 32-bit float red/green.
    Rg32f,
    /// 8-bit RGB.
    Rgb8,
    /// 8-bit RGBA.
    #[default]
    Rgba8,
    /// 8-bit sRGB with linear alpha.
    Srgba8,
    /// 16-bit RGBA.
    Rgba16,
    /// 32-bit unsigned integer RGBA.
    Rgba32ui,
    /// 32-bit float RGBA.
    Rgba32f,
    /// 8-bit BGRA.
    Bgra8,
    /// 16-bit depth.
    Depth16,
    /// 32-bit float depth.
    Depth32f,
}

impl TextureInternalFormat {
    /// Returns true for depth formats.
    pub fn is_depth(&self) -> bool {
        matches!(self, Self::Depth16 | Self::Depth32f)
    }
}

/// Channel layout of pixel data crossing the CPU/GPU boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureFormat {
    /// Red.
    Red,
    /// Red, green.
    RedGreen,
    /// Red, green, blue.
    RedGreenBlue,
    /// Red, green, blue, alpha.
    #[default]
    RedGreenBlueAlpha,
    /// Blue, green, red, alpha.
    BlueGreenRedAlpha,
    /// Depth.
    DepthComponent,
}

impl TextureFormat {
    /// Number of channels per pixel.
    pub fn channel_count(&self) -> usize {
        match self {
            Self::Red | Self::DepthComponent => 1,
            Self::RedGreen => 2,
            Self::RedGreenBlue => 3,
            Self::RedGreenBlueAlpha | Self::BlueGreenRedAlpha => 4,
        }
    }
}

impl From<ChannelLayout> for TextureFormat {
    fn from(layout: ChannelLayout) -> Self {
        match layout {
            ChannelLayout::R => Self::Red,
            ChannelLayout::Rg => Self::RedGreen,
            ChannelLayout::Rgb => Self::RedGreenBlue,
            ChannelLayout::Rgba => Self::RedGreenBlueAlpha,
            ChannelLayout::Bgra => Self::BlueGreenRedAlpha,
            ChannelLayout::Depth => Self::DepthComponent,
        }
    }
}

/// Shape and format of a texture's data store.
///
/// Equality deliberately ignores `width` and `height`: two descriptors are
/// equal when their data is format-compatible. Use
/// [`TextureDataDescriptor::same_shape`] to also compare dimensions.
#[derive(Debug, Clone, Copy)]
pub struct TextureDataDescriptor {
    /// Scalar type of each channel.
    pub component_type: TextureComponentType,
    /// GPU storage format.
    pub internal_format: TextureInternalFormat,
    /// Channel layout of transferred pixel data.
    pub format: TextureFormat,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl PartialEq for TextureDataDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.component_type == other.component_type
            && self.internal_format == other.internal_format
            && self.format == other.format
    }
}

impl Eq for TextureDataDescriptor {}

impl TextureDataDescriptor {
    /// Create a descriptor from all of its parts.
    pub fn new(
        component_type: TextureComponentType,
        internal_format: TextureInternalFormat,
        format: TextureFormat,
        width: u32,
        height: u32,
    ) -> Self {
        Self {
            component_type,
            internal_format,
            format,
            width,
            height,
        }
    }

    /// 8-bit RGBA descriptor, the usual colour texture.
    pub fn rgba8(width: u32, height: u32) -> Self {
        Self::new(
            TextureComponentType::Byte,
            TextureInternalFormat::Rgba8,
            TextureFormat::RedGreenBlueAlpha,
            width,
            height,
        )
    }

    /// 32-bit float depth descriptor.
    pub fn depth32f(width: u32, height: u32) -> Self {
        Self::new(
            TextureComponentType::Float,
            TextureInternalFormat::Depth32f,
            TextureFormat::DepthComponent,
            width,
            height,
        )
    }

    /// Descriptor matching images of pixel type `P`.
    pub fn for_pixel<P: Pixel>(width: u32, height: u32) -> Self {
        let format = TextureFormat::from(P::LAYOUT);
        let component_type = P::component_kind();
        Self::new(
            component_type,
            default_internal_format(format, component_type),
            format,
            width,
            height,
        )
    }

    /// Replace the internal format.
    pub fn with_internal_format(mut self, internal_format: TextureInternalFormat) -> Self {
        self.internal_format = internal_format;
        self
    }

    /// Replace the dimensions.
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// True if format and dimensions both match.
    pub fn same_shape(&self, other: &Self) -> bool {
        self == other && self.width == other.width && self.height == other.height
    }

    /// Number of pixels described.
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Size of one transferred pixel in bytes.
    pub fn bytes_per_pixel(&self) -> usize {
        self.format.channel_count() * self.component_type.size()
    }

    /// Size of the whole transferred image in bytes.
    pub fn size_bytes(&self) -> usize {
        self.pixel_count() * self.bytes_per_pixel()
    }
}

fn default_internal_format(
    format: TextureFormat,
    component: TextureComponentType,
) -> TextureInternalFormat {
    use TextureComponentType as C;
    use TextureFormat as F;
    use TextureInternalFormat as I;

    match (format, component) {
        (F::Red, C::Float) => I::R32f,
        (F::Red, C::Short) => I::R16,
        (F::Red, _) => I::R8,
        (F::RedGreen, C::Float) => I::Rg32f,
        (F::RedGreen, _) => I::Rg8,
        (F::RedGreenBlue, _) => I::Rgb8,
        (F::RedGreenBlueAlpha, C::Float) => I::Rgba32f,
        (F::RedGreenBlueAlpha, C::Short) => I::Rgba16,
        (F::RedGreenBlueAlpha, C::Int) => I::Rgba32ui,
        (F::RedGreenBlueAlpha, C::Byte) => I::Rgba8,
        (F::BlueGreenRedAlpha, _) => I::Bgra8,
        (F::DepthComponent, C::Short) => I::Depth16,
        (F::DepthComponent, _) => I::Depth32f,
    }
}

/// Minification filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MinificationFilter {
    /// Nearest texel.
    #[default]
    Nearest,
    /// Weighted average of the nearest texels.
    Linear,
    /// Nearest texel of the closest mipmap.
    NearestMipmapNearest,
    /// Weighted average within the closest mipmap.
    LinearMipmapNearest,
    /// Nearest texel, blended between two mipmaps.
    NearestMipmapLinear,
    /// Weighted average, blended between two mipmaps.
    LinearMipmapLinear,
}

/// Magnification filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MagnificationFilter {
    /// Nearest texel.
    #[default]
    Nearest,
    /// Weighted average of the nearest texels.
    Linear,
}

/// Texture coordinate wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WrapMode {
    /// Clamp to the edge texel.
    ClampToEdge,
    /// Mirror once, then clamp.
    MirrorClampToEdge,
    /// Clamp to the border colour.
    ClampToBorder,
    /// Mirror on every repeat.
    MirroredRepeat,
    /// Tile.
    #[default]
    Repeat,
}

/// Sampling parameters stored on a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TextureParameters {
    /// Minification filter.
    pub min_filter: MinificationFilter,
    /// Magnification filter.
    pub mag_filter: MagnificationFilter,
    /// Wrapping along U.
    pub horizontal_wrap: WrapMode,
    /// Wrapping along V.
    pub vertical_wrap: WrapMode,
}

impl TextureParameters {
    /// Linear filtering with clamped edges, the usual render-target setup.
    pub fn linear_clamped() -> Self {
        Self {
            min_filter: MinificationFilter::Linear,
            mag_filter: MagnificationFilter::Linear,
            horizontal_wrap: WrapMode::ClampToEdge,
            vertical_wrap: WrapMode::ClampToEdge,
        }
    }
}
