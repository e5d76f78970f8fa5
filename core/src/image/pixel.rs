//! Pixel and component type definitions.

use bytemuck::{Pod, Zeroable};

/// Scalar type of a single pixel channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    /// 8-bit unsigned integer.
    Byte,
    /// 16-bit unsigned integer.
    Short,
    /// 32-bit unsigned integer.
    Int,
    /// 32-bit float.
    Float,
}

impl ComponentKind {
    /// Size of one component in bytes.
    pub fn size(&self) -> usize {
        match self {
            Self::Byte => 1,
            Self::Short => 2,
            Self::Int | Self::Float => 4,
        }
    }
}

/// Channel order of a pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelLayout {
    /// Red only.
    R,
    /// Red, green.
    Rg,
    /// Red, green, blue.
    Rgb,
    /// Red, green, blue, alpha.
    Rgba,
    /// Blue, green, red, alpha.
    Bgra,
    /// Single depth value.
    Depth,
}

impl ChannelLayout {
    /// Number of channels in the layout.
    pub fn channel_count(&self) -> usize {
        match self {
            Self::R | Self::Depth => 1,
            Self::Rg => 2,
            Self::Rgb => 3,
            Self::Rgba | Self::Bgra => 4,
        }
    }
}

/// A scalar usable as a pixel channel.
pub trait Component: Pod + Default + PartialEq + std::fmt::Debug {
    /// Runtime tag for this component type.
    const KIND: ComponentKind;
}

impl Component for u8 {
    const KIND: ComponentKind = ComponentKind::Byte;
}

impl Component for u16 {
    const KIND: ComponentKind = ComponentKind::Short;
}

impl Component for u32 {
    const KIND: ComponentKind = ComponentKind::Int;
}

impl Component for f32 {
    const KIND: ComponentKind = ComponentKind::Float;
}

/// A plain-old-data pixel with a fixed layout and component type.
pub trait Pixel: Pod + Default + PartialEq + std::fmt::Debug {
    /// Channel scalar type.
    type Component: Component;

    /// Channel order.
    const LAYOUT: ChannelLayout;

    /// Size of a single pixel in bytes.
    fn bytes_per_pixel() -> usize {
        Self::LAYOUT.channel_count() * <Self::Component as Component>::KIND.size()
    }

    /// Component kind of this pixel's channels.
    fn component_kind() -> ComponentKind {
        <Self::Component as Component>::KIND
    }
}

macro_rules! pixel_type {
    ($(#[$meta:meta])* $name:ident, $layout:ident, { $($field:ident),+ }) => {
        $(#[$meta])*
        #[repr(C)]
        #[derive(Debug, Clone, Copy, PartialEq, Default)]
        pub struct $name<T> {
            $(
                #[allow(missing_docs)]
                pub $field: T,
            )+
        }

        impl<T: Component> $name<T> {
            /// Create a pixel from its channel values.
            pub fn new($($field: T),+) -> Self {
                Self { $($field),+ }
            }
        }

        // SAFETY: `#[repr(C)]` struct made only of fields of the same `Pod`
        // type, so it has no padding and every bit pattern is valid.
        unsafe impl<T: Component> Zeroable for $name<T> {}
        unsafe impl<T: Component> Pod for $name<T> {}

        impl<T: Component> Pixel for $name<T> {
            type Component = T;
            const LAYOUT: ChannelLayout = ChannelLayout::$layout;
        }
    };
}

pixel_type!(
    /// Single red channel pixel.
    PixelR, R, { r }
);
pixel_type!(
    /// Red/green pixel.
    PixelRg, Rg, { r, g }
);
pixel_type!(
    /// Red/green/blue pixel.
    PixelRgb, Rgb, { r, g, b }
);
pixel_type!(
    /// Red/green/blue/alpha pixel.
    PixelRgba, Rgba, { r, g, b, a }
);
pixel_type!(
    /// Blue/green/red/alpha pixel, the usual swapchain order.
    PixelBgra, Bgra, { b, g, r, a }
);
pixel_type!(
    /// Depth pixel.
    PixelDepth, Depth, { depth }
);

/// 8-bit red pixel.
pub type PixelR8 = PixelR<u8>;
/// 32-bit float red pixel.
pub type PixelRF = PixelR<f32>;
/// 8-bit red/green pixel.
pub type PixelRg8 = PixelRg<u8>;
/// 8-bit RGB pixel.
pub type PixelRgb8 = PixelRgb<u8>;
/// 8-bit RGBA pixel.
pub type PixelRgba8 = PixelRgba<u8>;
/// 32-bit float RGBA pixel.
pub type PixelRgbaF = PixelRgba<f32>;
/// 8-bit BGRA pixel.
pub type PixelBgra8 = PixelBgra<u8>;
/// 32-bit float depth pixel.
pub type PixelDepthF = PixelDepth<f32>;
