//! Render pass, framebuffer attachment and fixed-function state types.

use bitflags::bitflags;

bitflags! {
    /// Attachments an output target provides.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AttachmentFlags: u32 {
        /// A colour attachment.
        const COLOUR = 1 << 0;
        /// A depth attachment.
        const DEPTH = 1 << 1;
    }
}

impl Default for AttachmentFlags {
    fn default() -> Self {
        Self::COLOUR
    }
}

/// Attachments a render pass writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RenderPassAttachment {
    /// Colour only.
    #[default]
    Colour,
    /// Depth only.
    Depth,
    /// Colour and depth.
    ColourDepth,
}

impl RenderPassAttachment {
    /// Attachments an output target must provide to run this pass.
    pub fn required_attachments(&self) -> AttachmentFlags {
        match self {
            Self::Colour => AttachmentFlags::COLOUR,
            Self::Depth => AttachmentFlags::DEPTH,
            Self::ColourDepth => AttachmentFlags::COLOUR | AttachmentFlags::DEPTH,
        }
    }
}

/// Slot of a framebuffer attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FrameAttachment {
    /// Primary colour attachment.
    Colour,
    /// Depth attachment.
    Depth,
    /// Second colour attachment.
    ExtraColour1,
    /// Third colour attachment.
    ExtraColour2,
    /// Fourth colour attachment.
    ExtraColour3,
}

impl FrameAttachment {
    /// Returns true for colour slots.
    pub fn is_colour(&self) -> bool {
        !matches!(self, Self::Depth)
    }

    /// Colour attachment index, `None` for depth.
    pub fn colour_index(&self) -> Option<u32> {
        match self {
            Self::Colour => Some(0),
            Self::Depth => None,
            Self::ExtraColour1 => Some(1),
            Self::ExtraColour2 => Some(2),
            Self::ExtraColour3 => Some(3),
        }
    }
}

/// Which faces get culled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CullTarget {
    /// Cull back faces.
    #[default]
    BackFaces,
    /// Cull front faces.
    FrontFaces,
    /// Cull everything.
    Both,
    /// Disable culling.
    Nothing,
}

/// Depth comparison used by the depth test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DepthTesting {
    /// Never passes.
    NeverPass,
    /// Passes if the incoming depth is less.
    #[default]
    PassIfDepthIsLess,
    /// Passes if the incoming depth is equal.
    PassIfDepthIsEqual,
    /// Passes if the incoming depth is less or equal.
    PassIfDepthLessOrEqual,
    /// Passes if the incoming depth is greater.
    PassIfDepthIsGreater,
    /// Passes if the incoming depth is not equal.
    PassIfDepthIsNotEqual,
    /// Passes if the incoming depth is greater or equal.
    PassIfDepthIsGreaterOrEqual,
    /// Always passes.
    AlwaysPass,
}

/// Fixed-function state applied by a graphics context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderSettings {
    /// Face culling.
    pub cull: CullTarget,
    /// Depth comparison.
    pub depth: DepthTesting,
    /// Draw polygon edges only.
    pub wireframe: bool,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            cull: CullTarget::BackFaces,
            depth: DepthTesting::PassIfDepthIsLess,
            wireframe: false,
        }
    }
}

impl RenderSettings {
    /// Set face culling.
    pub fn with_cull(mut self, cull: CullTarget) -> Self {
        self.cull = cull;
        self
    }

    /// Set depth comparison.
    pub fn with_depth(mut self, depth: DepthTesting) -> Self {
        self.depth = depth;
        self
    }

    /// Enable or disable wireframe rendering.
    pub fn with_wireframe(mut self, wireframe: bool) -> Self {
        self.wireframe = wireframe;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_attachments() {
        assert_eq!(
            RenderPassAttachment::Colour.required_attachments(),
            AttachmentFlags::COLOUR
        );
        let both = RenderPassAttachment::ColourDepth.required_attachments();
        assert!(both.contains(AttachmentFlags::COLOUR | AttachmentFlags::DEPTH));
        assert!(
            !AttachmentFlags::COLOUR.contains(RenderPassAttachment::Depth.required_attachments())
        );
    }

    #[test]
    fn test_frame_attachment_colour_index() {
        assert_eq!(FrameAttachment::Colour.colour_index(), Some(0));
        assert_eq!(FrameAttachment::ExtraColour3.colour_index(), Some(3));
        assert_eq!(FrameAttachment::Depth.colour_index(), None);
        assert!(!FrameAttachment::Depth.is_colour());
    }

    #[test]
    fn test_render_settings_builder() {
        let settings = RenderSettings::default()
            .with_cull(CullTarget::Nothing)
            .with_wireframe(true);
        assert_eq!(settings.cull, CullTarget::Nothing);
        assert_eq!(settings.depth, DepthTesting::PassIfDepthIsLess);
        assert!(settings.wireframe);
    }
}
