//! Where a renderer draws.

use crate::types::{AttachmentFlags, RenderPassAttachment};

/// Destination kind of an [`OutputTarget`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    /// The default framebuffer, which has colour and depth.
    Window,
    /// A frame owned by the renderer with the given attachments.
    Offscreen(AttachmentFlags),
}

/// Size and kind of a renderer's destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputTarget {
    kind: OutputKind,
    width: u32,
    height: u32,
}

impl OutputTarget {
    /// Draw into the default framebuffer.
    pub fn window(width: u32, height: u32) -> Self {
        Self {
            kind: OutputKind::Window,
            width,
            height,
        }
    }

    /// Draw into an offscreen frame with `attachments`.
    pub fn offscreen(width: u32, height: u32, attachments: AttachmentFlags) -> Self {
        Self {
            kind: OutputKind::Offscreen(attachments),
            width,
            height,
        }
    }

    pub fn kind(&self) -> OutputKind {
        self.kind
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Attachments the destination provides.
    pub fn attachments(&self) -> AttachmentFlags {
        match self.kind {
            OutputKind::Window => AttachmentFlags::COLOUR | AttachmentFlags::DEPTH,
            OutputKind::Offscreen(flags) => flags,
        }
    }

    /// True if a pass writing `pass` attachments can draw here.
    pub fn supports(&self, pass: RenderPassAttachment) -> bool {
        self.attachments().contains(pass.required_attachments())
    }
}
