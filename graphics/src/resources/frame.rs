//! Framebuffer resource.

use std::collections::BTreeMap;
use std::rc::Rc;

use crate::backend::{FramebufferName, GpuBackend};
use crate::context::GraphicsContext;
use crate::error::GraphicsError;
use crate::types::{
    AttachmentFlags, FrameAttachment, TextureDataDescriptor, TextureParameters,
};

use super::{RenderBuffer, Texture};

/// Storage attached to one framebuffer slot.
#[derive(Debug)]
pub enum AttachmentTarget {
    /// A texture that can be sampled or read back later.
    Texture(Texture),
    /// Write-only storage.
    RenderBuffer(RenderBuffer),
}

impl AttachmentTarget {
    fn descriptor(&self) -> Option<&TextureDataDescriptor> {
        match self {
            Self::Texture(texture) => texture.descriptor(),
            Self::RenderBuffer(render_buffer) => Some(render_buffer.descriptor()),
        }
    }
}

/// A framebuffer owning its attachments.
///
/// # Example
///
/// ```ignore
/// let frame = Frame::offscreen(&ctx, 1280, 720, AttachmentFlags::COLOUR | AttachmentFlags::DEPTH)?;
/// assert!(frame.is_complete());
/// frame.bind(&mut ctx);
/// ```
pub struct Frame {
    name: FramebufferName,
    attachments: BTreeMap<FrameAttachment, AttachmentTarget>,
    backend: Rc<dyn GpuBackend>,
}

impl Frame {
    /// Create a framebuffer with no attachments.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot create the framebuffer.
    pub fn new(ctx: &GraphicsContext) -> Result<Self, GraphicsError> {
        let name = ctx.backend().create_framebuffer()?;
        Ok(Self {
            name,
            attachments: BTreeMap::new(),
            backend: Rc::clone(ctx.backend()),
        })
    }

    /// Create a framebuffer with an RGBA8 colour texture and/or a 32-bit
    /// float depth render buffer of the given size.
    ///
    /// # Errors
    ///
    /// Returns [`GraphicsError::InvalidParameter`] if `attachments` is empty
    /// or the size is zero, or any backend creation error.
    pub fn offscreen(
        ctx: &GraphicsContext,
        width: u32,
        height: u32,
        attachments: AttachmentFlags,
    ) -> Result<Self, GraphicsError> {
        if attachments.is_empty() {
            return Err(GraphicsError::InvalidParameter(
                "offscreen frame needs at least one attachment".to_string(),
            ));
        }
        if width == 0 || height == 0 {
            return Err(GraphicsError::InvalidParameter(format!(
                "offscreen frame size {width}x{height} is empty"
            )));
        }

        let mut frame = Self::new(ctx)?;
        if attachments.contains(AttachmentFlags::COLOUR) {
            let mut colour =
                Texture::with_descriptor(ctx, &TextureDataDescriptor::rgba8(width, height))?;
            colour.set_parameters(ctx, TextureParameters::linear_clamped());
            frame.attach_texture(ctx, FrameAttachment::Colour, colour)?;
        }
        if attachments.contains(AttachmentFlags::DEPTH) {
            let depth = RenderBuffer::new(ctx, &TextureDataDescriptor::depth32f(width, height))?;
            frame.attach_render_buffer(ctx, FrameAttachment::Depth, depth)?;
        }
        log::debug!(
            "Created offscreen {} ({}x{}, {:?})",
            frame.name,
            width,
            height,
            attachments
        );
        Ok(frame)
    }

    /// Backend name.
    pub fn name(&self) -> FramebufferName {
        self.name
    }

    /// Attach a texture, replacing whatever occupied the slot.
    ///
    /// # Errors
    ///
    /// Returns [`GraphicsError::InvalidParameter`] if the texture has no
    /// storage or its format does not suit the slot.
    pub fn attach_texture(
        &mut self,
        ctx: &GraphicsContext,
        attachment: FrameAttachment,
        texture: Texture,
    ) -> Result<(), GraphicsError> {
        let target = AttachmentTarget::Texture(texture);
        check_attachment(attachment, &target)?;
        if let AttachmentTarget::Texture(texture) = &target {
            ctx.backend()
                .attach_texture(self.name, attachment, texture.name())?;
        }
        self.attachments.insert(attachment, target);
        Ok(())
    }

    /// Attach a render buffer, replacing whatever occupied the slot.
    ///
    /// # Errors
    ///
    /// Returns [`GraphicsError::InvalidParameter`] if the render buffer's
    /// format does not suit the slot.
    pub fn attach_render_buffer(
        &mut self,
        ctx: &GraphicsContext,
        attachment: FrameAttachment,
        render_buffer: RenderBuffer,
    ) -> Result<(), GraphicsError> {
        let target = AttachmentTarget::RenderBuffer(render_buffer);
        check_attachment(attachment, &target)?;
        if let AttachmentTarget::RenderBuffer(render_buffer) = &target {
            ctx.backend()
                .attach_renderbuffer(self.name, attachment, render_buffer.name())?;
        }
        self.attachments.insert(attachment, target);
        Ok(())
    }

    /// What occupies `attachment`.
    pub fn attachment(&self, attachment: FrameAttachment) -> Option<&AttachmentTarget> {
        self.attachments.get(&attachment)
    }

    /// Texture attached to `attachment`, if the slot holds a texture.
    pub fn texture(&self, attachment: FrameAttachment) -> Option<&Texture> {
        match self.attachments.get(&attachment)? {
            AttachmentTarget::Texture(texture) => Some(texture),
            AttachmentTarget::RenderBuffer(_) => None,
        }
    }

    /// Kinds of attachments present.
    pub fn attachment_flags(&self) -> AttachmentFlags {
        self.attachments
            .keys()
            .fold(AttachmentFlags::empty(), |flags, attachment| {
                if attachment.is_colour() {
                    flags | AttachmentFlags::COLOUR
                } else {
                    flags | AttachmentFlags::DEPTH
                }
            })
    }

    /// Size shared by the attachments, `None` without attachments.
    pub fn size(&self) -> Option<(u32, u32)> {
        self.attachments
            .values()
            .find_map(AttachmentTarget::descriptor)
            .map(|d| (d.width, d.height))
    }

    /// True if the backend can draw into this framebuffer.
    pub fn is_complete(&self) -> bool {
        self.backend.is_framebuffer_complete(self.name)
    }

    /// Make this the draw framebuffer.
    pub fn bind(&self, ctx: &mut GraphicsContext) {
        ctx.bindings_mut().bind_framebuffer(Some(self.name));
    }

    /// Restore the default framebuffer if this one is bound.
    pub fn unbind(&self, ctx: &mut GraphicsContext) {
        if ctx.bindings().framebuffer() == Some(self.name) {
            ctx.bindings_mut().bind_framebuffer(None);
        }
    }
}

fn check_attachment(
    attachment: FrameAttachment,
    target: &AttachmentTarget,
) -> Result<(), GraphicsError> {
    let Some(descriptor) = target.descriptor() else {
        return Err(GraphicsError::InvalidParameter(format!(
            "{attachment:?} attachment has no storage"
        )));
    };
    if attachment.is_colour() == descriptor.internal_format.is_depth() {
        return Err(GraphicsError::InvalidParameter(format!(
            "{:?} format cannot be used as the {attachment:?} attachment",
            descriptor.internal_format
        )));
    }
    Ok(())
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("name", &self.name)
            .field("attachments", &self.attachments)
            .finish()
    }
}

impl Drop for Frame {
    fn drop(&mut self) {
        self.backend.delete_framebuffer(self.name);
    }
}

static_assertions::assert_not_impl_any!(Frame: Send, Sync, Clone);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendType;
    use crate::context::ContextParameters;

    fn context() -> GraphicsContext {
        GraphicsContext::new(ContextParameters::default().with_backend(BackendType::Dummy))
            .unwrap()
    }

    #[test]
    fn test_offscreen_colour_and_depth() {
        let ctx = context();
        let frame = Frame::offscreen(
            &ctx,
            16,
            8,
            AttachmentFlags::COLOUR | AttachmentFlags::DEPTH,
        )
        .unwrap();
        assert!(frame.is_complete());
        assert_eq!(frame.size(), Some((16, 8)));
        assert_eq!(
            frame.attachment_flags(),
            AttachmentFlags::COLOUR | AttachmentFlags::DEPTH
        );
        let colour = frame.texture(FrameAttachment::Colour).unwrap();
        assert_eq!(*colour.parameters(), TextureParameters::linear_clamped());
        assert!(frame.texture(FrameAttachment::Depth).is_none());
        assert!(matches!(
            frame.attachment(FrameAttachment::Depth),
            Some(AttachmentTarget::RenderBuffer(_))
        ));
    }

    #[test]
    fn test_offscreen_rejects_empty() {
        let ctx = context();
        assert!(Frame::offscreen(&ctx, 16, 8, AttachmentFlags::empty()).is_err());
        assert!(Frame::offscreen(&ctx, 0, 8, AttachmentFlags::COLOUR).is_err());
    }

    #[test]
    fn test_attachment_format_checks() {
        let ctx = context();
        let mut frame = Frame::new(&ctx).unwrap();
        assert!(!frame.is_complete());
        assert_eq!(frame.size(), None);

        let depth = RenderBuffer::new(&ctx, &TextureDataDescriptor::depth32f(4, 4)).unwrap();
        assert!(
            frame
                .attach_render_buffer(&ctx, FrameAttachment::Colour, depth)
                .is_err()
        );

        let empty = Texture::new(&ctx).unwrap();
        assert!(
            frame
                .attach_texture(&ctx, FrameAttachment::ExtraColour1, empty)
                .is_err()
        );

        let colour = Texture::with_descriptor(&ctx, &TextureDataDescriptor::rgba8(4, 4)).unwrap();
        frame
            .attach_texture(&ctx, FrameAttachment::ExtraColour1, colour)
            .unwrap();
        assert!(frame.is_complete());
        assert_eq!(frame.attachment_flags(), AttachmentFlags::COLOUR);
    }

    #[test]
    fn test_bind_and_unbind() {
        let mut ctx = context();
        let frame = Frame::offscreen(&ctx, 4, 4, AttachmentFlags::COLOUR).unwrap();
        frame.bind(&mut ctx);
        assert_eq!(ctx.bindings().framebuffer(), Some(frame.name()));
        frame.unbind(&mut ctx);
        assert_eq!(ctx.bindings().framebuffer(), None);
    }
}
