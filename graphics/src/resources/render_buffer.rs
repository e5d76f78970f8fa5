//! Render buffer resource.

use std::rc::Rc;

use crate::backend::{GpuBackend, RenderbufferName};
use crate::context::GraphicsContext;
use crate::error::GraphicsError;
use crate::types::TextureDataDescriptor;

/// Write-only attachment storage.
///
/// Unlike a [`Texture`](super::Texture) a render buffer cannot be sampled or
/// read back; it only serves as a framebuffer attachment, typically for depth.
pub struct RenderBuffer {
    name: RenderbufferName,
    descriptor: TextureDataDescriptor,
    backend: Rc<dyn GpuBackend>,
}

impl RenderBuffer {
    /// Create a render buffer with storage for `descriptor`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot allocate the storage.
    pub fn new(
        ctx: &GraphicsContext,
        descriptor: &TextureDataDescriptor,
    ) -> Result<Self, GraphicsError> {
        if descriptor.pixel_count() == 0 {
            return Err(GraphicsError::InvalidParameter(format!(
                "render buffer size {}x{} is empty",
                descriptor.width, descriptor.height
            )));
        }
        let name = ctx.backend().create_renderbuffer(descriptor)?;
        Ok(Self {
            name,
            descriptor: *descriptor,
            backend: Rc::clone(ctx.backend()),
        })
    }

    /// Backend name.
    pub fn name(&self) -> RenderbufferName {
        self.name
    }

    /// Storage descriptor.
    pub fn descriptor(&self) -> &TextureDataDescriptor {
        &self.descriptor
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.descriptor.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.descriptor.height
    }
}

impl std::fmt::Debug for RenderBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderBuffer")
            .field("name", &self.name)
            .field("descriptor", &self.descriptor)
            .finish()
    }
}

impl Drop for RenderBuffer {
    fn drop(&mut self) {
        self.backend.delete_renderbuffer(self.name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendType;
    use crate::context::ContextParameters;

    #[test]
    fn test_create_render_buffer() {
        let ctx =
            GraphicsContext::new(ContextParameters::default().with_backend(BackendType::Dummy))
                .unwrap();
        let depth = RenderBuffer::new(&ctx, &TextureDataDescriptor::depth32f(64, 32)).unwrap();
        assert_eq!(depth.width(), 64);
        assert_eq!(depth.height(), 32);
        assert!(depth.descriptor().internal_format.is_depth());

        assert!(matches!(
            RenderBuffer::new(&ctx, &TextureDataDescriptor::depth32f(0, 32)),
            Err(GraphicsError::InvalidParameter(_))
        ));
    }
}
