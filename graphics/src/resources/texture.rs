//! GPU texture resource.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use garnet_core::image::{Image, Pixel};

use crate::backend::{GpuBackend, TextureName};
use crate::context::GraphicsContext;
use crate::error::GraphicsError;
use crate::sentinel::TextureSentinel;
use crate::types::{BindlessTextureHandle, TextureDataDescriptor, TextureParameters};

/// Lifecycle state of a [`Texture`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureState {
    /// No storage allocated.
    Empty,
    /// Storage allocated; can be resized and written.
    Sized,
    /// Promoted to a bindless handle; storage is frozen.
    Terminal,
}

/// A 2D GPU texture.
///
/// Textures move through `Empty -> Sized -> Terminal`. Promotion to
/// [`TextureState::Terminal`] is one-way: it obtains a bindless handle and
/// freezes the storage, so a terminal texture can never be resized again.
///
/// # Example
///
/// ```ignore
/// let mut texture = Texture::from_image(&ctx, &image)?;
/// let handle = texture.make_terminal(&ctx)?;
/// // write `handle` into a shader storage buffer
/// ```
pub struct Texture {
    name: TextureName,
    descriptor: Option<TextureDataDescriptor>,
    handle: Option<BindlessTextureHandle>,
    parameters: TextureParameters,
    backend: Rc<dyn GpuBackend>,
    sentinel: Weak<RefCell<TextureSentinel>>,
}

impl Texture {
    /// Create a texture with no storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot create the texture.
    pub fn new(ctx: &GraphicsContext) -> Result<Self, GraphicsError> {
        let name = ctx.backend().create_texture()?;
        let parameters = TextureParameters::default();
        ctx.backend().set_texture_parameters(name, &parameters);
        Ok(Self {
            name,
            descriptor: None,
            handle: None,
            parameters,
            backend: Rc::clone(ctx.backend()),
            sentinel: Weak::new(),
        })
    }

    /// Create a texture with storage for `descriptor`.
    ///
    /// # Errors
    ///
    /// Returns an error if creation or allocation fails.
    pub fn with_descriptor(
        ctx: &GraphicsContext,
        descriptor: &TextureDataDescriptor,
    ) -> Result<Self, GraphicsError> {
        let mut texture = Self::new(ctx)?;
        texture.resize(ctx, descriptor)?;
        Ok(texture)
    }

    /// Create a texture holding a copy of `image`.
    ///
    /// # Errors
    ///
    /// Returns an error if creation or upload fails.
    pub fn from_image<P: Pixel>(
        ctx: &GraphicsContext,
        image: &Image<P>,
    ) -> Result<Self, GraphicsError> {
        let mut texture = Self::new(ctx)?;
        texture.set_data(ctx, image)?;
        Ok(texture)
    }

    /// Backend name.
    pub fn name(&self) -> TextureName {
        self.name
    }

    /// Current lifecycle state.
    pub fn state(&self) -> TextureState {
        match (self.descriptor, self.handle) {
            (_, Some(_)) => TextureState::Terminal,
            (Some(_), None) => TextureState::Sized,
            (None, None) => TextureState::Empty,
        }
    }

    /// True once the texture holds a bindless handle.
    pub fn is_terminal(&self) -> bool {
        self.handle.is_some()
    }

    /// Descriptor of the current storage.
    pub fn descriptor(&self) -> Option<&TextureDataDescriptor> {
        self.descriptor.as_ref()
    }

    /// Width in pixels, 0 when empty.
    pub fn width(&self) -> u32 {
        self.descriptor.map_or(0, |d| d.width)
    }

    /// Height in pixels, 0 when empty.
    pub fn height(&self) -> u32 {
        self.descriptor.map_or(0, |d| d.height)
    }

    /// Number of pixels in the storage.
    pub fn size(&self) -> usize {
        self.descriptor.map_or(0, |d| d.pixel_count())
    }

    /// True if the texture has no pixels.
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Sampling parameters.
    pub fn parameters(&self) -> &TextureParameters {
        &self.parameters
    }

    /// Reallocate storage for `descriptor`. Previous contents are undefined
    /// afterwards.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot allocate the storage.
    ///
    /// # Panics
    ///
    /// Panics if the texture is terminal.
    pub fn resize(
        &mut self,
        ctx: &GraphicsContext,
        descriptor: &TextureDataDescriptor,
    ) -> Result<(), GraphicsError> {
        assert!(
            !self.is_terminal(),
            "Texture::resize: {} is terminal and cannot be resized",
            self.name
        );
        ctx.backend().allocate_texture(self.name, descriptor)?;
        self.descriptor = Some(*descriptor);
        Ok(())
    }

    /// Promote the texture to a bindless handle and register it with the
    /// context's sentinel.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot make the texture resident.
    ///
    /// # Panics
    ///
    /// Panics if the texture is already terminal or has no storage.
    pub fn make_terminal(
        &mut self,
        ctx: &GraphicsContext,
    ) -> Result<BindlessTextureHandle, GraphicsError> {
        assert!(
            !self.is_terminal(),
            "Texture::make_terminal: {} is already terminal",
            self.name
        );
        assert!(
            self.descriptor.is_some(),
            "Texture::make_terminal: {} has no storage",
            self.name
        );
        let handle = ctx.backend().make_texture_resident(self.name)?;
        ctx.sentinel_cell().borrow_mut().register(self.name, handle);
        self.sentinel = Rc::downgrade(ctx.sentinel_cell());
        self.handle = Some(handle);
        Ok(handle)
    }

    /// Bindless handle of a terminal texture.
    ///
    /// # Panics
    ///
    /// Panics if the texture is not terminal.
    pub fn terminal_handle(&self) -> BindlessTextureHandle {
        match self.handle {
            Some(handle) => handle,
            None => panic!(
                "Texture::terminal_handle: {} is not terminal ({:?})",
                self.name,
                self.state()
            ),
        }
    }

    /// Upload a whole image, resizing first if its shape differs from the
    /// current storage.
    ///
    /// # Errors
    ///
    /// Returns an error if allocation or upload fails.
    ///
    /// # Panics
    ///
    /// Panics if a resize is needed and the texture is terminal.
    pub fn set_data<P: Pixel>(
        &mut self,
        ctx: &GraphicsContext,
        image: &Image<P>,
    ) -> Result<(), GraphicsError> {
        let wanted = TextureDataDescriptor::for_pixel::<P>(image.width(), image.height());
        let descriptor = match self.descriptor {
            Some(current) if holds_same_data(&current, &wanted) => current,
            _ => {
                self.resize(ctx, &wanted)?;
                wanted
            }
        };
        ctx.backend()
            .write_texture(self.name, &descriptor, image.as_bytes())
    }

    /// Upload raw texel bytes laid out as `descriptor` describes, resizing
    /// first unless the storage already has exactly that shape.
    ///
    /// # Panics
    ///
    /// Panics if a resize is needed and the texture is terminal.
    pub(crate) fn write_bytes(
        &mut self,
        ctx: &GraphicsContext,
        descriptor: &TextureDataDescriptor,
        bytes: &[u8],
    ) -> Result<(), GraphicsError> {
        let reuse = self
            .descriptor
            .is_some_and(|current| current.same_shape(descriptor));
        if !reuse {
            self.resize(ctx, descriptor)?;
        }
        ctx.backend().write_texture(self.name, descriptor, bytes)
    }

    /// Download the whole storage as an image of pixel type `P`.
    ///
    /// # Errors
    ///
    /// Returns [`GraphicsError::InvalidParameter`] if `P` does not match the
    /// texture's format, or any backend read error.
    ///
    /// # Panics
    ///
    /// Panics if the texture has no storage.
    pub fn get_data<P: Pixel>(&self, ctx: &GraphicsContext) -> Result<Image<P>, GraphicsError> {
        let Some(descriptor) = self.descriptor else {
            panic!("Texture::get_data: {} has no storage", self.name);
        };
        let wanted = TextureDataDescriptor::for_pixel::<P>(descriptor.width, descriptor.height);
        if !holds_same_data(&descriptor, &wanted) {
            return Err(GraphicsError::InvalidParameter(format!(
                "Texture::get_data: {} holds {:?}/{:?}, requested {:?}/{:?}",
                self.name,
                descriptor.format,
                descriptor.component_type,
                wanted.format,
                wanted.component_type
            )));
        }
        let bytes = ctx.backend().read_texture(self.name, &descriptor)?;
        Image::from_bytes(descriptor.width, descriptor.height, &bytes).ok_or_else(|| {
            GraphicsError::InvalidParameter(format!(
                "Texture::get_data: {} returned {} bytes for a {}x{} image",
                self.name,
                bytes.len(),
                descriptor.width,
                descriptor.height
            ))
        })
    }

    /// Replace the sampling parameters.
    pub fn set_parameters(&mut self, ctx: &GraphicsContext, parameters: TextureParameters) {
        ctx.backend().set_texture_parameters(self.name, &parameters);
        self.parameters = parameters;
    }

    /// Bind the texture to a texture unit.
    ///
    /// # Panics
    ///
    /// Panics if `unit` is not below [`MAX_TEXTURE_UNITS`](crate::binding::MAX_TEXTURE_UNITS).
    pub fn bind(&self, ctx: &mut GraphicsContext, unit: u32) {
        ctx.bindings_mut().bind_texture(unit, Some(self.name));
    }

    /// Clear a texture unit if this texture is bound to it.
    pub fn unbind(&self, ctx: &mut GraphicsContext, unit: u32) {
        if ctx.bindings().texture(unit) == Some(self.name) {
            ctx.bindings_mut().bind_texture(unit, None);
        }
    }
}

/// True if `wanted` describes the same texel layout and dimensions as `current`.
fn holds_same_data(current: &TextureDataDescriptor, wanted: &TextureDataDescriptor) -> bool {
    current.format == wanted.format
        && current.component_type == wanted.component_type
        && current.width == wanted.width
        && current.height == wanted.height
}

impl std::fmt::Debug for Texture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Texture")
            .field("name", &self.name)
            .field("state", &self.state())
            .field("descriptor", &self.descriptor)
            .field("handle", &self.handle)
            .finish()
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        if let Some(handle) = self.handle {
            if let Some(sentinel) = self.sentinel.upgrade() {
                match sentinel.try_borrow_mut() {
                    Ok(mut sentinel) => {
                        sentinel.unregister(self.name);
                    }
                    Err(_) => log::warn!(
                        "Texture {} dropped while the sentinel is borrowed; handle {:#x} left registered",
                        self.name,
                        handle.value()
                    ),
                }
            }
            self.backend.make_texture_non_resident(handle);
        }
        self.backend.delete_texture(self.name);
    }
}

static_assertions::assert_not_impl_any!(Texture: Send, Sync, Clone);
