//! Graphics device.
//!
//! The [`Device`] owns the [`GraphicsContext`] and the shader library, and
//! turns declarative [`RendererBuilder`]s into live [`Renderer`]s.

use std::rc::Rc;

use crate::backend::BackendType;
use crate::context::{ContextParameters, GraphicsContext};
use crate::error::GraphicsError;
use crate::renderer::{Renderer, RendererBuilder};
use crate::shader::{
    DEFAULT_SHADER_SOURCE, Shader, ShaderBuilder, ShaderHandle, ShaderLibrary, ShaderStage,
};
use crate::types::RenderSettings;

/// Parameters used to create a [`Device`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceBuilder {
    context: ContextParameters,
    default_shader: Option<ShaderBuilder>,
}

impl Default for DeviceBuilder {
    fn default() -> Self {
        Self {
            context: ContextParameters::default().with_label("Garnet Device"),
            default_shader: None,
        }
    }
}

impl DeviceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select the backend.
    pub fn with_backend(mut self, backend: BackendType) -> Self {
        self.context = self.context.with_backend(backend);
        self
    }

    /// Set the debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.context = self.context.with_label(label);
        self
    }

    /// Set the render settings renderers start with.
    pub fn with_settings(mut self, settings: RenderSettings) -> Self {
        self.context = self.context.with_settings(settings);
        self
    }

    /// Replace the built-in default shader.
    pub fn with_default_shader(mut self, shader: ShaderBuilder) -> Self {
        self.default_shader = Some(shader);
        self
    }

    /// Create the context, then the default shader.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be initialized or the default
    /// shader does not build.
    pub fn build(self) -> Result<Device, GraphicsError> {
        let context = GraphicsContext::new(self.context)?;
        Device::from_context(context, self.default_shader)
    }
}

/// Entry point for shader and renderer creation.
///
/// # Example
///
/// ```ignore
/// let mut device = DeviceBuilder::new().with_backend(BackendType::Dummy).build()?;
/// let lit = device.create_shader(
///     &ShaderBuilder::new()
///         .set_shader_file(ShaderStage::Vertex, "shaders/lit.wgsl")?
///         .set_shader_file(ShaderStage::Fragment, "shaders/lit.wgsl")?,
/// )?;
/// ```
pub struct Device {
    shaders: ShaderLibrary,
    context: GraphicsContext,
}

impl Device {
    /// Create a device with default parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be initialized.
    pub fn new() -> Result<Self, GraphicsError> {
        DeviceBuilder::new().build()
    }

    /// Wrap an existing context. `default_shader` replaces the built-in
    /// default shader when given.
    ///
    /// # Errors
    ///
    /// Returns an error if the default shader does not build.
    pub fn from_context(
        context: GraphicsContext,
        default_shader: Option<ShaderBuilder>,
    ) -> Result<Self, GraphicsError> {
        let default_shader = default_shader.unwrap_or_else(|| {
            ShaderBuilder::new()
                .set_shader_source(ShaderStage::Vertex, DEFAULT_SHADER_SOURCE)
                .set_shader_source(ShaderStage::Fragment, DEFAULT_SHADER_SOURCE)
                .with_label("default")
        });
        let shader = default_shader.build(&context)?;
        log::info!(
            "Device '{}' created on the {} backend",
            context.label(),
            context.backend_name()
        );
        Ok(Self {
            shaders: ShaderLibrary::new(shader),
            context,
        })
    }

    pub fn context(&self) -> &GraphicsContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut GraphicsContext {
        &mut self.context
    }

    pub fn shaders(&self) -> &ShaderLibrary {
        &self.shaders
    }

    /// Shader for `handle`, the default shader if the handle is unknown.
    pub fn shader(&self, handle: ShaderHandle) -> &Rc<Shader> {
        self.shaders.get(handle)
    }

    /// Build a shader and add it to the library.
    ///
    /// # Errors
    ///
    /// Returns [`GraphicsError::ShaderCreationFailed`] if the stages are
    /// incomplete or the backend rejects the sources.
    pub fn create_shader(&mut self, builder: &ShaderBuilder) -> Result<ShaderHandle, GraphicsError> {
        let shader = builder.build(&self.context)?;
        Ok(self.shaders.add(shader))
    }

    /// Validate `builder` and instantiate it.
    ///
    /// Every resource and input is cloned into the renderer, which then
    /// creates its own GPU objects from the clones.
    ///
    /// # Errors
    ///
    /// Returns [`GraphicsError::InvalidRenderer`] if validation fails, or
    /// any error from GPU object creation.
    pub fn create_renderer(&mut self, builder: &RendererBuilder) -> Result<Renderer, GraphicsError> {
        builder.validate()?;
        let handle = builder.shader().unwrap_or_default();
        let shader = Rc::clone(self.shaders.get(handle));
        Renderer::instantiate(&mut self.context, shader, builder)
    }

    /// Draw one frame of `renderer`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the submission.
    pub fn render(&mut self, renderer: &mut Renderer) -> Result<(), GraphicsError> {
        renderer.render(&mut self.context)
    }
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("context", &self.context)
            .field("shaders", &self.shaders.len())
            .finish()
    }
}

static_assertions::assert_not_impl_any!(Device: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::OutputTarget;

    fn device() -> Device {
        DeviceBuilder::new()
            .with_backend(BackendType::Dummy)
            .build()
            .unwrap()
    }

    #[test]
    fn test_default_shader_present() {
        let device = device();
        assert_eq!(device.shaders().len(), 1);
        assert_eq!(device.shader(ShaderHandle::DEFAULT).label(), Some("default"));
        assert_eq!(device.context().backend_name(), "Dummy Backend");
    }

    #[test]
    fn test_create_shader_returns_next_handle() {
        let mut device = device();
        let builder = ShaderBuilder::new()
            .set_shader_source(ShaderStage::Vertex, DEFAULT_SHADER_SOURCE)
            .set_shader_source(ShaderStage::Fragment, DEFAULT_SHADER_SOURCE);
        let handle = device.create_shader(&builder).unwrap();
        assert_eq!(handle.index(), 1);

        let incomplete =
            ShaderBuilder::new().set_shader_source(ShaderStage::Fragment, DEFAULT_SHADER_SOURCE);
        assert!(matches!(
            device.create_shader(&incomplete),
            Err(GraphicsError::ShaderCreationFailed(_))
        ));
    }

    #[test]
    fn test_unknown_shader_falls_back_to_default() {
        let mut device = device();
        let mut builder = RendererBuilder::new();
        builder
            .set_shader(ShaderHandle(7))
            .set_output(OutputTarget::window(4, 4));
        let renderer = device.create_renderer(&builder).unwrap();
        assert!(Rc::ptr_eq(
            renderer.shader(),
            device.shader(ShaderHandle::DEFAULT)
        ));
    }

    #[test]
    fn test_invalid_renderer_rejected() {
        let mut device = device();
        assert!(matches!(
            device.create_renderer(&RendererBuilder::new()),
            Err(GraphicsError::InvalidRenderer(_))
        ));
    }
}
