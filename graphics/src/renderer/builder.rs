//! Declarative renderer description.

use std::collections::HashSet;

use crate::binding::MAX_TEXTURE_UNITS;
use crate::error::GraphicsError;
use crate::shader::ShaderHandle;
use crate::types::{RenderPassAttachment, RenderSettings};

use super::input::{InputHandle, RendererInput};
use super::output::OutputTarget;
use super::resource::{Resource, ResourceHandle};

/// Everything a [`Renderer`](super::Renderer) is made from.
///
/// A builder is a plain value that never touches the GPU. It can be kept and
/// modified after [`Device::create_renderer`](crate::device::Device::create_renderer);
/// renderers created earlier hold their own copies of every resource and input.
///
/// # Example
///
/// ```ignore
/// let mut builder = RendererBuilder::new();
/// let material = builder.add_resource(BufferResource::from_slice(
///     BufferKind::Uniform,
///     0,
///     &[SurfaceProperties::default()],
/// ));
/// builder
///     .set_shader(ShaderHandle::DEFAULT)
///     .set_output(OutputTarget::window(1280, 720))
///     .set_pass(RenderPassAttachment::ColourDepth);
/// let renderer = device.create_renderer(&builder)?;
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RendererBuilder {
    resources: Vec<Resource>,
    inputs: Vec<RendererInput>,
    shader: Option<ShaderHandle>,
    output: Option<OutputTarget>,
    pass: RenderPassAttachment,
    settings: Option<RenderSettings>,
    label: Option<String>,
}

impl RendererBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a resource.
    pub fn add_resource(&mut self, resource: impl Into<Resource>) -> ResourceHandle {
        self.resources.push(resource.into());
        ResourceHandle(self.resources.len() - 1)
    }

    /// Declare a vertex input.
    pub fn add_input(&mut self, input: RendererInput) -> InputHandle {
        self.inputs.push(input);
        InputHandle(self.inputs.len() - 1)
    }

    pub fn set_shader(&mut self, shader: ShaderHandle) -> &mut Self {
        self.shader = Some(shader);
        self
    }

    pub fn set_output(&mut self, output: OutputTarget) -> &mut Self {
        self.output = Some(output);
        self
    }

    pub fn set_pass(&mut self, pass: RenderPassAttachment) -> &mut Self {
        self.pass = pass;
        self
    }

    /// Override the context's render settings for this renderer.
    pub fn set_settings(&mut self, settings: RenderSettings) -> &mut Self {
        self.settings = Some(settings);
        self
    }

    pub fn set_label(&mut self, label: impl Into<String>) -> &mut Self {
        self.label = Some(label.into());
        self
    }

    pub fn resource(&self, handle: ResourceHandle) -> Option<&Resource> {
        self.resources.get(handle.0)
    }

    pub fn resource_mut(&mut self, handle: ResourceHandle) -> Option<&mut Resource> {
        self.resources.get_mut(handle.0)
    }

    pub fn input(&self, handle: InputHandle) -> Option<&RendererInput> {
        self.inputs.get(handle.0)
    }

    pub fn input_mut(&mut self, handle: InputHandle) -> Option<&mut RendererInput> {
        self.inputs.get_mut(handle.0)
    }

    /// Declared resources in handle order.
    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    /// Declared inputs in handle order.
    pub fn inputs(&self) -> &[RendererInput] {
        &self.inputs
    }

    pub fn shader(&self) -> Option<ShaderHandle> {
        self.shader
    }

    pub fn output(&self) -> Option<&OutputTarget> {
        self.output.as_ref()
    }

    pub fn pass(&self) -> RenderPassAttachment {
        self.pass
    }

    pub fn settings(&self) -> Option<&RenderSettings> {
        self.settings.as_ref()
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Check that the description can be instantiated.
    ///
    /// # Errors
    ///
    /// Returns [`GraphicsError::InvalidRenderer`] if the shader or output is
    /// missing, the output lacks an attachment the pass writes, the output
    /// is empty, a buffer resource has no data, or two resources claim the same binding point or texture
    /// unit.
    pub fn validate(&self) -> Result<(), GraphicsError> {
        if self.shader.is_none() {
            return Err(GraphicsError::InvalidRenderer("no shader set".to_string()));
        }
        let Some(output) = &self.output else {
            return Err(GraphicsError::InvalidRenderer("no output set".to_string()));
        };
        if !output.supports(self.pass) {
            return Err(GraphicsError::InvalidRenderer(format!(
                "{:?} pass needs {:?}, output provides {:?}",
                self.pass,
                self.pass.required_attachments(),
                output.attachments()
            )));
        }
        if output.width() == 0 || output.height() == 0 {
            return Err(GraphicsError::InvalidRenderer(format!(
                "output size {}x{} is empty",
                output.width(),
                output.height()
            )));
        }

        let mut binding_points = HashSet::new();
        let mut units = HashSet::new();
        for (index, resource) in self.resources.iter().enumerate() {
            match resource {
                Resource::Buffer(buffer) => {
                    if buffer.bytes().is_empty() {
                        return Err(GraphicsError::InvalidRenderer(format!(
                            "resource {index}: {:?} buffer at binding point {} has no data",
                            buffer.kind(),
                            buffer.binding_point()
                        )));
                    }
                    if !binding_points.insert((buffer.kind(), buffer.binding_point())) {
                        return Err(GraphicsError::InvalidRenderer(format!(
                            "resource {index}: {:?} binding point {} is already used",
                            buffer.kind(),
                            buffer.binding_point()
                        )));
                    }
                }
                Resource::Texture(texture) if !texture.is_terminal() => {
                    if texture.unit() >= MAX_TEXTURE_UNITS {
                        return Err(GraphicsError::InvalidRenderer(format!(
                            "resource {index}: texture unit {} out of range (0..{MAX_TEXTURE_UNITS})",
                            texture.unit()
                        )));
                    }
                    if !units.insert(texture.unit()) {
                        return Err(GraphicsError::InvalidRenderer(format!(
                            "resource {index}: texture unit {} is already used",
                            texture.unit()
                        )));
                    }
                }
                Resource::Texture(_) => {}
            }
        }
        Ok(())
    }
}
