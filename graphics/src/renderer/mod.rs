//! Renderers: declared by a [`RendererBuilder`], instantiated by a
//! [`Device`](crate::device::Device), drawn once per frame.
//!
//! A renderer owns a deep copy of every resource and input its builder
//! declared, plus the GPU objects created from those copies. Nothing is
//! shared with the builder, so editing the builder afterwards never reaches
//! a live renderer.
//!
//! # Example
//!
//! ```ignore
//! let mut builder = RendererBuilder::new();
//! let data = builder.add_resource(BufferResource::new(BufferKind::Storage, 0, vec![1, 2, 3, 4, 5]));
//! builder.set_shader(ShaderHandle::DEFAULT).set_output(OutputTarget::window(800, 600));
//!
//! let mut renderer = device.create_renderer(&builder)?;
//! renderer.set_clear_colour(ClearColor::new(0.1, 0.1, 0.1, 1.0));
//! loop {
//!     renderer.render(device.context_mut())?;
//! }
//! ```

pub mod builder;
pub mod input;
pub mod output;
pub mod resource;

use std::rc::Rc;

use crate::backend::{BufferBinding, DrawCall, DrawSubmission, TextureBinding};
use crate::context::GraphicsContext;
use crate::error::GraphicsError;
use crate::resources::{Buffer, Frame, Texture, VertexObject};
use crate::shader::Shader;
use crate::types::{
    BindlessTextureHandle, BufferTarget, ClearColor, FrameAttachment, RenderPassAttachment,
    RenderSettings, Viewport,
};

pub use builder::RendererBuilder;
pub use input::{DataAccess, InputHandle, RendererInput};
pub use output::{OutputKind, OutputTarget};
pub use resource::{
    BufferKind, BufferResource, Resource, ResourceHandle, ResourceType, TextureResource,
};

/// GPU object created from a declared resource.
enum GpuResource {
    Buffer(Buffer),
    Texture(Texture),
}

struct OwnedResource {
    description: Resource,
    gpu: GpuResource,
}

struct OwnedInput {
    description: RendererInput,
    object: VertexObject,
    vertices: usize,
    indices: Option<usize>,
}

/// A live renderer.
pub struct Renderer {
    label: String,
    shader: Rc<Shader>,
    pass: RenderPassAttachment,
    output: OutputTarget,
    frame: Option<Frame>,
    settings: RenderSettings,
    clear_colour: ClearColor,
    resources: Vec<OwnedResource>,
    inputs: Vec<OwnedInput>,
    frame_count: u64,
}

impl Renderer {
    /// Instantiate `builder`. The builder must have passed validation.
    pub(crate) fn instantiate(
        ctx: &mut GraphicsContext,
        shader: Rc<Shader>,
        builder: &RendererBuilder,
    ) -> Result<Self, GraphicsError> {
        let Some(output) = builder.output().copied() else {
            return Err(GraphicsError::InvalidRenderer("no output set".to_string()));
        };
        let label = builder.label().unwrap_or("renderer").to_string();

        let frame = match output.kind() {
            OutputKind::Window => None,
            OutputKind::Offscreen(attachments) => Some(Frame::offscreen(
                ctx,
                output.width(),
                output.height(),
                attachments,
            )?),
        };

        let resources = builder
            .resources()
            .iter()
            .map(|description| {
                let description = description.clone();
                let gpu = create_gpu_resource(ctx, &description)?;
                Ok(OwnedResource { description, gpu })
            })
            .collect::<Result<Vec<_>, GraphicsError>>()?;

        let inputs = builder
            .inputs()
            .iter()
            .map(|description| create_input(ctx, description.clone()))
            .collect::<Result<Vec<_>, GraphicsError>>()?;

        log::debug!(
            "Created renderer '{}' ({} resources, {} inputs, {:?} pass, {}x{})",
            label,
            resources.len(),
            inputs.len(),
            builder.pass(),
            output.width(),
            output.height()
        );

        Ok(Self {
            label,
            shader,
            pass: builder.pass(),
            output,
            frame,
            settings: builder.settings().copied().unwrap_or(*ctx.settings()),
            clear_colour: ClearColor::default(),
            resources,
            inputs,
            frame_count: 0,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Shader the renderer draws with.
    pub fn shader(&self) -> &Rc<Shader> {
        &self.shader
    }

    pub fn pass(&self) -> RenderPassAttachment {
        self.pass
    }

    pub fn output(&self) -> &OutputTarget {
        &self.output
    }

    /// Offscreen frame, `None` when drawing to the window.
    pub fn output_frame(&self) -> Option<&Frame> {
        self.frame.as_ref()
    }

    /// Colour texture of an offscreen output.
    pub fn output_texture(&self) -> Option<&Texture> {
        self.frame.as_ref()?.texture(FrameAttachment::Colour)
    }

    /// The renderer's own copy of a declared resource.
    pub fn get_resource(&self, handle: ResourceHandle) -> Option<&Resource> {
        self.resources.get(handle.0).map(|owned| &owned.description)
    }

    /// The renderer's own copy of a declared input.
    pub fn get_input(&self, handle: InputHandle) -> Option<&RendererInput> {
        self.inputs.get(handle.0).map(|owned| &owned.description)
    }

    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }

    pub fn resource_count_of(&self, resource_type: ResourceType) -> usize {
        self.resources
            .iter()
            .filter(|owned| owned.description.resource_type() == resource_type)
            .count()
    }

    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    pub fn input_count_of(&self, access: DataAccess) -> usize {
        self.inputs
            .iter()
            .filter(|owned| owned.description.access() == access)
            .count()
    }

    /// Colour the output is cleared to each frame. Defaults to transparent
    /// black.
    pub fn clear_colour(&self) -> ClearColor {
        self.clear_colour
    }

    pub fn set_clear_colour(&mut self, colour: ClearColor) {
        self.clear_colour = colour;
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: RenderSettings) {
        self.settings = settings;
    }

    /// Number of frames submitted so far.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Bindless handle of a texture resource declared terminal.
    ///
    /// # Panics
    ///
    /// Panics if `handle` is unknown, is not a texture, or the texture is
    /// not terminal.
    pub fn terminal_handle(&self, handle: ResourceHandle) -> BindlessTextureHandle {
        match &self.owned_resource("terminal_handle", handle).gpu {
            GpuResource::Texture(texture) => texture.terminal_handle(),
            GpuResource::Buffer(buffer) => panic!(
                "Renderer::terminal_handle: resource {} is {}, not a texture",
                handle.0,
                buffer.name()
            ),
        }
    }

    /// Re-upload a dynamic buffer resource.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the upload.
    ///
    /// # Panics
    ///
    /// Panics if `handle` is unknown or not a buffer, the buffer is
    /// [`DataAccess::StaticFixed`], or `data` has a different size.
    pub fn update_buffer(
        &mut self,
        ctx: &mut GraphicsContext,
        handle: ResourceHandle,
        data: &[u8],
    ) -> Result<(), GraphicsError> {
        let count = self.resources.len();
        let Some(owned) = self.resources.get_mut(handle.0) else {
            panic!(
                "Renderer::update_buffer: resource {} out of range ({count} resources)",
                handle.0
            );
        };
        let (Resource::Buffer(description), GpuResource::Buffer(buffer)) =
            (&mut owned.description, &mut owned.gpu)
        else {
            panic!("Renderer::update_buffer: resource {} is not a buffer", handle.0);
        };
        assert!(
            description.access().is_dynamic(),
            "Renderer::update_buffer: resource {} is {:?}",
            handle.0,
            description.access()
        );
        assert_eq!(
            data.len(),
            description.bytes().len(),
            "Renderer::update_buffer: resource {} has a fixed size",
            handle.0
        );
        buffer.set_data(ctx, data)?;
        description.set_data(data);
        Ok(())
    }

    /// Re-upload the vertices of a dynamic input.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the upload.
    ///
    /// # Panics
    ///
    /// Panics if `handle` is unknown, the input is
    /// [`DataAccess::StaticFixed`], or `vertices` has a different size.
    pub fn update_input(
        &mut self,
        ctx: &mut GraphicsContext,
        handle: InputHandle,
        vertices: &[u8],
    ) -> Result<(), GraphicsError> {
        let count = self.inputs.len();
        let Some(owned) = self.inputs.get_mut(handle.0) else {
            panic!(
                "Renderer::update_input: input {} out of range ({count} inputs)",
                handle.0
            );
        };
        assert!(
            owned.description.access().is_dynamic(),
            "Renderer::update_input: input {} is {:?}",
            handle.0,
            owned.description.access()
        );
        assert_eq!(
            vertices.len(),
            owned.description.vertices().len(),
            "Renderer::update_input: input {} has a fixed size",
            handle.0
        );
        owned.object.bind(ctx);
        if let Some(buffer) = owned.object.get_mut(owned.vertices) {
            buffer.set_data(ctx, vertices)?;
        }
        owned.description.set_vertices(vertices);
        Ok(())
    }

    /// Draw one frame: bind the output, the program and every resource,
    /// clear, then draw each input in declaration order.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the submission.
    pub fn render(&mut self, ctx: &mut GraphicsContext) -> Result<(), GraphicsError> {
        match &self.frame {
            Some(frame) => frame.bind(ctx),
            None => ctx.bindings_mut().bind_framebuffer(None),
        }
        self.shader.bind(ctx);

        let mut buffers = Vec::new();
        let mut textures = Vec::new();
        for owned in &self.resources {
            match (&owned.gpu, &owned.description) {
                (GpuResource::Buffer(buffer), _) => {
                    buffer.bind(ctx);
                    if let Some(binding_point) = buffer.binding_point() {
                        buffers.push(BufferBinding {
                            target: buffer.target(),
                            binding_point,
                            buffer: buffer.name(),
                        });
                    }
                }
                (GpuResource::Texture(texture), Resource::Texture(description))
                    if !texture.is_terminal() =>
                {
                    texture.bind(ctx, description.unit());
                    textures.push(TextureBinding {
                        unit: description.unit(),
                        texture: texture.name(),
                        parameters: *texture.parameters(),
                    });
                }
                (GpuResource::Texture(_), _) => {}
            }
        }

        let mut draws = Vec::with_capacity(self.inputs.len());
        for owned in &self.inputs {
            owned.object.bind_child(ctx, owned.vertices);
            let index_buffer = match (owned.indices, owned.description.indices()) {
                (Some(slot), Some((_, format))) => {
                    owned.object.bind_child(ctx, slot);
                    owned.object.get(slot).map(|buffer| (buffer.name(), format))
                }
                _ => None,
            };
            draws.push(DrawCall {
                vertex_buffer: owned.object.get(owned.vertices).map(Buffer::name),
                stride: owned.description.stride(),
                attributes: owned.description.attributes().to_vec(),
                index_buffer,
                element_count: owned.description.element_count(),
            });
        }

        let submission = DrawSubmission {
            framebuffer: ctx.bindings().framebuffer(),
            viewport: Viewport::from_dimensions(self.output.width(), self.output.height()),
            clear_colour: self.clear_colour,
            settings: self.settings,
            program: self.shader.program(),
            buffers,
            textures,
            draws,
        };
        ctx.backend().submit(&submission)?;
        self.frame_count += 1;
        log::trace!("Renderer '{}': frame {}", self.label, self.frame_count);
        Ok(())
    }

    fn owned_resource(&self, operation: &str, handle: ResourceHandle) -> &OwnedResource {
        match self.resources.get(handle.0) {
            Some(owned) => owned,
            None => panic!(
                "Renderer::{operation}: resource {} out of range ({} resources)",
                handle.0,
                self.resources.len()
            ),
        }
    }
}

fn create_gpu_resource(
    ctx: &mut GraphicsContext,
    description: &Resource,
) -> Result<GpuResource, GraphicsError> {
    match description {
        Resource::Buffer(description) => {
            let mut buffer = Buffer::new_indexed(
                ctx,
                description.kind().target(),
                description.binding_point(),
            )?;
            buffer.set_data(ctx, description.bytes())?;
            Ok(GpuResource::Buffer(buffer))
        }
        Resource::Texture(description) => {
            let mut texture = Texture::new(ctx)?;
            texture.write_bytes(ctx, description.descriptor(), description.bytes())?;
            texture.set_parameters(ctx, *description.parameters());
            if description.is_terminal() {
                texture.make_terminal(ctx)?;
            }
            Ok(GpuResource::Texture(texture))
        }
    }
}

fn create_input(
    ctx: &mut GraphicsContext,
    description: RendererInput,
) -> Result<OwnedInput, GraphicsError> {
    let mut object = VertexObject::new(ctx)?;
    object.bind(ctx);
    let vertex_buffer = Buffer::from_data(ctx, BufferTarget::Array, description.vertices())?;
    let vertices = object.add(vertex_buffer);
    let indices = match description.indices() {
        Some((bytes, _)) => {
            let index_buffer = Buffer::from_data(ctx, BufferTarget::Index, bytes)?;
            Some(object.add(index_buffer))
        }
        None => None,
    };
    Ok(OwnedInput {
        description,
        object,
        vertices,
        indices,
    })
}

impl std::fmt::Debug for Renderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Renderer")
            .field("label", &self.label)
            .field("shader", &self.shader.program())
            .field("pass", &self.pass)
            .field("output", &self.output)
            .field("resources", &self.resources.len())
            .field("inputs", &self.inputs.len())
            .field("frame_count", &self.frame_count)
            .finish()
    }
}

static_assertions::assert_not_impl_any!(Renderer: Send, Sync, Clone);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendType;
    use crate::device::{Device, DeviceBuilder};
    use crate::shader::ShaderHandle;
    use crate::types::{AttachmentFlags, VertexFormat};
    use garnet_core::image::{Image, PixelRgba8};

    fn device() -> Device {
        DeviceBuilder::new()
            .with_backend(BackendType::Dummy)
            .build()
            .unwrap()
    }

    fn builder(output: OutputTarget) -> RendererBuilder {
        let mut builder = RendererBuilder::new();
        builder.set_shader(ShaderHandle::DEFAULT).set_output(output);
        builder
    }

    fn triangle() -> RendererInput {
        RendererInput::new(
            &[[0.0f32, 0.5, 0.0], [-0.5, -0.5, 0.0], [0.5, -0.5, 0.0]],
            &[VertexFormat::Float32x3],
        )
    }

    #[test]
    fn test_offscreen_output_is_cleared() {
        let mut device = device();
        let mut renderer = device
            .create_renderer(&builder(OutputTarget::offscreen(
                2,
                2,
                AttachmentFlags::COLOUR,
            )))
            .unwrap();
        renderer.set_clear_colour(ClearColor::WHITE);
        device.render(&mut renderer).unwrap();

        let colour = renderer.output_texture().unwrap();
        let image = colour.get_data::<PixelRgba8>(device.context()).unwrap();
        assert!(image.pixels().iter().all(|p| *p == PixelRgba8::new(255, 255, 255, 255)));
        assert_eq!(renderer.frame_count(), 1);
    }

    #[test]
    fn test_window_output_has_no_frame() {
        let mut device = device();
        let renderer = device
            .create_renderer(&builder(OutputTarget::window(8, 8)))
            .unwrap();
        assert!(renderer.output_frame().is_none());
        assert!(renderer.output_texture().is_none());
    }

    #[test]
    fn test_update_dynamic_buffer() {
        let mut device = device();
        let mut declared = builder(OutputTarget::window(8, 8));
        let handle = declared.add_resource(
            BufferResource::new(BufferKind::Storage, 0, vec![0; 4])
                .with_access(DataAccess::DynamicFixed),
        );
        let mut renderer = device.create_renderer(&declared).unwrap();
        renderer
            .update_buffer(device.context_mut(), handle, &[4, 3, 2, 1])
            .unwrap();
        assert_eq!(renderer.get_resource(handle).unwrap().bytes(), &[4, 3, 2, 1]);
        assert_eq!(declared.resource(handle).unwrap().bytes(), &[0; 4]);
    }

    #[test]
    #[should_panic(expected = "StaticFixed")]
    fn test_update_static_buffer() {
        let mut device = device();
        let mut declared = builder(OutputTarget::window(8, 8));
        let handle = declared.add_resource(BufferResource::new(BufferKind::Uniform, 0, vec![0; 4]));
        let mut renderer = device.create_renderer(&declared).unwrap();
        let _ = renderer.update_buffer(device.context_mut(), handle, &[1; 4]);
    }

    #[test]
    fn test_update_dynamic_input_and_draw() {
        let mut device = device();
        let mut declared = builder(OutputTarget::window(8, 8));
        let handle = declared.add_input(
            triangle()
                .with_indices_u16(&[0, 1, 2])
                .with_access(DataAccess::DynamicFixed),
        );
        declared.add_input(triangle());
        let mut renderer = device.create_renderer(&declared).unwrap();
        assert_eq!(renderer.input_count(), 2);
        assert_eq!(renderer.input_count_of(DataAccess::DynamicFixed), 1);
        assert_eq!(renderer.input_count_of(DataAccess::StaticFixed), 1);

        let moved: Vec<u8> = bytemuck::cast_slice(&[[0.0f32; 3]; 3]).to_vec();
        renderer
            .update_input(device.context_mut(), handle, &moved)
            .unwrap();
        assert_eq!(renderer.get_input(handle).unwrap().vertices(), &moved[..]);
        device.render(&mut renderer).unwrap();
    }

    #[test]
    #[should_panic(expected = "fixed size")]
    fn test_update_input_size_is_fixed() {
        let mut device = device();
        let mut declared = builder(OutputTarget::window(8, 8));
        let handle = declared.add_input(triangle().with_access(DataAccess::DynamicFixed));
        let mut renderer = device.create_renderer(&declared).unwrap();
        let _ = renderer.update_input(device.context_mut(), handle, &[0; 12]);
    }

    #[test]
    fn test_terminal_texture_resource() {
        let mut device = device();
        let image = Image::<PixelRgba8>::new(4, 4);
        let mut declared = builder(OutputTarget::window(8, 8));
        let terminal = declared.add_resource(TextureResource::from_image(0, &image).terminal());
        declared.add_resource(TextureResource::from_image(0, &image));
        let renderer = device.create_renderer(&declared).unwrap();

        let handle = renderer.terminal_handle(terminal);
        assert!(device.context().sentinel().texture_of(handle).is_some());
        assert_eq!(renderer.resource_count_of(ResourceType::Texture), 2);

        drop(renderer);
        assert!(device.context().sentinel().is_empty());
    }

    #[test]
    #[should_panic(expected = "is not terminal")]
    fn test_terminal_handle_of_sampled_texture() {
        let mut device = device();
        let image = Image::<PixelRgba8>::new(1, 1);
        let mut declared = builder(OutputTarget::window(8, 8));
        let sampled = declared.add_resource(TextureResource::from_image(0, &image));
        let renderer = device.create_renderer(&declared).unwrap();
        let _ = renderer.terminal_handle(sampled);
    }
}
