//! wgpu GPU backend implementation.
//!
//! This backend uses wgpu for cross-platform GPU access, supporting
//! Vulkan, Metal, DX12, and WebGPU. It runs headless: the default
//! framebuffer is an offscreen colour and depth target sized to the
//! viewport of the submission that draws into it.
//!
//! wgpu has no vertex array objects or bindless textures. Vertex arrays are
//! bookkeeping only since every [`DrawCall`](super::DrawCall) carries its
//! own layout, and bindless handles are registry ids that identify a
//! resident texture.

pub(crate) mod conversion;
mod pass_encoding;
mod resources;

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::error::GraphicsError;
use crate::shader::{ShaderSource, ShaderStage};
use crate::types::{
    BindlessTextureHandle, BufferTarget, FrameAttachment, TextureDataDescriptor,
    TextureParameters,
};

use super::{
    BufferName, DrawSubmission, FramebufferName, GpuBackend, ProgramName, RenderbufferName,
    TextureName, VertexArrayName,
};

/// First bindless handle value handed out.
const FIRST_BINDLESS_HANDLE: u64 = 0x1_0000_0000;

struct WgpuBuffer {
    target: BufferTarget,
    /// `None` until data is written. Sized to the data rounded up to 4 bytes.
    buffer: Option<wgpu::Buffer>,
    len: usize,
}

struct TextureStorage {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    format: wgpu::TextureFormat,
    descriptor: TextureDataDescriptor,
}

#[derive(Default)]
struct WgpuTexture {
    storage: Option<TextureStorage>,
    parameters: TextureParameters,
    resident: Option<BindlessTextureHandle>,
}

#[derive(Debug, Clone, Copy)]
enum WgpuAttachment {
    Texture(TextureName),
    Renderbuffer(RenderbufferName),
}

struct WgpuProgram {
    stages: Vec<(ShaderStage, wgpu::ShaderModule, String)>,
}

impl WgpuProgram {
    fn stage(&self, stage: ShaderStage) -> Option<(&wgpu::ShaderModule, &str)> {
        self.stages
            .iter()
            .find(|(s, ..)| *s == stage)
            .map(|(_, module, entry)| (module, entry.as_str()))
    }
}

/// Headless stand-in for the window's framebuffer.
struct DefaultTarget {
    width: u32,
    height: u32,
    colour: TextureStorage,
    depth: TextureStorage,
}

#[derive(Default)]
struct WgpuState {
    next_name: u32,
    next_handle: u64,
    buffers: HashMap<BufferName, WgpuBuffer>,
    vertex_arrays: HashSet<VertexArrayName>,
    textures: HashMap<TextureName, WgpuTexture>,
    resident: HashMap<BindlessTextureHandle, TextureName>,
    renderbuffers: HashMap<RenderbufferName, TextureStorage>,
    framebuffers: HashMap<FramebufferName, BTreeMap<FrameAttachment, WgpuAttachment>>,
    programs: HashMap<ProgramName, WgpuProgram>,
    pipelines: HashMap<pass_encoding::PipelineKey, pass_encoding::CachedPipeline>,
    default_target: Option<DefaultTarget>,
}

impl WgpuState {
    fn allocate_name(&mut self) -> u32 {
        self.next_name += 1;
        self.next_name
    }

    fn attachment_storage(&self, attachment: WgpuAttachment) -> Option<&TextureStorage> {
        match attachment {
            WgpuAttachment::Texture(name) => self.textures.get(&name)?.storage.as_ref(),
            WgpuAttachment::Renderbuffer(name) => self.renderbuffers.get(&name),
        }
    }
}

fn unknown(operation: &str, name: impl std::fmt::Display) -> GraphicsError {
    GraphicsError::InvalidParameter(format!("{operation}: unknown {name}"))
}

/// wgpu-based GPU backend.
pub struct WgpuBackend {
    #[allow(dead_code)]
    instance: wgpu::Instance,
    adapter: wgpu::Adapter,
    device: wgpu::Device,
    queue: wgpu::Queue,
    state: RefCell<WgpuState>,
}

impl std::fmt::Debug for WgpuBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WgpuBackend")
            .field("adapter", &self.adapter.get_info().name)
            .finish()
    }
}

impl WgpuBackend {
    /// Create a new wgpu backend on the best available adapter.
    ///
    /// # Errors
    ///
    /// Returns [`GraphicsError::InitializationFailed`] if no adapter is found
    /// or the device cannot be created.
    pub fn new() -> Result<Self, GraphicsError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            flags: wgpu::InstanceFlags::default(),
            backend_options: wgpu::BackendOptions::default(),
            memory_budget_thresholds: wgpu::MemoryBudgetThresholds::default(),
        });

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .map_err(|e| {
            GraphicsError::InitializationFailed(format!("No compatible GPU adapter: {e}"))
        })?;

        log::info!("wgpu adapter: {:?}", adapter.get_info());

        // Wireframe needs line polygon mode; enable it where the adapter has it.
        let required_features = adapter.features() & wgpu::Features::POLYGON_MODE_LINE;

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("Garnet Device"),
            required_features,
            required_limits: wgpu::Limits::default(),
            memory_hints: wgpu::MemoryHints::default(),
            experimental_features: wgpu::ExperimentalFeatures::default(),
            trace: wgpu::Trace::Off,
        }))
        .map_err(|e| GraphicsError::InitializationFailed(format!("Device creation failed: {e}")))?;

        Ok(Self {
            instance,
            adapter,
            device,
            queue,
            state: RefCell::new(WgpuState {
                next_handle: FIRST_BINDLESS_HANDLE,
                ..Default::default()
            }),
        })
    }

    /// Get the wgpu adapter.
    pub fn adapter(&self) -> &wgpu::Adapter {
        &self.adapter
    }

    /// Get the wgpu device.
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    /// Get the wgpu queue.
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Block until all submitted work is done.
    fn wait_idle(&self) {
        let _ = self.device.poll(wgpu::PollType::wait_indefinitely());
    }
}

impl GpuBackend for WgpuBackend {
    fn name(&self) -> &'static str {
        "wgpu Backend"
    }

    fn create_buffer(&self, target: BufferTarget) -> Result<BufferName, GraphicsError> {
        let mut state = self.state.borrow_mut();
        let name = BufferName(state.allocate_name());
        state.buffers.insert(
            name,
            WgpuBuffer {
                target,
                buffer: None,
                len: 0,
            },
        );
        log::trace!("WgpuBackend: created {} ({:?})", name, target);
        Ok(name)
    }

    fn write_buffer(&self, buffer: BufferName, data: &[u8]) -> Result<(), GraphicsError> {
        let mut state = self.state.borrow_mut();
        let entry = state
            .buffers
            .get_mut(&buffer)
            .ok_or_else(|| unknown("write_buffer", buffer))?;
        self.replace_buffer_store(buffer, entry, data);
        Ok(())
    }

    fn read_buffer(&self, buffer: BufferName) -> Result<Vec<u8>, GraphicsError> {
        let state = self.state.borrow();
        let entry = state
            .buffers
            .get(&buffer)
            .ok_or_else(|| unknown("read_buffer", buffer))?;
        log::trace!("WgpuBackend: reading {} ({} bytes)", buffer, entry.len);
        match &entry.buffer {
            Some(wgpu_buffer) => self.read_buffer_store(wgpu_buffer, entry.len),
            None => Ok(Vec::new()),
        }
    }

    fn delete_buffer(&self, buffer: BufferName) {
        if let Some(entry) = self.state.borrow_mut().buffers.remove(&buffer)
            && let Some(wgpu_buffer) = entry.buffer
        {
            wgpu_buffer.destroy();
        }
        log::trace!("WgpuBackend: deleted {}", buffer);
    }

    fn create_vertex_array(&self) -> Result<VertexArrayName, GraphicsError> {
        let mut state = self.state.borrow_mut();
        let name = VertexArrayName(state.allocate_name());
        state.vertex_arrays.insert(name);
        log::trace!("WgpuBackend: created {}", name);
        Ok(name)
    }

    fn delete_vertex_array(&self, vertex_array: VertexArrayName) {
        self.state.borrow_mut().vertex_arrays.remove(&vertex_array);
        log::trace!("WgpuBackend: deleted {}", vertex_array);
    }

    fn create_texture(&self) -> Result<TextureName, GraphicsError> {
        let mut state = self.state.borrow_mut();
        let name = TextureName(state.allocate_name());
        state.textures.insert(name, WgpuTexture::default());
        log::trace!("WgpuBackend: created {}", name);
        Ok(name)
    }

    fn allocate_texture(
        &self,
        texture: TextureName,
        descriptor: &TextureDataDescriptor,
    ) -> Result<(), GraphicsError> {
        let storage = self.create_texture_storage(
            descriptor,
            wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_DST
                | wgpu::TextureUsages::COPY_SRC
                | wgpu::TextureUsages::RENDER_ATTACHMENT,
        )?;
        let mut state = self.state.borrow_mut();
        let entry = state
            .textures
            .get_mut(&texture)
            .ok_or_else(|| unknown("allocate_texture", texture))?;
        if entry.resident.is_some() {
            return Err(GraphicsError::InvalidParameter(format!(
                "allocate_texture: {texture} is resident"
            )));
        }
        if let Some(old) = entry.storage.replace(storage) {
            old.texture.destroy();
        }
        log::trace!(
            "WgpuBackend: allocated {} ({}x{} {:?})",
            texture,
            descriptor.width,
            descriptor.height,
            descriptor.internal_format
        );
        Ok(())
    }

    fn write_texture(
        &self,
        texture: TextureName,
        descriptor: &TextureDataDescriptor,
        data: &[u8],
    ) -> Result<(), GraphicsError> {
        let state = self.state.borrow();
        let storage = state
            .textures
            .get(&texture)
            .ok_or_else(|| unknown("write_texture", texture))?
            .storage
            .as_ref()
            .ok_or_else(|| {
                GraphicsError::InvalidParameter(format!("write_texture: {texture} has no storage"))
            })?;
        check_transfer("write_texture", storage, descriptor, data.len())?;
        self.write_texture_store(storage, data);
        log::trace!("WgpuBackend: wrote {} bytes to {}", data.len(), texture);
        Ok(())
    }

    fn read_texture(
        &self,
        texture: TextureName,
        descriptor: &TextureDataDescriptor,
    ) -> Result<Vec<u8>, GraphicsError> {
        let state = self.state.borrow();
        let storage = state
            .textures
            .get(&texture)
            .ok_or_else(|| unknown("read_texture", texture))?
            .storage
            .as_ref()
            .ok_or_else(|| {
                GraphicsError::InvalidParameter(format!("read_texture: {texture} has no storage"))
            })?;
        check_transfer("read_texture", storage, descriptor, descriptor.size_bytes())?;
        log::trace!("WgpuBackend: reading {}", texture);
        self.read_texture_store(storage)
    }

    fn set_texture_parameters(&self, texture: TextureName, parameters: &TextureParameters) {
        if let Some(entry) = self.state.borrow_mut().textures.get_mut(&texture) {
            entry.parameters = *parameters;
        }
        log::trace!("WgpuBackend: {} parameters {:?}", texture, parameters);
    }

    fn delete_texture(&self, texture: TextureName) {
        let mut state = self.state.borrow_mut();
        if let Some(entry) = state.textures.remove(&texture) {
            if let Some(handle) = entry.resident {
                state.resident.remove(&handle);
            }
            if let Some(storage) = entry.storage {
                storage.texture.destroy();
            }
        }
        log::trace!("WgpuBackend: deleted {}", texture);
    }

    fn make_texture_resident(
        &self,
        texture: TextureName,
    ) -> Result<BindlessTextureHandle, GraphicsError> {
        let mut state = self.state.borrow_mut();
        let next = BindlessTextureHandle(state.next_handle);
        let entry = state
            .textures
            .get_mut(&texture)
            .ok_or_else(|| unknown("make_texture_resident", texture))?;
        if entry.storage.is_none() {
            return Err(GraphicsError::InvalidParameter(format!(
                "make_texture_resident: {texture} has no storage"
            )));
        }
        if let Some(handle) = entry.resident {
            return Ok(handle);
        }
        entry.resident = Some(next);
        state.next_handle += 1;
        state.resident.insert(next, texture);
        log::trace!("WgpuBackend: {} resident as {:#x}", texture, next.value());
        Ok(next)
    }

    fn make_texture_non_resident(&self, handle: BindlessTextureHandle) {
        let mut state = self.state.borrow_mut();
        if let Some(texture) = state.resident.remove(&handle)
            && let Some(entry) = state.textures.get_mut(&texture)
        {
            entry.resident = None;
        }
        log::trace!("WgpuBackend: {:#x} non-resident", handle.value());
    }

    fn create_renderbuffer(
        &self,
        descriptor: &TextureDataDescriptor,
    ) -> Result<RenderbufferName, GraphicsError> {
        let storage =
            self.create_texture_storage(descriptor, wgpu::TextureUsages::RENDER_ATTACHMENT)?;
        let mut state = self.state.borrow_mut();
        let name = RenderbufferName(state.allocate_name());
        state.renderbuffers.insert(name, storage);
        log::trace!("WgpuBackend: created {}", name);
        Ok(name)
    }

    fn delete_renderbuffer(&self, renderbuffer: RenderbufferName) {
        if let Some(storage) = self.state.borrow_mut().renderbuffers.remove(&renderbuffer) {
            storage.texture.destroy();
        }
        log::trace!("WgpuBackend: deleted {}", renderbuffer);
    }

    fn create_framebuffer(&self) -> Result<FramebufferName, GraphicsError> {
        let mut state = self.state.borrow_mut();
        let name = FramebufferName(state.allocate_name());
        state.framebuffers.insert(name, BTreeMap::new());
        log::trace!("WgpuBackend: created {}", name);
        Ok(name)
    }

    fn attach_texture(
        &self,
        framebuffer: FramebufferName,
        attachment: FrameAttachment,
        texture: TextureName,
    ) -> Result<(), GraphicsError> {
        let mut state = self.state.borrow_mut();
        if !state.textures.contains_key(&texture) {
            return Err(unknown("attach_texture", texture));
        }
        state
            .framebuffers
            .get_mut(&framebuffer)
            .ok_or_else(|| unknown("attach_texture", framebuffer))?
            .insert(attachment, WgpuAttachment::Texture(texture));
        log::trace!("WgpuBackend: {} {:?} <- {}", framebuffer, attachment, texture);
        Ok(())
    }

    fn attach_renderbuffer(
        &self,
        framebuffer: FramebufferName,
        attachment: FrameAttachment,
        renderbuffer: RenderbufferName,
    ) -> Result<(), GraphicsError> {
        let mut state = self.state.borrow_mut();
        if !state.renderbuffers.contains_key(&renderbuffer) {
            return Err(unknown("attach_renderbuffer", renderbuffer));
        }
        state
            .framebuffers
            .get_mut(&framebuffer)
            .ok_or_else(|| unknown("attach_renderbuffer", framebuffer))?
            .insert(attachment, WgpuAttachment::Renderbuffer(renderbuffer));
        log::trace!(
            "WgpuBackend: {} {:?} <- {}",
            framebuffer,
            attachment,
            renderbuffer
        );
        Ok(())
    }

    fn is_framebuffer_complete(&self, framebuffer: FramebufferName) -> bool {
        let state = self.state.borrow();
        let Some(attachments) = state.framebuffers.get(&framebuffer) else {
            return false;
        };
        let mut sizes = attachments.values().map(|attachment| {
            state
                .attachment_storage(*attachment)
                .map(|s| (s.descriptor.width, s.descriptor.height))
        });
        match sizes.next() {
            Some(Some(first)) => sizes.all(|size| size == Some(first)),
            _ => false,
        }
    }

    fn delete_framebuffer(&self, framebuffer: FramebufferName) {
        self.state.borrow_mut().framebuffers.remove(&framebuffer);
        log::trace!("WgpuBackend: deleted {}", framebuffer);
    }

    fn create_program(&self, sources: &[ShaderSource]) -> Result<ProgramName, GraphicsError> {
        if !sources.iter().any(|s| s.stage == ShaderStage::Vertex)
            && !sources.iter().any(|s| s.stage == ShaderStage::Compute)
        {
            return Err(GraphicsError::ShaderCreationFailed(
                "create_program: no vertex or compute stage".to_string(),
            ));
        }
        let stages = sources
            .iter()
            .map(|source| {
                let module = self
                    .device
                    .create_shader_module(wgpu::ShaderModuleDescriptor {
                        label: Some(source.entry_point.as_str()),
                        source: wgpu::ShaderSource::Wgsl(source.source.as_str().into()),
                    });
                (source.stage, module, source.entry_point.clone())
            })
            .collect();
        let mut state = self.state.borrow_mut();
        let name = ProgramName(state.allocate_name());
        state.programs.insert(name, WgpuProgram { stages });
        log::trace!("WgpuBackend: created {} from {} stages", name, sources.len());
        Ok(name)
    }

    fn delete_program(&self, program: ProgramName) {
        let mut state = self.state.borrow_mut();
        state.programs.remove(&program);
        state.pipelines.retain(|key, _| key.program != program);
        log::trace!("WgpuBackend: deleted {}", program);
    }

    fn submit(&self, submission: &DrawSubmission) -> Result<(), GraphicsError> {
        let mut state = self.state.borrow_mut();
        self.encode_submission(&mut state, submission)
    }
}

/// Check that a transfer of `len` bytes laid out as `descriptor` matches
/// the texel layout of `storage`.
fn check_transfer(
    operation: &str,
    storage: &TextureStorage,
    descriptor: &TextureDataDescriptor,
    len: usize,
) -> Result<(), GraphicsError> {
    if !storage.descriptor.same_shape(descriptor) {
        return Err(GraphicsError::InvalidParameter(format!(
            "{operation}: descriptor {descriptor:?} does not match storage {:?}",
            storage.descriptor
        )));
    }
    let texel_size = storage.format.block_copy_size(Some(resources::copy_aspect(storage.format)));
    if texel_size != Some(descriptor.bytes_per_pixel() as u32) {
        return Err(GraphicsError::InvalidParameter(format!(
            "{operation}: {:?} pixels cannot be copied to {:?} texels",
            descriptor.format, storage.format
        )));
    }
    if len != descriptor.size_bytes() {
        return Err(GraphicsError::InvalidParameter(format!(
            "{operation}: expected {} bytes, got {len}",
            descriptor.size_bytes()
        )));
    }
    Ok(())
}
