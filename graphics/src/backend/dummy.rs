//! Dummy GPU backend for testing and development.
//!
//! This backend doesn't talk to a GPU. It keeps every object in host memory
//! so data written to buffers and textures can be read back, and it clears
//! framebuffer attachments on submit. Draw calls are validated and logged but
//! not rasterized.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::error::GraphicsError;
use crate::shader::{ShaderSource, ShaderStage};
use crate::types::{
    BindlessTextureHandle, BufferTarget, ClearColor, FrameAttachment, TextureComponentType,
    TextureDataDescriptor, TextureFormat, TextureParameters,
};

use super::{
    BufferName, DrawSubmission, FramebufferName, GpuBackend, ProgramName, RenderbufferName,
    TextureName, VertexArrayName,
};

/// First bindless handle value handed out.
const FIRST_BINDLESS_HANDLE: u64 = 0x1_0000_0000;

#[derive(Debug)]
struct DummyBuffer {
    target: BufferTarget,
    data: Vec<u8>,
}

#[derive(Debug, Default)]
struct DummyTexture {
    storage: Option<TextureDataDescriptor>,
    data: Vec<u8>,
    parameters: TextureParameters,
    resident: Option<BindlessTextureHandle>,
}

#[derive(Debug, Clone, Copy)]
enum DummyAttachment {
    Texture(TextureName),
    Renderbuffer(RenderbufferName),
}

#[derive(Debug, Default)]
struct DummyState {
    next_name: u32,
    next_handle: u64,
    buffers: HashMap<BufferName, DummyBuffer>,
    vertex_arrays: HashSet<VertexArrayName>,
    textures: HashMap<TextureName, DummyTexture>,
    resident: HashMap<BindlessTextureHandle, TextureName>,
    renderbuffers: HashMap<RenderbufferName, TextureDataDescriptor>,
    framebuffers: HashMap<FramebufferName, BTreeMap<FrameAttachment, DummyAttachment>>,
    programs: HashSet<ProgramName>,
    submissions: u64,
}

impl DummyState {
    fn allocate_name(&mut self) -> u32 {
        self.next_name += 1;
        self.next_name
    }

    fn attachment_size(&self, attachment: DummyAttachment) -> Option<(u32, u32)> {
        let descriptor = match attachment {
            DummyAttachment::Texture(name) => self.textures.get(&name)?.storage?,
            DummyAttachment::Renderbuffer(name) => *self.renderbuffers.get(&name)?,
        };
        Some((descriptor.width, descriptor.height))
    }
}

/// Dummy GPU backend.
#[derive(Debug)]
pub struct DummyBackend {
    state: RefCell<DummyState>,
}

impl DummyBackend {
    /// Create a new dummy backend.
    pub fn new() -> Self {
        Self {
            state: RefCell::new(DummyState {
                next_handle: FIRST_BINDLESS_HANDLE,
                ..Default::default()
            }),
        }
    }

    /// Number of submissions executed so far.
    pub fn submission_count(&self) -> u64 {
        self.state.borrow().submissions
    }

    /// Number of live buffers.
    pub fn buffer_count(&self) -> usize {
        self.state.borrow().buffers.len()
    }

    /// Number of live textures.
    pub fn texture_count(&self) -> usize {
        self.state.borrow().textures.len()
    }
}

impl Default for DummyBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl GpuBackend for DummyBackend {
    fn name(&self) -> &'static str {
        "Dummy Backend"
    }

    fn create_buffer(&self, target: BufferTarget) -> Result<BufferName, GraphicsError> {
        let mut state = self.state.borrow_mut();
        let name = BufferName(state.allocate_name());
        log::trace!("DummyBackend: creating {} ({:?})", name, target);
        state.buffers.insert(
            name,
            DummyBuffer {
                target,
                data: Vec::new(),
            },
        );
        Ok(name)
    }

    fn write_buffer(&self, buffer: BufferName, data: &[u8]) -> Result<(), GraphicsError> {
        let mut state = self.state.borrow_mut();
        let entry = state
            .buffers
            .get_mut(&buffer)
            .ok_or_else(|| unknown("write_buffer", buffer))?;
        log::trace!(
            "DummyBackend: write_buffer {} ({:?}) len={}",
            buffer,
            entry.target,
            data.len()
        );
        entry.data.clear();
        entry.data.extend_from_slice(data);
        Ok(())
    }

    fn read_buffer(&self, buffer: BufferName) -> Result<Vec<u8>, GraphicsError> {
        let state = self.state.borrow();
        let entry = state
            .buffers
            .get(&buffer)
            .ok_or_else(|| unknown("read_buffer", buffer))?;
        log::trace!("DummyBackend: read_buffer {} len={}", buffer, entry.data.len());
        Ok(entry.data.clone())
    }

    fn delete_buffer(&self, buffer: BufferName) {
        log::trace!("DummyBackend: deleting {}", buffer);
        self.state.borrow_mut().buffers.remove(&buffer);
    }

    fn create_vertex_array(&self) -> Result<VertexArrayName, GraphicsError> {
        let mut state = self.state.borrow_mut();
        let name = VertexArrayName(state.allocate_name());
        log::trace!("DummyBackend: creating {}", name);
        state.vertex_arrays.insert(name);
        Ok(name)
    }

    fn delete_vertex_array(&self, vertex_array: VertexArrayName) {
        log::trace!("DummyBackend: deleting {}", vertex_array);
        self.state.borrow_mut().vertex_arrays.remove(&vertex_array);
    }

    fn create_texture(&self) -> Result<TextureName, GraphicsError> {
        let mut state = self.state.borrow_mut();
        let name = TextureName(state.allocate_name());
        log::trace!("DummyBackend: creating {}", name);
        state.textures.insert(name, DummyTexture::default());
        Ok(name)
    }

    fn allocate_texture(
        &self,
        texture: TextureName,
        descriptor: &TextureDataDescriptor,
    ) -> Result<(), GraphicsError> {
        let mut state = self.state.borrow_mut();
        let entry = state
            .textures
            .get_mut(&texture)
            .ok_or_else(|| unknown("allocate_texture", texture))?;
        log::trace!(
            "DummyBackend: allocating {} ({}x{} {:?})",
            texture,
            descriptor.width,
            descriptor.height,
            descriptor.internal_format
        );
        entry.storage = Some(*descriptor);
        entry.data = vec![0u8; descriptor.size_bytes()];
        Ok(())
    }

    fn write_texture(
        &self,
        texture: TextureName,
        descriptor: &TextureDataDescriptor,
        data: &[u8],
    ) -> Result<(), GraphicsError> {
        let mut state = self.state.borrow_mut();
        let entry = state
            .textures
            .get_mut(&texture)
            .ok_or_else(|| unknown("write_texture", texture))?;
        match entry.storage {
            Some(storage) if storage.same_shape(descriptor) => {}
            _ => {
                return Err(GraphicsError::InvalidParameter(format!(
                    "write_texture: {texture} storage does not match {descriptor:?}"
                )));
            }
        }
        if data.len() != descriptor.size_bytes() {
            return Err(GraphicsError::InvalidParameter(format!(
                "write_texture: expected {} bytes, got {}",
                descriptor.size_bytes(),
                data.len()
            )));
        }
        log::trace!("DummyBackend: write_texture {} len={}", texture, data.len());
        entry.data.copy_from_slice(data);
        Ok(())
    }

    fn read_texture(
        &self,
        texture: TextureName,
        descriptor: &TextureDataDescriptor,
    ) -> Result<Vec<u8>, GraphicsError> {
        let state = self.state.borrow();
        let entry = state
            .textures
            .get(&texture)
            .ok_or_else(|| unknown("read_texture", texture))?;
        match entry.storage {
            Some(storage) if storage.same_shape(descriptor) => Ok(entry.data.clone()),
            _ => Err(GraphicsError::InvalidParameter(format!(
                "read_texture: {texture} storage does not match {descriptor:?}"
            ))),
        }
    }

    fn set_texture_parameters(&self, texture: TextureName, parameters: &TextureParameters) {
        if let Some(entry) = self.state.borrow_mut().textures.get_mut(&texture) {
            log::trace!("DummyBackend: {} parameters {:?}", texture, parameters);
            entry.parameters = *parameters;
        }
    }

    fn delete_texture(&self, texture: TextureName) {
        log::trace!("DummyBackend: deleting {}", texture);
        let mut state = self.state.borrow_mut();
        if let Some(entry) = state.textures.remove(&texture)
            && let Some(handle) = entry.resident
        {
            log::warn!("DummyBackend: {} deleted while still resident", texture);
            state.resident.remove(&handle);
        }
    }

    fn make_texture_resident(
        &self,
        texture: TextureName,
    ) -> Result<BindlessTextureHandle, GraphicsError> {
        let mut state = self.state.borrow_mut();
        let handle = BindlessTextureHandle(state.next_handle);
        let entry = state
            .textures
            .get_mut(&texture)
            .ok_or_else(|| unknown("make_texture_resident", texture))?;
        if entry.storage.is_none() {
            return Err(GraphicsError::InvalidParameter(format!(
                "make_texture_resident: {texture} has no storage"
            )));
        }
        if let Some(existing) = entry.resident {
            return Ok(existing);
        }
        entry.resident = Some(handle);
        state.next_handle += 1;
        state.resident.insert(handle, texture);
        log::trace!("DummyBackend: {} resident as {:#x}", texture, handle.0);
        Ok(handle)
    }

    fn make_texture_non_resident(&self, handle: BindlessTextureHandle) {
        let mut state = self.state.borrow_mut();
        if let Some(texture) = state.resident.remove(&handle)
            && let Some(entry) = state.textures.get_mut(&texture)
        {
            log::trace!("DummyBackend: {} no longer resident", texture);
            entry.resident = None;
        }
    }

    fn create_renderbuffer(
        &self,
        descriptor: &TextureDataDescriptor,
    ) -> Result<RenderbufferName, GraphicsError> {
        let mut state = self.state.borrow_mut();
        let name = RenderbufferName(state.allocate_name());
        log::trace!(
            "DummyBackend: creating {} ({}x{} {:?})",
            name,
            descriptor.width,
            descriptor.height,
            descriptor.internal_format
        );
        state.renderbuffers.insert(name, *descriptor);
        Ok(name)
    }

    fn delete_renderbuffer(&self, renderbuffer: RenderbufferName) {
        log::trace!("DummyBackend: deleting {}", renderbuffer);
        self.state.borrow_mut().renderbuffers.remove(&renderbuffer);
    }

    fn create_framebuffer(&self) -> Result<FramebufferName, GraphicsError> {
        let mut state = self.state.borrow_mut();
        let name = FramebufferName(state.allocate_name());
        log::trace!("DummyBackend: creating {}", name);
        state.framebuffers.insert(name, BTreeMap::new());
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
        let attachments = state
            .framebuffers
            .get_mut(&framebuffer)
            .ok_or_else(|| unknown("attach_texture", framebuffer))?;
        attachments.insert(attachment, DummyAttachment::Texture(texture));
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
        let attachments = state
            .framebuffers
            .get_mut(&framebuffer)
            .ok_or_else(|| unknown("attach_renderbuffer", framebuffer))?;
        attachments.insert(attachment, DummyAttachment::Renderbuffer(renderbuffer));
        Ok(())
    }

    fn is_framebuffer_complete(&self, framebuffer: FramebufferName) -> bool {
        let state = self.state.borrow();
        let Some(attachments) = state.framebuffers.get(&framebuffer) else {
            return false;
        };
        let mut sizes = attachments
            .values()
            .map(|attachment| state.attachment_size(*attachment));
        match sizes.next() {
            Some(Some(first)) => sizes.all(|size| size == Some(first)),
            _ => false,
        }
    }

    fn delete_framebuffer(&self, framebuffer: FramebufferName) {
        log::trace!("DummyBackend: deleting {}", framebuffer);
        self.state.borrow_mut().framebuffers.remove(&framebuffer);
    }

    fn create_program(&self, sources: &[ShaderSource]) -> Result<ProgramName, GraphicsError> {
        if !sources.iter().any(|s| s.stage == ShaderStage::Vertex) {
            return Err(GraphicsError::ShaderCreationFailed(
                "program has no vertex stage".to_string(),
            ));
        }
        if let Some(empty) = sources.iter().find(|s| s.source.trim().is_empty()) {
            return Err(GraphicsError::ShaderCreationFailed(format!(
                "{:?} stage source is empty",
                empty.stage
            )));
        }
        let mut state = self.state.borrow_mut();
        let name = ProgramName(state.allocate_name());
        log::trace!("DummyBackend: linking {} ({} stages)", name, sources.len());
        state.programs.insert(name);
        Ok(name)
    }

    fn delete_program(&self, program: ProgramName) {
        log::trace!("DummyBackend: deleting {}", program);
        self.state.borrow_mut().programs.remove(&program);
    }

    fn submit(&self, submission: &DrawSubmission) -> Result<(), GraphicsError> {
        let mut state = self.state.borrow_mut();

        if !state.programs.contains(&submission.program) {
            return Err(unknown("submit", submission.program));
        }
        for binding in &submission.buffers {
            let buffer = state
                .buffers
                .get(&binding.buffer)
                .ok_or_else(|| unknown("submit", binding.buffer))?;
            if buffer.data.is_empty() {
                return Err(GraphicsError::InvalidParameter(format!(
                    "submit: {} bound at {} has no data",
                    binding.buffer, binding.binding_point
                )));
            }
        }
        for binding in &submission.textures {
            if !state.textures.contains_key(&binding.texture) {
                return Err(unknown("submit", binding.texture));
            }
        }
        for draw in &submission.draws {
            let buffers = draw
                .vertex_buffer
                .iter()
                .chain(draw.index_buffer.iter().map(|(name, _)| name));
            for buffer in buffers {
                if !state.buffers.contains_key(buffer) {
                    return Err(unknown("submit", *buffer));
                }
            }
        }

        if let Some(framebuffer) = submission.framebuffer {
            let attachments = state
                .framebuffers
                .get(&framebuffer)
                .ok_or_else(|| unknown("submit", framebuffer))?
                .clone();
            for (attachment, target) in attachments {
                let DummyAttachment::Texture(texture) = target else {
                    continue;
                };
                if let Some(entry) = state.textures.get_mut(&texture)
                    && let Some(storage) = entry.storage
                {
                    let pixel = if attachment.is_colour() {
                        encode_pixel(&storage, &submission.clear_colour)
                    } else {
                        encode_depth(&storage, 1.0)
                    };
                    for chunk in entry.data.chunks_exact_mut(pixel.len()) {
                        chunk.copy_from_slice(&pixel);
                    }
                }
            }
        }

        state.submissions += 1;
        log::trace!(
            "DummyBackend: submission {} with {} draws into {}",
            state.submissions,
            submission.draws.len(),
            submission
                .framebuffer
                .map_or_else(|| "default framebuffer".to_string(), |f| f.to_string())
        );
        Ok(())
    }
}

fn unknown(operation: &str, name: impl std::fmt::Display) -> GraphicsError {
    GraphicsError::InvalidParameter(format!("{operation}: unknown {name}"))
}

fn encode_component(component: TextureComponentType, value: f32, out: &mut Vec<u8>) {
    let value = value.clamp(0.0, 1.0);
    match component {
        TextureComponentType::Byte => out.push((value * u8::MAX as f32).round() as u8),
        TextureComponentType::Short => {
            out.extend_from_slice(&((value * u16::MAX as f32).round() as u16).to_ne_bytes())
        }
        TextureComponentType::Int => out.extend_from_slice(&(value.round() as u32).to_ne_bytes()),
        TextureComponentType::Float => out.extend_from_slice(&value.to_ne_bytes()),
    }
}

fn encode_pixel(descriptor: &TextureDataDescriptor, colour: &ClearColor) -> Vec<u8> {
    let [r, g, b, a] = colour.to_array();
    let channels = match descriptor.format {
        TextureFormat::Red | TextureFormat::DepthComponent => vec![r],
        TextureFormat::RedGreen => vec![r, g],
        TextureFormat::RedGreenBlue => vec![r, g, b],
        TextureFormat::RedGreenBlueAlpha => vec![r, g, b, a],
        TextureFormat::BlueGreenRedAlpha => vec![b, g, r, a],
    };
    let mut out = Vec::with_capacity(descriptor.bytes_per_pixel());
    for value in channels {
        encode_component(descriptor.component_type, value, &mut out);
    }
    out
}

fn encode_depth(descriptor: &TextureDataDescriptor, depth: f32) -> Vec<u8> {
    let mut out = Vec::with_capacity(descriptor.bytes_per_pixel());
    for _ in 0..descriptor.format.channel_count() {
        encode_component(descriptor.component_type, depth, &mut out);
    }
    out
}
