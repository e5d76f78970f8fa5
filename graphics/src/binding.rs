//! The binding cursor.
//!
//! [`BindingState`] records what is currently bound on a context: the vertex
//! array, one buffer per [`BufferTarget`], indexed buffer binding points,
//! texture units, the framebuffer and the program. Draw submissions are
//! assembled from it.

use std::collections::BTreeMap;

use crate::backend::{BufferName, FramebufferName, ProgramName, TextureName, VertexArrayName};
use crate::types::BufferTarget;

/// Number of texture units available for binding.
pub const MAX_TEXTURE_UNITS: u32 = 32;

/// What is currently bound on a graphics context.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindingState {
    vertex_array: Option<VertexArrayName>,
    buffers: [Option<BufferName>; BufferTarget::ALL.len()],
    indexed_buffers: BTreeMap<(BufferTarget, u32), BufferName>,
    texture_units: [Option<TextureName>; MAX_TEXTURE_UNITS as usize],
    framebuffer: Option<FramebufferName>,
    program: Option<ProgramName>,
}

impl BindingState {
    /// Create an empty binding state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind (or clear) the current vertex array.
    pub fn bind_vertex_array(&mut self, vertex_array: Option<VertexArrayName>) {
        log::trace!("bind vertex array {:?}", vertex_array);
        self.vertex_array = vertex_array;
    }

    /// Currently bound vertex array.
    pub fn vertex_array(&self) -> Option<VertexArrayName> {
        self.vertex_array
    }

    /// Bind (or clear) the buffer of a target.
    pub fn bind_buffer(&mut self, target: BufferTarget, buffer: Option<BufferName>) {
        log::trace!("bind {:?} buffer {:?}", target, buffer);
        self.buffers[target.slot()] = buffer;
    }

    /// Buffer currently bound to `target`.
    pub fn buffer(&self, target: BufferTarget) -> Option<BufferName> {
        self.buffers[target.slot()]
    }

    /// Bind (or clear) an indexed binding point. Also binds the generic
    /// target, as indexed binds do on GL-style APIs.
    ///
    /// # Panics
    ///
    /// Panics if `target` has no indexed binding points.
    pub fn bind_buffer_base(
        &mut self,
        target: BufferTarget,
        binding_point: u32,
        buffer: Option<BufferName>,
    ) {
        assert!(
            target.is_indexed(),
            "BindingState::bind_buffer_base: {target:?} has no indexed binding points"
        );
        log::trace!(
            "bind {:?} binding point {} buffer {:?}",
            target,
            binding_point,
            buffer
        );
        match buffer {
            Some(name) => self.indexed_buffers.insert((target, binding_point), name),
            None => self.indexed_buffers.remove(&(target, binding_point)),
        };
        self.buffers[target.slot()] = buffer;
    }

    /// Buffer bound at an indexed binding point.
    pub fn buffer_at(&self, target: BufferTarget, binding_point: u32) -> Option<BufferName> {
        self.indexed_buffers.get(&(target, binding_point)).copied()
    }

    /// All indexed bindings, ordered by target then binding point.
    pub fn indexed_buffers(&self) -> impl Iterator<Item = (BufferTarget, u32, BufferName)> + '_ {
        self.indexed_buffers
            .iter()
            .map(|((target, point), name)| (*target, *point, *name))
    }

    /// Bind (or clear) a texture unit.
    ///
    /// # Panics
    ///
    /// Panics if `unit >= MAX_TEXTURE_UNITS`.
    pub fn bind_texture(&mut self, unit: u32, texture: Option<TextureName>) {
        assert!(
            unit < MAX_TEXTURE_UNITS,
            "BindingState::bind_texture: unit {unit} out of range (0..{MAX_TEXTURE_UNITS})"
        );
        log::trace!("bind texture unit {} to {:?}", unit, texture);
        self.texture_units[unit as usize] = texture;
    }

    /// Texture bound to `unit`, if any.
    pub fn texture(&self, unit: u32) -> Option<TextureName> {
        self.texture_units.get(unit as usize).copied().flatten()
    }

    /// All occupied texture units.
    pub fn textures(&self) -> impl Iterator<Item = (u32, TextureName)> + '_ {
        self.texture_units
            .iter()
            .enumerate()
            .filter_map(|(unit, name)| name.map(|name| (unit as u32, name)))
    }

    /// Bind (or clear) the draw framebuffer. `None` is the default framebuffer.
    pub fn bind_framebuffer(&mut self, framebuffer: Option<FramebufferName>) {
        log::trace!("bind framebuffer {:?}", framebuffer);
        self.framebuffer = framebuffer;
    }

    /// Currently bound framebuffer.
    pub fn framebuffer(&self) -> Option<FramebufferName> {
        self.framebuffer
    }

    /// Make `program` current.
    pub fn use_program(&mut self, program: Option<ProgramName>) {
        log::trace!("use program {:?}", program);
        self.program = program;
    }

    /// Current program.
    pub fn program(&self) -> Option<ProgramName> {
        self.program
    }

    /// Forget everything bound.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_buffer_per_target() {
        let mut state = BindingState::new();
        state.bind_buffer(BufferTarget::Array, Some(BufferName(1)));
        state.bind_buffer(BufferTarget::Index, Some(BufferName(2)));
        assert_eq!(state.buffer(BufferTarget::Array), Some(BufferName(1)));
        assert_eq!(state.buffer(BufferTarget::Index), Some(BufferName(2)));
        assert_eq!(state.buffer(BufferTarget::Uniform), None);

        state.bind_buffer(BufferTarget::Array, None);
        assert_eq!(state.buffer(BufferTarget::Array), None);
    }

    #[test]
    fn test_bind_buffer_base() {
        let mut state = BindingState::new();
        state.bind_buffer_base(BufferTarget::ShaderStorage, 3, Some(BufferName(7)));
        assert_eq!(state.buffer_at(BufferTarget::ShaderStorage, 3), Some(BufferName(7)));
        assert_eq!(state.buffer(BufferTarget::ShaderStorage), Some(BufferName(7)));
        assert_eq!(state.indexed_buffers().count(), 1);

        state.bind_buffer_base(BufferTarget::ShaderStorage, 3, None);
        assert_eq!(state.buffer_at(BufferTarget::ShaderStorage, 3), None);
    }

    #[test]
    fn test_indexed_buffers_are_ordered() {
        let mut state = BindingState::new();
        state.bind_buffer_base(BufferTarget::Uniform, 0, Some(BufferName(3)));
        state.bind_buffer_base(BufferTarget::ShaderStorage, 5, Some(BufferName(2)));
        state.bind_buffer_base(BufferTarget::ShaderStorage, 1, Some(BufferName(1)));

        let bound: Vec<_> = state.indexed_buffers().collect();
        assert_eq!(
            bound,
            vec![
                (BufferTarget::ShaderStorage, 1, BufferName(1)),
                (BufferTarget::ShaderStorage, 5, BufferName(2)),
                (BufferTarget::Uniform, 0, BufferName(3)),
            ]
        );
        assert_eq!(state.buffer_at(BufferTarget::Uniform, 0), Some(BufferName(3)));
    }

    #[test]
    #[should_panic(expected = "no indexed binding points")]
    fn test_bind_buffer_base_rejects_array() {
        BindingState::new().bind_buffer_base(BufferTarget::Array, 0, Some(BufferName(1)));
    }

    #[test]
    fn test_texture_units() {
        let mut state = BindingState::new();
        state.bind_texture(0, Some(TextureName(4)));
        state.bind_texture(31, Some(TextureName(5)));
        let bound: Vec<_> = state.textures().collect();
        assert_eq!(bound, vec![(0, TextureName(4)), (31, TextureName(5))]);
        assert_eq!(state.texture(32), None);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_texture_unit_out_of_range() {
        BindingState::new().bind_texture(MAX_TEXTURE_UNITS, Some(TextureName(1)));
    }

    #[test]
    fn test_reset() {
        let mut state = BindingState::new();
        state.bind_vertex_array(Some(VertexArrayName(1)));
        state.use_program(Some(ProgramName(2)));
        state.reset();
        assert_eq!(state, BindingState::default());
    }
}
