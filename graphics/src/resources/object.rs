//! Vertex array aggregate.

use std::ops::Index;
use std::rc::Rc;

use crate::backend::{GpuBackend, VertexArrayName};
use crate::context::GraphicsContext;
use crate::error::GraphicsError;

use super::Buffer;

/// A vertex array owning zero or more buffers, addressed by stable index.
///
/// Slots are never compacted: [`erase`](Self::erase) and
/// [`release`](Self::release) leave an empty slot behind so every other index
/// stays valid. [`size`](Self::size) counts all slots while
/// [`element_size`](Self::element_size) counts only occupied ones.
///
/// # Example
///
/// ```ignore
/// let mut object = VertexObject::new(&ctx)?;
/// let positions = object.add(Buffer::from_data(&mut ctx, BufferTarget::Array, &bytes)?);
/// object.bind_child(&mut ctx, positions);
/// ```
pub struct VertexObject {
    name: VertexArrayName,
    buffers: Vec<Option<Buffer>>,
    backend: Rc<dyn GpuBackend>,
}

impl VertexObject {
    /// Create an empty vertex array.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot create the vertex array.
    pub fn new(ctx: &GraphicsContext) -> Result<Self, GraphicsError> {
        let name = ctx.backend().create_vertex_array()?;
        Ok(Self {
            name,
            buffers: Vec::new(),
            backend: Rc::clone(ctx.backend()),
        })
    }

    /// Backend name.
    pub fn name(&self) -> VertexArrayName {
        self.name
    }

    /// Add a buffer and return its index.
    ///
    /// If an equal buffer is already held, `buffer` is dropped and the
    /// existing index is returned instead.
    pub fn add(&mut self, buffer: Buffer) -> usize {
        if let Some(index) = self
            .buffers
            .iter()
            .position(|slot| slot.as_ref() == Some(&buffer))
        {
            log::trace!("{}: {} deduplicated into slot {}", self.name, buffer.name(), index);
            return index;
        }
        self.buffers.push(Some(buffer));
        self.buffers.len() - 1
    }

    /// Buffer in slot `index`, `None` if the slot is empty.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.size()`.
    pub fn get(&self, index: usize) -> Option<&Buffer> {
        self.check_index("get", index);
        self.buffers[index].as_ref()
    }

    /// Mutable buffer in slot `index`, `None` if the slot is empty.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.size()`.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut Buffer> {
        self.check_index("get_mut", index);
        self.buffers[index].as_mut()
    }

    /// Make this the current vertex array.
    pub fn bind(&self, ctx: &mut GraphicsContext) {
        ctx.bindings_mut().bind_vertex_array(Some(self.name));
    }

    /// Clear the current vertex array if it is this one.
    pub fn unbind(&self, ctx: &mut GraphicsContext) {
        if ctx.bindings().vertex_array() == Some(self.name) {
            ctx.bindings_mut().bind_vertex_array(None);
        }
    }

    /// Bind this vertex array, then the buffer in slot `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range or the slot is empty.
    pub fn bind_child(&self, ctx: &mut GraphicsContext, index: usize) {
        self.check_index("bind_child", index);
        let Some(buffer) = &self.buffers[index] else {
            panic!("VertexObject::bind_child: slot {index} of {} is empty", self.name);
        };
        self.bind(ctx);
        buffer.bind(ctx);
    }

    /// Drop the buffer in slot `index`, leaving the slot empty.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.size()`.
    pub fn erase(&mut self, index: usize) {
        self.check_index("erase", index);
        self.buffers[index] = None;
    }

    /// Move the buffer out of slot `index`, leaving the slot empty.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.size()`.
    pub fn release(&mut self, index: usize) -> Option<Buffer> {
        self.check_index("release", index);
        self.buffers[index].take()
    }

    /// Number of slots, empty ones included.
    pub fn size(&self) -> usize {
        self.buffers.len()
    }

    /// Number of occupied slots.
    pub fn element_size(&self) -> usize {
        self.buffers.iter().filter(|slot| slot.is_some()).count()
    }

    /// True if no slot holds a buffer.
    pub fn is_empty(&self) -> bool {
        self.element_size() == 0
    }

    /// Occupied slots with their indices.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Buffer)> {
        self.buffers
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|buffer| (index, buffer)))
    }

    fn check_index(&self, operation: &str, index: usize) {
        assert!(
            index < self.buffers.len(),
            "VertexObject::{operation}: index {index} out of range (size {})",
            self.buffers.len()
        );
    }
}

impl Index<usize> for VertexObject {
    type Output = Option<Buffer>;

    fn index(&self, index: usize) -> &Self::Output {
        self.check_index("index", index);
        &self.buffers[index]
    }
}

impl PartialEq for VertexObject {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl PartialEq<VertexArrayName> for VertexObject {
    fn eq(&self, other: &VertexArrayName) -> bool {
        self.name == *other
    }
}

impl std::fmt::Debug for VertexObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VertexObject")
            .field("name", &self.name)
            .field("buffers", &self.buffers)
            .finish()
    }
}

impl Drop for VertexObject {
    fn drop(&mut self) {
        self.buffers.clear();
        self.backend.delete_vertex_array(self.name);
    }
}

static_assertions::assert_not_impl_any!(VertexObject: Send, Sync, Clone);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendType;
    use crate::context::ContextParameters;
    use crate::types::BufferTarget;

    fn context() -> GraphicsContext {
        GraphicsContext::new(ContextParameters::default().with_backend(BackendType::Dummy))
            .unwrap()
    }

    fn buffer(ctx: &mut GraphicsContext, data: &[u8]) -> Buffer {
        Buffer::from_data(ctx, BufferTarget::Array, data).unwrap()
    }

    #[test]
    fn test_add_appends_distinct_buffers() {
        let mut ctx = context();
        let mut object = VertexObject::new(&ctx).unwrap();
        assert!(object.is_empty());

        let first = buffer(&mut ctx, &[1]);
        let second = buffer(&mut ctx, &[2]);
        assert_eq!(object.add(first), 0);
        assert_eq!(object.add(second), 1);
        assert_eq!(object.size(), 2);
        assert_eq!(object.element_size(), 2);
    }

    #[test]
    fn test_add_dedups_equal_buffers() {
        let mut ctx = context();
        let mut object = VertexObject::new(&ctx).unwrap();
        let first = buffer(&mut ctx, &[1, 2, 3]);
        let first_name = first.name();
        let second = buffer(&mut ctx, &[1, 2, 3]);

        assert_eq!(object.add(first), 0);
        assert_eq!(object.add(second), 0);
        assert_eq!(object.size(), 1);
        assert_eq!(object[0].as_ref().map(Buffer::name), Some(first_name));
    }

    #[test]
    fn test_erase_keeps_indices() {
        let mut ctx = context();
        let mut object = VertexObject::new(&ctx).unwrap();
        for i in 0..3u8 {
            let b = buffer(&mut ctx, &[i]);
            object.add(b);
        }
        let last_name = object.get(2).unwrap().name();

        object.erase(1);
        assert_eq!(object.size(), 3);
        assert_eq!(object.element_size(), 2);
        assert!(object[1].is_none());
        assert_eq!(object.get(2).unwrap().name(), last_name);

        let indices: Vec<_> = object.iter().map(|(i, _)| i).collect();
        assert_eq!(indices, vec![0, 2]);
    }

    #[test]
    fn test_release_transfers_ownership() {
        let mut ctx = context();
        let mut object = VertexObject::new(&ctx).unwrap();
        let b = buffer(&mut ctx, &[9, 9]);
        let index = object.add(b);

        let released = object.release(index).unwrap();
        assert_eq!(released.size(), 2);
        assert!(object[index].is_none());
        assert!(object.release(index).is_none());
        assert_eq!(released.read(&mut ctx).unwrap(), vec![9, 9]);
    }

    #[test]
    fn test_bind_child_binds_parent_first() {
        let mut ctx = context();
        let mut object = VertexObject::new(&ctx).unwrap();
        let b = buffer(&mut ctx, &[1]);
        let index = object.add(b);
        ctx.bindings_mut().bind_vertex_array(None);

        object.bind_child(&mut ctx, index);
        assert_eq!(ctx.bindings().vertex_array(), Some(object.name()));
        assert_eq!(
            ctx.bindings().buffer(BufferTarget::Array),
            Some(object.get(index).unwrap().name())
        );

        object.unbind(&mut ctx);
        assert_eq!(ctx.bindings().vertex_array(), None);
    }

    #[test]
    #[should_panic(expected = "is empty")]
    fn test_bind_child_on_empty_slot() {
        let mut ctx = context();
        let mut object = VertexObject::new(&ctx).unwrap();
        let b = buffer(&mut ctx, &[1]);
        object.add(b);
        object.erase(0);
        object.bind_child(&mut ctx, 0);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_index_out_of_range() {
        let ctx = context();
        let object = VertexObject::new(&ctx).unwrap();
        let _ = &object[0];
    }

    #[test]
    fn test_equality_against_name() {
        let ctx = context();
        let a = VertexObject::new(&ctx).unwrap();
        let b = VertexObject::new(&ctx).unwrap();
        assert!(a == a.name());
        assert!(a != b);
    }
}
