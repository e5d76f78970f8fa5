//! GPU buffer resource.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use bytemuck::Pod;

use crate::backend::{BufferName, GpuBackend};
use crate::context::GraphicsContext;
use crate::error::GraphicsError;
use crate::types::BufferTarget;

/// A GPU buffer resource.
///
/// A buffer owns one backend buffer, is tagged with a single
/// [`BufferTarget`] and always binds to it. Shader storage and uniform
/// buffers also carry the binding point they attach to.
///
/// Two buffers compare equal when they have the same target, binding point,
/// size and contents. Contents are compared byte for byte against a CPU-side
/// copy of the last upload, with a digest as a fast reject. The backend name is not part of equality, which is what
/// lets [`VertexObject::add`](super::VertexObject::add) dedup by value.
///
/// # Example
///
/// ```ignore
/// let mut buffer = Buffer::new(&ctx, BufferTarget::Array)?;
/// buffer.set_slice(&mut ctx, &[0.0f32, 1.0, 2.0])?;
/// assert_eq!(buffer.size(), 12);
/// ```
pub struct Buffer {
    name: BufferName,
    target: BufferTarget,
    binding_point: Option<u32>,
    contents: Vec<u8>,
    fingerprint: u64,
    backend: Rc<dyn GpuBackend>,
}

impl Buffer {
    /// Create an empty buffer.
    ///
    /// Shader storage and uniform buffers attach to binding point 0.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot create the buffer.
    pub fn new(ctx: &GraphicsContext, target: BufferTarget) -> Result<Self, GraphicsError> {
        let binding_point = target.is_indexed().then_some(0);
        Self::create(ctx, target, binding_point)
    }

    /// Create an empty buffer attached to a specific binding point.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot create the buffer.
    ///
    /// # Panics
    ///
    /// Panics if `target` has no indexed binding points.
    pub fn new_indexed(
        ctx: &GraphicsContext,
        target: BufferTarget,
        binding_point: u32,
    ) -> Result<Self, GraphicsError> {
        assert!(
            target.is_indexed(),
            "Buffer::new_indexed: {target:?} has no binding points"
        );
        Self::create(ctx, target, Some(binding_point))
    }

    /// Create a buffer and upload `data` to it.
    ///
    /// # Errors
    ///
    /// Returns an error if creation or upload fails.
    pub fn from_data(
        ctx: &mut GraphicsContext,
        target: BufferTarget,
        data: &[u8],
    ) -> Result<Self, GraphicsError> {
        let mut buffer = Self::new(ctx, target)?;
        buffer.set_data(ctx, data)?;
        Ok(buffer)
    }

    fn create(
        ctx: &GraphicsContext,
        target: BufferTarget,
        binding_point: Option<u32>,
    ) -> Result<Self, GraphicsError> {
        let name = ctx.backend().create_buffer(target)?;
        Ok(Self {
            name,
            target,
            binding_point,
            contents: Vec::new(),
            fingerprint: fingerprint(&[]),
            backend: Rc::clone(ctx.backend()),
        })
    }

    /// Backend name.
    pub fn name(&self) -> BufferName {
        self.name
    }

    /// Target the buffer is tagged with.
    pub fn target(&self) -> BufferTarget {
        self.target
    }

    /// Binding point, for shader storage and uniform buffers.
    pub fn binding_point(&self) -> Option<u32> {
        self.binding_point
    }

    /// Size of the last upload in bytes.
    pub fn size(&self) -> usize {
        self.contents.len()
    }

    /// True if no data was uploaded.
    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }

    /// Bind the buffer to its target, then replace its contents with `data`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the upload.
    pub fn set_data(&mut self, ctx: &mut GraphicsContext, data: &[u8]) -> Result<(), GraphicsError> {
        self.bind(ctx);
        self.backend.write_buffer(self.name, data)?;
        self.contents.clear();
        self.contents.extend_from_slice(data);
        self.fingerprint = fingerprint(data);
        Ok(())
    }

    /// Upload a slice of plain-old-data values.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the upload.
    pub fn set_slice<T: Pod>(
        &mut self,
        ctx: &mut GraphicsContext,
        data: &[T],
    ) -> Result<(), GraphicsError> {
        self.set_data(ctx, bytemuck::cast_slice(data))
    }

    /// Bind the buffer, then read back its whole contents.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot read the buffer.
    pub fn read(&self, ctx: &mut GraphicsContext) -> Result<Vec<u8>, GraphicsError> {
        self.bind(ctx);
        self.backend.read_buffer(self.name)
    }

    /// Bind the buffer to its target (and binding point, if it has one).
    pub fn bind(&self, ctx: &mut GraphicsContext) {
        let bindings = ctx.bindings_mut();
        match self.binding_point {
            Some(point) => bindings.bind_buffer_base(self.target, point, Some(self.name)),
            None => bindings.bind_buffer(self.target, Some(self.name)),
        }
    }

    /// Clear the buffer's target (and binding point) if this buffer is bound.
    pub fn unbind(&self, ctx: &mut GraphicsContext) {
        let bindings = ctx.bindings_mut();
        if let Some(point) = self.binding_point
            && bindings.buffer_at(self.target, point) == Some(self.name)
        {
            bindings.bind_buffer_base(self.target, point, None);
        }
        if bindings.buffer(self.target) == Some(self.name) {
            bindings.bind_buffer(self.target, None);
        }
    }
}

impl PartialEq for Buffer {
    fn eq(&self, other: &Self) -> bool {
        self.target == other.target
            && self.binding_point == other.binding_point
            && self.fingerprint == other.fingerprint
            && self.contents == other.contents
    }
}

impl std::fmt::Debug for Buffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Buffer")
            .field("name", &self.name)
            .field("target", &self.target)
            .field("binding_point", &self.binding_point)
            .field("size", &self.contents.len())
            .finish()
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        self.backend.delete_buffer(self.name);
    }
}

static_assertions::assert_not_impl_any!(Buffer: Send, Sync, Clone);

fn fingerprint(data: &[u8]) -> u64 {
    let mut hasher = DefaultHasher::new();
    data.hash(&mut hasher);
    hasher.finish()
}

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
    fn test_set_data_binds_and_uploads() {
        let mut ctx = context();
        let mut buffer = Buffer::new(&ctx, BufferTarget::Array).unwrap();
        assert!(buffer.is_empty());

        buffer.set_slice(&mut ctx, &[1.0f32, 2.0, 3.0]).unwrap();
        assert_eq!(buffer.size(), 12);
        assert_eq!(ctx.bindings().buffer(BufferTarget::Array), Some(buffer.name()));

        let bytes = buffer.read(&mut ctx).unwrap();
        let values: &[f32] = bytemuck::cast_slice(&bytes);
        assert_eq!(values, &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_storage_buffer_binding_point() {
        let mut ctx = context();
        let buffer = Buffer::new_indexed(&ctx, BufferTarget::ShaderStorage, 4).unwrap();
        assert_eq!(buffer.binding_point(), Some(4));

        buffer.bind(&mut ctx);
        assert_eq!(
            ctx.bindings().buffer_at(BufferTarget::ShaderStorage, 4),
            Some(buffer.name())
        );

        buffer.unbind(&mut ctx);
        assert_eq!(ctx.bindings().buffer_at(BufferTarget::ShaderStorage, 4), None);
        assert_eq!(ctx.bindings().buffer(BufferTarget::ShaderStorage), None);

        let uniform = Buffer::new(&ctx, BufferTarget::Uniform).unwrap();
        assert_eq!(uniform.binding_point(), Some(0));
    }

    #[test]
    #[should_panic(expected = "has no binding points")]
    fn test_new_indexed_rejects_index_target() {
        let ctx = context();
        let _ = Buffer::new_indexed(&ctx, BufferTarget::Index, 1);
    }

    #[test]
    fn test_equality_is_by_value() {
        let mut ctx = context();
        let a = Buffer::from_data(&mut ctx, BufferTarget::Array, &[1, 2, 3]).unwrap();
        let b = Buffer::from_data(&mut ctx, BufferTarget::Array, &[1, 2, 3]).unwrap();
        let c = Buffer::from_data(&mut ctx, BufferTarget::Array, &[1, 2, 4]).unwrap();
        let d = Buffer::from_data(&mut ctx, BufferTarget::Index, &[1, 2, 3]).unwrap();
        assert_ne!(a.name(), b.name());
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
    }

    #[test]
    fn test_equal_digest_still_compares_bytes() {
        let mut ctx = context();
        let a = Buffer::from_data(&mut ctx, BufferTarget::Array, &[1, 2, 3]).unwrap();
        let mut b = Buffer::from_data(&mut ctx, BufferTarget::Array, &[3, 2, 1]).unwrap();
        b.fingerprint = a.fingerprint;
        assert_eq!(a.size(), b.size());
        assert_ne!(a, b);
    }

    #[test]
    fn test_unbind_leaves_other_buffer_bound() {
        let mut ctx = context();
        let a = Buffer::new(&ctx, BufferTarget::Array).unwrap();
        let b = Buffer::new(&ctx, BufferTarget::Array).unwrap();
        a.bind(&mut ctx);
        b.bind(&mut ctx);
        a.unbind(&mut ctx);
        assert_eq!(ctx.bindings().buffer(BufferTarget::Array), Some(b.name()));
    }
}
