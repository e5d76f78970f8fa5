//! The device's shader collection.
//!
//! Slot 0 always holds the default shader, built from
//! [`DEFAULT_SHADER_SOURCE`] unless the device was given other sources.
//! Shaders created later take slots 1, 2, ... Looking up a slot that does
//! not exist is a soft miss: it logs an error and yields the default shader.

use std::rc::Rc;

use super::Shader;

/// WGSL source of the built-in default shader.
pub const DEFAULT_SHADER_SOURCE: &str = include_str!("../../shaders/default.wgsl");

/// Stable index of a shader in a [`ShaderLibrary`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ShaderHandle(pub(crate) usize);

impl ShaderHandle {
    /// The default shader.
    pub const DEFAULT: Self = Self(0);

    /// Slot index.
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Default shader plus every shader created on a device.
#[derive(Debug)]
pub struct ShaderLibrary {
    default: Rc<Shader>,
    extra: Vec<Rc<Shader>>,
}

impl ShaderLibrary {
    /// Create a library around its default shader.
    pub fn new(default: Shader) -> Self {
        Self {
            default: Rc::new(default),
            extra: Vec::new(),
        }
    }

    /// Add a shader, returning its handle.
    pub fn add(&mut self, shader: Shader) -> ShaderHandle {
        self.extra.push(Rc::new(shader));
        ShaderHandle(self.extra.len())
    }

    /// True if `handle` names a shader in this library.
    pub fn contains(&self, handle: ShaderHandle) -> bool {
        handle.0 <= self.extra.len()
    }

    /// Shader for `handle`, falling back to the default shader when the
    /// handle is out of range.
    pub fn get(&self, handle: ShaderHandle) -> &Rc<Shader> {
        match handle.0 {
            0 => &self.default,
            i => match self.extra.get(i - 1) {
                Some(shader) => shader,
                None => {
                    log::error!(
                        "Shader {} is out of range ({} shaders), using the default shader",
                        i,
                        self.len()
                    );
                    &self.default
                }
            },
        }
    }

    /// The default shader.
    pub fn default_shader(&self) -> &Rc<Shader> {
        &self.default
    }

    /// Number of shaders including the default one.
    pub fn len(&self) -> usize {
        self.extra.len() + 1
    }

    /// Always false: the default shader is always present.
    pub fn is_empty(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendType;
    use crate::context::{ContextParameters, GraphicsContext};
    use crate::shader::{ShaderBuilder, ShaderStage};

    fn build(ctx: &GraphicsContext, label: &str) -> Shader {
        ShaderBuilder::new()
            .set_shader_source(ShaderStage::Vertex, DEFAULT_SHADER_SOURCE)
            .set_shader_source(ShaderStage::Fragment, DEFAULT_SHADER_SOURCE)
            .with_label(label)
            .build(ctx)
            .unwrap()
    }

    #[test]
    fn test_default_source_has_entry_points() {
        assert!(DEFAULT_SHADER_SOURCE.contains("fn vs_main"));
        assert!(DEFAULT_SHADER_SOURCE.contains("fn fs_main"));
    }

    #[test]
    fn test_handles_and_fallback() {
        let ctx =
            GraphicsContext::new(ContextParameters::default().with_backend(BackendType::Dummy))
                .unwrap();
        let mut library = ShaderLibrary::new(build(&ctx, "default"));
        let lit = library.add(build(&ctx, "lit"));
        let unlit = library.add(build(&ctx, "unlit"));

        assert_eq!(lit, ShaderHandle(1));
        assert_eq!(unlit, ShaderHandle(2));
        assert_eq!(library.len(), 3);
        assert_eq!(library.get(lit).label(), Some("lit"));
        assert_eq!(library.get(ShaderHandle::DEFAULT).label(), Some("default"));

        let missing = ShaderHandle(9);
        assert!(!library.contains(missing));
        assert!(Rc::ptr_eq(library.get(missing), library.default_shader()));
    }
}
