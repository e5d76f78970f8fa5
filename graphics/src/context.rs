//! Graphics context.
//!
//! The [`GraphicsContext`] owns the GPU backend, the binding cursor and the
//! bindless [`TextureSentinel`]. Every resource is created against a context
//! and every bind goes through `&mut GraphicsContext`, so binding order is
//! visible in the borrow structure of the calling code.
//!
//! # Thread Safety
//!
//! A context and everything created from it is confined to the thread that
//! created it. None of these types are `Send` or `Sync`.

use std::cell::{Ref, RefCell};
use std::rc::Rc;

use crate::backend::{self, BackendType, GpuBackend};
use crate::binding::BindingState;
use crate::error::GraphicsError;
use crate::sentinel::TextureSentinel;
use crate::types::RenderSettings;

/// Parameters used to create a [`GraphicsContext`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextParameters {
    /// Backend to run on.
    pub backend: BackendType,
    /// Initial fixed-function state.
    pub settings: RenderSettings,
    /// Debug label.
    pub label: String,
}

impl Default for ContextParameters {
    fn default() -> Self {
        Self {
            backend: BackendType::Auto,
            settings: RenderSettings::default(),
            label: "Garnet Context".to_string(),
        }
    }
}

impl ContextParameters {
    /// Select the backend.
    pub fn with_backend(mut self, backend: BackendType) -> Self {
        self.backend = backend;
        self
    }

    /// Set the initial render settings.
    pub fn with_settings(mut self, settings: RenderSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Set the debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }
}

/// Owner of the backend, binding cursor and bindless sentinel.
///
/// # Example
///
/// ```ignore
/// let mut ctx = GraphicsContext::new(ContextParameters::default())?;
/// let mut buffer = Buffer::new(&ctx, BufferTarget::Array)?;
/// buffer.set_data(&mut ctx, &vertices)?;
/// ```
pub struct GraphicsContext {
    label: String,
    backend: Rc<dyn GpuBackend>,
    bindings: BindingState,
    sentinel: Rc<RefCell<TextureSentinel>>,
    settings: RenderSettings,
}

impl std::fmt::Debug for GraphicsContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphicsContext")
            .field("label", &self.label)
            .field("backend", &self.backend.name())
            .field("resident_textures", &self.sentinel.borrow().len())
            .finish_non_exhaustive()
    }
}

impl GraphicsContext {
    /// Create a context and its backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the requested backend is unavailable or fails to
    /// initialize.
    pub fn new(params: ContextParameters) -> Result<Self, GraphicsError> {
        let backend = backend::create_backend(params.backend)?;
        Ok(Self::with_backend(backend, params))
    }

    /// Create a context on an already constructed backend.
    pub fn with_backend(backend: Rc<dyn GpuBackend>, params: ContextParameters) -> Self {
        log::info!(
            "Creating GraphicsContext '{}' on {}",
            params.label,
            backend.name()
        );
        Self {
            label: params.label,
            backend,
            bindings: BindingState::new(),
            sentinel: Rc::new(RefCell::new(TextureSentinel::new())),
            settings: params.settings,
        }
    }

    /// Debug label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The GPU backend.
    pub fn backend(&self) -> &Rc<dyn GpuBackend> {
        &self.backend
    }

    /// Name of the GPU backend.
    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Current binding cursor.
    pub fn bindings(&self) -> &BindingState {
        &self.bindings
    }

    /// Mutable binding cursor.
    pub fn bindings_mut(&mut self) -> &mut BindingState {
        &mut self.bindings
    }

    /// The bindless handle registry.
    pub fn sentinel(&self) -> Ref<'_, TextureSentinel> {
        self.sentinel.borrow()
    }

    /// Shared sentinel cell, for textures that unregister themselves on drop.
    pub(crate) fn sentinel_cell(&self) -> &Rc<RefCell<TextureSentinel>> {
        &self.sentinel
    }

    /// Fixed-function state used for draws.
    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    /// Replace the fixed-function state.
    pub fn set_settings(&mut self, settings: RenderSettings) {
        self.settings = settings;
    }
}

impl Drop for GraphicsContext {
    fn drop(&mut self) {
        let resident = self.sentinel.borrow().len();
        if resident > 0 {
            log::warn!(
                "GraphicsContext '{}' destroyed with {} texture(s) still resident",
                self.label,
                resident
            );
        }
        log::info!("Destroying GraphicsContext '{}'", self.label);
    }
}

static_assertions::assert_not_impl_any!(GraphicsContext: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CullTarget;

    fn dummy_context() -> GraphicsContext {
        GraphicsContext::new(ContextParameters::default().with_backend(BackendType::Dummy))
            .unwrap()
    }

    #[test]
    fn test_context_creation() {
        let ctx = dummy_context();
        assert_eq!(ctx.backend_name(), "Dummy Backend");
        assert_eq!(ctx.label(), "Garnet Context");
        assert!(ctx.sentinel().is_empty());
        assert_eq!(*ctx.bindings(), BindingState::default());
    }

    #[test]
    fn test_settings() {
        let mut ctx = GraphicsContext::new(
            ContextParameters::default()
                .with_backend(BackendType::Dummy)
                .with_label("test")
                .with_settings(RenderSettings::default().with_wireframe(true)),
        )
        .unwrap();
        assert!(ctx.settings().wireframe);
        ctx.set_settings(RenderSettings::default().with_cull(CullTarget::Nothing));
        assert_eq!(ctx.settings().cull, CullTarget::Nothing);
        assert!(!ctx.settings().wireframe);
    }
}
