//! Shared setup for the integration tests.
//!
//! Every test takes a [`Backend`] case and asks [`TestContext::new`] for a
//! device on it. Backends that were not compiled in, or that find no
//! adapter, yield `None` and the test returns early.

#![allow(dead_code)]

use garnet_graphics::{
    BackendType, Buffer, BufferTarget, Device, DeviceBuilder, GraphicsContext, OutputTarget,
    RendererBuilder, RendererInput, ShaderHandle, VertexFormat,
};

/// Backends the tests run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    /// In-memory backend, always available.
    Dummy,
    /// wgpu on whatever adapter the machine has.
    Wgpu,
}

impl Backend {
    /// True if the backend was compiled into this build.
    pub fn is_available(&self) -> bool {
        match self {
            Backend::Dummy => true,
            #[cfg(feature = "wgpu-backend")]
            Backend::Wgpu => true,
            #[cfg(not(feature = "wgpu-backend"))]
            Backend::Wgpu => false,
        }
    }

    fn backend_type(&self) -> BackendType {
        match self {
            Backend::Dummy => BackendType::Dummy,
            Backend::Wgpu => BackendType::Wgpu,
        }
    }
}

/// A device on one backend.
pub struct TestContext {
    pub backend: Backend,
    pub device: Device,
}

impl TestContext {
    /// Create a device, or `None` if the backend is unavailable here.
    pub fn new(backend: Backend) -> Option<Self> {
        let _ = env_logger::builder().is_test(true).try_init();
        if !backend.is_available() {
            return None;
        }
        match DeviceBuilder::new()
            .with_backend(backend.backend_type())
            .with_label(format!("{backend:?} test device"))
            .build()
        {
            Ok(device) => Some(Self { backend, device }),
            Err(e) => {
                log::warn!("Could not create {:?} device: {}", backend, e);
                None
            }
        }
    }

    pub fn ctx(&mut self) -> &mut GraphicsContext {
        self.device.context_mut()
    }

    /// Create an array buffer holding `data`.
    pub fn array_buffer(&mut self, data: &[u8]) -> Buffer {
        Buffer::from_data(self.ctx(), BufferTarget::Array, data).expect("buffer upload")
    }
}

/// A renderer description using the default shader.
pub fn renderer_builder(output: OutputTarget) -> RendererBuilder {
    let mut builder = RendererBuilder::new();
    builder
        .set_shader(ShaderHandle::DEFAULT)
        .set_output(output)
        .set_label("test renderer");
    builder
}

/// A clip-space triangle with positions only.
pub fn triangle() -> RendererInput {
    RendererInput::new(
        &[[0.0f32, 0.5, 0.0], [-0.5, -0.5, 0.0], [0.5, -0.5, 0.0]],
        &[VertexFormat::Float32x3],
    )
}
