//! Shader programs.
//!
//! A [`ShaderBuilder`] collects one [`ShaderSource`] per stage. Sources are
//! opaque text handed to the backend unchanged: the wgpu backend expects
//! WGSL, the dummy backend only checks that the stages are present.
//!
//! # Example
//!
//! ```ignore
//! let builder = ShaderBuilder::new()
//!     .set_shader_source(ShaderStage::Vertex, VERTEX_WGSL)
//!     .set_shader_file(ShaderStage::Fragment, "shaders/lit.wgsl")?;
//! let handle = device.create_shader(&builder)?;
//! ```

pub mod library;

use std::path::Path;
use std::rc::Rc;

use crate::backend::{GpuBackend, ProgramName};
use crate::context::GraphicsContext;
use crate::error::GraphicsError;

pub use library::{DEFAULT_SHADER_SOURCE, ShaderHandle, ShaderLibrary};

/// Programmable pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    /// Vertex stage.
    Vertex,
    /// Fragment stage.
    Fragment,
    /// Compute stage.
    Compute,
}

impl ShaderStage {
    /// Entry point used when none is given.
    pub fn default_entry_point(&self) -> &'static str {
        match self {
            Self::Vertex => "vs_main",
            Self::Fragment => "fs_main",
            Self::Compute => "cs_main",
        }
    }
}

/// Source text of one shader stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderSource {
    /// Stage this source compiles to.
    pub stage: ShaderStage,
    /// Shader text.
    pub source: String,
    /// Entry point function name.
    pub entry_point: String,
}

impl ShaderSource {
    /// Create a source with the stage's default entry point.
    pub fn new(stage: ShaderStage, source: impl Into<String>) -> Self {
        Self {
            stage,
            source: source.into(),
            entry_point: stage.default_entry_point().to_string(),
        }
    }

    /// Override the entry point.
    pub fn with_entry_point(mut self, entry_point: impl Into<String>) -> Self {
        self.entry_point = entry_point.into();
        self
    }
}

/// Collects stage sources for a program.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShaderBuilder {
    sources: Vec<ShaderSource>,
    label: Option<String>,
}

impl ShaderBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the source of a stage, replacing any previous one.
    pub fn set_shader_source(mut self, stage: ShaderStage, source: impl Into<String>) -> Self {
        self.push(ShaderSource::new(stage, source));
        self
    }

    /// Set a fully described stage source, replacing any previous one.
    pub fn with_source(mut self, source: ShaderSource) -> Self {
        self.push(source);
        self
    }

    /// Read the source of a stage from a file.
    ///
    /// # Errors
    ///
    /// Returns [`GraphicsError::Io`] if the file cannot be read.
    pub fn set_shader_file(
        self,
        stage: ShaderStage,
        path: impl AsRef<Path>,
    ) -> Result<Self, GraphicsError> {
        let path = path.as_ref();
        log::debug!("Loading {:?} shader from {}", stage, path.display());
        let source = std::fs::read_to_string(path)?;
        Ok(self.set_shader_source(stage, source))
    }

    /// Set a debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Collected sources.
    pub fn sources(&self) -> &[ShaderSource] {
        &self.sources
    }

    /// Debug label.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// True if a source was set for `stage`.
    pub fn has_stage(&self, stage: ShaderStage) -> bool {
        self.sources.iter().any(|s| s.stage == stage)
    }

    /// Check that the stages form a complete program: vertex and fragment,
    /// or compute alone.
    ///
    /// # Errors
    ///
    /// Returns [`GraphicsError::ShaderCreationFailed`] describing the
    /// missing or conflicting stage.
    pub fn validate(&self) -> Result<(), GraphicsError> {
        let compute = self.has_stage(ShaderStage::Compute);
        let vertex = self.has_stage(ShaderStage::Vertex);
        let fragment = self.has_stage(ShaderStage::Fragment);
        match (compute, vertex, fragment) {
            (true, false, false) | (false, true, true) => Ok(()),
            (true, _, _) => Err(GraphicsError::ShaderCreationFailed(
                "a compute stage cannot be combined with graphics stages".to_string(),
            )),
            (false, false, _) => Err(GraphicsError::ShaderCreationFailed(
                "missing vertex stage".to_string(),
            )),
            (false, true, false) => Err(GraphicsError::ShaderCreationFailed(
                "missing fragment stage".to_string(),
            )),
        }
    }

    /// Compile and link the program.
    ///
    /// # Errors
    ///
    /// Returns an error if the stages are incomplete or the backend rejects
    /// the sources.
    pub fn build(&self, ctx: &GraphicsContext) -> Result<Shader, GraphicsError> {
        self.validate()?;
        let program = ctx.backend().create_program(&self.sources)?;
        log::debug!(
            "Created shader {} ({})",
            program,
            self.label.as_deref().unwrap_or("unnamed")
        );
        Ok(Shader {
            program,
            stages: self.sources.iter().map(|s| s.stage).collect(),
            label: self.label.clone(),
            backend: Rc::clone(ctx.backend()),
        })
    }

    fn push(&mut self, source: ShaderSource) {
        self.sources.retain(|s| s.stage != source.stage);
        self.sources.push(source);
    }
}

/// A linked shader program.
pub struct Shader {
    program: ProgramName,
    stages: Vec<ShaderStage>,
    label: Option<String>,
    backend: Rc<dyn GpuBackend>,
}

impl std::fmt::Debug for Shader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shader")
            .field("program", &self.program)
            .field("stages", &self.stages)
            .field("label", &self.label)
            .finish()
    }
}

impl Shader {
    /// Backend program name.
    pub fn program(&self) -> ProgramName {
        self.program
    }

    /// Stages linked into the program.
    pub fn stages(&self) -> &[ShaderStage] {
        &self.stages
    }

    /// Debug label.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Make this the current program.
    pub fn bind(&self, ctx: &mut GraphicsContext) {
        ctx.bindings_mut().use_program(Some(self.program));
    }
}

impl Drop for Shader {
    fn drop(&mut self) {
        self.backend.delete_program(self.program);
    }
}
