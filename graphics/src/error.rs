//! Graphics error types.
//!
//! Only recoverable failures are reported through [`GraphicsError`]. Misuse
//! of an object's lifecycle (out-of-range slots, resizing a terminal texture,
//! promoting a texture twice) is a programming error and panics instead.

use thiserror::Error;

/// Errors that can occur in the graphics system.
#[derive(Debug, Error)]
pub enum GraphicsError {
    /// Failed to initialize the graphics context or backend.
    #[error("initialization failed: {0}")]
    InitializationFailed(String),
    /// Failed to create a resource.
    #[error("resource creation failed: {0}")]
    ResourceCreationFailed(String),
    /// Failed to create a shader program.
    #[error("shader creation failed: {0}")]
    ShaderCreationFailed(String),
    /// A renderer builder did not describe a valid renderer.
    #[error("invalid renderer: {0}")]
    InvalidRenderer(String),
    /// A requested feature is not supported by the active backend.
    #[error("feature not supported: {0}")]
    FeatureNotSupported(String),
    /// An invalid parameter was provided.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    /// Reading a shader file failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GraphicsError::InvalidRenderer("no shader".to_string());
        assert_eq!(err.to_string(), "invalid renderer: no shader");

        let err = GraphicsError::InitializationFailed("no GPU found".to_string());
        assert_eq!(err.to_string(), "initialization failed: no GPU found");
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.glsl");
        let err: GraphicsError = io.into();
        assert!(err.to_string().contains("missing.glsl"));
    }
}
