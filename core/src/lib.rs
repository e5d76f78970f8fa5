//! # Garnet Engine Core
//!
//! CPU-side data shared by the rest of the engine: pixel and image types
//! that textures are uploaded from and downloaded into, and the surface
//! material block that object shaders read from a uniform buffer.
//!
//! Nothing in this crate touches the GPU.

pub mod image;
pub mod material;

/// Core library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Log the core version. Call once at startup.
pub fn init() {
    log::info!("Garnet Core v{} initialized", VERSION);
}
