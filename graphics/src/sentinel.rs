//! Registry of bindless texture handles.

use std::collections::HashMap;

use crate::backend::TextureName;
use crate::types::BindlessTextureHandle;

/// Tracks every live bindless handle and the texture it belongs to.
///
/// The sentinel never owns textures; it only stores names. It lives on the
/// [`GraphicsContext`](crate::GraphicsContext), so there is exactly one per
/// context and it is torn down with it.
#[derive(Debug, Default)]
pub struct TextureSentinel {
    by_handle: HashMap<BindlessTextureHandle, TextureName>,
    by_texture: HashMap<TextureName, BindlessTextureHandle>,
}

impl TextureSentinel {
    /// Create an empty sentinel.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `texture` was promoted to `handle`.
    ///
    /// # Panics
    ///
    /// Panics if the texture was already promoted or the handle is already
    /// in use by another texture.
    pub fn register(&mut self, texture: TextureName, handle: BindlessTextureHandle) {
        assert!(
            !self.by_texture.contains_key(&texture),
            "TextureSentinel::register: {texture} is already terminal"
        );
        if let Some(owner) = self.by_handle.get(&handle) {
            panic!(
                "TextureSentinel::register: handle {:#x} already belongs to {owner}",
                handle.value()
            );
        }
        log::debug!("{} promoted to bindless handle {:#x}", texture, handle.value());
        self.by_handle.insert(handle, texture);
        self.by_texture.insert(texture, handle);
    }

    /// Forget `texture`, returning the handle it held.
    pub fn unregister(&mut self, texture: TextureName) -> Option<BindlessTextureHandle> {
        let handle = self.by_texture.remove(&texture)?;
        self.by_handle.remove(&handle);
        Some(handle)
    }

    /// Handle held by `texture`.
    pub fn handle_of(&self, texture: TextureName) -> Option<BindlessTextureHandle> {
        self.by_texture.get(&texture).copied()
    }

    /// Texture behind `handle`.
    pub fn texture_of(&self, handle: BindlessTextureHandle) -> Option<TextureName> {
        self.by_handle.get(&handle).copied()
    }

    /// Iterate over every live handle.
    pub fn handles(&self) -> impl Iterator<Item = BindlessTextureHandle> + '_ {
        self.by_handle.keys().copied()
    }

    /// Number of live handles.
    pub fn len(&self) -> usize {
        self.by_handle.len()
    }

    /// True if no handles are live.
    pub fn is_empty(&self) -> bool {
        self.by_handle.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_unregister() {
        let mut sentinel = TextureSentinel::new();
        sentinel.register(TextureName(1), BindlessTextureHandle(10));
        sentinel.register(TextureName(2), BindlessTextureHandle(11));
        assert_eq!(sentinel.len(), 2);
        assert_eq!(sentinel.handle_of(TextureName(1)), Some(BindlessTextureHandle(10)));
        assert_eq!(sentinel.texture_of(BindlessTextureHandle(11)), Some(TextureName(2)));

        assert_eq!(
            sentinel.unregister(TextureName(1)),
            Some(BindlessTextureHandle(10))
        );
        assert_eq!(sentinel.unregister(TextureName(1)), None);
        assert_eq!(sentinel.texture_of(BindlessTextureHandle(10)), None);
        assert_eq!(sentinel.len(), 1);
    }

    #[test]
    #[should_panic(expected = "already terminal")]
    fn test_texture_registered_twice() {
        let mut sentinel = TextureSentinel::new();
        sentinel.register(TextureName(1), BindlessTextureHandle(10));
        sentinel.register(TextureName(1), BindlessTextureHandle(11));
    }

    #[test]
    #[should_panic(expected = "already belongs to")]
    fn test_duplicate_handle() {
        let mut sentinel = TextureSentinel::new();
        sentinel.register(TextureName(1), BindlessTextureHandle(10));
        sentinel.register(TextureName(2), BindlessTextureHandle(10));
    }
}
