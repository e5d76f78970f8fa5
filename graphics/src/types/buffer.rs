//! Buffer binding targets.

/// The capability a buffer is created with.
///
/// A buffer is tagged with exactly one target for its whole lifetime and is
/// always bound to that target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum BufferTarget {
    /// Per-vertex attribute data.
    #[default]
    Array,
    /// Element indices.
    Index,
    /// Shader storage block, bound at an indexed binding point.
    ShaderStorage,
    /// Uniform block, bound at an indexed binding point.
    Uniform,
    /// Source of a buffer copy.
    CopySource,
    /// Destination of a buffer copy.
    CopyDestination,
    /// Indirect draw arguments.
    DrawIndirect,
}

impl BufferTarget {
    /// Returns true if buffers of this target bind at a numbered binding point.
    pub fn is_indexed(&self) -> bool {
        matches!(self, Self::ShaderStorage | Self::Uniform)
    }

    /// Returns true if this target is read by shaders as a resource block.
    pub fn is_shader_visible(&self) -> bool {
        self.is_indexed()
    }

    /// All targets, in declaration order.
    pub const ALL: [BufferTarget; 7] = [
        Self::Array,
        Self::Index,
        Self::ShaderStorage,
        Self::Uniform,
        Self::CopySource,
        Self::CopyDestination,
        Self::DrawIndirect,
    ];

    /// Position of this target in [`BufferTarget::ALL`].
    pub fn slot(&self) -> usize {
        *self as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indexed_targets() {
        assert!(BufferTarget::ShaderStorage.is_indexed());
        assert!(BufferTarget::Uniform.is_indexed());
        assert!(!BufferTarget::Array.is_indexed());
        assert!(!BufferTarget::Index.is_indexed());
    }

    #[test]
    fn test_slots_match_all() {
        for (i, target) in BufferTarget::ALL.iter().enumerate() {
            assert_eq!(target.slot(), i);
        }
    }
}
