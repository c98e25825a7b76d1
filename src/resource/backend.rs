//! The narrow interface the buffer manager uses to allocate and update GPU memory.

use crate::error::Result;
use std::fmt;

/// Opaque handle to a buffer owned by a [`GpuBackend`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(pub(crate) u32);

impl BufferId {
    /// The raw handle value.
    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for BufferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What a buffer is bound as when drawing.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BufferKind {
    /// Per-vertex attribute data.
    Vertex,
    /// Element (index) data.
    Index,
    /// Table sampled by object index from the shaders (transforms, settings).
    Texture,
}

impl BufferKind {
    /// Converts to wgpu buffer usages. Every buffer accepts partial writes.
    ///
    /// Vertex and index data are also readable as storage, for the point and
    /// line stages that expand each primitive into a quad.
    #[inline]
    pub fn to_wgpu(self) -> wgpu::BufferUsages {
        let usage = match self {
            BufferKind::Vertex => wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::STORAGE,
            BufferKind::Index => wgpu::BufferUsages::INDEX | wgpu::BufferUsages::STORAGE,
            BufferKind::Texture => wgpu::BufferUsages::STORAGE,
        };
        usage | wgpu::BufferUsages::COPY_DST
    }
}

/// Allocator and uploader for GPU buffers.
///
/// All calls happen on the render thread. Handles are only valid between their
/// creation and their release; using a released handle is an
/// [`InvalidHandle`](crate::BufferError::InvalidHandle) error.
pub trait GpuBackend {
    /// Allocates a buffer initialized with `contents`.
    fn create_buffer(&mut self, kind: BufferKind, label: &str, contents: &[u8]) -> Result<BufferId>;

    /// Overwrites `data.len()` bytes of `buffer` starting at `offset`, without reallocating.
    fn write_buffer(&mut self, buffer: BufferId, offset: u64, data: &[u8]) -> Result<()>;

    /// Frees a buffer. Releasing an unknown handle is a no-op.
    fn release_buffer(&mut self, buffer: BufferId);

    /// Size in bytes of a live buffer.
    fn buffer_size(&self, buffer: BufferId) -> Option<u64>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_and_index_data_can_be_read_as_storage() {
        for kind in [BufferKind::Vertex, BufferKind::Index, BufferKind::Texture] {
            let usage = kind.to_wgpu();
            assert!(usage.contains(wgpu::BufferUsages::STORAGE));
            assert!(usage.contains(wgpu::BufferUsages::COPY_DST));
        }
        assert!(BufferKind::Index.to_wgpu().contains(wgpu::BufferUsages::INDEX));
    }
}
