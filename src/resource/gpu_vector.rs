//! A CPU-side array mirrored into one backend buffer.

use crate::error::{BufferError, Result};
use crate::resource::{BufferId, BufferKind, GpuBackend};
use bytemuck::Pod;
use std::mem;

/// A vector of elements kept on the RAM and, after upload, in a GPU buffer.
///
/// The RAM copy is authoritative. Partial updates rewrite both copies so they
/// never drift apart.
pub struct GpuVec<T: Pod> {
    kind: BufferKind,
    label: &'static str,
    buffer: Option<BufferId>,
    data: Vec<T>,
}

impl<T: Pod> GpuVec<T> {
    /// Creates an empty vector that is not yet uploaded.
    pub fn new(kind: BufferKind, label: &'static str) -> Self {
        GpuVec {
            kind,
            label,
            buffer: None,
            data: Vec::new(),
        }
    }

    /// The number of elements on the RAM.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Is this vector empty?
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The RAM copy.
    #[inline]
    pub fn data(&self) -> &[T] {
        &self.data
    }

    /// What the buffer is bound as.
    #[inline]
    pub fn kind(&self) -> BufferKind {
        self.kind
    }

    /// The backend handle, if uploaded.
    #[inline]
    pub fn buffer(&self) -> Option<BufferId> {
        self.buffer
    }

    /// Returns `true` if this vector is already uploaded to the GPU.
    #[inline]
    pub fn is_on_gpu(&self) -> bool {
        self.buffer.is_some()
    }

    /// Appends elements on the RAM. Only valid before upload.
    pub fn extend_from_slice(&mut self, values: &[T]) {
        debug_assert!(self.buffer.is_none(), "{} grown after upload", self.label);
        self.data.extend_from_slice(values)
    }

    /// Appends one element on the RAM. Only valid before upload.
    pub fn push(&mut self, value: T) {
        debug_assert!(self.buffer.is_none(), "{} grown after upload", self.label);
        self.data.push(value)
    }

    /// Appends every element of `values` on the RAM. Only valid before upload.
    pub fn extend(&mut self, values: impl IntoIterator<Item = T>) {
        debug_assert!(self.buffer.is_none(), "{} grown after upload", self.label);
        self.data.extend(values)
    }

    /// Allocates the GPU buffer from the RAM copy.
    ///
    /// Does nothing if the vector is already on the GPU.
    pub fn load_to_gpu<B: GpuBackend>(&mut self, backend: &mut B) -> Result<BufferId> {
        if let Some(id) = self.buffer {
            return Ok(id);
        }

        let id = backend.create_buffer(self.kind, self.label, bytemuck::cast_slice(&self.data))?;
        log::debug!(
            "uploaded {} ({} elements, {} bytes) as {}",
            self.label,
            self.data.len(),
            self.data.len() * mem::size_of::<T>(),
            id
        );
        self.buffer = Some(id);
        Ok(id)
    }

    /// Allocates the GPU buffer, holding only `placeholder` if the vector is empty.
    ///
    /// The placeholder keeps the buffer bindable. It is not added to the RAM copy.
    pub fn load_to_gpu_or<B: GpuBackend>(&mut self, backend: &mut B, placeholder: T) -> Result<BufferId> {
        if self.buffer.is_none() && self.data.is_empty() {
            let id = backend.create_buffer(self.kind, self.label, bytemuck::bytes_of(&placeholder))?;
            log::debug!("uploaded placeholder {} as {}", self.label, id);
            self.buffer = Some(id);
        }
        self.load_to_gpu(backend)
    }

    /// Overwrites `values.len()` elements starting at element `start`, on the RAM and on the GPU.
    ///
    /// The GPU write is skipped if the vector is not uploaded.
    pub fn write_range<B: GpuBackend>(
        &mut self,
        backend: &mut B,
        start: usize,
        values: &[T],
    ) -> Result<()> {
        let end = start + values.len();
        if end > self.data.len() {
            let stride = mem::size_of::<T>() as u64;
            return Err(BufferError::OutOfBounds {
                buffer: self.buffer.unwrap_or(BufferId(u32::MAX)),
                offset: start as u64 * stride,
                len: values.len() as u64 * stride,
                size: self.data.len() as u64 * stride,
            });
        }

        self.data[start..end].copy_from_slice(values);

        if let Some(id) = self.buffer {
            let offset = (start * mem::size_of::<T>()) as u64;
            backend.write_buffer(id, offset, bytemuck::cast_slice(values))?;
        }

        Ok(())
    }

    /// Releases the GPU buffer and keeps the RAM copy.
    pub fn unload_from_gpu<B: GpuBackend>(&mut self, backend: &mut B) {
        if let Some(id) = self.buffer.take() {
            log::debug!("released {} ({})", self.label, id);
            backend.release_buffer(id);
        }
    }

    /// Releases the GPU buffer and empties the RAM copy.
    pub fn clear<B: GpuBackend>(&mut self, backend: &mut B) {
        self.unload_from_gpu(backend);
        self.data.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::RecordingBackend;

    #[test]
    fn write_range_keeps_ram_and_gpu_in_sync() {
        let mut backend = RecordingBackend::new();
        let mut v = GpuVec::<u32>::new(BufferKind::Index, "indices");
        v.extend_from_slice(&[0, 1, 2, 3]);
        let id = v.load_to_gpu(&mut backend).unwrap();

        v.write_range(&mut backend, 2, &[7, 8]).unwrap();

        assert_eq!(v.data(), &[0, 1, 7, 8]);
        assert_eq!(backend.contents_as::<u32>(id).unwrap(), vec![0, 1, 7, 8]);
        assert!(v.write_range(&mut backend, 3, &[9, 9]).is_err());
    }

    #[test]
    fn clear_releases_once() {
        let mut backend = RecordingBackend::new();
        let mut v = GpuVec::<f32>::new(BufferKind::Vertex, "values");
        v.push(1.0);
        let id = v.load_to_gpu(&mut backend).unwrap();
        assert_eq!(v.load_to_gpu(&mut backend).unwrap(), id);

        v.clear(&mut backend);
        v.clear(&mut backend);

        assert!(v.is_empty());
        assert!(!backend.is_live(id));
        assert_eq!(backend.live_buffers(), 0);
    }
}
