//! Per-draw uniform blocks packed into one buffer and selected with dynamic offsets.

use crate::context::Context;
use bytemuck::Pod;
use std::marker::PhantomData;
use std::mem;

/// A uniform buffer holding one aligned `T` per recorded draw.
///
/// Entries are accumulated on the RAM during a frame and uploaded with a
/// single write by [`flush`](Self::flush).
pub struct DynamicUniformBuffer<T: Pod> {
    ctxt: Context,
    data: Vec<u8>,
    buffer: wgpu::Buffer,
    capacity: u64,
    aligned_size: u64,
    count: usize,
    label: &'static str,
    _marker: PhantomData<T>,
}

impl<T: Pod> DynamicUniformBuffer<T> {
    /// Creates a buffer with room for 64 entries.
    pub fn new(ctxt: &Context, label: &'static str) -> Self {
        Self::with_capacity(ctxt, label, 64)
    }

    /// Creates a buffer with room for `initial_capacity` entries.
    pub fn with_capacity(ctxt: &Context, label: &'static str, initial_capacity: usize) -> Self {
        let alignment = ctxt.device.limits().min_uniform_buffer_offset_alignment as u64;
        let aligned_size = (mem::size_of::<T>() as u64).div_ceil(alignment) * alignment;
        let capacity = aligned_size * initial_capacity.max(1) as u64;

        DynamicUniformBuffer {
            ctxt: ctxt.clone(),
            data: Vec::with_capacity(capacity as usize),
            buffer: Self::allocate(ctxt, label, capacity),
            capacity,
            aligned_size,
            count: 0,
            label,
            _marker: PhantomData,
        }
    }

    fn allocate(ctxt: &Context, label: &'static str, size: u64) -> wgpu::Buffer {
        ctxt.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    /// Number of entries pushed since the last [`clear`](Self::clear).
    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Size of one entry binding.
    #[inline]
    pub fn binding_size(&self) -> wgpu::BufferSize {
        wgpu::BufferSize::new(mem::size_of::<T>() as u64).unwrap_or(wgpu::BufferSize::MIN)
    }

    /// Forgets every entry. The GPU buffer is kept.
    pub fn clear(&mut self) {
        self.data.clear();
        self.count = 0;
    }

    /// Appends an entry and returns the dynamic offset selecting it.
    pub fn push(&mut self, value: &T) -> u32 {
        let offset = (self.count as u64 * self.aligned_size) as u32;

        let bytes = bytemuck::bytes_of(value);
        self.data.extend_from_slice(bytes);
        self.data
            .resize(self.data.len() + self.aligned_size as usize - bytes.len(), 0);

        self.count += 1;
        offset
    }

    /// Uploads every pushed entry.
    ///
    /// Returns `true` if the GPU buffer was reallocated, in which case bind
    /// groups referencing it must be recreated.
    pub fn flush(&mut self) -> bool {
        if self.data.is_empty() {
            return false;
        }

        let required = self.data.len() as u64;
        let reallocated = required > self.capacity;
        if reallocated {
            let mut capacity = self.capacity;
            while capacity < required {
                capacity *= 2;
            }
            log::debug!("growing {} to {} bytes", self.label, capacity);
            self.buffer = Self::allocate(&self.ctxt, self.label, capacity);
            self.capacity = capacity;
        }

        self.ctxt.write_buffer(&self.buffer, 0, &self.data);
        reallocated
    }

    /// The GPU buffer.
    #[inline]
    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }
}
