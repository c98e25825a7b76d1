//! [`GpuBackend`] implementation over a wgpu device.

use crate::context::Context;
use crate::error::{BufferError, Result};
use crate::resource::{BufferId, BufferKind, GpuBackend};
use std::collections::HashMap;

/// Stores wgpu buffers behind [`BufferId`] handles.
pub struct WgpuBackend {
    ctxt: Context,
    next_id: u32,
    buffers: HashMap<BufferId, wgpu::Buffer>,
}

impl WgpuBackend {
    /// Creates a backend allocating from `ctxt`.
    pub fn new(ctxt: Context) -> Self {
        WgpuBackend {
            ctxt,
            next_id: 0,
            buffers: HashMap::new(),
        }
    }

    /// The context buffers are allocated from.
    #[inline]
    pub fn context(&self) -> &Context {
        &self.ctxt
    }

    /// The wgpu buffer behind a live handle.
    #[inline]
    pub fn buffer(&self, id: BufferId) -> Option<&wgpu::Buffer> {
        self.buffers.get(&id)
    }
}

impl GpuBackend for WgpuBackend {
    fn create_buffer(&mut self, kind: BufferKind, label: &str, contents: &[u8]) -> Result<BufferId> {
        let limit = self.ctxt.max_buffer_size();
        if contents.len() as u64 > limit {
            log::error!("allocation of {} bytes for {} refused", contents.len(), label);
            return Err(BufferError::Exhausted {
                label: label.to_string(),
                requested: contents.len() as u64,
                limit,
            });
        }

        // Zero-sized bindings are invalid, keep a minimal placeholder.
        let contents = if contents.is_empty() {
            &[0u8; 4][..]
        } else {
            contents
        };

        let buffer = self
            .ctxt
            .create_buffer_init(Some(label), contents, kind.to_wgpu());

        let id = BufferId(self.next_id);
        self.next_id += 1;
        let _ = self.buffers.insert(id, buffer);
        Ok(id)
    }

    fn write_buffer(&mut self, id: BufferId, offset: u64, data: &[u8]) -> Result<()> {
        let buffer = self.buffers.get(&id).ok_or(BufferError::InvalidHandle(id))?;

        let size = buffer.size();
        if offset + data.len() as u64 > size {
            return Err(BufferError::OutOfBounds {
                buffer: id,
                offset,
                len: data.len() as u64,
                size,
            });
        }

        if !data.is_empty() {
            self.ctxt.write_buffer(buffer, offset, data);
        }
        Ok(())
    }

    fn release_buffer(&mut self, id: BufferId) {
        if let Some(buffer) = self.buffers.remove(&id) {
            buffer.destroy();
        }
    }

    fn buffer_size(&self, id: BufferId) -> Option<u64> {
        self.buffers.get(&id).map(|b| b.size())
    }
}
