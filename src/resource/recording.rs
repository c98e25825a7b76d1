//! An in-memory GPU backend that keeps buffer contents on the CPU and logs every call.
//!
//! Useful for headless tooling and for asserting exactly which uploads the
//! buffer manager performs.

use crate::error::{BufferError, Result};
use crate::resource::{BufferId, BufferKind, GpuBackend};
use bytemuck::Pod;
use std::collections::BTreeMap;

/// One call received by a [`RecordingBackend`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BackendCall {
    Create {
        id: BufferId,
        kind: BufferKind,
        label: String,
        len: usize,
    },
    Write {
        id: BufferId,
        offset: u64,
        len: usize,
    },
    Release {
        id: BufferId,
    },
}

struct RecordedBuffer {
    kind: BufferKind,
    label: String,
    data: Vec<u8>,
}

/// A [`GpuBackend`] whose buffers live in RAM.
#[derive(Default)]
pub struct RecordingBackend {
    next_id: u32,
    limit: Option<u64>,
    buffers: BTreeMap<BufferId, RecordedBuffer>,
    calls: Vec<BackendCall>,
}

impl RecordingBackend {
    /// Creates an empty backend with no allocation limit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a backend that refuses any single allocation larger than `limit` bytes.
    pub fn with_limit(limit: u64) -> Self {
        RecordingBackend {
            limit: Some(limit),
            ..Self::default()
        }
    }

    /// Every call received so far, in order.
    pub fn calls(&self) -> &[BackendCall] {
        &self.calls
    }

    /// Forgets the call log. Buffer contents are kept.
    pub fn clear_calls(&mut self) {
        self.calls.clear()
    }

    /// Number of partial writes received so far.
    pub fn write_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, BackendCall::Write { .. }))
            .count()
    }

    /// Number of partial writes received by `id`.
    pub fn writes_to(&self, id: BufferId) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, BackendCall::Write { id: w, .. } if *w == id))
            .count()
    }

    /// Number of buffers currently allocated.
    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    /// Returns `true` if `id` is allocated.
    pub fn is_live(&self, id: BufferId) -> bool {
        self.buffers.contains_key(&id)
    }

    /// The kind a live buffer was created with.
    pub fn kind(&self, id: BufferId) -> Option<BufferKind> {
        self.buffers.get(&id).map(|b| b.kind)
    }

    /// The label a live buffer was created with.
    pub fn label(&self, id: BufferId) -> Option<&str> {
        self.buffers.get(&id).map(|b| b.label.as_str())
    }

    /// The raw bytes of a live buffer.
    pub fn contents(&self, id: BufferId) -> Option<&[u8]> {
        self.buffers.get(&id).map(|b| &b.data[..])
    }

    /// The contents of a live buffer reinterpreted as `T`s.
    pub fn contents_as<T: Pod>(&self, id: BufferId) -> Option<Vec<T>> {
        self.contents(id).map(bytemuck::pod_collect_to_vec)
    }
}

impl GpuBackend for RecordingBackend {
    fn create_buffer(&mut self, kind: BufferKind, label: &str, contents: &[u8]) -> Result<BufferId> {
        if let Some(limit) = self.limit {
            if contents.len() as u64 > limit {
                return Err(BufferError::Exhausted {
                    label: label.to_string(),
                    requested: contents.len() as u64,
                    limit,
                });
            }
        }

        let id = BufferId(self.next_id);
        self.next_id += 1;

        self.calls.push(BackendCall::Create {
            id,
            kind,
            label: label.to_string(),
            len: contents.len(),
        });
        self.buffers.insert(
            id,
            RecordedBuffer {
                kind,
                label: label.to_string(),
                data: contents.to_vec(),
            },
        );

        Ok(id)
    }

    fn write_buffer(&mut self, id: BufferId, offset: u64, data: &[u8]) -> Result<()> {
        let buffer = self
            .buffers
            .get_mut(&id)
            .ok_or(BufferError::InvalidHandle(id))?;

        let size = buffer.data.len() as u64;
        let end = offset + data.len() as u64;
        if end > size {
            return Err(BufferError::OutOfBounds {
                buffer: id,
                offset,
                len: data.len() as u64,
                size,
            });
        }

        buffer.data[offset as usize..end as usize].copy_from_slice(data);
        self.calls.push(BackendCall::Write {
            id,
            offset,
            len: data.len(),
        });

        Ok(())
    }

    fn release_buffer(&mut self, id: BufferId) {
        if self.buffers.remove(&id).is_some() {
            self.calls.push(BackendCall::Release { id });
        }
    }

    fn buffer_size(&self, id: BufferId) -> Option<u64> {
        self.buffers.get(&id).map(|b| b.data.len() as u64)
    }
}
