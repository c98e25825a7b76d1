//! Errors raised by the buffer manager and its GPU backends.
//!
//! Data-shape problems (mismatched color counts, incomplete primitives, dangling
//! element indices under the lenient policy) are repaired in place and reported
//! through `log::warn!`. Only contract violations and allocation failures reach
//! the caller as a [`BufferError`].

use crate::buffer::BucketKind;
use crate::resource::BufferId;
use crate::scene::ObjectId;

/// Errors produced while accumulating, uploading or updating combined buffers.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum BufferError {
    /// `create_buffers` was called while GPU resources from a previous call are still alive.
    #[error("GPU buffers already created; call clear() before creating them again")]
    AlreadyCreated,

    /// Geometry was added after `create_buffers` without an intervening `clear`.
    #[error("cannot add {0} while GPU buffers are live; call clear() first")]
    BuffersLive(ObjectId),

    /// An element index points past the vertices supplied for the same bucket.
    #[error("{object} ({kind}): element index {index} out of range for {vertex_count} vertices")]
    DanglingElement {
        object: ObjectId,
        kind: BucketKind,
        index: u32,
        vertex_count: usize,
    },

    /// The vertex count of an object changed since it was ingested.
    #[error("{object} ({kind}): vertex count changed from {expected} to {found}, a full rebuild is required")]
    TopologyChanged {
        object: ObjectId,
        kind: BucketKind,
        expected: usize,
        found: usize,
    },

    /// New colors or opacity move triangles between the opaque and transparent lists.
    #[error("{object} ({kind}): transparency changed, a full rebuild is required")]
    PartitionChanged { object: ObjectId, kind: BucketKind },

    /// The device refused an allocation.
    #[error("cannot allocate {requested} bytes for `{label}` (limit {limit} bytes)")]
    Exhausted {
        label: String,
        requested: u64,
        limit: u64,
    },

    /// A handle that was never created, or was already released, was used.
    #[error("invalid buffer handle {0:?}")]
    InvalidHandle(BufferId),

    /// A partial write does not fit in the destination buffer.
    #[error("write of {len} bytes at offset {offset} exceeds buffer {buffer:?} of {size} bytes")]
    OutOfBounds {
        buffer: BufferId,
        offset: u64,
        len: u64,
        size: u64,
    },
}

impl BufferError {
    /// Whether the error is cleared by rebuilding the buffers from the current scene.
    pub fn requires_rebuild(&self) -> bool {
        matches!(
            self,
            BufferError::TopologyChanged { .. } | BufferError::PartitionChanged { .. }
        )
    }
}

/// Result alias used across the crate.
pub type Result<T, E = BufferError> = std::result::Result<T, E>;
