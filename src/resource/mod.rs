//! GPU resources: the backend seam and the buffers built on it.

pub use self::backend::{BufferId, BufferKind, GpuBackend};
pub use self::dynamic_buffer::DynamicUniformBuffer;
pub use self::gpu_vector::GpuVec;
pub use self::recording::{BackendCall, RecordingBackend};
pub use self::wgpu_backend::WgpuBackend;

mod backend;
mod dynamic_buffer;
mod gpu_vector;
mod recording;
mod wgpu_backend;
