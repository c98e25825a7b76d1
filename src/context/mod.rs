//! The wgpu device and queue handed to GPU components.

pub use self::context::Context;

mod context;
