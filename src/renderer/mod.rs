//! Drawing the combined buffers: the program seam, its wgpu implementation and the frame driver.

pub use self::camera::{Camera, FrameStats};
pub use self::renderer::Renderer;
pub use self::shader::{ElementType, RecordingShader, RenderState, Shader, ShaderCall, Uniform};
pub use self::wgpu_program::{DrawSequence, WgpuProgram};
pub use self::wgpu_viewer::WgpuViewer;

mod camera;
mod renderer;
pub mod shader;
mod wgpu_program;
mod wgpu_viewer;
