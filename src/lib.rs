/*!
# geoview

GPU buffer management for an interactive 3D geometry viewer.

Every object of a [`Scene`](scene::Scene) (point clouds, polylines, meshes,
grids) is concatenated into four shared geometry buckets: points, lines, front
faces and back faces. Each vertex carries the slot of its object, which the
shaders use to fetch the object's transform and display settings from two
per-object tables. Moving, restyling or recoloring an object rewrites its slice
of the buffers in place; adding or removing objects rebuilds them.

The [`BufferManager`](buffer::BufferManager) allocates through the
[`GpuBackend`](resource::GpuBackend) trait and draws through the
[`Shader`](renderer::Shader) trait. [`RecordingBackend`](resource::RecordingBackend)
and [`RecordingShader`](renderer::RecordingShader) keep everything on the CPU
for headless use; [`WgpuViewer`](renderer::WgpuViewer) draws with wgpu.

```no_run
use geoview::prelude::*;

let mut scene = Scene::new();
let cube = scene.add(TriMesh::cuboid(Vec3::splat(1.0)).with_color(RED)).id();
let _ = scene.add(Grid::new(1.0, 10, 1.0, 10).unwrap().with_z_axis(true));

let mut renderer = Renderer::new(RecordingBackend::new(), RenderConfig::default());
let (mut shader, mut lines) = (RecordingShader::new(), RecordingShader::new());

renderer.sync(&mut scene).unwrap();
renderer.paint(&mut shader, &mut lines).unwrap();

scene.get_mut(cube).unwrap().translate(Vec3::X);
renderer.sync(&mut scene).unwrap();
```

## Rendering modes
* `shaded`: flat vertex colors.
* `lighted`: vertex colors modulated by a headlight.
* `ghosted`: every face is drawn through the transparent pass at a reduced opacity.
* `wireframe`: only points and lines are drawn.
*/
#![allow(clippy::module_inception)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::type_complexity)]

pub use glamx;

pub mod buffer;
pub mod color;
pub mod config;
pub mod context;
pub mod error;
pub mod geometry;
pub mod renderer;
pub mod resource;
pub mod scene;

pub use crate::error::{BufferError, Result};

pub mod prelude {
    pub use crate::buffer::*;
    pub use crate::color::*;
    pub use crate::config::*;
    pub use crate::context::*;
    pub use crate::error::BufferError;
    pub use crate::geometry::*;
    pub use crate::renderer::*;
    pub use crate::resource::*;
    pub use crate::scene::*;
    pub use glamx::{Mat4, Vec3};
}
