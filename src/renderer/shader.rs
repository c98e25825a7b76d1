//! The narrow program interface the buffer manager draws through.

use crate::resource::BufferId;

/// A uniform value.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Uniform {
    Int(i32),
    Float(f32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    /// Column-major 4×4 matrix.
    Mat4([f32; 16]),
}

impl From<bool> for Uniform {
    fn from(value: bool) -> Self {
        Uniform::Int(value as i32)
    }
}

impl From<f32> for Uniform {
    fn from(value: f32) -> Self {
        Uniform::Float(value)
    }
}

impl From<glamx::Mat4> for Uniform {
    fn from(value: glamx::Mat4) -> Self {
        Uniform::Mat4(value.to_cols_array())
    }
}

impl From<crate::color::Color> for Uniform {
    fn from(value: crate::color::Color) -> Self {
        Uniform::Vec4([value.r, value.g, value.b, value.a])
    }
}

/// Selects the code path of the model program.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ElementType {
    Point = 0,
    Line = 1,
    Face = 2,
}

impl From<ElementType> for Uniform {
    fn from(value: ElementType) -> Self {
        Uniform::Int(value as i32)
    }
}

/// Fixed-function state a draw call is recorded with.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct RenderState {
    /// Whether fragments write to the depth buffer.
    pub depth_write: bool,
    /// Whether back-facing triangles are culled.
    pub cull_faces: bool,
    /// Whether triangles are pushed back slightly so coincident lines win the depth test.
    pub polygon_offset: bool,
}

impl Default for RenderState {
    fn default() -> Self {
        RenderState {
            depth_write: true,
            cull_faces: true,
            polygon_offset: false,
        }
    }
}

/// Names of the vertex attributes and tables the model programs read.
pub mod names {
    pub const POSITION: &str = "position";
    pub const COLOR: &str = "color";
    pub const OBJECT_INDEX: &str = "object_index";

    pub const TRANSFORMS: &str = "transforms";
    pub const SETTINGS: &str = "settings";

    pub const PROJECTION: &str = "projection";
    pub const VIEWWORLD: &str = "viewworld";
    pub const OPACITY: &str = "opacity";
    pub const SELECTION_COLOR: &str = "selection_color";
    pub const ELEMENT_TYPE: &str = "element_type";
    pub const IS_LIGHTED: &str = "is_lighted";
    pub const IS_INSTANCE: &str = "is_instance";
    pub const VIEWPORT: &str = "viewport";
}

/// A GPU program.
///
/// Attribute and texture bindings persist until rebound. Draw calls use the
/// uniforms, bindings and render state current at the time of the call.
pub trait Shader {
    /// Makes this program current.
    fn bind(&mut self);
    /// Ends the use of this program.
    fn release(&mut self);

    fn uniform(&mut self, name: &str, value: Uniform);

    fn enable_attribute(&mut self, name: &str);
    fn disable_attribute(&mut self, name: &str);
    /// Binds a vertex buffer of `step` floats per vertex to an attribute.
    fn bind_attribute(&mut self, name: &str, buffer: BufferId, step: u32);
    /// Binds a per-object table indexed by the `object_index` attribute.
    fn bind_texture(&mut self, name: &str, buffer: BufferId);

    fn render_state(&self) -> RenderState;
    fn set_render_state(&mut self, state: RenderState);

    fn draw_points(&mut self, elements: BufferId, count: usize);
    fn draw_lines(&mut self, elements: BufferId, count: usize);
    fn draw_triangles(&mut self, elements: BufferId, count: usize);
}

/// A call received by a [`RecordingShader`].
#[derive(Clone, Debug, PartialEq)]
pub enum ShaderCall {
    Bind,
    Release,
    Uniform(String, Uniform),
    EnableAttribute(String),
    DisableAttribute(String),
    BindAttribute(String, BufferId, u32),
    BindTexture(String, BufferId),
    SetRenderState(RenderState),
    DrawPoints(BufferId, usize),
    DrawLines(BufferId, usize),
    DrawTriangles(BufferId, usize),
}

/// A [`Shader`] that only records what it is asked to do.
#[derive(Clone, Debug, Default)]
pub struct RecordingShader {
    calls: Vec<ShaderCall>,
    state: RenderState,
}

impl RecordingShader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call so far, in order.
    pub fn calls(&self) -> &[ShaderCall] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear()
    }

    /// The draw calls so far, with the render state each was issued with.
    pub fn draws(&self) -> Vec<(ShaderCall, RenderState)> {
        let mut state = RenderState::default();
        let mut draws = Vec::new();
        for call in &self.calls {
            match call {
                ShaderCall::SetRenderState(s) => state = *s,
                ShaderCall::DrawPoints(..)
                | ShaderCall::DrawLines(..)
                | ShaderCall::DrawTriangles(..) => draws.push((call.clone(), state)),
                _ => {}
            }
        }
        draws
    }

    /// The last value set for a uniform.
    pub fn last_uniform(&self, name: &str) -> Option<Uniform> {
        self.calls.iter().rev().find_map(|c| match c {
            ShaderCall::Uniform(n, v) if n == name => Some(*v),
            _ => None,
        })
    }
}

impl Shader for RecordingShader {
    fn bind(&mut self) {
        self.calls.push(ShaderCall::Bind)
    }

    fn release(&mut self) {
        self.calls.push(ShaderCall::Release)
    }

    fn uniform(&mut self, name: &str, value: Uniform) {
        self.calls.push(ShaderCall::Uniform(name.to_string(), value))
    }

    fn enable_attribute(&mut self, name: &str) {
        self.calls.push(ShaderCall::EnableAttribute(name.to_string()))
    }

    fn disable_attribute(&mut self, name: &str) {
        self.calls.push(ShaderCall::DisableAttribute(name.to_string()))
    }

    fn bind_attribute(&mut self, name: &str, buffer: BufferId, step: u32) {
        self.calls
            .push(ShaderCall::BindAttribute(name.to_string(), buffer, step))
    }

    fn bind_texture(&mut self, name: &str, buffer: BufferId) {
        self.calls
            .push(ShaderCall::BindTexture(name.to_string(), buffer))
    }

    fn render_state(&self) -> RenderState {
        self.state
    }

    fn set_render_state(&mut self, state: RenderState) {
        self.state = state;
        self.calls.push(ShaderCall::SetRenderState(state))
    }

    fn draw_points(&mut self, elements: BufferId, count: usize) {
        self.calls.push(ShaderCall::DrawPoints(elements, count))
    }

    fn draw_lines(&mut self, elements: BufferId, count: usize) {
        self.calls.push(ShaderCall::DrawLines(elements, count))
    }

    fn draw_triangles(&mut self, elements: BufferId, count: usize) {
        self.calls.push(ShaderCall::DrawTriangles(elements, count))
    }
}
