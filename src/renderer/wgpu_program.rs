//! A [`Shader`] over wgpu.
//!
//! wgpu has no immediate-mode draw calls: a [`WgpuProgram`] records every draw
//! with the uniforms, bindings and render state current at that time, then
//! replays the recording into a render pass once the frame is complete.
//!
//! Triangles are drawn indexed from the vertex buffers. Points and lines are
//! expanded into screen-aligned quads in the vertex stage, which reads the
//! vertex data from storage buffers, so the per-object point size and line
//! width apply.

use crate::context::Context;
use crate::renderer::shader::names;
use crate::renderer::{RenderState, Shader, Uniform};
use crate::resource::{BufferId, DynamicUniformBuffer, WgpuBackend};
use bytemuck::{Pod, Zeroable};
use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;

/// Uniform block of `model.wgsl`.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
struct DrawUniforms {
    projection: [f32; 16],
    viewworld: [f32; 16],
    selection_color: [f32; 4],
    opacity: f32,
    element_type: i32,
    is_lighted: i32,
    is_instance: i32,
    viewport: [f32; 2],
    _pad: [f32; 2],
}

impl Default for DrawUniforms {
    fn default() -> Self {
        let identity = glamx::Mat4::IDENTITY.to_cols_array();
        DrawUniforms {
            projection: identity,
            viewworld: identity,
            selection_color: [1.0, 1.0, 0.0, 1.0],
            opacity: 1.0,
            element_type: 2,
            is_lighted: 0,
            is_instance: 0,
            viewport: [1.0, 1.0],
            _pad: [0.0; 2],
        }
    }
}

impl DrawUniforms {
    fn set(&mut self, name: &str, value: Uniform) -> bool {
        match (name, value) {
            (names::PROJECTION, Uniform::Mat4(m)) => self.projection = m,
            (names::VIEWWORLD, Uniform::Mat4(m)) => self.viewworld = m,
            (names::SELECTION_COLOR, Uniform::Vec4(c)) => self.selection_color = c,
            (names::SELECTION_COLOR, Uniform::Vec3([r, g, b])) => {
                self.selection_color = [r, g, b, 1.0]
            }
            (names::OPACITY, Uniform::Float(v)) => self.opacity = v,
            (names::ELEMENT_TYPE, Uniform::Int(v)) => self.element_type = v,
            (names::IS_LIGHTED, Uniform::Int(v)) => self.is_lighted = v,
            (names::IS_INSTANCE, Uniform::Int(v)) => self.is_instance = v,
            (names::VIEWPORT, Uniform::Vec2(v)) => self.viewport = v,
            _ => return false,
        }
        true
    }
}

/// Draw counter shared by programs whose draws interleave in one render pass.
#[derive(Clone, Debug, Default)]
pub struct DrawSequence(Rc<Cell<u64>>);

impl DrawSequence {
    pub fn new() -> Self {
        Self::default()
    }

    fn next(&self) -> u64 {
        let n = self.0.get();
        self.0.set(n + 1);
        n
    }
}

const POSITION: usize = 0;
const COLOR: usize = 1;
const OBJECT_INDEX: usize = 2;

fn attribute_slot(name: &str) -> Option<usize> {
    match name {
        names::POSITION => Some(POSITION),
        names::COLOR => Some(COLOR),
        names::OBJECT_INDEX => Some(OBJECT_INDEX),
        _ => None,
    }
}

/// How a recorded draw is rasterized.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
enum Primitive {
    /// Indexed triangles read from the vertex buffers.
    Triangles,
    /// One quad per point, sized by the object's point size.
    Points,
    /// One quad per segment, as wide as the object's line width.
    Lines,
}

impl Primitive {
    fn topology(self) -> wgpu::PrimitiveTopology {
        wgpu::PrimitiveTopology::TriangleList
    }

    fn vertex_entry(self) -> &'static str {
        match self {
            Primitive::Triangles => "vs_main",
            Primitive::Points => "vs_points",
            Primitive::Lines => "vs_lines",
        }
    }

    fn is_expanded(self) -> bool {
        self != Primitive::Triangles
    }

    /// Vertices drawn for `count` element indices.
    fn vertex_count(self, count: usize) -> u32 {
        let n = match self {
            Primitive::Triangles => count,
            Primitive::Points => count * 6,
            Primitive::Lines => count / 2 * 6,
        };
        n as u32
    }
}

type PipelineKey = (Primitive, RenderState);

#[derive(Clone, Debug)]
struct DrawCommand {
    sequence: u64,
    key: PipelineKey,
    uniform_offset: u32,
    attributes: [BufferId; 3],
    tables: (BufferId, BufferId),
    elements: BufferId,
    vertices: u32,
}

impl DrawCommand {
    /// Storage bindings of an expanded draw: positions, colors, object indices, elements.
    fn geometry(&self) -> [BufferId; 4] {
        let [p, c, o] = self.attributes;
        [p, c, o, self.elements]
    }
}

/// A `model.wgsl` pipeline family targeting one color format.
pub struct WgpuProgram {
    ctxt: Context,
    label: &'static str,
    format: wgpu::TextureFormat,
    blend: Option<wgpu::BlendState>,
    module: wgpu::ShaderModule,
    uniforms_layout: wgpu::BindGroupLayout,
    tables_layout: wgpu::BindGroupLayout,
    geometry_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    expanded_layout: wgpu::PipelineLayout,
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,

    uniform_buffer: DynamicUniformBuffer<DrawUniforms>,
    uniforms_group: Option<wgpu::BindGroup>,
    tables_groups: HashMap<(BufferId, BufferId), wgpu::BindGroup>,
    geometry_groups: HashMap<[BufferId; 4], wgpu::BindGroup>,

    uniforms: DrawUniforms,
    state: RenderState,
    bound: bool,
    enabled: [bool; 3],
    attributes: [Option<BufferId>; 3],
    transforms: Option<BufferId>,
    settings: Option<BufferId>,

    sequence: DrawSequence,
    commands: Vec<DrawCommand>,
}

impl WgpuProgram {
    /// Creates a program drawing into `format` targets with alpha blending.
    pub fn new(ctxt: &Context, label: &'static str, format: wgpu::TextureFormat) -> Self {
        Self::with_blend(ctxt, label, format, Some(wgpu::BlendState::ALPHA_BLENDING))
    }

    /// Creates a program with an explicit blend state. `None` overwrites the target.
    pub fn with_blend(
        ctxt: &Context,
        label: &'static str,
        format: wgpu::TextureFormat,
        blend: Option<wgpu::BlendState>,
    ) -> Self {
        let uniform_buffer = DynamicUniformBuffer::new(ctxt, label);

        let uniforms_layout = ctxt.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("model_uniforms_bind_group_layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: Some(uniform_buffer.binding_size()),
                },
                count: None,
            }],
        });

        let storage_entry = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::VERTEX,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only: true },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };
        let tables_layout = ctxt.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("model_tables_bind_group_layout"),
            entries: &[storage_entry(0), storage_entry(1)],
        });
        let geometry_layout = ctxt.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("model_geometry_bind_group_layout"),
            entries: &[
                storage_entry(0),
                storage_entry(1),
                storage_entry(2),
                storage_entry(3),
            ],
        });

        let pipeline_layout = ctxt.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("model_pipeline_layout"),
            bind_group_layouts: &[&uniforms_layout, &tables_layout],
            push_constant_ranges: &[],
        });
        let expanded_layout = ctxt.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("model_expanded_pipeline_layout"),
            bind_group_layouts: &[&uniforms_layout, &tables_layout, &geometry_layout],
            push_constant_ranges: &[],
        });

        let module =
            ctxt.create_shader_module(Some("model_shader"), include_str!("../builtin/model.wgsl"));

        WgpuProgram {
            ctxt: ctxt.clone(),
            label,
            format,
            blend,
            module,
            uniforms_layout,
            tables_layout,
            geometry_layout,
            pipeline_layout,
            expanded_layout,
            pipelines: HashMap::new(),
            uniform_buffer,
            uniforms_group: None,
            tables_groups: HashMap::new(),
            geometry_groups: HashMap::new(),
            uniforms: DrawUniforms::default(),
            state: RenderState::default(),
            bound: false,
            enabled: [false; 3],
            attributes: [None; 3],
            transforms: None,
            settings: None,
            sequence: DrawSequence::new(),
            commands: Vec::new(),
        }
    }

    /// Shares a draw counter with other programs drawing into the same pass.
    pub fn with_sequence(mut self, sequence: DrawSequence) -> Self {
        self.sequence = sequence;
        self
    }

    #[inline]
    pub fn label(&self) -> &str {
        self.label
    }

    /// Number of draws recorded since the last [`clear_commands`](Self::clear_commands).
    #[inline]
    pub fn command_count(&self) -> usize {
        self.commands.len()
    }

    /// Forgets the recorded draws. Called at the start of every frame.
    pub fn clear_commands(&mut self) {
        self.commands.clear();
        self.uniform_buffer.clear();
    }

    fn record(&mut self, primitive: Primitive, elements: BufferId, count: usize) {
        if !self.bound {
            log::warn!("{}: draw issued while the program is not bound, skipped", self.label);
            return;
        }

        let attributes = match (self.attribute(POSITION), self.attribute(COLOR), self.attribute(OBJECT_INDEX)) {
            (Some(p), Some(c), Some(o)) => [p, c, o],
            _ => {
                log::warn!("{}: draw issued with missing vertex attributes, skipped", self.label);
                return;
            }
        };
        let (Some(transforms), Some(settings)) = (self.transforms, self.settings) else {
            log::warn!("{}: draw issued without object tables, skipped", self.label);
            return;
        };

        let uniform_offset = self.uniform_buffer.push(&self.uniforms);
        self.commands.push(DrawCommand {
            sequence: self.sequence.next(),
            key: (primitive, self.state),
            uniform_offset,
            attributes,
            tables: (transforms, settings),
            elements,
            vertices: primitive.vertex_count(count),
        });
    }

    fn attribute(&self, slot: usize) -> Option<BufferId> {
        self.attributes[slot].filter(|_| self.enabled[slot])
    }

    fn create_pipeline(&self, (primitive, state): PipelineKey) -> wgpu::RenderPipeline {
        let is_triangles = primitive == Primitive::Triangles;

        let bias = if is_triangles && state.polygon_offset {
            wgpu::DepthBiasState {
                constant: 1,
                slope_scale: 1.0,
                clamp: 0.0,
            }
        } else {
            wgpu::DepthBiasState::default()
        };

        let cull_mode = if is_triangles && state.cull_faces {
            Some(wgpu::Face::Back)
        } else {
            None
        };

        let vertex_buffers = [
            wgpu::VertexBufferLayout {
                array_stride: 12,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &[wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                }],
            },
            wgpu::VertexBufferLayout {
                array_stride: 16,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &[wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x4,
                }],
            },
            wgpu::VertexBufferLayout {
                array_stride: 4,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &[wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32,
                }],
            },
        ];

        // Expanded primitives pull their vertices from storage buffers.
        let expanded = primitive.is_expanded();
        let layout = if expanded {
            &self.expanded_layout
        } else {
            &self.pipeline_layout
        };
        let buffers: &[wgpu::VertexBufferLayout] = if expanded { &[] } else { &vertex_buffers[..] };

        log::debug!("{}: new pipeline {:?} {:?}", self.label, primitive, state);

        self.ctxt
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(self.label),
                layout: Some(layout),
                vertex: wgpu::VertexState {
                    module: &self.module,
                    entry_point: Some(primitive.vertex_entry()),
                    buffers,
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &self.module,
                    entry_point: Some("fs_main"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: self.format,
                        blend: self.blend,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: primitive.topology(),
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: Context::depth_format(),
                    depth_write_enabled: state.depth_write,
                    depth_compare: wgpu::CompareFunction::Less,
                    stencil: wgpu::StencilState::default(),
                    bias,
                }),
                multisample: wgpu::MultisampleState {
                    count: 1,
                    mask: !0,
                    alpha_to_coverage_enabled: false,
                },
                multiview: None,
                cache: None,
            })
    }

    /// Uploads the recorded uniforms and creates the pipelines and bind
    /// groups the recorded draws need.
    pub fn prepare(&mut self, backend: &WgpuBackend) {
        if self.commands.is_empty() {
            return;
        }

        if self.uniform_buffer.flush() || self.uniforms_group.is_none() {
            self.uniforms_group = Some(self.ctxt.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("model_uniforms_bind_group"),
                layout: &self.uniforms_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                        buffer: self.uniform_buffer.buffer(),
                        offset: 0,
                        size: Some(self.uniform_buffer.binding_size()),
                    }),
                }],
            }));
        }

        // Buffers are reallocated on every rebuild.
        self.tables_groups.clear();
        self.geometry_groups.clear();

        for i in 0..self.commands.len() {
            let key = self.commands[i].key;
            if !self.pipelines.contains_key(&key) {
                let pipeline = self.create_pipeline(key);
                let _ = self.pipelines.insert(key, pipeline);
            }

            if key.0.is_expanded() {
                let geometry = self.commands[i].geometry();
                self.prepare_geometry(backend, geometry);
            }

            let tables = self.commands[i].tables;
            if self.tables_groups.contains_key(&tables) {
                continue;
            }
            let (Some(transforms), Some(settings)) =
                (backend.buffer(tables.0), backend.buffer(tables.1))
            else {
                continue;
            };
            let group = self.ctxt.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("model_tables_bind_group"),
                layout: &self.tables_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: transforms.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: settings.as_entire_binding(),
                    },
                ],
            });
            let _ = self.tables_groups.insert(tables, group);
        }
    }

    fn prepare_geometry(&mut self, backend: &WgpuBackend, geometry: [BufferId; 4]) {
        if self.geometry_groups.contains_key(&geometry) {
            return;
        }

        let mut entries = Vec::with_capacity(geometry.len());
        for (binding, id) in geometry.iter().enumerate() {
            let Some(buffer) = backend.buffer(*id) else {
                return;
            };
            entries.push(wgpu::BindGroupEntry {
                binding: binding as u32,
                resource: buffer.as_entire_binding(),
            });
        }

        let group = self.ctxt.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("model_geometry_bind_group"),
            layout: &self.geometry_layout,
            entries: &entries,
        });
        let _ = self.geometry_groups.insert(geometry, group);
    }

    fn render_command(&self, pass: &mut wgpu::RenderPass<'_>, backend: &WgpuBackend, cmd: &DrawCommand) {
        let (Some(pipeline), Some(uniforms), Some(tables)) = (
            self.pipelines.get(&cmd.key),
            self.uniforms_group.as_ref(),
            self.tables_groups.get(&cmd.tables),
        ) else {
            log::warn!("{}: draw was not prepared, skipped", self.label);
            return;
        };

        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, uniforms, &[cmd.uniform_offset]);
        pass.set_bind_group(1, tables, &[]);

        if cmd.key.0.is_expanded() {
            let Some(geometry) = self.geometry_groups.get(&cmd.geometry()) else {
                log::warn!("{}: vertex data of a draw is gone, skipped", self.label);
                return;
            };
            pass.set_bind_group(2, geometry, &[]);
            pass.draw(0..cmd.vertices, 0..1);
            return;
        }

        let Some(elements) = backend.buffer(cmd.elements) else {
            log::warn!("{}: element buffer {} is gone, skipped", self.label, cmd.elements);
            return;
        };
        for (slot, id) in cmd.attributes.iter().enumerate() {
            let Some(buffer) = backend.buffer(*id) else {
                log::warn!("{}: vertex buffer {} is gone, skipped", self.label, id);
                return;
            };
            pass.set_vertex_buffer(slot as u32, buffer.slice(..));
        }
        pass.set_index_buffer(elements.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..cmd.vertices, 0, 0..1);
    }

    /// Replays this program's recorded draws. Call [`prepare`](Self::prepare) first.
    pub fn render(&self, pass: &mut wgpu::RenderPass<'_>, backend: &WgpuBackend) {
        Self::render_all(pass, backend, &[self])
    }

    /// Replays the draws of several programs in the order they were recorded.
    ///
    /// Programs must share a [`DrawSequence`] for the order to be meaningful.
    pub fn render_all(pass: &mut wgpu::RenderPass<'_>, backend: &WgpuBackend, programs: &[&WgpuProgram]) {
        let mut order: Vec<(u64, usize, usize)> = programs
            .iter()
            .enumerate()
            .flat_map(|(p, program)| {
                program
                    .commands
                    .iter()
                    .enumerate()
                    .map(move |(c, cmd)| (cmd.sequence, p, c))
            })
            .collect();
        order.sort_unstable();

        for (_, p, c) in order {
            let program = programs[p];
            program.render_command(pass, backend, &program.commands[c]);
        }
    }
}

impl Shader for WgpuProgram {
    fn bind(&mut self) {
        self.bound = true;
    }

    fn release(&mut self) {
        self.bound = false;
    }

    fn uniform(&mut self, name: &str, value: Uniform) {
        if !self.uniforms.set(name, value) {
            log::warn!("{}: no uniform `{}` of type {:?}", self.label, name, value);
        }
    }

    fn enable_attribute(&mut self, name: &str) {
        if let Some(slot) = attribute_slot(name) {
            self.enabled[slot] = true;
        }
    }

    fn disable_attribute(&mut self, name: &str) {
        if let Some(slot) = attribute_slot(name) {
            self.enabled[slot] = false;
        }
    }

    fn bind_attribute(&mut self, name: &str, buffer: BufferId, _step: u32) {
        match attribute_slot(name) {
            Some(slot) => self.attributes[slot] = Some(buffer),
            None => log::warn!("{}: no attribute `{}`", self.label, name),
        }
    }

    fn bind_texture(&mut self, name: &str, buffer: BufferId) {
        match name {
            names::TRANSFORMS => self.transforms = Some(buffer),
            names::SETTINGS => self.settings = Some(buffer),
            _ => log::warn!("{}: no table `{}`", self.label, name),
        }
    }

    fn render_state(&self) -> RenderState {
        self.state
    }

    fn set_render_state(&mut self, state: RenderState) {
        self.state = state;
    }

    fn draw_points(&mut self, elements: BufferId, count: usize) {
        self.record(Primitive::Points, elements, count)
    }

    fn draw_lines(&mut self, elements: BufferId, count: usize) {
        self.record(Primitive::Lines, elements, count)
    }

    fn draw_triangles(&mut self, elements: BufferId, count: usize) {
        self.record(Primitive::Triangles, elements, count)
    }
}
