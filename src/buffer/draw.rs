//! Multi-pass drawing of the combined buffers.

use crate::buffer::bucket::BucketHandles;
use crate::buffer::{BucketKind, BufferManager};
use crate::config::RenderMode;
use crate::renderer::shader::names;
use crate::renderer::{ElementType, RenderState, Shader};
use crate::resource::{BufferId, GpuBackend};

fn enable_attributes<S: Shader + ?Sized>(shader: &mut S) {
    shader.enable_attribute(names::POSITION);
    shader.enable_attribute(names::COLOR);
    shader.enable_attribute(names::OBJECT_INDEX);
}

fn disable_attributes<S: Shader + ?Sized>(shader: &mut S) {
    shader.disable_attribute(names::POSITION);
    shader.disable_attribute(names::COLOR);
    shader.disable_attribute(names::OBJECT_INDEX);
}

fn bind_attributes<S: Shader + ?Sized>(shader: &mut S, handles: &BucketHandles) {
    shader.bind_attribute(names::POSITION, handles.positions, 3);
    shader.bind_attribute(names::COLOR, handles.colors, 4);
    shader.bind_attribute(names::OBJECT_INDEX, handles.object_indices, 1);
}

fn draw_triangles<S: Shader + ?Sized>(shader: &mut S, elements: Option<BufferId>, count: usize) {
    if let Some(elements) = elements.filter(|_| count > 0) {
        shader.draw_triangles(elements, count);
    }
}

/// Per-object tables bound to every program.
#[derive(Copy, Clone)]
struct Tables {
    transforms: BufferId,
    settings: BufferId,
}

impl Tables {
    fn bind<S: Shader + ?Sized>(self, shader: &mut S) {
        shader.bind_texture(names::TRANSFORMS, self.transforms);
        shader.bind_texture(names::SETTINGS, self.settings);
    }
}

impl<B: GpuBackend> BufferManager<B> {
    /// Draws every bucket.
    ///
    /// Passes, in order:
    /// 1. opaque faces (every face when `is_instance`), skipped in wireframe
    ///    mode and, outside instance mode, in ghosted mode;
    /// 2. points;
    /// 3. lines, with `line_shader` and face culling off;
    /// 4. transparent faces (every face in ghosted mode) with depth writes
    ///    off, skipped in wireframe and instance modes.
    ///
    /// Does nothing if no bucket was uploaded.
    pub fn draw<S, L>(&self, shader: &mut S, line_shader: &mut L, rendermode: RenderMode, is_instance: bool)
    where
        S: Shader + ?Sized,
        L: Shader + ?Sized,
    {
        if !self.has_gpu_resources() {
            return;
        }
        let (Some(transforms), Some(settings)) = (self.transforms.buffer(), self.settings.buffer())
        else {
            return;
        };
        let tables = Tables {
            transforms,
            settings,
        };

        let is_wireframe = rendermode.is_wireframe();
        let is_lighted = rendermode.is_lighted();
        let is_ghosted = rendermode.is_ghosted();

        shader.bind();
        tables.bind(shader);
        enable_attributes(shader);

        if !is_wireframe && (!is_ghosted || is_instance) {
            self.draw_faces(shader, is_instance, is_lighted);
        }
        self.draw_points(shader);

        disable_attributes(shader);
        shader.release();

        self.draw_lines(line_shader, tables);

        if !is_instance && !is_wireframe {
            self.draw_transparent_faces(shader, tables, is_lighted, is_ghosted);
        }
    }

    fn draw_faces<S: Shader + ?Sized>(&self, shader: &mut S, is_instance: bool, is_lighted: bool) {
        let state = shader.render_state();
        shader.set_render_state(RenderState {
            polygon_offset: true,
            ..state
        });

        shader.uniform(names::IS_LIGHTED, is_lighted.into());
        shader.uniform(names::ELEMENT_TYPE, ElementType::Face.into());

        for kind in BucketKind::FACES {
            let bucket = self.bucket(kind);
            let Some(handles) = bucket.handles() else {
                continue;
            };

            bind_attributes(shader, &handles);
            draw_triangles(shader, Some(handles.elements), bucket.opaque_elements().len());
            if is_instance {
                // Picking must hit every triangle whatever its opacity.
                draw_triangles(shader, handles.transparent, bucket.transparent_elements().len());
            }
        }

        shader.set_render_state(state);
    }

    fn draw_points<S: Shader + ?Sized>(&self, shader: &mut S) {
        shader.uniform(names::ELEMENT_TYPE, ElementType::Point.into());

        let bucket = self.bucket(BucketKind::Points);
        let count = bucket.opaque_elements().len();
        if let Some(handles) = bucket.handles().filter(|_| count > 0) {
            bind_attributes(shader, &handles);
            shader.draw_points(handles.elements, count);
        }
    }

    fn draw_lines<L: Shader + ?Sized>(&self, line_shader: &mut L, tables: Tables) {
        let state = line_shader.render_state();
        line_shader.set_render_state(RenderState {
            cull_faces: false,
            ..state
        });

        line_shader.bind();
        line_shader.uniform(names::IS_LIGHTED, false.into());
        line_shader.uniform(names::ELEMENT_TYPE, ElementType::Line.into());
        tables.bind(line_shader);

        let bucket = self.bucket(BucketKind::Lines);
        let count = bucket.opaque_elements().len();
        if let Some(handles) = bucket.handles().filter(|_| count > 0) {
            enable_attributes(line_shader);
            bind_attributes(line_shader, &handles);
            line_shader.draw_lines(handles.elements, count);
            disable_attributes(line_shader);
        }

        line_shader.release();
        line_shader.set_render_state(state);
    }

    fn draw_transparent_faces<S: Shader + ?Sized>(
        &self,
        shader: &mut S,
        tables: Tables,
        is_lighted: bool,
        is_ghosted: bool,
    ) {
        shader.bind();
        shader.uniform(names::IS_LIGHTED, is_lighted.into());
        shader.uniform(names::ELEMENT_TYPE, ElementType::Face.into());
        tables.bind(shader);
        enable_attributes(shader);

        let state = shader.render_state();
        shader.set_render_state(RenderState {
            depth_write: false,
            ..state
        });

        for kind in BucketKind::FACES {
            let bucket = self.bucket(kind);
            let Some(handles) = bucket.handles() else {
                continue;
            };

            bind_attributes(shader, &handles);
            draw_triangles(shader, handles.transparent, bucket.transparent_elements().len());
            if is_ghosted {
                draw_triangles(shader, Some(handles.elements), bucket.opaque_elements().len());
            }
        }

        shader.set_render_state(state);
        disable_attributes(shader);
        shader.release();
    }
}
