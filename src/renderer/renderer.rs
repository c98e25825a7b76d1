//! The frame driver: keeps the buffers in sync with a scene and draws them.

use crate::buffer::BufferManager;
use crate::config::{RenderConfig, RenderMode, ViewMode};
use crate::error::Result;
use crate::renderer::shader::names;
use crate::renderer::{Camera, FrameStats, Shader, Uniform};
use crate::resource::GpuBackend;
use crate::scene::{Dirty, RenderObject, Scene};

/// Owns the camera, the configuration and the buffer manager of one view.
pub struct Renderer<B: GpuBackend> {
    /// The camera the next frames are drawn from.
    pub camera: Camera,
    config: RenderConfig,
    buffers: BufferManager<B>,
    width: u32,
    height: u32,
    stats: FrameStats,
    stale: bool,
}

impl<B: GpuBackend> Renderer<B> {
    /// Creates a renderer allocating from `backend`.
    pub fn new(backend: B, config: RenderConfig) -> Self {
        let buffers = BufferManager::new(backend).with_policy(config.element_policy);
        Renderer {
            camera: Camera::default(),
            config,
            buffers,
            width: 800,
            height: 600,
            stats: FrameStats::new(),
            stale: false,
        }
    }

    #[inline]
    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    #[inline]
    pub fn buffers(&self) -> &BufferManager<B> {
        &self.buffers
    }

    #[inline]
    pub fn buffers_mut(&mut self) -> &mut BufferManager<B> {
        &mut self.buffers
    }

    /// The viewport size, in pixels.
    #[inline]
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    #[inline]
    pub fn stats(&self) -> &FrameStats {
        &self.stats
    }

    /// Sets the viewport size used by the projection.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width.max(1);
        self.height = height.max(1);
    }

    /// Switches the render mode. The global opacity follows on the next frame.
    pub fn set_rendermode(&mut self, rendermode: RenderMode) {
        if self.config.rendermode != rendermode {
            log::debug!("render mode: {}", rendermode);
            self.config.rendermode = rendermode;
        }
    }

    pub fn set_viewmode(&mut self, viewmode: ViewMode) {
        self.config.viewmode = viewmode;
    }

    /// Shows or hides grid objects. The buffers are rebuilt on the next sync.
    pub fn set_show_grid(&mut self, show: bool) {
        if self.config.show_grid != show {
            self.config.show_grid = show;
            self.stale = true;
        }
    }

    /// Sets the per-frame uniforms of a program.
    ///
    /// Instance rendering always uses full opacity so every pixel carries an
    /// exact instance color.
    pub fn init_shader<S: Shader + ?Sized>(&self, shader: &mut S, is_instance: bool) {
        let viewmode = self.config.viewmode;
        let opacity = if is_instance { 1.0 } else { self.config.opacity() };

        shader.bind();
        shader.uniform(
            names::PROJECTION,
            self.camera
                .projection(self.width, self.height, viewmode)
                .into(),
        );
        shader.uniform(names::VIEWWORLD, self.camera.viewworld(viewmode).into());
        shader.uniform(
            names::VIEWPORT,
            Uniform::Vec2([self.width as f32, self.height as f32]),
        );
        shader.uniform(names::OPACITY, opacity.into());
        shader.uniform(names::SELECTION_COLOR, self.config.selection_color.into());
        shader.uniform(names::IS_INSTANCE, is_instance.into());
        shader.release();
    }

    /// Clears the buffers and ingests every object of the scene again.
    ///
    /// Grid objects are left out while the grid is hidden.
    pub fn rebuild_buffers(&mut self, scene: &mut Scene) -> Result<()> {
        self.buffers.clear();
        let show_grid = self.config.show_grid;
        for obj in scene.iter().filter(|o| show_grid || !o.geometry().is_grid()) {
            self.buffers.add_object(obj)?;
        }
        self.buffers.create_buffers()?;
        scene.mark_synced();
        self.stale = false;
        Ok(())
    }

    /// Brings the buffers up to date with the scene.
    ///
    /// Pending transform, settings and data changes are written in place. The
    /// buffers are rebuilt when objects were added or removed, or when a change
    /// cannot be applied in place. Returns whether a rebuild happened.
    ///
    /// On any other error the changes not yet applied stay pending.
    pub fn sync(&mut self, scene: &mut Scene) -> Result<bool> {
        if self.stale || scene.needs_rebuild() || !self.buffers.is_created() {
            self.rebuild_buffers(scene)?;
            return Ok(true);
        }

        let pending = scene.take_dirty();
        for (i, &(id, dirty)) in pending.iter().enumerate() {
            let Some(obj) = scene.get(id) else {
                continue;
            };

            match self.apply(obj, dirty) {
                Ok(()) => {}
                Err(err) if err.requires_rebuild() => {
                    log::debug!("{}, rebuilding", err);
                    self.rebuild_buffers(scene)?;
                    return Ok(true);
                }
                Err(err) => {
                    log::error!("could not update {}: {}", id, err);
                    scene.restore_dirty(pending[i..].iter().copied());
                    return Err(err);
                }
            }
        }

        Ok(false)
    }

    fn apply<O: RenderObject + ?Sized>(&mut self, obj: &O, dirty: Dirty) -> Result<()> {
        if dirty.contains(Dirty::SETTINGS) {
            self.buffers.update_object_settings(obj)?;
        }
        if dirty.contains(Dirty::DATA) {
            self.buffers.update_object_data(obj)?;
        }
        if dirty.contains(Dirty::TRANSFORM) {
            self.buffers.update_object_transform(obj)?;
        }
        Ok(())
    }

    /// Draws one frame of the scene.
    pub fn paint<S, L>(&mut self, shader: &mut S, line_shader: &mut L) -> Result<()>
    where
        S: Shader + ?Sized,
        L: Shader + ?Sized,
    {
        let rendermode = self.config.rendermode;
        if self.config.sort_transparent && !rendermode.is_wireframe() {
            let viewworld = self.camera.viewworld(self.config.viewmode);
            let _ = self.buffers.sort_transparent(viewworld)?;
        }

        self.init_shader(shader, false);
        self.init_shader(line_shader, false);
        self.buffers.draw(shader, line_shader, rendermode, false);
        Ok(())
    }

    /// Draws every object in its instance color, for picking.
    pub fn paint_instances<S, L>(&self, instance_shader: &mut S, line_shader: &mut L)
    where
        S: Shader + ?Sized,
        L: Shader + ?Sized,
    {
        self.init_shader(instance_shader, true);
        self.init_shader(line_shader, true);
        self.buffers
            .draw(instance_shader, line_shader, self.config.rendermode, true);
    }

    /// Counts the frame. Returns the frame rate once per second.
    pub fn end_frame(&mut self) -> Option<f32> {
        let fps = self.stats.tick();
        if let Some(fps) = fps {
            log::debug!("{:.1} fps", fps);
        }
        fps
    }
}
