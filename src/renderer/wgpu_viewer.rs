//! Draws a [`Scene`] with wgpu.

use crate::config::RenderConfig;
use crate::context::Context;
use crate::error::Result;
use crate::renderer::{DrawSequence, Renderer, WgpuProgram};
use crate::resource::WgpuBackend;
use crate::scene::{ObjectId, Scene};

/// Format of the offscreen instance-color target read back for picking.
const INSTANCE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

fn create_target(
    ctxt: &Context,
    label: &str,
    width: u32,
    height: u32,
    format: wgpu::TextureFormat,
    usage: wgpu::TextureUsages,
) -> (wgpu::Texture, wgpu::TextureView) {
    let texture = ctxt.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    (texture, view)
}

fn begin_pass<'e>(
    encoder: &'e mut wgpu::CommandEncoder,
    label: &str,
    color_view: &wgpu::TextureView,
    depth_view: &wgpu::TextureView,
    clear: wgpu::Color,
) -> wgpu::RenderPass<'e> {
    encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(label),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view: color_view,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(clear),
                store: wgpu::StoreOp::Store,
            },
            depth_slice: None,
        })],
        depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
            view: depth_view,
            depth_ops: Some(wgpu::Operations {
                load: wgpu::LoadOp::Clear(1.0),
                store: wgpu::StoreOp::Store,
            }),
            stencil_ops: None,
        }),
        timestamp_writes: None,
        occlusion_query_set: None,
    })
}

/// A [`Renderer`] over wgpu, with the programs and targets one view needs.
pub struct WgpuViewer {
    ctxt: Context,
    renderer: Renderer<WgpuBackend>,
    model: WgpuProgram,
    lines: WgpuProgram,
    instance: WgpuProgram,
    instance_lines: WgpuProgram,
    depth: (wgpu::Texture, wgpu::TextureView),
    instance_target: (wgpu::Texture, wgpu::TextureView),
}

impl WgpuViewer {
    /// Creates a viewer drawing `width` by `height` frames into `ctxt.surface_format` targets.
    pub fn new(ctxt: Context, config: RenderConfig, width: u32, height: u32) -> Self {
        let frame = DrawSequence::new();
        let picking = DrawSequence::new();
        let format = ctxt.surface_format;

        let model = WgpuProgram::new(&ctxt, "model", format).with_sequence(frame.clone());
        let lines = WgpuProgram::new(&ctxt, "lines", format).with_sequence(frame);
        let instance = WgpuProgram::with_blend(&ctxt, "instance", INSTANCE_FORMAT, None)
            .with_sequence(picking.clone());
        let instance_lines = WgpuProgram::with_blend(&ctxt, "instance_lines", INSTANCE_FORMAT, None)
            .with_sequence(picking);

        let mut renderer = Renderer::new(WgpuBackend::new(ctxt.clone()), config);
        renderer.resize(width, height);

        let (depth, instance_target) = Self::create_targets(&ctxt, width, height);

        WgpuViewer {
            ctxt,
            renderer,
            model,
            lines,
            instance,
            instance_lines,
            depth,
            instance_target,
        }
    }

    fn create_targets(
        ctxt: &Context,
        width: u32,
        height: u32,
    ) -> ((wgpu::Texture, wgpu::TextureView), (wgpu::Texture, wgpu::TextureView)) {
        let depth = create_target(
            ctxt,
            "depth_texture",
            width,
            height,
            Context::depth_format(),
            wgpu::TextureUsages::RENDER_ATTACHMENT,
        );
        let instance = create_target(
            ctxt,
            "instance_texture",
            width,
            height,
            INSTANCE_FORMAT,
            wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        );
        (depth, instance)
    }

    #[inline]
    pub fn renderer(&self) -> &Renderer<WgpuBackend> {
        &self.renderer
    }

    #[inline]
    pub fn renderer_mut(&mut self) -> &mut Renderer<WgpuBackend> {
        &mut self.renderer
    }

    /// Resizes the viewport and reallocates the depth and picking targets.
    pub fn resize(&mut self, width: u32, height: u32) {
        if self.renderer.size() == (width.max(1), height.max(1)) {
            return;
        }
        self.renderer.resize(width, height);
        let (depth, instance_target) = Self::create_targets(&self.ctxt, width, height);
        self.depth = depth;
        self.instance_target = instance_target;
    }

    /// Synchronizes the buffers with `scene` and draws one frame into `color_view`.
    ///
    /// Returns the frame rate once per second.
    pub fn render(&mut self, scene: &mut Scene, color_view: &wgpu::TextureView) -> Result<Option<f32>> {
        let _ = self.renderer.sync(scene)?;

        self.model.clear_commands();
        self.lines.clear_commands();
        self.renderer.paint(&mut self.model, &mut self.lines)?;

        let backend = self.renderer.buffers().backend();
        self.model.prepare(backend);
        self.lines.prepare(backend);

        let bg = self.renderer.config().background_color;
        let clear = wgpu::Color {
            r: bg.r as f64,
            g: bg.g as f64,
            b: bg.b as f64,
            a: bg.a as f64,
        };

        let mut encoder = self.ctxt.create_command_encoder(Some("geoview_frame_encoder"));
        {
            let mut pass = begin_pass(&mut encoder, "scene_render_pass", color_view, &self.depth.1, clear);
            WgpuProgram::render_all(&mut pass, backend, &[&self.model, &self.lines]);
        }
        self.ctxt.submit(std::iter::once(encoder.finish()));

        Ok(self.renderer.end_frame())
    }

    /// Draws every object in its instance color into the picking target.
    pub fn render_instances(&mut self, scene: &mut Scene) -> Result<()> {
        let _ = self.renderer.sync(scene)?;

        self.instance.clear_commands();
        self.instance_lines.clear_commands();
        self.renderer
            .paint_instances(&mut self.instance, &mut self.instance_lines);

        let backend = self.renderer.buffers().backend();
        self.instance.prepare(backend);
        self.instance_lines.prepare(backend);

        let mut encoder = self.ctxt.create_command_encoder(Some("geoview_instance_encoder"));
        {
            let mut pass = begin_pass(
                &mut encoder,
                "instance_render_pass",
                &self.instance_target.1,
                &self.depth.1,
                wgpu::Color::BLACK,
            );
            WgpuProgram::render_all(&mut pass, backend, &[&self.instance, &self.instance_lines]);
        }
        self.ctxt.submit(std::iter::once(encoder.finish()));
        Ok(())
    }

    /// Returns the object drawn at pixel (`x`, `y`), origin at the top left.
    ///
    /// Blocks until the GPU has drawn the instance map and copied the pixel back.
    pub fn pick(&mut self, scene: &mut Scene, x: u32, y: u32) -> Result<Option<ObjectId>> {
        let (width, height) = self.renderer.size();
        if x >= width || y >= height {
            return Ok(None);
        }

        self.render_instances(scene)?;

        // A single padded row.
        let row = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let staging = self.ctxt.create_buffer(&wgpu::BufferDescriptor {
            label: Some("pick_staging_buffer"),
            size: row as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = self.ctxt.create_command_encoder(Some("pick_copy_encoder"));
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &self.instance_target.0,
                mip_level: 0,
                origin: wgpu::Origin3d { x, y, z: 0 },
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &staging,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(row),
                    rows_per_image: Some(1),
                },
            },
            wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: 1,
            },
        );
        self.ctxt.submit(std::iter::once(encoder.finish()));

        let slice = staging.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        let _ = self.ctxt.device.poll(wgpu::PollType::wait_indefinitely());

        if !matches!(rx.recv(), Ok(Ok(()))) {
            log::error!("could not read back the instance map");
            return Ok(None);
        }

        let rgb = {
            let data = slice.get_mapped_range();
            [data[0], data[1], data[2]]
        };
        staging.unmap();

        Ok(scene.object_from_instance_color(rgb))
    }
}
