//! wgpu implementation of the core `RenderDevice`.
//!
//! Draw commands between `begin_frame` and `present` are batched on the CPU
//! (see `QuadBatch`); `present` uploads the batch, records one scene pass and
//! then hands the same target to the overlay painter before submitting.

use crate::batch::{vertex_color, QuadBatch};
use crate::camera::Camera2D;
use crate::gpu_context::GpuContext;
use crate::pipeline::QuadPipeline;
use crate::text::TextRasterizer;
use crate::texture::{decode_rgba8, GpuTexture};
use crate::vertex::QuadVertex;
use crank_core::device::{
    check_geometry, DrawParams, FontHandle, RenderDevice, TextureHandle, TextureInfo, Vertex,
};
use crank_core::error::{EngineError, EngineResult};
use crank_core::transform::Rect;
use crank_core::util::Color;
use std::collections::HashMap;
use std::sync::Arc;
use wgpu::util::DeviceExt;
use winit::window::Window;

const INITIAL_QUAD_CAPACITY: usize = 1024;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub draw_calls: u32,
    pub quads: u32,
    pub textures: u32,
    pub fonts: u32,
}

/// Something drawn on top of the scene in the same frame, such as a debug
/// overlay. It must load the existing contents of `view`.
pub trait OverlayPainter {
    fn paint(
        &mut self,
        gpu: &GpuContext,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        stats: &RenderStats,
    );
}

pub struct NoOverlay;

impl OverlayPainter for NoOverlay {
    fn paint(
        &mut self,
        _gpu: &GpuContext,
        _encoder: &mut wgpu::CommandEncoder,
        _view: &wgpu::TextureView,
        _stats: &RenderStats,
    ) {
    }
}

struct Frame {
    output: wgpu::SurfaceTexture,
    view: wgpu::TextureView,
}

pub struct WgpuDevice<O: OverlayPainter = NoOverlay> {
    gpu: GpuContext,
    pipeline: QuadPipeline,
    camera: Camera2D,
    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
    white: GpuTexture,
    textures: HashMap<TextureHandle, GpuTexture>,
    fonts: HashMap<FontHandle, TextRasterizer>,
    next_handle: u32,
    batch: QuadBatch,
    vertex_buffer: wgpu::Buffer,
    vertex_capacity: usize,
    index_buffer: wgpu::Buffer,
    index_capacity: usize,
    frame: Option<Frame>,
    clear_color: wgpu::Color,
    viewport: Rect,
    overlay: O,
    stats: RenderStats,
}

impl WgpuDevice<NoOverlay> {
    pub fn new(window: Arc<Window>, vsync: bool) -> EngineResult<Self> {
        Self::with_overlay(window, vsync, |_| NoOverlay)
    }
}

impl<O: OverlayPainter> WgpuDevice<O> {
    pub fn with_overlay(
        window: Arc<Window>,
        vsync: bool,
        make_overlay: impl FnOnce(&GpuContext) -> O,
    ) -> EngineResult<Self> {
        let gpu = GpuContext::new(window, vsync)?;
        let pipeline = QuadPipeline::new(&gpu.device, gpu.surface_format);

        let camera = Camera2D::new(gpu.size.0, gpu.size.1);
        let camera_buffer = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Camera Buffer"),
                contents: bytemuck::cast_slice(&[camera.build_uniform()]),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            });
        let camera_bind_group = pipeline.create_camera_bind_group(&gpu.device, &camera_buffer);

        let white = GpuTexture::from_rgba8(
            &gpu.device,
            &gpu.queue,
            &pipeline,
            1,
            1,
            &[255, 255, 255, 255],
            "White",
        );

        let vertex_capacity = INITIAL_QUAD_CAPACITY * 4;
        let index_capacity = INITIAL_QUAD_CAPACITY * 6;
        let vertex_buffer = create_vertex_buffer(&gpu.device, vertex_capacity);
        let index_buffer = create_index_buffer(&gpu.device, index_capacity);
        let overlay = make_overlay(&gpu);
        let viewport = Rect::new(0.0, 0.0, gpu.size.0 as f32, gpu.size.1 as f32);

        Ok(Self {
            gpu,
            pipeline,
            camera,
            camera_buffer,
            camera_bind_group,
            white,
            textures: HashMap::new(),
            fonts: HashMap::new(),
            next_handle: 0,
            batch: QuadBatch::new(),
            vertex_buffer,
            vertex_capacity,
            index_buffer,
            index_capacity,
            frame: None,
            clear_color: wgpu::Color::BLACK,
            viewport,
            overlay,
            stats: RenderStats::default(),
        })
    }

    pub fn gpu(&self) -> &GpuContext {
        &self.gpu
    }

    pub fn overlay(&self) -> &O {
        &self.overlay
    }

    pub fn overlay_mut(&mut self) -> &mut O {
        &mut self.overlay
    }

    /// Stats of the last presented frame.
    pub fn stats(&self) -> RenderStats {
        self.stats
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.gpu.resize(width, height);
    }

    /// A font handle backed by egui's bundled font, for when no font file is
    /// available.
    pub fn builtin_font(&mut self, point_size: f32) -> EngineResult<FontHandle> {
        let raster = TextRasterizer::builtin(point_size)?;
        let handle = FontHandle(self.allocate());
        self.fonts.insert(handle, raster);
        Ok(handle)
    }

    fn allocate(&mut self) -> u32 {
        self.next_handle += 1;
        self.next_handle
    }

    fn upload(&mut self, width: u32, height: u32, rgba: &[u8], label: &str) -> TextureInfo {
        let texture = GpuTexture::from_rgba8(
            &self.gpu.device,
            &self.gpu.queue,
            &self.pipeline,
            width,
            height,
            rgba,
            label,
        );
        let handle = TextureHandle(self.allocate());
        self.textures.insert(handle, texture);
        TextureInfo {
            handle,
            width,
            height,
        }
    }

    fn ensure_capacity(&mut self) {
        let vertex_count = self.batch.vertices.len();
        let index_count = self.batch.indices.len();
        if vertex_count > self.vertex_capacity {
            self.vertex_capacity = vertex_count.next_power_of_two();
            self.vertex_buffer = create_vertex_buffer(&self.gpu.device, self.vertex_capacity);
        }
        if index_count > self.index_capacity {
            self.index_capacity = index_count.next_power_of_two();
            self.index_buffer = create_index_buffer(&self.gpu.device, self.index_capacity);
        }
    }

    /// The render-pass viewport, clamped to the surface.
    fn pass_viewport(&self) -> Option<(f32, f32, f32, f32)> {
        let (sw, sh) = (self.gpu.size.0 as f32, self.gpu.size.1 as f32);
        let x = self.viewport.x.clamp(0.0, sw);
        let y = self.viewport.y.clamp(0.0, sh);
        let w = self.viewport.w.min(sw - x);
        let h = self.viewport.h.min(sh - y);
        (w > 0.0 && h > 0.0).then_some((x, y, w, h))
    }
}

impl<O: OverlayPainter> RenderDevice for WgpuDevice<O> {
    fn begin_frame(&mut self) -> EngineResult<()> {
        let (output, view) = self.gpu.begin_frame()?;
        self.frame = Some(Frame { output, view });
        self.batch.clear();
        Ok(())
    }

    fn clear(&mut self, color: Color) {
        let [r, g, b, a] = vertex_color(color, color.a);
        self.clear_color = wgpu::Color {
            r: r as f64,
            g: g as f64,
            b: b as f64,
            a: a as f64,
        };
    }

    fn set_viewport(&mut self, rect: Rect) {
        self.viewport = rect;
        self.camera.viewport = (rect.w.max(1.0) as u32, rect.h.max(1.0) as u32);
    }

    fn draw_rect(&mut self, dest: Rect, color: Color, filled: bool) {
        if filled {
            self.batch.push_rect(dest, color);
        } else {
            self.batch.push_outline(dest, color);
        }
    }

    fn draw_texture(&mut self, texture: TextureHandle, dest: Rect, params: &DrawParams) {
        let Some(gpu_texture) = self.textures.get(&texture) else {
            log::warn!("draw_texture with unknown handle {texture:?}");
            return;
        };
        let size = (gpu_texture.width, gpu_texture.height);
        self.batch.push_texture(texture, size, dest, params);
    }

    fn draw_geometry(
        &mut self,
        texture: Option<TextureHandle>,
        vertices: &[Vertex],
        indices: &[u32],
    ) {
        if let Err(e) = check_geometry(vertices, indices) {
            log::warn!("Skipping geometry: {e}");
            return;
        }
        if let Some(texture) = texture.filter(|t| !self.textures.contains_key(t)) {
            log::warn!("draw_geometry with unknown handle {texture:?}");
            return;
        }
        self.batch.push_geometry(texture, vertices, indices);
    }

    fn present(&mut self) -> EngineResult<()> {
        let frame = self
            .frame
            .take()
            .ok_or_else(|| EngineError::misuse("present without begin_frame"))?;

        self.gpu.queue.write_buffer(
            &self.camera_buffer,
            0,
            bytemuck::cast_slice(&[self.camera.build_uniform()]),
        );
        self.ensure_capacity();
        if !self.batch.is_empty() {
            self.gpu
                .queue
                .write_buffer(&self.vertex_buffer, 0, bytemuck::cast_slice(&self.batch.vertices));
            self.gpu
                .queue
                .write_buffer(&self.index_buffer, 0, bytemuck::cast_slice(&self.batch.indices));
        }

        self.stats = RenderStats {
            draw_calls: self.batch.draw_calls.len() as u32,
            quads: self.batch.quad_count() as u32,
            textures: self.textures.len() as u32,
            fonts: self.fonts.len() as u32,
        };

        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &frame.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                ..Default::default()
            });

            let viewport = self.pass_viewport().filter(|_| !self.batch.is_empty());
            if let Some((x, y, w, h)) = viewport {
                render_pass.set_viewport(x, y, w, h, 0.0, 1.0);
                render_pass.set_pipeline(&self.pipeline.render_pipeline);
                render_pass.set_bind_group(0, &self.camera_bind_group, &[]);
                render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
                render_pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);

                for draw in &self.batch.draw_calls {
                    let bind_group = match draw.texture {
                        None => &self.white.bind_group,
                        Some(handle) => match self.textures.get(&handle) {
                            Some(texture) => &texture.bind_group,
                            // Released after it was queued this frame.
                            None => continue,
                        },
                    };
                    render_pass.set_bind_group(1, bind_group, &[]);
                    render_pass.draw_indexed(
                        draw.index_start..(draw.index_start + draw.index_count),
                        0,
                        0..1,
                    );
                }
            }
        }

        self.overlay
            .paint(&self.gpu, &mut encoder, &frame.view, &self.stats);

        self.gpu.queue.submit(std::iter::once(encoder.finish()));
        frame.output.present();
        Ok(())
    }

    fn load_texture(&mut self, bytes: &[u8], label: &str) -> EngineResult<TextureInfo> {
        let (width, height, rgba) = decode_rgba8(bytes, label)?;
        let info = self.upload(width, height, &rgba, label);
        log::debug!("Loaded texture {label} ({width}x{height}) as {:?}", info.handle);
        Ok(info)
    }

    fn release_texture(&mut self, texture: TextureHandle) {
        if self.textures.remove(&texture).is_none() {
            log::warn!("release_texture with unknown handle {texture:?}");
        }
    }

    fn load_font(&mut self, bytes: &[u8], point_size: f32) -> EngineResult<FontHandle> {
        let raster = TextRasterizer::from_bytes(bytes, point_size)?;
        let handle = FontHandle(self.allocate());
        self.fonts.insert(handle, raster);
        Ok(handle)
    }

    fn release_font(&mut self, font: FontHandle) {
        if self.fonts.remove(&font).is_none() {
            log::warn!("release_font with unknown handle {font:?}");
        }
    }

    fn render_text(
        &mut self,
        font: FontHandle,
        text: &str,
        color: Color,
        wrap_width: Option<f32>,
    ) -> EngineResult<TextureInfo> {
        let raster = self
            .fonts
            .get(&font)
            .ok_or_else(|| EngineError::misuse(format!("unknown font {font:?}")))?
            .rasterize(text, color, wrap_width);
        Ok(self.upload(raster.width, raster.height, &raster.rgba, "Text"))
    }
}

fn create_vertex_buffer(device: &wgpu::Device, vertex_capacity: usize) -> wgpu::Buffer {
    let byte_len = (vertex_capacity * std::mem::size_of::<QuadVertex>()).max(1) as u64;
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Quad Vertex Buffer"),
        size: byte_len,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

fn create_index_buffer(device: &wgpu::Device, index_capacity: usize) -> wgpu::Buffer {
    let byte_len = (index_capacity * std::mem::size_of::<u32>()).max(1) as u64;
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Quad Index Buffer"),
        size: byte_len,
        usage: wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}
