//! Display-only debug overlay rendered via egui on top of the scene.
//!
//! The overlay takes no input. The host feeds it frame statistics with
//! `update`, and the render device calls `paint` once per presented frame
//! after the scene pass:
//!
//!   1. run the egui UI and tessellate it
//!   2. upload textures and buffers (borrows the encoder mutably)
//!   3. paint into a second pass that loads the scene, via `forget_lifetime()`
//!   4. free textures egui no longer references

use crank_core::time::TimeState;
use crank_render::{GpuContext, OverlayPainter, RenderStats};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverlayStats {
    pub fps: f64,
    pub frame_time_ms: f64,
    pub steps_this_frame: u32,
    pub fixed_step_count: u64,
    pub frame_count: u64,
    pub node_count: usize,
}

impl OverlayStats {
    pub fn from_time(time: &TimeState, node_count: usize) -> Self {
        Self {
            fps: time.fps,
            frame_time_ms: time.delta_time * 1000.0,
            steps_this_frame: time.steps_this_frame,
            fixed_step_count: time.fixed_step_count,
            frame_count: time.frame_count,
            node_count,
        }
    }
}

pub fn stat_lines(stats: &OverlayStats, render: &RenderStats) -> Vec<String> {
    vec![
        format!("FPS: {:.1}", stats.fps),
        format!("Frame time: {:.2} ms", stats.frame_time_ms),
        format!("Steps this frame: {}", stats.steps_this_frame),
        format!("Total steps: {}", stats.fixed_step_count),
        format!("Frame: {}", stats.frame_count),
        format!("Nodes: {}", stats.node_count),
        format!("Draw calls: {}", render.draw_calls),
        format!("Quads: {}", render.quads),
        format!("Textures: {}", render.textures),
        format!("Fonts: {}", render.fonts),
    ]
}

pub struct DebugOverlay {
    pub egui_ctx: egui::Context,
    pub egui_renderer: egui_wgpu::Renderer,
    pub visible: bool,
    stats: OverlayStats,
}

impl DebugOverlay {
    pub fn new(device: &wgpu::Device, surface_format: wgpu::TextureFormat) -> Self {
        let egui_ctx = egui::Context::default();
        let egui_renderer = egui_wgpu::Renderer::new(device, surface_format, None, 1, false);

        Self {
            egui_ctx,
            egui_renderer,
            visible: false,
            stats: OverlayStats::default(),
        }
    }

    pub fn toggle(&mut self) {
        self.visible = !self.visible;
        log::info!("Debug overlay: {}", if self.visible { "ON" } else { "OFF" });
    }

    pub fn update(&mut self, stats: OverlayStats) {
        self.stats = stats;
    }
}

impl OverlayPainter for DebugOverlay {
    fn paint(
        &mut self,
        gpu: &GpuContext,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        render: &RenderStats,
    ) {
        if !self.visible {
            return;
        }
        let (width, height) = gpu.size;
        let raw_input = egui::RawInput {
            screen_rect: Some(egui::Rect::from_min_size(
                egui::Pos2::ZERO,
                egui::vec2(width as f32, height as f32),
            )),
            ..Default::default()
        };
        let lines = stat_lines(&self.stats, render);
        let full_output = self.egui_ctx.run(raw_input, |ctx| {
            egui::Window::new("Debug")
                .default_pos([10.0, 10.0])
                .show(ctx, |ui| {
                    for line in &lines {
                        ui.label(line);
                    }
                });
        });

        let primitives = self
            .egui_ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);
        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [width, height],
            pixels_per_point: full_output.pixels_per_point,
        };

        for (id, image_delta) in &full_output.textures_delta.set {
            self.egui_renderer
                .update_texture(&gpu.device, &gpu.queue, *id, image_delta);
        }
        self.egui_renderer.update_buffers(
            &gpu.device,
            &gpu.queue,
            encoder,
            &primitives,
            &screen_descriptor,
        );

        {
            let mut egui_pass = encoder
                .begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("egui Render Pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Load,
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: None,
                    ..Default::default()
                })
                .forget_lifetime();

            self.egui_renderer
                .render(&mut egui_pass, &primitives, &screen_descriptor);
        }

        for id in &full_output.textures_delta.free {
            self.egui_renderer.free_texture(id);
        }
    }
}
