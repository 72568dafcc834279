//! Boundary with the graphics collaborator.
//!
//! The core never rasterizes anything itself. Nodes describe what to draw in
//! world-space rects and the device turns that into pixels. `RecordingDevice`
//! is a headless implementation that keeps every command in memory; it backs
//! headless runs and the render-phase tests.

use crate::error::{EngineError, EngineResult};
use crate::transform::Rect;
use crate::util::Color;
use glam::Vec2;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureHandle(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FontHandle(pub u32);

/// A texture the device has uploaded, with its pixel size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureInfo {
    pub handle: TextureHandle,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Flip {
    pub horizontal: bool,
    pub vertical: bool,
}

/// Source sub-rectangle in texture pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceRect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawParams {
    pub src: Option<SourceRect>,
    pub tint: Color,
    pub alpha: u8,
    pub flip: Flip,
}

impl Default for DrawParams {
    fn default() -> Self {
        Self {
            src: None,
            tint: Color::WHITE,
            alpha: 255,
            flip: Flip::default(),
        }
    }
}

/// One corner of a triangle mesh. `tex_coord` is normalized and ignored when
/// the mesh has no texture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub position: Vec2,
    pub color: Color,
    pub tex_coord: Vec2,
}

impl Vertex {
    pub fn new(position: Vec2, color: Color) -> Self {
        Self {
            position,
            color,
            tex_coord: Vec2::ZERO,
        }
    }

    pub fn textured(position: Vec2, color: Color, tex_coord: Vec2) -> Self {
        Self {
            position,
            color,
            tex_coord,
        }
    }
}

/// Reject meshes a device cannot draw: indices must form whole triangles and
/// stay inside the vertex list.
pub fn check_geometry(vertices: &[Vertex], indices: &[u32]) -> EngineResult<()> {
    if indices.len() % 3 != 0 {
        return Err(EngineError::misuse(format!(
            "geometry index count {} is not a multiple of 3",
            indices.len()
        )));
    }
    if let Some(bad) = indices.iter().find(|&&i| i as usize >= vertices.len()) {
        return Err(EngineError::misuse(format!(
            "geometry index {bad} out of range for {} vertices",
            vertices.len()
        )));
    }
    Ok(())
}

pub trait RenderDevice {
    /// Acquire the frame target. An error abandons the whole frame.
    fn begin_frame(&mut self) -> EngineResult<()>;
    fn clear(&mut self, color: Color);
    fn set_viewport(&mut self, rect: Rect);
    fn draw_rect(&mut self, dest: Rect, color: Color, filled: bool);
    fn draw_texture(&mut self, texture: TextureHandle, dest: Rect, params: &DrawParams);
    /// Draw an indexed triangle list in world space. Invalid meshes are
    /// logged and skipped.
    fn draw_geometry(
        &mut self,
        texture: Option<TextureHandle>,
        vertices: &[Vertex],
        indices: &[u32],
    );
    fn present(&mut self) -> EngineResult<()>;

    fn load_texture(&mut self, bytes: &[u8], label: &str) -> EngineResult<TextureInfo>;
    fn release_texture(&mut self, texture: TextureHandle);
    fn load_font(&mut self, bytes: &[u8], point_size: f32) -> EngineResult<FontHandle>;
    fn release_font(&mut self, font: FontHandle);
    /// Rasterize a line (or wrapped block) of text into a texture.
    fn render_text(
        &mut self,
        font: FontHandle,
        text: &str,
        color: Color,
        wrap_width: Option<f32>,
    ) -> EngineResult<TextureInfo>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Clear(Color),
    Viewport(Rect),
    Rect {
        dest: Rect,
        color: Color,
        filled: bool,
    },
    Texture {
        texture: TextureHandle,
        dest: Rect,
        params: DrawParams,
    },
    Geometry {
        texture: Option<TextureHandle>,
        vertices: Vec<Vertex>,
        indices: Vec<u32>,
    },
    Present,
}

/// Headless device. Textures are decoded only far enough to learn their size;
/// text is measured with a fixed-advance metric (half the point size per char,
/// one point size per line).
#[derive(Debug, Default)]
pub struct RecordingDevice {
    pub commands: Vec<DrawCommand>,
    pub frames_presented: u64,
    /// When set, `begin_frame` fails, simulating a lost surface.
    pub fail_next_frame: bool,
    next_handle: u32,
    textures: HashMap<TextureHandle, TextureInfo>,
    fonts: HashMap<FontHandle, f32>,
}

impl RecordingDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    pub fn live_fonts(&self) -> usize {
        self.fonts.len()
    }

    /// Commands issued since the last `clear`.
    pub fn last_frame(&self) -> &[DrawCommand] {
        let start = self
            .commands
            .iter()
            .rposition(|c| matches!(c, DrawCommand::Clear(_)))
            .unwrap_or(0);
        &self.commands[start..]
    }

    fn allocate(&mut self) -> u32 {
        self.next_handle += 1;
        self.next_handle
    }
}

impl RenderDevice for RecordingDevice {
    fn begin_frame(&mut self) -> EngineResult<()> {
        if std::mem::take(&mut self.fail_next_frame) {
            return Err(EngineError::setup("surface unavailable"));
        }
        Ok(())
    }

    fn clear(&mut self, color: Color) {
        self.commands.push(DrawCommand::Clear(color));
    }

    fn set_viewport(&mut self, rect: Rect) {
        self.commands.push(DrawCommand::Viewport(rect));
    }

    fn draw_rect(&mut self, dest: Rect, color: Color, filled: bool) {
        self.commands.push(DrawCommand::Rect {
            dest,
            color,
            filled,
        });
    }

    fn draw_texture(&mut self, texture: TextureHandle, dest: Rect, params: &DrawParams) {
        if !self.textures.contains_key(&texture) {
            log::warn!("Draw with unknown texture {:?}", texture);
        }
        self.commands.push(DrawCommand::Texture {
            texture,
            dest,
            params: *params,
        });
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
            log::warn!("Draw with unknown texture {:?}", texture);
        }
        self.commands.push(DrawCommand::Geometry {
            texture,
            vertices: vertices.to_vec(),
            indices: indices.to_vec(),
        });
    }

    fn present(&mut self) -> EngineResult<()> {
        self.commands.push(DrawCommand::Present);
        self.frames_presented += 1;
        Ok(())
    }

    fn load_texture(&mut self, bytes: &[u8], label: &str) -> EngineResult<TextureInfo> {
        let (width, height) = image::ImageReader::new(std::io::Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| EngineError::asset(format!("{label}: {e}")))?
            .into_dimensions()
            .map_err(|e| EngineError::asset(format!("{label}: {e}")))?;
        let handle = TextureHandle(self.allocate());
        let info = TextureInfo {
            handle,
            width,
            height,
        };
        self.textures.insert(handle, info);
        Ok(info)
    }

    fn release_texture(&mut self, texture: TextureHandle) {
        self.textures.remove(&texture);
    }

    fn load_font(&mut self, bytes: &[u8], point_size: f32) -> EngineResult<FontHandle> {
        if bytes.is_empty() {
            return Err(EngineError::asset("empty font data"));
        }
        if point_size <= 0.0 {
            return Err(EngineError::misuse(format!(
                "font point size must be > 0, got {point_size}"
            )));
        }
        let handle = FontHandle(self.allocate());
        self.fonts.insert(handle, point_size);
        Ok(handle)
    }

    fn release_font(&mut self, font: FontHandle) {
        self.fonts.remove(&font);
    }

    fn render_text(
        &mut self,
        font: FontHandle,
        text: &str,
        _color: Color,
        wrap_width: Option<f32>,
    ) -> EngineResult<TextureInfo> {
        let size = *self
            .fonts
            .get(&font)
            .ok_or_else(|| EngineError::misuse(format!("unknown font {:?}", font)))?;
        let advance = size * 0.5;
        let chars = text.chars().count() as f32;
        let natural = chars * advance;
        let (width, lines) = match wrap_width {
            Some(wrap) if wrap > 0.0 && natural > wrap => {
                let per_line = (wrap / advance).floor().max(1.0);
                (per_line * advance, (chars / per_line).ceil())
            }
            _ => (natural, 1.0),
        };
        let handle = TextureHandle(self.allocate());
        let info = TextureInfo {
            handle,
            width: width.ceil() as u32,
            height: (lines * size).ceil() as u32,
        };
        self.textures.insert(handle, info);
        Ok(info)
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::tiny_png;
    use super::*;

    #[test]
    fn load_texture_reads_dimensions() {
        let mut device = RecordingDevice::new();
        let info = device.load_texture(&tiny_png(), "tiny").expect("decode");
        assert_eq!((info.width, info.height), (2, 3));
        assert_eq!(device.live_textures(), 1);
        device.release_texture(info.handle);
        assert_eq!(device.live_textures(), 0);
    }

    #[test]
    fn load_texture_rejects_garbage() {
        let mut device = RecordingDevice::new();
        let err = device
            .load_texture(b"not an image", "junk")
            .expect_err("garbage should fail");
        assert!(matches!(err, EngineError::Asset(_)));
    }

    #[test]
    fn text_metrics_wrap() {
        let mut device = RecordingDevice::new();
        let font = device.load_font(b"font-bytes", 20.0).expect("font");
        let line = device
            .render_text(font, "abcd", Color::WHITE, None)
            .expect("text");
        assert_eq!((line.width, line.height), (40, 20));

        let wrapped = device
            .render_text(font, "abcdefgh", Color::WHITE, Some(40.0))
            .expect("text");
        assert_eq!((wrapped.width, wrapped.height), (40, 40));
    }

    #[test]
    fn render_text_with_unknown_font_fails() {
        let mut device = RecordingDevice::new();
        assert!(device
            .render_text(FontHandle(99), "x", Color::WHITE, None)
            .is_err());
    }

    #[test]
    fn malformed_geometry_is_skipped() {
        let mut device = RecordingDevice::new();
        let tri = [
            Vertex::new(Vec2::ZERO, Color::WHITE),
            Vertex::new(Vec2::new(10.0, 0.0), Color::WHITE),
            Vertex::new(Vec2::new(0.0, 10.0), Color::WHITE),
        ];
        device.draw_geometry(None, &tri, &[0, 1]);
        device.draw_geometry(None, &tri, &[0, 1, 3]);
        assert!(device.commands.is_empty());

        device.draw_geometry(None, &tri, &[0, 1, 2]);
        assert_eq!(device.commands.len(), 1);
        assert!(check_geometry(&tri, &[]).is_ok());
    }

    #[test]
    fn begin_frame_failure_is_one_shot() {
        let mut device = RecordingDevice::new();
        device.fail_next_frame = true;
        assert!(device.begin_frame().is_err());
        assert!(device.begin_frame().is_ok());
    }

    #[test]
    fn last_frame_starts_at_latest_clear() {
        let mut device = RecordingDevice::new();
        device.clear(Color::BLACK);
        device.draw_rect(Rect::new(0.0, 0.0, 1.0, 1.0), Color::WHITE, true);
        device.clear(Color::WHITE);
        device.present().expect("present");
        assert_eq!(device.last_frame().len(), 2);
        assert_eq!(device.frames_presented, 1);
    }
}
