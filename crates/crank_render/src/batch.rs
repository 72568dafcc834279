//! CPU-side quad batching. Every rect or texture draw of a frame becomes one
//! quad and every geometry draw appends its triangles; consecutive runs that
//! sample the same texture collapse into a single indexed draw call.

use crate::vertex::QuadVertex;
use crank_core::device::{DrawParams, Flip, SourceRect, TextureHandle, Vertex};
use crank_core::transform::Rect;
use crank_core::util::Color;

/// A run of indices sharing one texture. `None` is the built-in white
/// texture used for solid rects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawCall {
    pub texture: Option<TextureHandle>,
    pub index_start: u32,
    pub index_count: u32,
}

#[derive(Debug, Default)]
pub struct QuadBatch {
    pub vertices: Vec<QuadVertex>,
    pub indices: Vec<u32>,
    pub draw_calls: Vec<DrawCall>,
    quads: usize,
}

impl QuadBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.vertices.clear();
        self.indices.clear();
        self.draw_calls.clear();
        self.quads = 0;
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn quad_count(&self) -> usize {
        self.quads
    }

    pub fn push_rect(&mut self, dest: Rect, color: Color) {
        self.push_quad(None, dest, [0.0, 0.0, 1.0, 1.0], vertex_color(color, color.a));
    }

    /// One-pixel border inside `dest`.
    pub fn push_outline(&mut self, dest: Rect, color: Color) {
        if dest.w <= 0.0 || dest.h <= 0.0 {
            return;
        }
        let inner_h = (dest.h - 2.0).max(0.0);
        self.push_rect(Rect::new(dest.x, dest.y, dest.w, 1.0_f32.min(dest.h)), color);
        if dest.h > 1.0 {
            self.push_rect(Rect::new(dest.x, dest.bottom() - 1.0, dest.w, 1.0), color);
        }
        if inner_h > 0.0 {
            self.push_rect(Rect::new(dest.x, dest.y + 1.0, 1.0, inner_h), color);
            if dest.w > 1.0 {
                self.push_rect(Rect::new(dest.right() - 1.0, dest.y + 1.0, 1.0, inner_h), color);
            }
        }
    }

    pub fn push_texture(
        &mut self,
        texture: TextureHandle,
        texture_size: (u32, u32),
        dest: Rect,
        params: &DrawParams,
    ) {
        let uv = uv_rect(params.src, texture_size, params.flip);
        let color = vertex_color(params.tint, params.alpha);
        self.push_quad(Some(texture), dest, uv, color);
    }

    /// Append a triangle list. The caller validates the indices.
    pub fn push_geometry(
        &mut self,
        texture: Option<TextureHandle>,
        vertices: &[Vertex],
        indices: &[u32],
    ) {
        if indices.is_empty() {
            return;
        }
        let base_index = self.vertices.len() as u32;
        self.vertices.extend(vertices.iter().map(|v| QuadVertex {
            position: v.position.to_array(),
            tex_coords: v.tex_coord.to_array(),
            color: vertex_color(v.color, v.color.a),
        }));
        let index_start = self.indices.len() as u32;
        self.indices.extend(indices.iter().map(|i| base_index + i));
        self.push_draw_call(texture, index_start, indices.len() as u32);
    }

    fn push_quad(
        &mut self,
        texture: Option<TextureHandle>,
        dest: Rect,
        [u0, v0, u1, v1]: [f32; 4],
        color: [f32; 4],
    ) {
        let base_index = self.vertices.len() as u32;
        let (x0, y0, x1, y1) = (dest.x, dest.y, dest.right(), dest.bottom());
        self.vertices.extend_from_slice(&[
            QuadVertex {
                position: [x0, y0],
                tex_coords: [u0, v0],
                color,
            },
            QuadVertex {
                position: [x1, y0],
                tex_coords: [u1, v0],
                color,
            },
            QuadVertex {
                position: [x1, y1],
                tex_coords: [u1, v1],
                color,
            },
            QuadVertex {
                position: [x0, y1],
                tex_coords: [u0, v1],
                color,
            },
        ]);

        let index_start = self.indices.len() as u32;
        self.indices.extend_from_slice(&[
            base_index,
            base_index + 1,
            base_index + 2,
            base_index,
            base_index + 2,
            base_index + 3,
        ]);
        self.quads += 1;
        self.push_draw_call(texture, index_start, 6);
    }

    fn push_draw_call(&mut self, texture: Option<TextureHandle>, index_start: u32, index_count: u32) {
        if let Some(last) = self.draw_calls.last_mut() {
            let contiguous = last.index_start + last.index_count == index_start;
            if last.texture == texture && contiguous {
                last.index_count += index_count;
                return;
            }
        }
        self.draw_calls.push(DrawCall {
            texture,
            index_start,
            index_count,
        });
    }
}

/// Normalized `[u0, v0, u1, v1]` for a source rect, swapped per flip axis.
pub fn uv_rect(src: Option<SourceRect>, texture_size: (u32, u32), flip: Flip) -> [f32; 4] {
    let (tw, th) = (texture_size.0.max(1) as f32, texture_size.1.max(1) as f32);
    let [mut u0, mut v0, mut u1, mut v1] = match src {
        Some(src) => [
            src.x as f32 / tw,
            src.y as f32 / th,
            (src.x + src.w) as f32 / tw,
            (src.y + src.h) as f32 / th,
        ],
        None => [0.0, 0.0, 1.0, 1.0],
    };
    if flip.horizontal {
        std::mem::swap(&mut u0, &mut u1);
    }
    if flip.vertical {
        std::mem::swap(&mut v0, &mut v1);
    }
    [u0, v0, u1, v1]
}

/// The surface is sRGB, so colour channels go to the shader linearized.
pub fn vertex_color(color: Color, alpha: u8) -> [f32; 4] {
    let [r, g, b, _] = color.to_f32_array();
    [
        srgb_to_linear(r),
        srgb_to_linear(g),
        srgb_to_linear(b),
        alpha as f32 / 255.0,
    ]
}

fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    const EPS: f32 = 1e-6;

    #[test]
    fn same_texture_quads_merge() {
        let mut batch = QuadBatch::new();
        let tex = TextureHandle(1);
        let params = DrawParams::default();
        batch.push_rect(Rect::new(0.0, 0.0, 10.0, 10.0), Color::WHITE);
        batch.push_rect(Rect::new(10.0, 0.0, 10.0, 10.0), Color::WHITE);
        batch.push_texture(tex, (4, 4), Rect::new(0.0, 0.0, 4.0, 4.0), &params);
        batch.push_texture(tex, (4, 4), Rect::new(4.0, 0.0, 4.0, 4.0), &params);
        batch.push_rect(Rect::new(0.0, 0.0, 1.0, 1.0), Color::BLACK);

        assert_eq!(batch.quad_count(), 5);
        assert_eq!(
            batch.draw_calls,
            vec![
                DrawCall {
                    texture: None,
                    index_start: 0,
                    index_count: 12
                },
                DrawCall {
                    texture: Some(tex),
                    index_start: 12,
                    index_count: 12
                },
                DrawCall {
                    texture: None,
                    index_start: 24,
                    index_count: 6
                },
            ]
        );
    }

    #[test]
    fn quad_corners_follow_dest_rect() {
        let mut batch = QuadBatch::new();
        batch.push_rect(Rect::new(5.0, 6.0, 10.0, 20.0), Color::WHITE);
        let corners: Vec<[f32; 2]> = batch.vertices.iter().map(|v| v.position).collect();
        assert_eq!(corners, vec![[5.0, 6.0], [15.0, 6.0], [15.0, 26.0], [5.0, 26.0]]);
        assert_eq!(batch.indices, vec![0, 1, 2, 0, 2, 3]);
    }

    #[test]
    fn source_rect_and_flip_set_uvs() {
        let src = SourceRect {
            x: 16,
            y: 0,
            w: 16,
            h: 32,
        };
        let uv = uv_rect(Some(src), (64, 32), Flip::default());
        assert_eq!(uv, [0.25, 0.0, 0.5, 1.0]);

        let flipped = uv_rect(
            Some(src),
            (64, 32),
            Flip {
                horizontal: true,
                vertical: true,
            },
        );
        assert_eq!(flipped, [0.5, 1.0, 0.25, 0.0]);
        assert_eq!(uv_rect(None, (8, 8), Flip::default()), [0.0, 0.0, 1.0, 1.0]);
    }

    #[test]
    fn outline_is_four_edges() {
        let mut batch = QuadBatch::new();
        batch.push_outline(Rect::new(0.0, 0.0, 10.0, 10.0), Color::WHITE);
        assert_eq!(batch.quad_count(), 4);
        assert_eq!(batch.draw_calls.len(), 1);

        batch.clear();
        batch.push_outline(Rect::new(0.0, 0.0, 0.0, 10.0), Color::WHITE);
        assert!(batch.is_empty());
    }

    #[test]
    fn geometry_indices_are_offset_and_merge_with_solid_quads() {
        let mut batch = QuadBatch::new();
        batch.push_rect(Rect::new(0.0, 0.0, 1.0, 1.0), Color::WHITE);
        let tri = [
            Vertex::new(Vec2::new(0.0, 0.0), Color::WHITE),
            Vertex::new(Vec2::new(8.0, 0.0), Color::WHITE),
            Vertex::new(Vec2::new(0.0, 8.0), Color::WHITE),
        ];
        batch.push_geometry(None, &tri, &[0, 1, 2]);
        batch.push_geometry(Some(TextureHandle(3)), &tri, &[2, 1, 0]);

        assert_eq!(batch.quad_count(), 1);
        assert_eq!(batch.vertices.len(), 10);
        assert_eq!(&batch.indices[6..], &[4, 5, 6, 9, 8, 7]);
        assert_eq!(batch.vertices[5].position, [8.0, 0.0]);
        assert_eq!(
            batch.draw_calls,
            vec![
                DrawCall {
                    texture: None,
                    index_start: 0,
                    index_count: 9
                },
                DrawCall {
                    texture: Some(TextureHandle(3)),
                    index_start: 9,
                    index_count: 3
                },
            ]
        );
    }

    #[test]
    fn vertex_colors_are_linear_with_straight_alpha() {
        let c = vertex_color(Color::rgb(255, 0, 0), 128);
        assert!((c[0] - 1.0).abs() < EPS);
        assert!(c[1].abs() < EPS);
        assert!((c[3] - 128.0 / 255.0).abs() < EPS);

        let grey = vertex_color(Color::rgb(128, 128, 128), 255);
        assert!((grey[0] - 0.2158605).abs() < 1e-4);
    }
}
