//! Text rasterization on top of egui's font system: egui lays the text out and
//! fills its glyph atlas, and the glyphs are then copied out of that atlas
//! into a standalone RGBA image the quad pipeline can draw.

use crank_core::error::{EngineError, EngineResult};
use crank_core::util::Color;
use egui::epaint::text::Fonts;
use egui::{Color32, FontData, FontDefinitions, FontFamily, FontId};
use std::sync::Arc;

const MAX_ATLAS_SIDE: usize = 8192;
const FONT_NAME: &str = "crank-font";

#[derive(Debug, Clone, PartialEq)]
pub struct RasterizedText {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

/// One font at one point size.
pub struct TextRasterizer {
    fonts: Fonts,
    point_size: f32,
}

impl TextRasterizer {
    /// Load a TrueType/OpenType font.
    pub fn from_bytes(bytes: &[u8], point_size: f32) -> EngineResult<Self> {
        if !looks_like_font(bytes) {
            return Err(EngineError::asset("not a TrueType or OpenType font"));
        }
        let mut definitions = FontDefinitions::empty();
        definitions.font_data.insert(
            FONT_NAME.to_owned(),
            Arc::new(FontData::from_owned(bytes.to_vec())),
        );
        for family in [FontFamily::Proportional, FontFamily::Monospace] {
            definitions
                .families
                .insert(family, vec![FONT_NAME.to_owned()]);
        }
        Self::with_definitions(definitions, point_size)
    }

    /// egui's bundled proportional font.
    pub fn builtin(point_size: f32) -> EngineResult<Self> {
        Self::with_definitions(FontDefinitions::default(), point_size)
    }

    fn with_definitions(definitions: FontDefinitions, point_size: f32) -> EngineResult<Self> {
        if !(point_size > 0.0 && point_size.is_finite()) {
            return Err(EngineError::asset(format!("invalid point size {point_size}")));
        }
        Ok(Self {
            fonts: Fonts::new(1.0, MAX_ATLAS_SIDE, definitions),
            point_size,
        })
    }

    pub fn point_size(&self) -> f32 {
        self.point_size
    }

    pub fn rasterize(&self, text: &str, color: Color, wrap_width: Option<f32>) -> RasterizedText {
        let galley = self.fonts.layout(
            text.to_owned(),
            FontId::new(self.point_size, FontFamily::Proportional),
            Color32::WHITE,
            wrap_width.unwrap_or(f32::INFINITY),
        );
        let size = galley.size();
        let width = size.x.ceil().max(1.0) as u32;
        let height = size.y.ceil().max(1.0) as u32;
        let mut rgba = vec![0u8; (width * height * 4) as usize];

        let atlas = self.fonts.image();
        let atlas_width = atlas.size[0];
        for row in &galley.rows {
            // Glyph positions are relative to their row.
            let origin = egui::Pos2::ZERO; // egui 0.31: glyph positions are already galley-relative
            for glyph in &row.glyphs {
                let uv = glyph.uv_rect;
                if uv.is_nothing() {
                    continue;
                }
                let left = (origin.x + glyph.pos.x + uv.offset.x).round() as i64;
                let top = (origin.y + glyph.pos.y + uv.offset.y).round() as i64;
                for ty in uv.min[1]..uv.max[1] {
                    for tx in uv.min[0]..uv.max[0] {
                        let x = left + i64::from(tx - uv.min[0]);
                        let y = top + i64::from(ty - uv.min[1]);
                        if x < 0 || y < 0 || x >= i64::from(width) || y >= i64::from(height) {
                            continue;
                        }
                        let coverage = atlas
                            .pixels
                            .get(ty as usize * atlas_width + tx as usize)
                            .copied()
                            .unwrap_or(0.0)
                            .clamp(0.0, 1.0);
                        let alpha = (coverage * color.a as f32).round() as u8;
                        let i = ((y as u32 * width + x as u32) * 4) as usize;
                        let pixel = &mut rgba[i..i + 4];
                        pixel[0] = color.r;
                        pixel[1] = color.g;
                        pixel[2] = color.b;
                        pixel[3] = pixel[3].max(alpha);
                    }
                }
            }
        }

        RasterizedText {
            width,
            height,
            rgba,
        }
    }
}

/// sfnt version tags: TrueType, OpenType/CFF, legacy Apple, collection.
fn looks_like_font(bytes: &[u8]) -> bool {
    matches!(
        bytes.get(..4),
        Some([0x00, 0x01, 0x00, 0x00]) | Some(b"OTTO") | Some(b"true") | Some(b"ttcf")
    )
}
