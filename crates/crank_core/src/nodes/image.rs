use crate::behavior::Behavior;
use crate::cache::{source_label, OwnedSource};
use crate::context::NodeContext;
use crate::device::{DrawParams, Flip, SourceRect, TextureInfo};
use crate::error::{EngineError, EngineResult};
use crate::scene::{NodeId, Scene};
use crate::util::Color;
use std::borrow::Cow;
use std::path::PathBuf;

/// A texture drawn into the node's world rect.
///
/// A node built from a path or bytes loads through the texture cache when it
/// starts, and takes the texture's pixel size as its rect size.
#[derive(Debug, Clone)]
pub struct ImageNode {
    source: Option<OwnedSource>,
    texture: Option<TextureInfo>,
    src: Option<SourceRect>,
    tint: Color,
    alpha: u8,
    flip: Flip,
}

impl Default for ImageNode {
    fn default() -> Self {
        Self {
            source: None,
            texture: None,
            src: None,
            tint: Color::WHITE,
            alpha: 255,
            flip: Flip::default(),
        }
    }
}

impl ImageNode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            source: Some(OwnedSource::Path(path.into())),
            ..Self::default()
        }
    }

    pub fn from_bytes(bytes: impl Into<Cow<'static, [u8]>>) -> Self {
        Self {
            source: Some(OwnedSource::Bytes(bytes.into())),
            ..Self::default()
        }
    }

    /// Use an already loaded texture. The node is resized when it starts.
    pub fn from_texture(texture: TextureInfo) -> Self {
        Self {
            texture: Some(texture),
            ..Self::default()
        }
    }

    /// Swap the texture on a live node and resize it to match.
    pub fn set_texture(scene: &mut Scene, id: NodeId, texture: TextureInfo) -> EngineResult<()> {
        let image = scene
            .behavior_mut::<ImageNode>(id)
            .ok_or_else(|| EngineError::misuse(format!("{id:?} is not an image node")))?;
        image.texture = Some(texture);
        if let Some(node) = scene.node_mut(id) {
            node.set_size(texture.width as f32, texture.height as f32);
        }
        Ok(())
    }

    pub fn texture(&self) -> Option<TextureInfo> {
        self.texture
    }

    pub fn src_rect(&self) -> Option<SourceRect> {
        self.src
    }

    pub fn set_src_rect(&mut self, src: SourceRect) {
        self.src = Some(src);
    }

    pub fn clear_src_rect(&mut self) {
        self.src = None;
    }

    pub fn tint(&self) -> Color {
        self.tint
    }

    /// Colour modulation. Only the RGB channels are used; see `set_alpha`.
    pub fn set_tint(&mut self, tint: Color) {
        self.tint = Color::rgba(tint.r, tint.g, tint.b, 255);
    }

    pub fn alpha(&self) -> u8 {
        self.alpha
    }

    pub fn set_alpha(&mut self, alpha: u8) {
        self.alpha = alpha;
    }

    pub fn flip(&self) -> Flip {
        self.flip
    }

    pub fn set_flip(&mut self, flip: Flip) {
        self.flip = flip;
    }

    pub fn draw_params(&self) -> DrawParams {
        DrawParams {
            src: self.src,
            tint: self.tint,
            alpha: self.alpha,
            flip: self.flip,
        }
    }

    /// Load the pending source, if any. Failures are logged and leave the
    /// node without a texture.
    pub(crate) fn load(&mut self, ctx: &mut NodeContext<'_, '_>) {
        if let Some(source) = self.source.take() {
            match ctx.load_texture(source.as_source()) {
                Ok(info) => self.texture = Some(info),
                Err(e) => log::error!(
                    "Failed to load image {}: {e}",
                    source_label(source.as_source())
                ),
            }
        }
    }

    pub(crate) fn draw(&self, ctx: &mut NodeContext<'_, '_>) {
        let Some(texture) = self.texture else {
            return;
        };
        let dest = ctx.world_rect();
        let params = self.draw_params();
        ctx.device().draw_texture(texture.handle, dest, &params);
    }
}

impl Behavior for ImageNode {
    fn start(&mut self, ctx: &mut NodeContext<'_, '_>) {
        self.load(ctx);
        if let Some(info) = self.texture {
            ctx.node_mut()
                .set_size(info.width as f32, info.height as f32);
        }
    }

    fn render(&mut self, ctx: &mut NodeContext<'_, '_>) {
        self.draw(ctx);
    }
}
