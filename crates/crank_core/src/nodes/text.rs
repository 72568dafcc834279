use crate::behavior::Behavior;
use crate::context::NodeContext;
use crate::device::{DrawParams, FontHandle, RenderDevice, TextureInfo};
use crate::error::{EngineError, EngineResult};
use crate::scene::{NodeId, Scene};
use crate::util::Color;

#[derive(Debug, Clone)]
enum InitialText {
    Line(String),
    Wrapped(String),
}

/// Text rasterized by the device into a texture the node owns. Setting text
/// resizes the node to the rasterized size.
#[derive(Debug, Clone)]
pub struct TextNode {
    font: Option<FontHandle>,
    color: Color,
    text: String,
    texture: Option<TextureInfo>,
    initial: Option<InitialText>,
}

impl Default for TextNode {
    fn default() -> Self {
        Self {
            font: None,
            color: Color::WHITE,
            text: String::new(),
            texture: None,
            initial: None,
        }
    }
}

impl TextNode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_font(font: FontHandle) -> Self {
        Self {
            font: Some(font),
            ..Self::default()
        }
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    /// Text rasterized when the node starts.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.initial = Some(InitialText::Line(text.into()));
        self
    }

    /// Like `with_text`, wrapped to the node's width at start.
    pub fn with_wrapped_text(mut self, text: impl Into<String>) -> Self {
        self.initial = Some(InitialText::Wrapped(text.into()));
        self
    }

    pub fn font(&self) -> Option<FontHandle> {
        self.font
    }

    pub fn set_font(&mut self, font: FontHandle) {
        self.font = Some(font);
    }

    pub fn color(&self) -> Color {
        self.color
    }

    /// Applies from the next `set_text`.
    pub fn set_color(&mut self, color: Color) {
        self.color = color;
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn texture(&self) -> Option<TextureInfo> {
        self.texture
    }

    fn rasterize(
        &mut self,
        device: &mut dyn RenderDevice,
        text: &str,
        wrap_width: Option<f32>,
    ) -> EngineResult<TextureInfo> {
        let font = self.font.ok_or(EngineError::MissingFont)?;
        let info = device.render_text(font, text, self.color, wrap_width)?;
        if let Some(old) = self.texture.replace(info) {
            device.release_texture(old.handle);
        }
        self.text = text.to_string();
        Ok(info)
    }

    /// Rasterize `text` on a live node and resize it. Fails with
    /// `MissingFont` when the node has no font.
    pub fn set_text(
        scene: &mut Scene,
        device: &mut dyn RenderDevice,
        id: NodeId,
        text: &str,
    ) -> EngineResult<()> {
        Self::apply(scene, device, id, text, false)
    }

    /// Like `set_text`, wrapping at the node's current width.
    pub fn set_wrapped_text(
        scene: &mut Scene,
        device: &mut dyn RenderDevice,
        id: NodeId,
        text: &str,
    ) -> EngineResult<()> {
        Self::apply(scene, device, id, text, true)
    }

    fn apply(
        scene: &mut Scene,
        device: &mut dyn RenderDevice,
        id: NodeId,
        text: &str,
        wrapped: bool,
    ) -> EngineResult<()> {
        let wrap_width = match scene.node(id) {
            Some(node) if wrapped => Some(node.rect().w),
            _ => None,
        };
        let node = scene
            .behavior_mut::<TextNode>(id)
            .ok_or_else(|| EngineError::misuse(format!("{id:?} is not a text node")))?;
        let info = node.rasterize(device, text, wrap_width)?;
        if let Some(node) = scene.node_mut(id) {
            node.set_size(info.width as f32, info.height as f32);
        }
        Ok(())
    }
}

impl Behavior for TextNode {
    fn start(&mut self, ctx: &mut NodeContext<'_, '_>) {
        let Some(initial) = self.initial.take() else {
            return;
        };
        let (text, wrap_width) = match &initial {
            InitialText::Line(text) => (text.as_str(), None),
            InitialText::Wrapped(text) => (text.as_str(), Some(ctx.node().rect().w)),
        };
        match self.rasterize(ctx.device(), text, wrap_width) {
            Ok(info) => ctx
                .node_mut()
                .set_size(info.width as f32, info.height as f32),
            Err(e) => log::error!("Failed to set text {text:?}: {e}"),
        }
    }

    fn render(&mut self, ctx: &mut NodeContext<'_, '_>) {
        let Some(texture) = self.texture else {
            return;
        };
        let dest = ctx.world_rect();
        ctx.device()
            .draw_texture(texture.handle, dest, &DrawParams::default());
    }

    fn on_destroy(&mut self, ctx: &mut NodeContext<'_, '_>) {
        if let Some(texture) = self.texture.take() {
            ctx.device().release_texture(texture.handle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::test_support::Harness;
    use crate::device::DrawCommand;
    use crate::transform::Rect;

    #[test]
    fn set_text_without_font_is_an_error() {
        let mut h = Harness::new();
        let mut scene = Scene::new();
        let id = scene.add_root(TextNode::new());
        let err = TextNode::set_text(&mut scene, &mut h.device, id, "hello")
            .expect_err("no font assigned");
        assert!(matches!(err, EngineError::MissingFont));
        assert_eq!(scene.behavior::<TextNode>(id).map(|t| t.text()), Some(""));
    }

    #[test]
    fn set_text_resizes_to_rasterized_size() {
        let mut h = Harness::new();
        let font = h.device.load_font(b"ttf", 20.0).expect("font");
        let mut scene = Scene::new();
        let id = scene.add_root(TextNode::with_font(font));
        TextNode::set_text(&mut scene, &mut h.device, id, "1234").expect("text");
        assert_eq!(scene[id].rect(), Rect::new(0.0, 0.0, 40.0, 20.0));
        assert_eq!(scene.behavior::<TextNode>(id).map(|t| t.text()), Some("1234"));
    }

    #[test]
    fn replacing_text_releases_the_old_texture() {
        let mut h = Harness::new();
        let font = h.device.load_font(b"ttf", 20.0).expect("font");
        let mut scene = Scene::new();
        let id = scene.add_root(TextNode::with_font(font));
        TextNode::set_text(&mut scene, &mut h.device, id, "0").expect("text");
        TextNode::set_text(&mut scene, &mut h.device, id, "10").expect("text");
        assert_eq!(h.device.live_textures(), 1);
        assert_eq!(scene[id].rect().w, 20.0);
    }

    #[test]
    fn wrapped_text_uses_node_width() {
        let mut h = Harness::new();
        let font = h.device.load_font(b"ttf", 20.0).expect("font");
        let mut scene = Scene::new();
        let id = scene.add_root(TextNode::with_font(font));
        scene[id].set_size(40.0, 10.0);
        TextNode::set_wrapped_text(&mut scene, &mut h.device, id, "abcdefgh").expect("text");
        assert_eq!(scene[id].rect(), Rect::new(0.0, 0.0, 40.0, 40.0));
    }

    #[test]
    fn initial_text_applies_at_start_and_renders() {
        let mut h = Harness::new();
        let font = h.device.load_font(b"ttf", 10.0).expect("font");
        let mut scene = Scene::new();
        let id = scene.add_root(TextNode::with_font(font).with_text("score"));
        scene[id].set_position(100.0, 50.0);
        scene.update(&mut h.env(), 0.016);
        scene.render(&mut h.env());

        assert_eq!(scene[id].rect(), Rect::new(100.0, 50.0, 25.0, 10.0));
        assert!(matches!(
            h.device.commands.last(),
            Some(DrawCommand::Texture { dest, .. }) if *dest == Rect::new(100.0, 50.0, 25.0, 10.0)
        ));
    }

    #[test]
    fn destroy_releases_the_text_texture() {
        let mut h = Harness::new();
        let font = h.device.load_font(b"ttf", 10.0).expect("font");
        let mut scene = Scene::new();
        let id = scene.add_root(TextNode::with_font(font).with_text("bye"));
        scene.update(&mut h.env(), 0.016);
        assert_eq!(h.device.live_textures(), 1);
        scene.destroy(id);
        scene.destroy_sweep(&mut h.env());
        assert_eq!(h.device.live_textures(), 0);
    }
}
