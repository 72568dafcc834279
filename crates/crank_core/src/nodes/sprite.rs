use super::image::ImageNode;
use crate::behavior::Behavior;
use crate::context::NodeContext;
use crate::device::SourceRect;
use glam::Vec2;

/// Seconds each frame stays on screen.
pub const DEFAULT_FRAME_SPEED: f64 = 0.1;

/// An image that steps through source rects of a sheet. Each drawn frame
/// resizes the node to the frame's size.
#[derive(Debug, Clone)]
pub struct SpriteNode {
    image: ImageNode,
    frames: Vec<SourceRect>,
    frame: usize,
    frame_speed: f64,
    playing: bool,
    next_tick: f64,
}

impl SpriteNode {
    pub fn new(image: ImageNode) -> Self {
        Self {
            image,
            frames: Vec::new(),
            frame: 0,
            frame_speed: DEFAULT_FRAME_SPEED,
            playing: false,
            next_tick: 0.0,
        }
    }

    pub fn image(&self) -> &ImageNode {
        &self.image
    }

    pub fn image_mut(&mut self) -> &mut ImageNode {
        &mut self.image
    }

    pub fn play(&mut self) {
        self.playing = true;
    }

    pub fn pause(&mut self) {
        self.playing = false;
    }

    /// Pause and rewind to the first frame.
    pub fn stop(&mut self) {
        self.frame = 0;
        self.playing = false;
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn frame(&self) -> usize {
        self.frame
    }

    pub fn frame_speed(&self) -> f64 {
        self.frame_speed
    }

    pub fn set_frame_speed(&mut self, frame_speed: f64) {
        self.frame_speed = frame_speed;
    }

    pub fn frames(&self) -> &[SourceRect] {
        &self.frames
    }

    pub fn set_frames(&mut self, frames: Vec<SourceRect>) {
        self.frames = frames;
    }

    /// Cut a `columns` x `rows` grid out of a `width` x `height` sheet.
    /// `padding` is the gap between cells and `offset` shifts the grid by
    /// whole cells. Frames are ordered column by column.
    pub fn calculate_frames(
        &mut self,
        width: f32,
        height: f32,
        columns: u32,
        rows: u32,
        padding: Vec2,
        offset: Vec2,
    ) {
        self.frames.clear();
        if columns == 0 || rows == 0 {
            return;
        }
        let cell_w = (width - padding.x * (columns - 1) as f32) / columns as f32;
        let cell_h = (height - padding.y * (rows - 1) as f32) / rows as f32;
        for x in 0..columns {
            for y in 0..rows {
                self.frames.push(SourceRect {
                    x: ((offset.x + x as f32) * (cell_w + padding.x)) as i32,
                    y: ((offset.y + y as f32) * (cell_h + padding.y)) as i32,
                    w: cell_w as i32,
                    h: cell_h as i32,
                });
            }
        }
    }

    /// Advance the frame timer, wrapping to the first frame after the last.
    pub fn advance(&mut self, dt: f64) {
        if !self.playing {
            return;
        }
        self.next_tick += dt;
        if self.next_tick < self.frame_speed {
            return;
        }
        self.frame += 1;
        if self.frame >= self.frames.len() {
            self.frame = 0;
        }
        self.next_tick = 0.0;
    }
}

impl Behavior for SpriteNode {
    fn start(&mut self, ctx: &mut NodeContext<'_, '_>) {
        self.image.load(ctx);
    }

    fn update(&mut self, _ctx: &mut NodeContext<'_, '_>, dt: f64) {
        self.advance(dt);
    }

    fn render(&mut self, ctx: &mut NodeContext<'_, '_>) {
        let Some(&src) = self.frames.get(self.frame) else {
            return;
        };
        self.image.set_src_rect(src);
        ctx.node_mut().set_size(src.w as f32, src.h as f32);
        self.image.draw(ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::test_support::Harness;
    use crate::device::test_support::tiny_png;
    use crate::device::DrawCommand;
    use crate::scene::Scene;
    use crate::transform::Rect;

    fn src(x: i32, y: i32, w: i32, h: i32) -> SourceRect {
        SourceRect { x, y, w, h }
    }

    #[test]
    fn grid_frames_are_column_major() {
        let mut sprite = SpriteNode::new(ImageNode::new());
        sprite.calculate_frames(100.0, 100.0, 2, 2, Vec2::ZERO, Vec2::ZERO);
        assert_eq!(
            sprite.frames(),
            &[
                src(0, 0, 50, 50),
                src(0, 50, 50, 50),
                src(50, 0, 50, 50),
                src(50, 50, 50, 50)
            ]
        );
    }

    #[test]
    fn grid_frames_respect_padding_and_offset() {
        let mut sprite = SpriteNode::new(ImageNode::new());
        sprite.calculate_frames(110.0, 50.0, 2, 1, Vec2::new(10.0, 0.0), Vec2::new(1.0, 0.0));
        assert_eq!(sprite.frames(), &[src(60, 0, 50, 50), src(120, 0, 50, 50)]);

        sprite.calculate_frames(100.0, 100.0, 0, 2, Vec2::ZERO, Vec2::ZERO);
        assert!(sprite.frames().is_empty());
    }

    #[test]
    fn frames_advance_at_frame_speed_and_wrap() {
        let mut sprite = SpriteNode::new(ImageNode::new());
        sprite.calculate_frames(30.0, 10.0, 3, 1, Vec2::ZERO, Vec2::ZERO);

        sprite.advance(1.0);
        assert_eq!(sprite.frame(), 0, "not playing yet");

        sprite.play();
        sprite.advance(0.05);
        assert_eq!(sprite.frame(), 0);
        sprite.advance(0.05);
        assert_eq!(sprite.frame(), 1);
        sprite.advance(0.1);
        assert_eq!(sprite.frame(), 2);
        sprite.advance(0.1);
        assert_eq!(sprite.frame(), 0);

        sprite.advance(0.1);
        sprite.stop();
        assert_eq!(sprite.frame(), 0);
        assert!(!sprite.is_playing());
    }

    #[test]
    fn render_uses_current_frame() {
        let mut h = Harness::new();
        let mut scene = Scene::new();
        let mut sprite = SpriteNode::new(ImageNode::from_bytes(tiny_png()));
        sprite.set_frames(vec![src(0, 0, 1, 1), src(1, 0, 1, 3)]);
        sprite.set_frame_speed(0.5);
        sprite.play();
        let id = scene.add_root(sprite);

        scene.update(&mut h.env(), 0.5);
        scene.render(&mut h.env());
        assert_eq!(scene[id].rect(), Rect::new(0.0, 0.0, 1.0, 3.0));
        match h.device.commands.last() {
            Some(DrawCommand::Texture { params, .. }) => {
                assert_eq!(params.src, Some(src(1, 0, 1, 3)));
            }
            other => panic!("expected a texture draw, got {other:?}"),
        }
    }

    #[test]
    fn sprite_without_frames_draws_nothing() {
        let mut h = Harness::new();
        let mut scene = Scene::new();
        scene.add_root(SpriteNode::new(ImageNode::from_bytes(tiny_png())));
        scene.update(&mut h.env(), 0.016);
        scene.render(&mut h.env());
        assert!(h.device.commands.is_empty());
    }
}
