//! Rectangles, anchors and the local-to-world rule for scene nodes.
//!
//! World rects are never cached: every query recomputes from the node's own
//! local rect, scale and anchor plus the parent's world rect and scale, so a
//! parent moved mid-frame is reflected immediately.

use bitflags::bitflags;
use glam::Vec2;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }

    pub fn origin(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    /// Half-open containment: the left/top edges are inside, the right/bottom
    /// edges are not.
    pub fn contains_point(&self, point: Vec2) -> bool {
        point.x >= self.x && point.x < self.right() && point.y >= self.y && point.y < self.bottom()
    }

    /// Smallest rect covering both: min of origins, max of far edges.
    pub fn union(&self, other: &Rect) -> Rect {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        Rect::new(x, y, right - x, bottom - y)
    }
}

bitflags! {
    /// Which edge or centre of a rect is treated as its origin.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Anchor: u8 {
        const TOP     = 0b0000_0001;
        const LEFT    = 0b0000_0010;
        const BOTTOM  = 0b0000_0100;
        const RIGHT   = 0b0000_1000;
        const HCENTER = 0b0001_0000;
        const VCENTER = 0b0010_0000;
    }
}

impl Default for Anchor {
    fn default() -> Self {
        Self::TOP | Self::LEFT
    }
}

/// The parent's contribution to a child's world rect.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParentFrame {
    pub world: Rect,
    pub scale: f32,
}

/// Local rect, own scale and anchor, then the single-level parent offset.
///
/// The parent contributes its world origin and multiplies the child's size by
/// the parent's own scale. Position is not scaled by the parent, and scale does
/// not compound further up the chain.
pub fn world_rect(local: Rect, scale: f32, anchor: Anchor, parent: Option<ParentFrame>) -> Rect {
    let mut out = Rect::new(local.x, local.y, local.w * scale, local.h * scale);

    if anchor.contains(Anchor::HCENTER) {
        out.x -= out.w / 2.0;
    } else if anchor.contains(Anchor::RIGHT) {
        out.x -= out.w;
    }

    if anchor.contains(Anchor::VCENTER) {
        out.y -= out.h / 2.0;
    } else if anchor.contains(Anchor::BOTTOM) {
        out.y -= out.h;
    }

    if let Some(parent) = parent {
        out.x += parent.world.x;
        out.y += parent.world.y;
        out.w *= parent.scale;
        out.h *= parent.scale;
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-5;

    fn assert_rect_eq(a: Rect, b: Rect) {
        assert!(
            (a.x - b.x).abs() < EPS
                && (a.y - b.y).abs() < EPS
                && (a.w - b.w).abs() < EPS
                && (a.h - b.h).abs() < EPS,
            "{a:?} != {b:?}"
        );
    }

    #[test]
    fn root_rect_is_local_rect_with_default_anchor() {
        let local = Rect::new(10.0, 20.0, 30.0, 40.0);
        assert_rect_eq(world_rect(local, 1.0, Anchor::default(), None), local);
    }

    #[test]
    fn own_scale_applies_to_size_only() {
        let out = world_rect(Rect::new(10.0, 20.0, 30.0, 40.0), 2.0, Anchor::default(), None);
        assert_rect_eq(out, Rect::new(10.0, 20.0, 60.0, 80.0));
    }

    #[test]
    fn centre_anchor_uses_scaled_size() {
        let anchor = Anchor::HCENTER | Anchor::VCENTER;
        let out = world_rect(Rect::new(100.0, 100.0, 20.0, 10.0), 2.0, anchor, None);
        assert_rect_eq(out, Rect::new(80.0, 90.0, 40.0, 20.0));
    }

    #[test]
    fn right_bottom_anchor_subtracts_full_size() {
        let anchor = Anchor::RIGHT | Anchor::BOTTOM;
        let out = world_rect(Rect::new(100.0, 100.0, 20.0, 10.0), 1.0, anchor, None);
        assert_rect_eq(out, Rect::new(80.0, 90.0, 20.0, 10.0));
    }

    #[test]
    fn hcenter_wins_over_right() {
        let anchor = Anchor::HCENTER | Anchor::RIGHT;
        let out = world_rect(Rect::new(100.0, 0.0, 20.0, 10.0), 1.0, anchor, None);
        assert!((out.x - 90.0).abs() < EPS);
    }

    #[test]
    fn parent_adds_origin_and_scales_size_not_position() {
        let parent = ParentFrame {
            world: Rect::new(50.0, 60.0, 100.0, 100.0),
            scale: 2.0,
        };
        let out = world_rect(
            Rect::new(5.0, 6.0, 10.0, 10.0),
            1.0,
            Anchor::default(),
            Some(parent),
        );
        assert_rect_eq(out, Rect::new(55.0, 66.0, 20.0, 20.0));
    }

    #[test]
    fn contains_point_is_half_open() {
        let r = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(r.contains_point(Vec2::new(0.0, 0.0)));
        assert!(r.contains_point(Vec2::new(9.99, 9.99)));
        assert!(!r.contains_point(Vec2::new(10.0, 5.0)));
        assert!(!r.contains_point(Vec2::new(5.0, 10.0)));
    }

    #[test]
    fn union_reaches_far_edges() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(20.0, 20.0, 5.0, 5.0);
        assert_rect_eq(a.union(&b), Rect::new(0.0, 0.0, 25.0, 25.0));
        assert_rect_eq(b.union(&a), Rect::new(0.0, 0.0, 25.0, 25.0));
    }

    #[test]
    fn default_anchor_is_top_left() {
        assert_eq!(Anchor::default(), Anchor::TOP | Anchor::LEFT);
    }
}
