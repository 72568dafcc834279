//! Boolean AABB overlap. There is no resolution step: callers decide what an
//! overlap means (bounce, score, ignore).
//!
//! Intervals are closed, so rects that only touch along an edge or at a corner
//! count as intersecting. The same rule is used for render culling and for
//! gameplay checks so the two never disagree.

use crate::transform::Rect;

pub fn intersects(a: &Rect, b: &Rect) -> bool {
    a.x <= b.right() && b.x <= a.right() && a.y <= b.bottom() && b.y <= a.bottom()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlapping_rects_intersect() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(5.0, 5.0, 10.0, 10.0);
        assert!(intersects(&a, &b));
        assert!(intersects(&b, &a));
    }

    #[test]
    fn touching_edges_intersect() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let right = Rect::new(10.0, 0.0, 10.0, 10.0);
        let below = Rect::new(0.0, 10.0, 10.0, 10.0);
        let corner = Rect::new(10.0, 10.0, 5.0, 5.0);
        assert!(intersects(&a, &right));
        assert!(intersects(&a, &below));
        assert!(intersects(&a, &corner));
    }

    #[test]
    fn separated_rects_do_not_intersect() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(!intersects(&a, &Rect::new(10.5, 0.0, 10.0, 10.0)));
        assert!(!intersects(&a, &Rect::new(0.0, -20.0, 10.0, 10.0)));
    }

    #[test]
    fn containment_intersects() {
        let outer = Rect::new(0.0, 0.0, 100.0, 100.0);
        let inner = Rect::new(40.0, 40.0, 1.0, 1.0);
        assert!(intersects(&outer, &inner));
        assert!(intersects(&inner, &outer));
    }
}
