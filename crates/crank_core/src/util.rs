//! Small math and string helpers used across the engine, plus a deterministic
//! random source for gameplay code.

use serde::Deserialize;

pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    (1.0 - t) * a + b * t
}

/// Position of `v` between `a` and `b`, clamped to `[0, 1]`.
///
/// A degenerate range (`a == b`) is a step function: 1 once `v` reaches `b`.
pub fn inverse_lerp(a: f32, b: f32, v: f32) -> f32 {
    if a == b {
        return if v >= b { 1.0 } else { 0.0 };
    }
    ((v - a) / (b - a)).clamp(0.0, 1.0)
}

pub fn left_pad(content: &str, pad: char, length: usize) -> String {
    let count = content.chars().count();
    if count >= length {
        return content.to_string();
    }
    let mut out: String = std::iter::repeat(pad).take(length - count).collect();
    out.push_str(content);
    out
}

pub fn right_pad(content: &str, pad: char, length: usize) -> String {
    let count = content.chars().count();
    let mut out = content.to_string();
    out.extend(std::iter::repeat(pad).take(length.saturating_sub(count)));
    out
}

/// 8-bit RGBA colour as consumed by the render device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgba(255, 255, 255, 255);
    pub const BLACK: Color = Color::rgba(0, 0, 0, 255);
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::rgba(r, g, b, 255)
    }

    pub fn to_f32_array(self) -> [f32; 4] {
        [
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
            self.a as f32 / 255.0,
        ]
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

/// SplitMix64 generator. Seeded explicitly so replays stay reproducible.
#[derive(Debug, Clone)]
pub struct Rng {
    state: u64,
}

impl Rng {
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Seed from the wall clock, for gameplay that does not need replays.
    pub fn from_time() -> Self {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0x9e37_79b9_7f4a_7c15);
        Self::new(nanos)
    }

    pub fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9e37_79b9_7f4a_7c15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
        z ^ (z >> 31)
    }

    /// Uniform integer in `[min, max]`, both ends inclusive.
    pub fn range_i32(&mut self, min: i32, max: i32) -> i32 {
        let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
        let span = (hi as i64 - lo as i64 + 1) as u64;
        (lo as i64 + (self.next_u64() % span) as i64) as i32
    }

    pub fn boolean(&mut self) -> bool {
        self.next_u64() >> 63 == 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lerp_hits_endpoints_and_midpoint() {
        assert!((lerp(10.0, 20.0, 0.0) - 10.0).abs() < f32::EPSILON);
        assert!((lerp(10.0, 20.0, 1.0) - 20.0).abs() < f32::EPSILON);
        assert!((lerp(10.0, 20.0, 0.5) - 15.0).abs() < f32::EPSILON);
    }

    #[test]
    fn inverse_lerp_clamps() {
        assert!((inverse_lerp(0.0, 10.0, 5.0) - 0.5).abs() < f32::EPSILON);
        assert_eq!(inverse_lerp(0.0, 10.0, -5.0), 0.0);
        assert_eq!(inverse_lerp(0.0, 10.0, 50.0), 1.0);
    }

    #[test]
    fn inverse_lerp_degenerate_range_is_a_step() {
        assert_eq!(inverse_lerp(3.0, 3.0, 2.0), 0.0);
        assert_eq!(inverse_lerp(3.0, 3.0, 3.0), 1.0);
    }

    #[test]
    fn padding() {
        assert_eq!(left_pad("7", '0', 3), "007");
        assert_eq!(right_pad("ab", '.', 4), "ab..");
        assert_eq!(left_pad("1234", '0', 3), "1234");
        assert_eq!(right_pad("1234", '0', 3), "1234");
    }

    #[test]
    fn rng_range_is_inclusive_and_in_bounds() {
        let mut rng = Rng::new(42);
        let mut seen_min = false;
        let mut seen_max = false;
        for _ in 0..1000 {
            let v = rng.range_i32(-2, 2);
            assert!((-2..=2).contains(&v));
            seen_min |= v == -2;
            seen_max |= v == 2;
        }
        assert!(seen_min && seen_max);
    }

    #[test]
    fn rng_accepts_reversed_bounds() {
        let mut rng = Rng::new(1);
        for _ in 0..100 {
            let v = rng.range_i32(5, 1);
            assert!((1..=5).contains(&v));
        }
    }

    #[test]
    fn rng_is_deterministic_per_seed() {
        let mut a = Rng::new(7);
        let mut b = Rng::new(7);
        for _ in 0..32 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
        let flips: Vec<bool> = (0..64).map(|_| a.boolean()).collect();
        assert!(flips.contains(&true) && flips.contains(&false));
    }

    #[test]
    fn color_to_floats() {
        let c = Color::rgba(255, 0, 51, 255).to_f32_array();
        assert!((c[0] - 1.0).abs() < f32::EPSILON);
        assert!((c[2] - 0.2).abs() < 1e-6);
    }
}
