//! Input state tracking with both edge-triggered and level-triggered queries.
//!
//! - **Level-triggered (down):** `is_key_down(key)` returns true every frame the
//!   key is physically down. Used for continuous actions like movement.
//!
//! - **Edge-triggered (pressed / released):** true only during the frame the
//!   transition happened. The root context clears them at the start of every
//!   input phase, before draining the new frame's events, so every node sees
//!   the same snapshot for the whole frame.
//!
//! A down event while the key is already down (OS key repeat) clears the
//! pressed edge instead of setting it: `pressed = !previously_down`.

use glam::Vec2;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Left,
    Right,
    Up,
    Down,
    Escape,
    Space,
    Enter,
    Tab,
    Backspace,
    LeftShift,
    RightShift,
    LeftCtrl,
    RightCtrl,
    F1,
    F2,
    F3,
    F4,
    F5,
    /// Letter keys, stored upper-case (`'A'..='Z'`).
    Char(char),
    /// Digit keys on the main row (`0..=9`).
    Digit(u8),
}

impl Key {
    /// Letter key from any-case ASCII. Non-letters yield `None`.
    pub fn letter(c: char) -> Option<Key> {
        c.is_ascii_alphabetic().then(|| Key::Char(c.to_ascii_uppercase()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    Other(u16),
}

pub struct InputState {
    down: HashSet<Key>,
    pressed: HashSet<Key>,
    released: HashSet<Key>,

    mouse_down: HashSet<MouseButton>,
    mouse_pressed: HashSet<MouseButton>,
    mouse_released: HashSet<MouseButton>,

    pub mouse_position: Vec2,
}

impl InputState {
    pub fn new() -> Self {
        Self {
            down: HashSet::new(),
            pressed: HashSet::new(),
            released: HashSet::new(),
            mouse_down: HashSet::new(),
            mouse_pressed: HashSet::new(),
            mouse_released: HashSet::new(),
            mouse_position: Vec2::ZERO,
        }
    }

    pub fn key_down(&mut self, key: Key) {
        if self.down.insert(key) {
            self.pressed.insert(key);
        } else {
            self.pressed.remove(&key);
        }
    }

    pub fn key_up(&mut self, key: Key) {
        self.down.remove(&key);
        self.pressed.remove(&key);
        self.released.insert(key);
    }

    pub fn mouse_button_down(&mut self, btn: MouseButton) {
        if self.mouse_down.insert(btn) {
            self.mouse_pressed.insert(btn);
        } else {
            self.mouse_pressed.remove(&btn);
        }
    }

    pub fn mouse_button_up(&mut self, btn: MouseButton) {
        self.mouse_down.remove(&btn);
        self.mouse_pressed.remove(&btn);
        self.mouse_released.insert(btn);
    }

    pub fn is_key_down(&self, key: Key) -> bool {
        self.down.contains(&key)
    }

    pub fn is_key_pressed(&self, key: Key) -> bool {
        self.pressed.contains(&key)
    }

    pub fn is_key_released(&self, key: Key) -> bool {
        self.released.contains(&key)
    }

    pub fn is_mouse_down(&self, btn: MouseButton) -> bool {
        self.mouse_down.contains(&btn)
    }

    pub fn is_mouse_pressed(&self, btn: MouseButton) -> bool {
        self.mouse_pressed.contains(&btn)
    }

    pub fn is_mouse_released(&self, btn: MouseButton) -> bool {
        self.mouse_released.contains(&btn)
    }

    /// Drop last frame's edges. Level state and pointer position persist.
    pub fn clear_edges(&mut self) {
        self.pressed.clear();
        self.released.clear();
        self.mouse_pressed.clear();
        self.mouse_released.clear();
    }

    /// Forget everything, e.g. after focus loss when key-ups may never arrive.
    pub fn reset(&mut self) {
        self.clear_edges();
        self.down.clear();
        self.mouse_down.clear();
    }
}

impl Default for InputState {
    fn default() -> Self {
        Self::new()
    }
}
