//! Raw events as produced by the platform event pump, already translated out
//! of the windowing library's types.

use crate::input::{Key, MouseButton};
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawEvent {
    Quit,
    KeyDown(Key),
    KeyUp(Key),
    /// Pointer position in window coordinates. The root context multiplies
    /// it by the DPI scale once, when the event is consumed.
    MouseMove { x: f32, y: f32 },
    MouseDown(MouseButton),
    MouseUp(MouseButton),
    WindowResized { width: u32, height: u32 },
    FocusGained,
    FocusLost,
}

/// Anything that can hand the blocking loop the events pending this frame.
pub trait EventSource {
    fn poll_events(&mut self) -> Vec<RawEvent>;
}

/// Pre-built event batches, one per frame. Once exhausted every poll reports
/// `Quit`, so a loop driven by it always terminates.
#[derive(Debug, Default)]
pub struct ScriptedEvents {
    frames: VecDeque<Vec<RawEvent>>,
}

impl ScriptedEvents {
    pub fn new(frames: impl IntoIterator<Item = Vec<RawEvent>>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl EventSource for ScriptedEvents {
    fn poll_events(&mut self) -> Vec<RawEvent> {
        self.frames
            .pop_front()
            .unwrap_or_else(|| vec![RawEvent::Quit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripted_events_replay_then_quit() {
        let mut events = ScriptedEvents::new(vec![
            vec![RawEvent::KeyDown(Key::Space)],
            vec![],
        ]);
        assert_eq!(events.poll_events(), vec![RawEvent::KeyDown(Key::Space)]);
        assert!(events.poll_events().is_empty());
        assert_eq!(events.remaining(), 0);
        assert_eq!(events.poll_events(), vec![RawEvent::Quit]);
    }
}
