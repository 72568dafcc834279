//! winit events translated into the core's `RawEvent`s. Anything the engine
//! does not track maps to `None` and is dropped.

use crank_core::event::RawEvent;
use crank_core::input::{Key, MouseButton};
use winit::event::{ElementState, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

pub fn map_key(key_code: KeyCode) -> Option<Key> {
    let key = match key_code {
        KeyCode::ArrowLeft => Key::Left,
        KeyCode::ArrowRight => Key::Right,
        KeyCode::ArrowUp => Key::Up,
        KeyCode::ArrowDown => Key::Down,
        KeyCode::Escape => Key::Escape,
        KeyCode::Space => Key::Space,
        KeyCode::Enter => Key::Enter,
        KeyCode::Tab => Key::Tab,
        KeyCode::Backspace => Key::Backspace,
        KeyCode::ShiftLeft => Key::LeftShift,
        KeyCode::ShiftRight => Key::RightShift,
        KeyCode::ControlLeft => Key::LeftCtrl,
        KeyCode::ControlRight => Key::RightCtrl,
        KeyCode::F1 => Key::F1,
        KeyCode::F2 => Key::F2,
        KeyCode::F3 => Key::F3,
        KeyCode::F4 => Key::F4,
        KeyCode::F5 => Key::F5,
        other => return letter_or_digit(other),
    };
    Some(key)
}

fn letter_or_digit(key_code: KeyCode) -> Option<Key> {
    const LETTERS: [(KeyCode, char); 26] = [
        (KeyCode::KeyA, 'A'),
        (KeyCode::KeyB, 'B'),
        (KeyCode::KeyC, 'C'),
        (KeyCode::KeyD, 'D'),
        (KeyCode::KeyE, 'E'),
        (KeyCode::KeyF, 'F'),
        (KeyCode::KeyG, 'G'),
        (KeyCode::KeyH, 'H'),
        (KeyCode::KeyI, 'I'),
        (KeyCode::KeyJ, 'J'),
        (KeyCode::KeyK, 'K'),
        (KeyCode::KeyL, 'L'),
        (KeyCode::KeyM, 'M'),
        (KeyCode::KeyN, 'N'),
        (KeyCode::KeyO, 'O'),
        (KeyCode::KeyP, 'P'),
        (KeyCode::KeyQ, 'Q'),
        (KeyCode::KeyR, 'R'),
        (KeyCode::KeyS, 'S'),
        (KeyCode::KeyT, 'T'),
        (KeyCode::KeyU, 'U'),
        (KeyCode::KeyV, 'V'),
        (KeyCode::KeyW, 'W'),
        (KeyCode::KeyX, 'X'),
        (KeyCode::KeyY, 'Y'),
        (KeyCode::KeyZ, 'Z'),
    ];
    const DIGITS: [KeyCode; 10] = [
        KeyCode::Digit0,
        KeyCode::Digit1,
        KeyCode::Digit2,
        KeyCode::Digit3,
        KeyCode::Digit4,
        KeyCode::Digit5,
        KeyCode::Digit6,
        KeyCode::Digit7,
        KeyCode::Digit8,
        KeyCode::Digit9,
    ];

    if let Some((_, c)) = LETTERS.iter().find(|(code, _)| *code == key_code) {
        return Some(Key::Char(*c));
    }
    DIGITS
        .iter()
        .position(|code| *code == key_code)
        .map(|d| Key::Digit(d as u8))
}

pub fn map_mouse_button(button: winit::event::MouseButton) -> MouseButton {
    match button {
        winit::event::MouseButton::Left => MouseButton::Left,
        winit::event::MouseButton::Right => MouseButton::Right,
        winit::event::MouseButton::Middle => MouseButton::Middle,
        winit::event::MouseButton::Back => MouseButton::Other(3),
        winit::event::MouseButton::Forward => MouseButton::Other(4),
        winit::event::MouseButton::Other(n) => MouseButton::Other(n),
    }
}

/// Pointer positions stay in physical pixels, matching the window's
/// physical inner size.
pub fn translate_window_event(event: &WindowEvent) -> Option<RawEvent> {
    match event {
        WindowEvent::CloseRequested => Some(RawEvent::Quit),
        WindowEvent::Resized(size) => Some(RawEvent::WindowResized {
            width: size.width,
            height: size.height,
        }),
        WindowEvent::Focused(true) => Some(RawEvent::FocusGained),
        WindowEvent::Focused(false) => Some(RawEvent::FocusLost),
        WindowEvent::KeyboardInput { event, .. } => {
            let PhysicalKey::Code(code) = event.physical_key else {
                return None;
            };
            let key = map_key(code)?;
            Some(match event.state {
                ElementState::Pressed => RawEvent::KeyDown(key),
                ElementState::Released => RawEvent::KeyUp(key),
            })
        }
        WindowEvent::CursorMoved { position, .. } => Some(RawEvent::MouseMove {
            x: position.x as f32,
            y: position.y as f32,
        }),
        WindowEvent::MouseInput { state, button, .. } => {
            let button = map_mouse_button(*button);
            Some(match state {
                ElementState::Pressed => RawEvent::MouseDown(button),
                ElementState::Released => RawEvent::MouseUp(button),
            })
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use winit::dpi::PhysicalSize;

    #[test]
    fn named_keys_map() {
        assert_eq!(map_key(KeyCode::ArrowUp), Some(Key::Up));
        assert_eq!(map_key(KeyCode::Escape), Some(Key::Escape));
        assert_eq!(map_key(KeyCode::F3), Some(Key::F3));
        assert_eq!(map_key(KeyCode::NumLock), None);
    }

    #[test]
    fn letters_and_digits_map() {
        assert_eq!(map_key(KeyCode::KeyW), Some(Key::Char('W')));
        assert_eq!(map_key(KeyCode::KeyS), Some(Key::Char('S')));
        assert_eq!(map_key(KeyCode::Digit0), Some(Key::Digit(0)));
        assert_eq!(map_key(KeyCode::Digit7), Some(Key::Digit(7)));
    }

    #[test]
    fn mouse_buttons_map() {
        assert_eq!(map_mouse_button(winit::event::MouseButton::Left), MouseButton::Left);
        assert_eq!(
            map_mouse_button(winit::event::MouseButton::Other(9)),
            MouseButton::Other(9)
        );
    }

    #[test]
    fn window_events_translate() {
        assert_eq!(
            translate_window_event(&WindowEvent::CloseRequested),
            Some(RawEvent::Quit)
        );
        assert_eq!(
            translate_window_event(&WindowEvent::Resized(PhysicalSize::new(640, 480))),
            Some(RawEvent::WindowResized {
                width: 640,
                height: 480
            })
        );
        assert_eq!(
            translate_window_event(&WindowEvent::Focused(false)),
            Some(RawEvent::FocusLost)
        );
        assert_eq!(translate_window_event(&WindowEvent::Destroyed), None);
    }
}
