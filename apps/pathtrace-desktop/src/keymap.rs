//! winit events to toolkit-independent input.

use pathtrace_common::MouseButton;
use pathtrace_input::Key;
use winit::event::MouseButton as WinitButton;
use winit::keyboard::KeyCode;

pub fn key(code: KeyCode) -> Key {
    match code {
        KeyCode::KeyW => Key::W,
        KeyCode::KeyA => Key::A,
        KeyCode::KeyS => Key::S,
        KeyCode::KeyD => Key::D,
        KeyCode::KeyQ => Key::Q,
        KeyCode::KeyE => Key::E,
        KeyCode::BracketLeft => Key::BracketLeft,
        KeyCode::BracketRight => Key::BracketRight,
        KeyCode::Minus | KeyCode::NumpadSubtract => Key::Minus,
        KeyCode::Equal | KeyCode::NumpadAdd => Key::Equal,
        KeyCode::Escape => Key::Escape,
        _ => Key::Other,
    }
}

pub fn button(button: WinitButton) -> Option<MouseButton> {
    match button {
        WinitButton::Left => Some(MouseButton::Left),
        WinitButton::Middle => Some(MouseButton::Middle),
        WinitButton::Right => Some(MouseButton::Right),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn movement_keys_map() {
        assert_eq!(key(KeyCode::KeyW), Key::W);
        assert_eq!(key(KeyCode::KeyE), Key::E);
        assert_eq!(key(KeyCode::NumpadAdd), Key::Equal);
        assert_eq!(key(KeyCode::Escape), Key::Escape);
    }

    #[test]
    fn unbound_keys_are_other() {
        assert_eq!(key(KeyCode::KeyZ), Key::Other);
        assert_eq!(key(KeyCode::F1), Key::Other);
    }

    #[test]
    fn extra_buttons_are_dropped() {
        assert_eq!(button(WinitButton::Right), Some(MouseButton::Right));
        assert_eq!(button(WinitButton::Back), None);
        assert_eq!(button(WinitButton::Other(7)), None);
    }
}
