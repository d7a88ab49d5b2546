use crate::action::KeyEvent;
use glam::Vec2;
use pathtrace_common::MouseButton;

/// Held/released state of the three tracked mouse buttons.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ButtonState {
    left: bool,
    middle: bool,
    right: bool,
}

impl ButtonState {
    pub fn is_held(&self, button: MouseButton) -> bool {
        match button {
            MouseButton::Left => self.left,
            MouseButton::Middle => self.middle,
            MouseButton::Right => self.right,
        }
    }

    pub fn set(&mut self, button: MouseButton, held: bool) {
        let slot = match button {
            MouseButton::Left => &mut self.left,
            MouseButton::Middle => &mut self.middle,
            MouseButton::Right => &mut self.right,
        };
        *slot = held;
    }

    pub fn any_held(&self) -> bool {
        self.left || self.middle || self.right
    }
}

/// Accumulates window input between two frames.
///
/// The window layer's callbacks write into it; the frame loop reads and
/// resets it once per frame. Cursor motion counts toward the drag only while
/// the drag button is held, and stays pending after the release until
/// [`InputTracker::consume_drag`] takes it.
#[derive(Debug)]
pub struct InputTracker {
    buttons: ButtonState,
    drag_button: MouseButton,
    cursor: Option<Vec2>,
    /// Held-button motion not yet consumed.
    drag: Vec2,
    keys: Vec<KeyEvent>,
}

impl Default for InputTracker {
    fn default() -> Self {
        Self::with_drag_button(MouseButton::Left)
    }
}

impl InputTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_drag_button(drag_button: MouseButton) -> Self {
        Self {
            buttons: ButtonState::default(),
            drag_button,
            cursor: None,
            drag: Vec2::ZERO,
            keys: Vec::new(),
        }
    }

    pub fn drag_button(&self) -> MouseButton {
        self.drag_button
    }

    pub fn on_button(&mut self, button: MouseButton, pressed: bool) {
        tracing::trace!(?button, pressed, "mouse button");
        self.buttons.set(button, pressed);
    }

    pub fn on_cursor(&mut self, x: f64, y: f64) {
        let pos = Vec2::new(x as f32, y as f32);
        if self.buttons.is_held(self.drag_button) {
            self.drag += pos - self.cursor.unwrap_or(pos);
        }
        self.cursor = Some(pos);
    }

    pub fn on_key(&mut self, event: KeyEvent) {
        self.keys.push(event);
    }

    pub fn is_held(&self, button: MouseButton) -> bool {
        self.buttons.is_held(button)
    }

    pub fn buttons(&self) -> ButtonState {
        self.buttons
    }

    pub fn cursor_position(&self) -> Option<Vec2> {
        self.cursor
    }

    /// Drag movement since the previous call, then cleared.
    pub fn consume_drag(&mut self) -> Vec2 {
        std::mem::take(&mut self.drag)
    }

    /// Key events received since the previous drain, in arrival order.
    pub fn drain_keys(&mut self) -> std::vec::Drain<'_, KeyEvent> {
        self.keys.drain(..)
    }

    pub fn pending_keys(&self) -> usize {
        self.keys.len()
    }
}
