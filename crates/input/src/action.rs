use glam::Vec3;
use pathtrace_common::TracerConfig;

/// Window-toolkit-independent key identity. The window layer maps its own
/// key codes onto this; unbound keys arrive as `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    W,
    A,
    S,
    D,
    Q,
    E,
    BracketLeft,
    BracketRight,
    Minus,
    Equal,
    Escape,
    Other,
}

/// A discrete key transition as delivered by the window layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: Key,
    pub pressed: bool,
}

impl KeyEvent {
    pub fn pressed(key: Key) -> Self {
        Self { key, pressed: true }
    }

    pub fn released(key: Key) -> Self {
        Self {
            key,
            pressed: false,
        }
    }
}

/// What a key press asks the tracer to do.
///
/// The frame loop consumes actions, never raw key codes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    /// Translate the camera. `x` is along the camera's right vector, `y`
    /// along world up, `z` along the camera's forward vector.
    Move(Vec3),
    /// Change the vertical field of view by this many radians.
    Zoom(f32),
    /// Multiply the display exposure.
    ScaleExposure(f32),
    /// Ask the window layer to stop the loop.
    Quit,
    /// Unbound key.
    Noop,
}

/// Fixed key layout with configurable step sizes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyBindings {
    pub move_speed: f32,
    /// Radians per zoom key press.
    pub zoom_step: f32,
    pub exposure_step: f32,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self::from_config(&TracerConfig::default())
    }
}

impl KeyBindings {
    pub fn from_config(config: &TracerConfig) -> Self {
        Self {
            move_speed: config.move_speed,
            zoom_step: config.zoom_step_degrees.to_radians(),
            exposure_step: config.exposure_step,
        }
    }

    /// Map a key event to an action. Releases never act.
    pub fn action_for(&self, event: KeyEvent) -> Action {
        if !event.pressed {
            return Action::Noop;
        }
        let s = self.move_speed;
        match event.key {
            Key::W => Action::Move(Vec3::new(0.0, 0.0, s)),
            Key::S => Action::Move(Vec3::new(0.0, 0.0, -s)),
            Key::D => Action::Move(Vec3::new(s, 0.0, 0.0)),
            Key::A => Action::Move(Vec3::new(-s, 0.0, 0.0)),
            Key::E => Action::Move(Vec3::new(0.0, s, 0.0)),
            Key::Q => Action::Move(Vec3::new(0.0, -s, 0.0)),
            Key::BracketLeft => Action::Zoom(-self.zoom_step),
            Key::BracketRight => Action::Zoom(self.zoom_step),
            Key::Minus => Action::ScaleExposure(1.0 / self.exposure_step),
            Key::Equal => Action::ScaleExposure(self.exposure_step),
            Key::Escape => Action::Quit,
            Key::Other => Action::Noop,
        }
    }
}
