//! Input: raw window events accumulated between frames, and key bindings
//! that turn them into tracer actions.
//!
//! # Invariants
//! - No debouncing. Repeated "held" events are the window layer's concern.
//! - Cursor motion counts toward a drag only while the drag button is held.
//!   A drag finished between two frames is still reported on the next one.

pub mod action;
pub mod tracker;

pub use action::{Action, Key, KeyBindings, KeyEvent};
pub use tracker::{ButtonState, InputTracker};

pub fn crate_info() -> &'static str {
    "pathtrace-input v0.1.0"
}
