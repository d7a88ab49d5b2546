//! Shared types: render parameter snapshots, resolutions, mouse buttons, configuration.
//!
//! # Invariants
//! - Everything here is plain data; no GPU or window handles.
//! - `RenderParams` is a value type. Whoever holds one holds a complete,
//!   self-consistent copy.

pub mod config;
pub mod types;

pub use config::{ConfigError, MAX_BOUNCES, MAX_FOV_DEGREES, MIN_FOV_DEGREES, TracerConfig};
pub use types::{MouseButton, RenderParams, Resolution};

pub fn crate_info() -> &'static str {
    "pathtrace-common v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("common"));
    }
}
