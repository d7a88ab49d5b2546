//! Frame coordination core: decides each frame what the compute backend
//! must be told, and in which order.
//!
//! # Invariants
//! - The backend only ever receives complete `RenderParams` snapshots.
//! - At most one parameter upload per frame, however many inputs arrived.
//! - Accumulation resets exactly on scene-affecting changes (camera, resize).
//! - Buffer resize happens-before the next upload happens-before the next dispatch.
//!
//! Backends plug in through [`ComputeBackend`]; [`NullBackend`] stands in
//! for a device so everything here is testable without one.

mod backend;
mod camera;
mod frame;
mod host;
mod stats;
mod sync;

pub use backend::{AccumulatedFrame, BackendCall, BackendError, ComputeBackend, NullBackend};
pub use camera::{Basis, CameraRotation, CameraState, MAX_FOV, MIN_FOV, PITCH_LIMIT};
pub use frame::{FrameError, FrameLoop, FrameOutcome, FrameReport, FrameStage, LoopSettings};
pub use host::{ScriptedHost, WindowHost};
pub use stats::{FrameStats, FrameTimer};
pub use sync::{DirtyKind, ParamSnapshot, ParamSynchronizer, RenderControls, SyncError};

pub fn crate_info() -> &'static str {
    "pathtrace-render v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("render"));
    }
}
