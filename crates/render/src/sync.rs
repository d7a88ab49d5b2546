//! Render parameter synchronization.
//!
//! [`ParamSynchronizer`] is the single owner of the "parameters pending"
//! flag. Any number of changes between two frames collapse into one
//! snapshot, and a snapshot is always built in one piece from the current
//! camera, resolution and controls.
//!
//! A produced snapshot is outstanding until the caller reports the upload
//! result with [`ParamSynchronizer::commit`] or
//! [`ParamSynchronizer::rollback`]. Rolling back restores the pending state,
//! so a failed upload is retried on the next frame.

use crate::camera::CameraState;
use pathtrace_common::{RenderParams, Resolution, TracerConfig};

/// What kind of change made the parameters stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirtyKind {
    CameraMoved,
    Resized,
    ControlChanged,
}

impl DirtyKind {
    /// Whether samples accumulated before this change are still valid.
    pub fn resets_accumulation(self) -> bool {
        match self {
            DirtyKind::CameraMoved | DirtyKind::Resized => true,
            // Exposure is applied at display time and samples-per-frame only
            // changes how fast the mean converges.
            DirtyKind::ControlChanged => false,
        }
    }
}

/// Per-frame scalar controls carried in [`RenderParams`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderControls {
    pub exposure: f32,
    pub samples_per_frame: u32,
    /// Fixed for the lifetime of the synchronizer.
    pub max_bounces: u32,
}

impl Default for RenderControls {
    fn default() -> Self {
        Self::from_config(&TracerConfig::default())
    }
}

impl RenderControls {
    pub fn from_config(config: &TracerConfig) -> Self {
        Self {
            exposure: config.exposure,
            samples_per_frame: config.samples_per_frame.max(1),
            max_bounces: config.max_bounces,
        }
    }
}

/// A complete parameter set ready for upload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamSnapshot {
    pub params: RenderParams,
    /// The backend must drop accumulated samples after uploading this.
    pub reset_accumulation: bool,
    generation: u64,
}

impl ParamSnapshot {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Misuse of the snapshot protocol. Always a programming error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    #[error("snapshot {outstanding} is still awaiting commit or rollback")]
    SnapshotOutstanding { outstanding: u64 },
    #[error("snapshot {got} is not the outstanding snapshot (outstanding: {outstanding:?})")]
    UnknownSnapshot { got: u64, outstanding: Option<u64> },
}

#[derive(Debug)]
pub struct ParamSynchronizer {
    /// Parameters differ from what the backend holds.
    dirty: bool,
    reset_pending: bool,
    controls: RenderControls,
    outstanding: Option<u64>,
    next_generation: u64,
    /// Last committed parameters, i.e. what the backend holds.
    current: Option<RenderParams>,
}

impl Default for ParamSynchronizer {
    fn default() -> Self {
        Self::new(RenderControls::default())
    }
}

impl ParamSynchronizer {
    /// Starts dirty so the first frame always uploads.
    pub fn new(controls: RenderControls) -> Self {
        Self {
            dirty: true,
            reset_pending: true,
            controls,
            outstanding: None,
            next_generation: 0,
            current: None,
        }
    }

    pub fn mark_dirty(&mut self, kind: DirtyKind) {
        tracing::trace!(?kind, "params marked dirty");
        self.dirty = true;
        if kind.resets_accumulation() {
            self.reset_pending = true;
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn reset_pending(&self) -> bool {
        self.reset_pending
    }

    pub fn controls(&self) -> RenderControls {
        self.controls
    }

    /// The parameters the backend currently holds, if any upload succeeded.
    pub fn current(&self) -> Option<&RenderParams> {
        self.current.as_ref()
    }

    /// Set display exposure. Returns false (and marks nothing) when the
    /// value is unchanged or not a positive finite number.
    pub fn set_exposure(&mut self, exposure: f32) -> bool {
        if !(exposure.is_finite() && exposure > 0.0) || exposure == self.controls.exposure {
            return false;
        }
        self.controls.exposure = exposure;
        self.mark_dirty(DirtyKind::ControlChanged);
        true
    }

    pub fn set_samples_per_frame(&mut self, samples: u32) -> bool {
        if samples == 0 || samples == self.controls.samples_per_frame {
            return false;
        }
        self.controls.samples_per_frame = samples;
        self.mark_dirty(DirtyKind::ControlChanged);
        true
    }

    /// Build a fresh snapshot if anything changed since the last one.
    ///
    /// Clears the pending flag. The snapshot must be resolved with
    /// [`commit`](Self::commit) or [`rollback`](Self::rollback) before the
    /// next call.
    pub fn sync_if_needed(
        &mut self,
        camera: &CameraState,
        resolution: Resolution,
    ) -> Result<Option<ParamSnapshot>, SyncError> {
        if let Some(outstanding) = self.outstanding {
            return Err(SyncError::SnapshotOutstanding { outstanding });
        }
        if !self.dirty {
            return Ok(None);
        }

        let basis = camera.basis_vectors();
        let params = RenderParams {
            position: camera.position(),
            forward: basis.forward,
            right: basis.right,
            up: basis.up,
            fov_y: camera.fov_y(),
            resolution,
            exposure: self.controls.exposure,
            samples_per_frame: self.controls.samples_per_frame,
            max_bounces: self.controls.max_bounces,
        };
        let snapshot = ParamSnapshot {
            params,
            reset_accumulation: self.reset_pending,
            generation: self.next_generation,
        };

        self.dirty = false;
        self.reset_pending = false;
        self.outstanding = Some(snapshot.generation);
        self.next_generation += 1;

        tracing::debug!(
            generation = snapshot.generation,
            reset = snapshot.reset_accumulation,
            %resolution,
            "built parameter snapshot"
        );
        Ok(Some(snapshot))
    }

    /// The backend accepted the snapshot.
    pub fn commit(&mut self, snapshot: &ParamSnapshot) -> Result<(), SyncError> {
        self.resolve(snapshot)?;
        self.current = Some(snapshot.params);
        Ok(())
    }

    /// The upload failed; the changes it carried are pending again.
    pub fn rollback(&mut self, snapshot: &ParamSnapshot) -> Result<(), SyncError> {
        self.resolve(snapshot)?;
        self.dirty = true;
        self.reset_pending |= snapshot.reset_accumulation;
        tracing::debug!(generation = snapshot.generation, "parameter snapshot rolled back");
        Ok(())
    }

    fn resolve(&mut self, snapshot: &ParamSnapshot) -> Result<(), SyncError> {
        if self.outstanding != Some(snapshot.generation) {
            return Err(SyncError::UnknownSnapshot {
                got: snapshot.generation,
                outstanding: self.outstanding,
            });
        }
        self.outstanding = None;
        Ok(())
    }
}
