//! The per-frame driver.
//!
//! Each call to [`FrameLoop::update`] walks
//! `Idle → PollInput → UpdateCamera → MaybeSync → Dispatch → Present → Idle`
//! strictly in order, so at most one parameter upload and one dispatch are
//! ever submitted per frame, and a frame's submissions finish before the
//! next frame's sync begins.
//!
//! # Ordering
//! - A framebuffer size change is applied in PollInput: the backend is
//!   drained (`wait_idle`), buffers are resized, and `Resized` is marked.
//!   The resulting upload and accumulation reset happen in the same frame's
//!   MaybeSync, before Dispatch.
//! - A failed resize keeps the old buffers and is retried only once the
//!   framebuffer reports a different size.

use crate::backend::{BackendError, ComputeBackend};
use crate::camera::{Basis, CameraState};
use crate::host::WindowHost;
use crate::stats::FrameStats;
use crate::sync::{DirtyKind, ParamSynchronizer, RenderControls, SyncError};
use glam::Vec2;
use pathtrace_common::{MouseButton, Resolution, TracerConfig};
use pathtrace_input::{Action, InputTracker, KeyBindings};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStage {
    Idle,
    PollInput,
    UpdateCamera,
    MaybeSync,
    Dispatch,
    Present,
}

/// Input handling knobs for the loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopSettings {
    /// Radians per pixel of drag.
    pub look_sensitivity: f32,
    pub drag_button: MouseButton,
    pub bindings: KeyBindings,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self::from_config(&TracerConfig::default())
    }
}

impl LoopSettings {
    pub fn from_config(config: &TracerConfig) -> Self {
        Self {
            look_sensitivity: config.look_sensitivity,
            drag_button: config.drag_button,
            bindings: KeyBindings::from_config(config),
        }
    }
}

/// What happened in one presented frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameReport {
    pub frame: u64,
    pub uploaded: bool,
    pub accumulation_reset: bool,
    pub resized: Option<Resolution>,
    /// Samples per pixel in the presented image.
    pub samples: u64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrameOutcome {
    Presented(FrameReport),
    /// Zero-area framebuffer; nothing was dispatched or presented.
    Suspended,
    /// The host asked to stop and device work has been drained.
    Stopped,
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// Frame skipped; accumulated samples unchanged.
    #[error("device dispatch failed: {0}")]
    DeviceDispatch(#[source] BackendError),
    /// Previous buffers retained; retried on the next size change.
    #[error("failed to resize buffers to {requested}: {source}")]
    BufferResize {
        requested: Resolution,
        #[source]
        source: BackendError,
    },
    /// Parameters stay pending and are uploaded again next frame.
    #[error("parameter upload failed: {0}")]
    ParamUpload(#[source] BackendError),
    #[error("inconsistent parameter state: {0}")]
    InconsistentParamState(#[from] SyncError),
}

impl FrameError {
    /// Errors after which the loop must not keep running.
    pub fn is_fatal(&self) -> bool {
        matches!(self, FrameError::InconsistentParamState(_))
    }
}

enum ResizeStep {
    Unchanged,
    Resized(Resolution),
    Suspended,
}

pub struct FrameLoop<B: ComputeBackend> {
    backend: B,
    camera: CameraState,
    input: InputTracker,
    sync: ParamSynchronizer,
    settings: LoopSettings,
    /// Size of the backend's buffers.
    resolution: Resolution,
    /// Size whose allocation failed; not retried until the framebuffer changes.
    failed_resize: Option<Resolution>,
    basis: Basis,
    stage: FrameStage,
    frame: u64,
    stats: FrameStats,
    quit_requested: bool,
    stopped: bool,
}

impl<B: ComputeBackend> FrameLoop<B> {
    pub fn new(backend: B, config: &TracerConfig) -> Self {
        let camera = CameraState::new(config.start_position, config.fov_y());
        let resolution = backend.resolution();
        let settings = LoopSettings::from_config(config);
        Self {
            basis: camera.basis_vectors(),
            backend,
            camera,
            input: InputTracker::with_drag_button(settings.drag_button),
            sync: ParamSynchronizer::new(RenderControls::from_config(config)),
            settings,
            resolution,
            failed_resize: None,
            stage: FrameStage::Idle,
            frame: 0,
            stats: FrameStats::default(),
            quit_requested: false,
            stopped: false,
        }
    }

    /// Where the window layer's input callbacks write.
    pub fn input_mut(&mut self) -> &mut InputTracker {
        &mut self.input
    }

    pub fn input(&self) -> &InputTracker {
        &self.input
    }

    pub fn camera(&self) -> &CameraState {
        &self.camera
    }

    /// Camera basis as of the last UpdateCamera stage.
    pub fn basis(&self) -> Basis {
        self.basis
    }

    pub fn sync(&self) -> &ParamSynchronizer {
        &self.sync
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn stats(&self) -> &FrameStats {
        &self.stats
    }

    pub fn stage(&self) -> FrameStage {
        self.stage
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Escape was pressed. The window layer decides what to do about it.
    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub fn set_exposure(&mut self, exposure: f32) -> bool {
        self.sync.set_exposure(exposure)
    }

    pub fn set_samples_per_frame(&mut self, samples: u32) -> bool {
        self.sync.set_samples_per_frame(samples)
    }

    /// Run one frame.
    pub fn update<W: WindowHost<B::Image>>(
        &mut self,
        window: &mut W,
    ) -> Result<FrameOutcome, FrameError> {
        if self.stopped {
            return Ok(FrameOutcome::Stopped);
        }
        self.frame += 1;
        let _span = tracing::info_span!("frame", index = self.frame).entered();

        self.stage = FrameStage::Idle;
        if !window.should_keep_running() {
            self.shutdown();
            return Ok(FrameOutcome::Stopped);
        }

        let result = self.run_stages(window);
        self.stage = FrameStage::Idle;
        result
    }

    fn run_stages<W: WindowHost<B::Image>>(
        &mut self,
        window: &mut W,
    ) -> Result<FrameOutcome, FrameError> {
        self.enter(FrameStage::PollInput);
        let resized = match self.poll_resize(window.framebuffer_size())? {
            ResizeStep::Unchanged => None,
            ResizeStep::Resized(size) => Some(size),
            ResizeStep::Suspended => return Ok(FrameOutcome::Suspended),
        };
        let camera_changed = self.poll_input();

        self.enter(FrameStage::UpdateCamera);
        if camera_changed {
            self.basis = self.camera.basis_vectors();
            tracing::trace!(forward = ?self.basis.forward, "camera basis updated");
        }

        self.enter(FrameStage::MaybeSync);
        let (uploaded, accumulation_reset) = self.maybe_sync()?;

        self.enter(FrameStage::Dispatch);
        if let Err(err) = self.backend.dispatch_step() {
            self.stats.failed_dispatches += 1;
            tracing::warn!("dispatch failed, frame skipped: {err}");
            return Err(FrameError::DeviceDispatch(err));
        }
        self.stats.dispatches += 1;

        self.enter(FrameStage::Present);
        window.present(self.backend.current_image());
        self.stats.frames += 1;

        Ok(FrameOutcome::Presented(FrameReport {
            frame: self.frame,
            uploaded,
            accumulation_reset,
            resized,
            samples: self.backend.sample_count(),
        }))
    }

    fn enter(&mut self, stage: FrameStage) {
        tracing::trace!(?stage, "frame stage");
        self.stage = stage;
    }

    fn poll_resize(&mut self, size: Resolution) -> Result<ResizeStep, FrameError> {
        if size.is_empty() {
            return Ok(ResizeStep::Suspended);
        }
        if size == self.resolution {
            self.failed_resize = None;
            return Ok(ResizeStep::Unchanged);
        }
        if self.failed_resize == Some(size) {
            return Ok(ResizeStep::Unchanged);
        }

        // Nothing in flight may still reference the buffers being replaced.
        self.backend.wait_idle();
        match self.backend.resize_buffers(size) {
            Ok(()) => {
                tracing::debug!(from = %self.resolution, to = %size, "accumulation buffers resized");
                self.resolution = size;
                self.failed_resize = None;
                self.sync.mark_dirty(DirtyKind::Resized);
                self.stats.resizes += 1;
                Ok(ResizeStep::Resized(size))
            }
            Err(source) => {
                tracing::warn!(requested = %size, "buffer resize failed: {source}");
                self.failed_resize = Some(size);
                self.stats.failed_resizes += 1;
                Err(FrameError::BufferResize {
                    requested: size,
                    source,
                })
            }
        }
    }

    /// Apply key actions and drag rotation. Returns whether the camera moved.
    fn poll_input(&mut self) -> bool {
        let mut camera_changed = false;

        for event in self.input.drain_keys() {
            let changed = match self.settings.bindings.action_for(event) {
                Action::Move(delta) => self.camera.translate_local(delta),
                Action::Zoom(delta) => self.camera.zoom(delta),
                Action::ScaleExposure(factor) => {
                    let exposure = self.sync.controls().exposure * factor;
                    self.sync.set_exposure(exposure);
                    false
                }
                Action::Quit => {
                    tracing::info!("quit requested");
                    self.quit_requested = true;
                    false
                }
                Action::Noop => false,
            };
            if changed {
                self.sync.mark_dirty(DirtyKind::CameraMoved);
                camera_changed = true;
            }
        }

        let delta = self.input.consume_drag();
        if delta != Vec2::ZERO {
            let s = self.settings.look_sensitivity;
            if self.camera.rotate(delta.x * s, -delta.y * s) {
                self.sync.mark_dirty(DirtyKind::CameraMoved);
                camera_changed = true;
            }
        }

        camera_changed
    }

    fn maybe_sync(&mut self) -> Result<(bool, bool), FrameError> {
        let Some(snapshot) = self.sync.sync_if_needed(&self.camera, self.resolution)? else {
            return Ok((false, false));
        };

        if let Err(err) = self.backend.upload_params(&snapshot.params) {
            self.sync.rollback(&snapshot)?;
            self.stats.failed_uploads += 1;
            tracing::warn!("parameter upload failed: {err}");
            return Err(FrameError::ParamUpload(err));
        }
        if snapshot.reset_accumulation {
            self.backend.reset_accumulation();
            self.stats.accumulation_resets += 1;
        }
        self.sync.commit(&snapshot)?;
        self.stats.uploads += 1;

        Ok((true, snapshot.reset_accumulation))
    }

    /// Drain device work once. Later updates return `Stopped` immediately.
    pub fn shutdown(&mut self) {
        if self.stopped {
            return;
        }
        self.stage = FrameStage::Idle;
        self.backend.wait_idle();
        self.stopped = true;
        tracing::info!(
            frames = self.stats.frames,
            samples = self.backend.sample_count(),
            "frame loop stopped"
        );
    }

    /// Stop and hand back the backend.
    pub fn into_backend(mut self) -> B {
        self.shutdown();
        self.backend
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{AccumulatedFrame, BackendCall, NullBackend};
    use crate::host::ScriptedHost;
    use pathtrace_input::{Key, KeyEvent};

    const START: Resolution = Resolution::new(800, 600);

    type Host = ScriptedHost<AccumulatedFrame>;

    fn setup() -> (FrameLoop<NullBackend>, Host) {
        let fl = FrameLoop::new(NullBackend::new(START), &TracerConfig::default());
        (fl, ScriptedHost::new(START))
    }

    /// Run the first frame and clear the call log.
    fn setup_synced() -> (FrameLoop<NullBackend>, Host) {
        let (mut fl, mut host) = setup();
        presented(fl.update(&mut host));
        fl.backend.take_calls();
        (fl, host)
    }

    fn presented(outcome: Result<FrameOutcome, FrameError>) -> FrameReport {
        match outcome {
            Ok(FrameOutcome::Presented(report)) => report,
            other => panic!("expected a presented frame, got {other:?}"),
        }
    }

    fn begin_drag(fl: &mut FrameLoop<NullBackend>) {
        fl.input_mut().on_cursor(400.0, 300.0);
        fl.input_mut().on_button(MouseButton::Left, true);
    }

    fn move_cursor(fl: &mut FrameLoop<NullBackend>, dx: f32, dy: f32) {
        let p = fl.input().cursor_position().unwrap_or(Vec2::ZERO);
        fl.input_mut().on_cursor((p.x + dx) as f64, (p.y + dy) as f64);
    }

    fn position(calls: &[BackendCall], pred: impl Fn(&BackendCall) -> bool) -> Option<usize> {
        calls.iter().position(pred)
    }

    #[test]
    fn first_frame_uploads_and_resets() {
        let (mut fl, mut host) = setup();
        let report = presented(fl.update(&mut host));
        assert!(report.uploaded);
        assert!(report.accumulation_reset);
        assert_eq!(report.samples, 1);

        let calls = fl.backend().calls();
        assert!(matches!(calls[0], BackendCall::UploadParams(_)));
        assert_eq!(calls[1], BackendCall::ResetAccumulation);
        assert_eq!(calls[2], BackendCall::DispatchStep);
        assert_eq!(calls.len(), 3);
        assert_eq!(host.presented(), 1);
        assert_eq!(fl.stage(), FrameStage::Idle);
    }

    #[test]
    fn idle_frames_reuse_parameters() {
        let (mut fl, mut host) = setup_synced();
        for expected_samples in 2..=4 {
            let report = presented(fl.update(&mut host));
            assert!(!report.uploaded);
            assert_eq!(report.samples, expected_samples);
        }
        assert_eq!(fl.backend().upload_count(), 0);
        assert_eq!(fl.backend().count(|c| *c == BackendCall::DispatchStep), 3);
    }

    #[test]
    fn one_upload_per_frame_with_camera_input() {
        let (mut fl, mut host) = setup_synced();
        begin_drag(&mut fl);

        for i in 0..60u32 {
            let events = if i % 3 == 0 { 0 } else { i % 4 + 1 };
            for _ in 0..events {
                move_cursor(&mut fl, 5.0, 1.0);
            }
            let before = fl.backend().upload_count();
            let report = presented(fl.update(&mut host));
            let uploads = fl.backend().upload_count() - before;

            assert_eq!(uploads, usize::from(events > 0), "frame {i}");
            assert_eq!(report.uploaded, events > 0);
            assert_eq!(report.accumulation_reset, events > 0);
        }
    }

    #[test]
    fn motion_without_drag_button_does_not_rotate() {
        let (mut fl, mut host) = setup_synced();
        let rotation = fl.camera().rotation();
        fl.input_mut().on_cursor(0.0, 0.0);
        fl.input_mut().on_cursor(100.0, 40.0);
        fl.input_mut().on_button(MouseButton::Right, true);
        fl.input_mut().on_cursor(150.0, 40.0);

        let report = presented(fl.update(&mut host));
        assert!(!report.uploaded);
        assert_eq!(fl.camera().rotation(), rotation);
    }

    #[test]
    fn drag_released_before_update_still_rotates() {
        let (mut fl, mut host) = setup_synced();
        let rotation = fl.camera().rotation();
        begin_drag(&mut fl);
        move_cursor(&mut fl, 40.0, 0.0);
        fl.input_mut().on_button(MouseButton::Left, false);

        let report = presented(fl.update(&mut host));
        assert!(report.uploaded);
        assert!(report.accumulation_reset);
        assert_ne!(fl.camera().rotation(), rotation);

        // consumed once
        let report = presented(fl.update(&mut host));
        assert!(!report.uploaded);
    }

    #[test]
    fn frame_indices_start_at_one() {
        let (mut fl, mut host) = setup();
        assert_eq!(presented(fl.update(&mut host)).frame, 1);
        assert_eq!(presented(fl.update(&mut host)).frame, 2);
    }

    #[test]
    fn drag_yaw_shifts_forward() {
        let (mut fl, mut host) = setup_synced();
        let before = fl.basis();
        begin_drag(&mut fl);
        // default sensitivity 0.005 rad/px
        move_cursor(&mut fl, 20.0, 0.0);
        presented(fl.update(&mut host));
        let after = fl.basis();

        let angle = |v: glam::Vec3| v.z.atan2(v.x);
        assert!((angle(after.forward) - angle(before.forward) - 0.1).abs() < 1e-5);
        assert!(after.up.abs_diff_eq(before.up, 1e-5));
        let uploaded = fl.backend().params().unwrap();
        assert_eq!(uploaded.forward, after.forward);
    }

    #[test]
    fn many_events_coalesce_into_one_upload() {
        let (mut fl, mut host) = setup_synced();
        begin_drag(&mut fl);
        move_cursor(&mut fl, 3.0, 0.0);
        move_cursor(&mut fl, 3.0, 2.0);
        fl.input_mut().on_key(KeyEvent::pressed(Key::W));
        fl.input_mut().on_key(KeyEvent::pressed(Key::BracketRight));
        fl.input_mut().on_key(KeyEvent::pressed(Key::Equal));

        let report = presented(fl.update(&mut host));
        assert!(report.uploaded);
        assert!(report.accumulation_reset);
        assert_eq!(fl.backend().upload_count(), 1);

        let params = fl.backend().params().unwrap();
        let basis = fl.camera().basis_vectors();
        assert_eq!(params.forward, basis.forward);
        assert_eq!(params.position, fl.camera().position());
        assert_eq!(params.fov_y, fl.camera().fov_y());
        assert!(params.exposure > 1.0);
    }

    #[test]
    fn exposure_change_uploads_without_reset() {
        let (mut fl, mut host) = setup_synced();
        fl.input_mut().on_key(KeyEvent::pressed(Key::Equal));
        let report = presented(fl.update(&mut host));
        assert!(report.uploaded);
        assert!(!report.accumulation_reset);
        assert_eq!(report.samples, 2);
        assert_eq!(fl.backend().count(|c| *c == BackendCall::ResetAccumulation), 0);
        assert_eq!(fl.backend().params().unwrap().exposure, 1.25);
    }

    #[test]
    fn resize_happens_before_upload_and_dispatch() {
        let (mut fl, mut host) = setup_synced();
        let target = Resolution::new(1024, 768);
        host.set_size(target);

        let report = presented(fl.update(&mut host));
        assert_eq!(report.resized, Some(target));
        assert!(report.accumulation_reset);
        assert_eq!(fl.resolution(), target);

        let calls = fl.backend().calls();
        assert_eq!(calls.len(), 5);
        assert_eq!(calls[0], BackendCall::WaitIdle);
        assert_eq!(calls[1], BackendCall::ResizeBuffers(target));
        match &calls[2] {
            BackendCall::UploadParams(p) => assert_eq!(p.resolution, target),
            other => panic!("expected upload, got {other:?}"),
        }
        assert_eq!(calls[3], BackendCall::ResetAccumulation);
        assert_eq!(calls[4], BackendCall::DispatchStep);
    }

    #[test]
    fn resize_precedes_dispatch_in_every_schedule() {
        let (mut fl, mut host) = setup_synced();
        let mut seed = 0x2545_f491_u32;
        let mut next = move || {
            seed ^= seed << 13;
            seed ^= seed >> 17;
            seed ^= seed << 5;
            seed
        };

        for _ in 0..200 {
            let roll = next();
            if roll % 3 == 0 {
                host.set_size(Resolution::new(320 + next() % 1600, 240 + next() % 900));
            }
            if roll % 5 == 0 {
                begin_drag(&mut fl);
                move_cursor(&mut fl, (next() % 7) as f32, 1.0);
            }
            presented(fl.update(&mut host));

            let calls = fl.backend.take_calls();
            let dispatch = position(&calls, |c| *c == BackendCall::DispatchStep).unwrap();
            if let Some(resize) = position(&calls, |c| matches!(c, BackendCall::ResizeBuffers(_))) {
                assert!(resize < dispatch);
                assert_eq!(calls[resize - 1], BackendCall::WaitIdle);
                let reset = position(&calls, |c| *c == BackendCall::ResetAccumulation).unwrap();
                assert!(resize < reset && reset < dispatch);
            }
            assert_eq!(fl.resolution(), host.framebuffer_size());
        }
    }

    #[test]
    fn failed_resize_keeps_buffers_and_waits_for_next_size() {
        let (mut fl, mut host) = setup_synced();
        let target = Resolution::new(1024, 768);
        host.set_size(target);
        fl.backend.fail_next_resize();

        let err = fl.update(&mut host).unwrap_err();
        assert!(matches!(err, FrameError::BufferResize { requested, .. } if requested == target));
        assert!(!err.is_fatal());
        assert_eq!(fl.resolution(), START);
        assert_eq!(fl.backend().count(|c| *c == BackendCall::DispatchStep), 0);
        fl.backend.take_calls();

        // Same size again: no retry, keep rendering at the old size.
        let report = presented(fl.update(&mut host));
        assert_eq!(report.resized, None);
        assert!(!report.uploaded);
        assert_eq!(fl.backend().calls(), &[BackendCall::DispatchStep]);
        fl.backend.take_calls();

        // A new resize event retries.
        let next = Resolution::new(1280, 720);
        host.set_size(next);
        let report = presented(fl.update(&mut host));
        assert_eq!(report.resized, Some(next));
        assert!(report.accumulation_reset);
        assert_eq!(fl.stats().failed_resizes, 1);
        assert_eq!(fl.stats().resizes, 1);
    }

    #[test]
    fn failed_dispatch_leaves_accumulation_unchanged() {
        let (mut fl, mut host) = setup_synced();
        assert_eq!(fl.backend().sample_count(), 1);
        fl.backend.fail_next_dispatch();

        let err = fl.update(&mut host).unwrap_err();
        assert!(matches!(err, FrameError::DeviceDispatch(_)));
        assert!(!err.is_fatal());
        assert_eq!(fl.backend().sample_count(), 1);
        assert_eq!(host.presented(), 1);
        assert_eq!(fl.stats().failed_dispatches, 1);

        let report = presented(fl.update(&mut host));
        assert!(!report.uploaded);
        assert_eq!(report.samples, 2);
    }

    #[test]
    fn failed_upload_is_retried_next_frame() {
        let (mut fl, mut host) = setup();
        fl.backend.fail_next_upload();

        let err = fl.update(&mut host).unwrap_err();
        assert!(matches!(err, FrameError::ParamUpload(_)));
        assert!(fl.sync().is_dirty());
        assert_eq!(fl.backend().count(|c| *c == BackendCall::DispatchStep), 0);

        let report = presented(fl.update(&mut host));
        assert!(report.uploaded);
        assert!(report.accumulation_reset);
        assert_eq!(fl.stats().failed_uploads, 1);
        assert_eq!(fl.stats().uploads, 1);
    }

    #[test]
    fn zero_area_framebuffer_suspends() {
        let (mut fl, mut host) = setup_synced();
        host.set_size(Resolution::new(0, 600));
        assert_eq!(fl.update(&mut host).unwrap(), FrameOutcome::Suspended);
        assert!(fl.backend().calls().is_empty());
        assert_eq!(fl.resolution(), START);

        host.set_size(START);
        let report = presented(fl.update(&mut host));
        assert_eq!(report.resized, None);
        assert!(!report.uploaded);
    }

    #[test]
    fn stop_drains_once() {
        let (mut fl, mut host) = setup_synced();
        host.stop();
        assert_eq!(fl.update(&mut host).unwrap(), FrameOutcome::Stopped);
        assert_eq!(fl.update(&mut host).unwrap(), FrameOutcome::Stopped);
        assert_eq!(fl.backend().calls(), &[BackendCall::WaitIdle]);
        assert!(fl.is_stopped());
    }

    #[test]
    fn escape_requests_quit() {
        let (mut fl, mut host) = setup_synced();
        fl.input_mut().on_key(KeyEvent::pressed(Key::Escape));
        let report = presented(fl.update(&mut host));
        assert!(!report.uploaded);
        assert!(fl.quit_requested());
    }

    #[test]
    fn presented_image_tracks_samples() {
        let (mut fl, mut host) = setup();
        fl.set_samples_per_frame(4);
        presented(fl.update(&mut host));
        presented(fl.update(&mut host));
        let image = host.last_image().unwrap();
        assert_eq!(image.samples, 8);
        assert_eq!(image.resolution, START);
    }

    #[test]
    fn sync_errors_are_fatal() {
        let err = FrameError::from(SyncError::SnapshotOutstanding { outstanding: 3 });
        assert!(err.is_fatal());
    }

    #[test]
    fn into_backend_drains() {
        let (fl, _host) = setup_synced();
        let backend = fl.into_backend();
        assert_eq!(backend.calls(), &[BackendCall::WaitIdle]);
    }
}
