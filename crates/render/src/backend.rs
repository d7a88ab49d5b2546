use pathtrace_common::{RenderParams, Resolution};

/// Failures reported by a compute backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    #[error("device error: {0}")]
    Device(String),
    #[error("out of device memory: {0}")]
    OutOfMemory(String),
    #[error("no parameters uploaded yet")]
    NotReady,
}

/// The compute side of the tracer, as seen by the frame loop.
///
/// All calls return once the work is submitted; execution may still be
/// pending on the device. Implementations copy what they need out of
/// borrowed arguments and keep no alias past the call.
pub trait ComputeBackend {
    /// Handle to the accumulated image, handed to the window layer.
    type Image;

    /// Size of the accumulation buffers.
    fn resolution(&self) -> Resolution;

    fn upload_params(&mut self, params: &RenderParams) -> Result<(), BackendError>;

    /// Drop all accumulated samples. The next dispatch starts a new image.
    fn reset_accumulation(&mut self);

    /// Reallocate accumulation buffers. On failure the previous buffers
    /// stay in place and usable.
    fn resize_buffers(&mut self, resolution: Resolution) -> Result<(), BackendError>;

    /// Add one pass of `samples_per_frame` samples to the accumulation.
    /// A failed dispatch leaves the sample count untouched.
    fn dispatch_step(&mut self) -> Result<(), BackendError>;

    fn current_image(&self) -> Self::Image;

    /// Samples per pixel accumulated since the last reset.
    fn sample_count(&self) -> u64;

    /// Block until all submitted device work has finished.
    fn wait_idle(&mut self);
}

/// One recorded call on a [`NullBackend`].
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    UploadParams(RenderParams),
    ResetAccumulation,
    ResizeBuffers(Resolution),
    DispatchStep,
    WaitIdle,
}

/// What a [`NullBackend`] "presents".
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AccumulatedFrame {
    pub resolution: Resolution,
    pub samples: u64,
    pub exposure: f32,
}

/// Device-free backend: records every call and fakes accumulation.
///
/// Stands in for a GPU in tests and headless runs. Faults can be injected
/// for the next upload, dispatch or resize.
#[derive(Debug, Default)]
pub struct NullBackend {
    resolution: Resolution,
    params: Option<RenderParams>,
    samples: u64,
    calls: Vec<BackendCall>,
    fail_next_upload: bool,
    fail_next_dispatch: bool,
    fail_next_resize: bool,
}

impl NullBackend {
    pub fn new(resolution: Resolution) -> Self {
        Self {
            resolution,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> &[BackendCall] {
        &self.calls
    }

    pub fn take_calls(&mut self) -> Vec<BackendCall> {
        std::mem::take(&mut self.calls)
    }

    pub fn params(&self) -> Option<&RenderParams> {
        self.params.as_ref()
    }

    pub fn upload_count(&self) -> usize {
        self.count(|c| matches!(c, BackendCall::UploadParams(_)))
    }

    pub fn count(&self, pred: impl Fn(&BackendCall) -> bool) -> usize {
        self.calls.iter().filter(|c| pred(c)).count()
    }

    pub fn fail_next_upload(&mut self) {
        self.fail_next_upload = true;
    }

    pub fn fail_next_dispatch(&mut self) {
        self.fail_next_dispatch = true;
    }

    pub fn fail_next_resize(&mut self) {
        self.fail_next_resize = true;
    }
}

impl ComputeBackend for NullBackend {
    type Image = AccumulatedFrame;

    fn resolution(&self) -> Resolution {
        self.resolution
    }

    fn upload_params(&mut self, params: &RenderParams) -> Result<(), BackendError> {
        self.calls.push(BackendCall::UploadParams(*params));
        if std::mem::take(&mut self.fail_next_upload) {
            return Err(BackendError::Device("injected upload failure".into()));
        }
        self.params = Some(*params);
        Ok(())
    }

    fn reset_accumulation(&mut self) {
        self.calls.push(BackendCall::ResetAccumulation);
        self.samples = 0;
    }

    fn resize_buffers(&mut self, resolution: Resolution) -> Result<(), BackendError> {
        self.calls.push(BackendCall::ResizeBuffers(resolution));
        if std::mem::take(&mut self.fail_next_resize) {
            return Err(BackendError::OutOfMemory(format!(
                "injected failure allocating {resolution}"
            )));
        }
        self.resolution = resolution;
        self.samples = 0;
        Ok(())
    }

    fn dispatch_step(&mut self) -> Result<(), BackendError> {
        self.calls.push(BackendCall::DispatchStep);
        if std::mem::take(&mut self.fail_next_dispatch) {
            return Err(BackendError::Device("injected dispatch failure".into()));
        }
        let params = self.params.as_ref().ok_or(BackendError::NotReady)?;
        self.samples += params.samples_per_frame as u64;
        Ok(())
    }

    fn current_image(&self) -> AccumulatedFrame {
        AccumulatedFrame {
            resolution: self.resolution,
            samples: self.samples,
            exposure: self.params.map_or(1.0, |p| p.exposure),
        }
    }

    fn sample_count(&self) -> u64 {
        self.samples
    }

    fn wait_idle(&mut self) {
        self.calls.push(BackendCall::WaitIdle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn params(samples_per_frame: u32) -> RenderParams {
        RenderParams {
            position: Vec3::ZERO,
            forward: Vec3::NEG_Z,
            right: Vec3::X,
            up: Vec3::Y,
            fov_y: 1.0,
            resolution: Resolution::new(4, 4),
            exposure: 1.0,
            samples_per_frame,
            max_bounces: 2,
        }
    }

    #[test]
    fn dispatch_before_upload_is_not_ready() {
        let mut backend = NullBackend::new(Resolution::new(4, 4));
        assert_eq!(backend.dispatch_step(), Err(BackendError::NotReady));
        assert_eq!(backend.sample_count(), 0);
    }

    #[test]
    fn dispatch_accumulates_samples_per_frame() {
        let mut backend = NullBackend::new(Resolution::new(4, 4));
        backend.upload_params(&params(3)).unwrap();
        backend.dispatch_step().unwrap();
        backend.dispatch_step().unwrap();
        assert_eq!(backend.sample_count(), 6);
        backend.reset_accumulation();
        assert_eq!(backend.sample_count(), 0);
    }

    #[test]
    fn injected_dispatch_failure_keeps_samples() {
        let mut backend = NullBackend::new(Resolution::new(4, 4));
        backend.upload_params(&params(1)).unwrap();
        backend.dispatch_step().unwrap();
        backend.fail_next_dispatch();
        assert!(backend.dispatch_step().is_err());
        assert_eq!(backend.sample_count(), 1);
        backend.dispatch_step().unwrap();
        assert_eq!(backend.sample_count(), 2);
    }

    #[test]
    fn injected_resize_failure_keeps_buffers() {
        let mut backend = NullBackend::new(Resolution::new(4, 4));
        backend.fail_next_resize();
        let err = backend.resize_buffers(Resolution::new(8, 8)).unwrap_err();
        assert!(matches!(err, BackendError::OutOfMemory(_)));
        assert_eq!(backend.resolution(), Resolution::new(4, 4));
        backend.resize_buffers(Resolution::new(8, 8)).unwrap();
        assert_eq!(backend.resolution(), Resolution::new(8, 8));
    }

    #[test]
    fn calls_are_recorded_in_order() {
        let mut backend = NullBackend::new(Resolution::new(4, 4));
        backend.wait_idle();
        backend.resize_buffers(Resolution::new(2, 2)).unwrap();
        backend.upload_params(&params(1)).unwrap();
        backend.reset_accumulation();
        backend.dispatch_step().unwrap();
        let calls = backend.take_calls();
        assert_eq!(calls.len(), 5);
        assert_eq!(calls[0], BackendCall::WaitIdle);
        assert_eq!(calls[1], BackendCall::ResizeBuffers(Resolution::new(2, 2)));
        assert!(matches!(calls[2], BackendCall::UploadParams(_)));
        assert_eq!(calls[3], BackendCall::ResetAccumulation);
        assert_eq!(calls[4], BackendCall::DispatchStep);
        assert!(backend.calls().is_empty());
    }

    #[test]
    fn image_reports_exposure_of_uploaded_params() {
        let mut backend = NullBackend::new(Resolution::new(4, 4));
        assert_eq!(backend.current_image().exposure, 1.0);
        let mut p = params(1);
        p.exposure = 2.5;
        backend.upload_params(&p).unwrap();
        assert_eq!(backend.current_image().exposure, 2.5);
    }
}
