use crate::script::{ScriptAction, ScriptEvent};
use anyhow::Result;
use pathtrace_common::{RenderParams, Resolution, TracerConfig};
use pathtrace_input::KeyEvent;
use pathtrace_render::{
    AccumulatedFrame, BackendCall, ComputeBackend, FrameLoop, FrameOutcome, FrameStats,
    NullBackend, ScriptedHost,
};
use serde::Serialize;

/// Backend calls by kind, as recorded by the [`NullBackend`].
#[derive(Debug, Default, Serialize)]
pub struct CallSummary {
    pub uploads: usize,
    pub resets: usize,
    pub resizes: usize,
    pub dispatches: usize,
    pub wait_idle: usize,
}

impl CallSummary {
    fn from_backend(backend: &NullBackend) -> Self {
        Self {
            uploads: backend.upload_count(),
            resets: backend.count(|c| matches!(c, BackendCall::ResetAccumulation)),
            resizes: backend.count(|c| matches!(c, BackendCall::ResizeBuffers(_))),
            dispatches: backend.count(|c| matches!(c, BackendCall::DispatchStep)),
            wait_idle: backend.count(|c| matches!(c, BackendCall::WaitIdle)),
        }
    }
}

/// Outcome of a headless run.
#[derive(Debug, Serialize)]
pub struct SimulationReport {
    /// Updates run, including suspended and stopping ones.
    pub frames: u64,
    pub presented: u64,
    pub suspended: u64,
    pub stopped: bool,
    /// Non-fatal frame errors, in order.
    pub errors: Vec<String>,
    pub samples: u64,
    pub resolution: Resolution,
    pub params: Option<RenderParams>,
    pub stats: FrameStats,
    pub calls: CallSummary,
}

/// Drive the frame loop over a [`NullBackend`] for up to `frames` updates,
/// feeding scripted input before each one.
pub fn run(config: &TracerConfig, frames: u64, script: &[ScriptEvent]) -> Result<SimulationReport> {
    let mut frame_loop = FrameLoop::new(NullBackend::new(config.resolution()), config);
    let mut host: ScriptedHost<AccumulatedFrame> = ScriptedHost::new(config.resolution());
    let drag_button = config.drag_button;
    let mut cursor = (0.0_f64, 0.0_f64);
    frame_loop.input_mut().on_cursor(cursor.0, cursor.1);

    let mut report = SimulationReport {
        frames: 0,
        presented: 0,
        suspended: 0,
        stopped: false,
        errors: Vec::new(),
        samples: 0,
        resolution: config.resolution(),
        params: None,
        stats: FrameStats::default(),
        calls: CallSummary::default(),
    };

    for frame in 1..=frames {
        let mut dragging = false;
        for event in script.iter().filter(|e| e.frame == frame) {
            let input = frame_loop.input_mut();
            match event.action {
                ScriptAction::Drag { dx, dy } => {
                    input.on_button(drag_button, true);
                    cursor = (cursor.0 + dx, cursor.1 + dy);
                    input.on_cursor(cursor.0, cursor.1);
                    dragging = true;
                }
                ScriptAction::Resize(size) => host.set_size(size),
                ScriptAction::Key(key) => {
                    input.on_key(KeyEvent::pressed(key));
                    input.on_key(KeyEvent::released(key));
                }
                ScriptAction::Stop => host.stop(),
            }
        }

        report.frames = frame;
        match frame_loop.update(&mut host) {
            Ok(FrameOutcome::Presented(r)) => {
                report.presented += 1;
                tracing::debug!(frame, samples = r.samples, uploaded = r.uploaded, "presented");
            }
            Ok(FrameOutcome::Suspended) => report.suspended += 1,
            Ok(FrameOutcome::Stopped) => {
                report.stopped = true;
                break;
            }
            Err(err) if err.is_fatal() => return Err(err.into()),
            Err(err) => {
                tracing::warn!(frame, "{err}");
                report.errors.push(format!("frame {frame}: {err}"));
            }
        }

        if dragging {
            frame_loop.input_mut().on_button(drag_button, false);
        }
        if frame_loop.quit_requested() {
            host.stop();
        }
    }

    report.stats = frame_loop.stats().clone();
    let backend = frame_loop.into_backend();
    report.samples = backend.sample_count();
    report.resolution = backend.resolution();
    report.params = backend.params().copied();
    report.calls = CallSummary::from_backend(&backend);
    Ok(report)
}
