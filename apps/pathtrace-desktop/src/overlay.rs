use glam::Vec3;
use pathtrace_common::Resolution;
use pathtrace_render::{CameraState, RenderControls};

/// A control changed from the overlay, applied to the frame loop before the
/// next update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlEdit {
    Exposure(f32),
    SamplesPerFrame(u32),
}

/// Status panel drawn over the traced image.
#[derive(Debug)]
pub struct Overlay {
    pub visible: bool,
    exposure: f32,
    samples_per_frame: u32,
    position: Vec3,
    fov_degrees: f32,
    fps: f64,
    edits: Vec<ControlEdit>,
}

impl Default for Overlay {
    fn default() -> Self {
        Self {
            visible: true,
            exposure: 1.0,
            samples_per_frame: 1,
            position: Vec3::ZERO,
            fov_degrees: 60.0,
            fps: 0.0,
            edits: Vec::new(),
        }
    }
}

impl Overlay {
    /// Pull the current loop state so widgets show what keys changed.
    pub fn observe(&mut self, controls: RenderControls, camera: &CameraState, fps: f64) {
        self.exposure = controls.exposure;
        self.samples_per_frame = controls.samples_per_frame;
        self.position = camera.position();
        self.fov_degrees = camera.fov_y().to_degrees();
        self.fps = fps;
    }

    pub fn take_edits(&mut self) -> Vec<ControlEdit> {
        std::mem::take(&mut self.edits)
    }

    pub fn ui(&mut self, ctx: &egui::Context, resolution: Resolution, samples: u64) {
        if !self.visible {
            return;
        }
        egui::Window::new("Path Tracer")
            .default_pos([12.0, 12.0])
            .resizable(false)
            .show(ctx, |ui| {
                ui.label(format!("Resolution: {resolution}"));
                ui.label(format!("Samples: {samples}"));
                ui.label(format!("{:.1} fps", self.fps));
                ui.label(format!(
                    "Camera: ({:.2}, {:.2}, {:.2})  fov {:.0}°",
                    self.position.x, self.position.y, self.position.z, self.fov_degrees
                ));
                ui.separator();

                let mut exposure = self.exposure;
                let slider = egui::Slider::new(&mut exposure, 0.05..=16.0)
                    .logarithmic(true)
                    .text("exposure");
                if ui.add(slider).changed() {
                    self.exposure = exposure;
                    self.edits.push(ControlEdit::Exposure(exposure));
                }

                let mut spf = self.samples_per_frame;
                let drag = egui::DragValue::new(&mut spf)
                    .range(1..=64)
                    .prefix("samples/frame: ");
                if ui.add(drag).changed() {
                    self.samples_per_frame = spf;
                    self.edits.push(ControlEdit::SamplesPerFrame(spf));
                }

                ui.separator();
                ui.small("Drag: look | WASD/QE: move | [ ]: zoom | - =: exposure | F1: panel");
            });
    }
}
