use pathtrace_common::Resolution;

/// The window side of the tracer, as seen by the frame loop.
///
/// Input events do not go through this trait; the window layer writes them
/// straight into the loop's input tracker from its own callbacks.
pub trait WindowHost<I> {
    /// Current framebuffer size in physical pixels. Zero-area when minimised.
    fn framebuffer_size(&self) -> Resolution;

    /// Polled once per frame, before any input is read.
    fn should_keep_running(&self) -> bool;

    /// Display the accumulated image.
    fn present(&mut self, image: I);
}

/// A window stand-in driven by code: tests and headless runs set its size
/// and stop it explicitly.
#[derive(Debug)]
pub struct ScriptedHost<I> {
    size: Resolution,
    running: bool,
    presented: u64,
    last_image: Option<I>,
}

impl<I> ScriptedHost<I> {
    pub fn new(size: Resolution) -> Self {
        Self {
            size,
            running: true,
            presented: 0,
            last_image: None,
        }
    }

    pub fn set_size(&mut self, size: Resolution) {
        self.size = size;
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn presented(&self) -> u64 {
        self.presented
    }

    pub fn last_image(&self) -> Option<&I> {
        self.last_image.as_ref()
    }
}

impl<I> WindowHost<I> for ScriptedHost<I> {
    fn framebuffer_size(&self) -> Resolution {
        self.size
    }

    fn should_keep_running(&self) -> bool {
        self.running
    }

    fn present(&mut self, image: I) {
        self.presented += 1;
        self.last_image = Some(image);
    }
}
