mod host;
mod keymap;
mod overlay;

use anyhow::{Context as _, Result};
use clap::Parser;
use host::DesktopHost;
use overlay::ControlEdit;
use pathtrace_common::{Resolution, TracerConfig};
use pathtrace_input::KeyEvent;
use pathtrace_render::{FrameLoop, FrameOutcome, FrameTimer};
use pathtrace_render_wgpu::WgpuBackend;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

const REPORT_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Parser)]
#[command(name = "pathtrace-desktop", about = "Interactive progressive path tracer")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// YAML tracer configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the configured samples per frame
    #[arg(long)]
    samples_per_frame: Option<u32>,
}

struct Session {
    host: DesktopHost,
    frame_loop: FrameLoop<WgpuBackend>,
}

impl Session {
    fn open(event_loop: &ActiveEventLoop, config: &TracerConfig) -> Result<Self> {
        let attrs = Window::default_attributes()
            .with_title("Path Tracer")
            .with_inner_size(PhysicalSize::new(config.width, config.height));
        let window = Arc::new(event_loop.create_window(attrs).context("create window")?);

        let (host, gpu) = DesktopHost::open(window)?;
        let size = host.window().inner_size();
        let backend = WgpuBackend::new(
            gpu.device,
            gpu.queue,
            gpu.surface_format,
            Resolution::new(size.width.max(1), size.height.max(1)),
        )?;
        Ok(Self {
            host,
            frame_loop: FrameLoop::new(backend, config),
        })
    }

    fn apply_edits(&mut self) {
        for edit in self.host.overlay.take_edits() {
            match edit {
                ControlEdit::Exposure(value) => self.frame_loop.set_exposure(value),
                ControlEdit::SamplesPerFrame(value) => self.frame_loop.set_samples_per_frame(value),
            };
        }
    }
}

struct App {
    config: TracerConfig,
    session: Option<Session>,
    failure: Option<anyhow::Error>,
    timer: FrameTimer,
    last_frame: Instant,
    last_report: Instant,
}

impl App {
    fn new(config: TracerConfig) -> Self {
        let now = Instant::now();
        Self {
            config,
            session: None,
            failure: None,
            timer: FrameTimer::new(120),
            last_frame: now,
            last_report: now,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        tracing::error!("{err:#}");
        self.failure = Some(err);
        event_loop.exit();
    }

    fn step(&mut self, event_loop: &ActiveEventLoop) {
        let Some(session) = &mut self.session else {
            return;
        };

        let now = Instant::now();
        self.timer.record(now - self.last_frame);
        self.last_frame = now;

        session.apply_edits();
        let controls = session.frame_loop.sync().controls();
        session
            .host
            .overlay
            .observe(controls, session.frame_loop.camera(), self.timer.fps());

        match session.frame_loop.update(&mut session.host) {
            Ok(FrameOutcome::Presented(report)) => {
                if now - self.last_report >= REPORT_INTERVAL {
                    self.last_report = now;
                    tracing::info!(
                        frame = report.frame,
                        samples = report.samples,
                        fps = self.timer.fps(),
                        avg_ms = self.timer.average().as_secs_f64() * 1000.0,
                        "throughput"
                    );
                }
            }
            Ok(FrameOutcome::Suspended) => {}
            Ok(FrameOutcome::Stopped) => {
                tracing::info!(stats = ?session.frame_loop.stats(), "exiting");
                event_loop.exit();
                return;
            }
            Err(err) if err.is_fatal() => {
                session.frame_loop.shutdown();
                self.fail(event_loop, err.into());
                return;
            }
            Err(err) => tracing::warn!("frame skipped: {err}"),
        }

        if session.frame_loop.quit_requested() {
            session.host.stop();
        }
        session.host.window().request_redraw();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.session.is_some() {
            return;
        }
        match Session::open(event_loop, &self.config) {
            Ok(session) => {
                session.host.window().request_redraw();
                self.session = Some(session);
            }
            Err(err) => self.fail(event_loop, err),
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(session) = &mut self.session else {
            return;
        };
        let consumed = session.host.on_window_event(&event);
        // releases always reach the tracker so a drag cannot stick
        let release = matches!(
            event,
            WindowEvent::MouseInput {
                state: ElementState::Released,
                ..
            }
        );
        if consumed && !release {
            return;
        }

        match event {
            WindowEvent::CloseRequested => {
                session.host.stop();
                self.step(event_loop);
            }
            WindowEvent::Resized(_) => {
                // picked up by the frame loop from the framebuffer size
                session.host.window().request_redraw();
            }
            WindowEvent::KeyboardInput { event, .. } => {
                let PhysicalKey::Code(code) = event.physical_key else {
                    return;
                };
                let pressed = event.state == ElementState::Pressed;
                if code == KeyCode::F1 && pressed && !event.repeat {
                    session.host.overlay.visible = !session.host.overlay.visible;
                    return;
                }
                session.frame_loop.input_mut().on_key(KeyEvent {
                    key: keymap::key(code),
                    pressed,
                });
            }
            WindowEvent::MouseInput { state, button, .. } => {
                if let Some(button) = keymap::button(button) {
                    session
                        .frame_loop
                        .input_mut()
                        .on_button(button, state == ElementState::Pressed);
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                session.frame_loop.input_mut().on_cursor(position.x, position.y);
            }
            WindowEvent::RedrawRequested => self.step(event_loop),
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(session) = &self.session {
            session.host.window().request_redraw();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(session) = &mut self.session {
            session.frame_loop.shutdown();
        }
    }
}

fn log_filter(verbose: bool) -> EnvFilter {
    EnvFilter::new(if verbose { "debug" } else { "info" })
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(log_filter(cli.verbose))
        .init();

    let mut config = match &cli.config {
        Some(path) => TracerConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => TracerConfig::default(),
    };
    if let Some(spf) = cli.samples_per_frame {
        config.samples_per_frame = spf;
    }
    config.validate()?;
    tracing::info!(resolution = %config.resolution(), "pathtrace-desktop starting");

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(config);
    event_loop.run_app(&mut app)?;

    match app.failure {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbose_flag_picks_the_filter() {
        assert_eq!(log_filter(false).to_string(), "info");
        assert_eq!(log_filter(true).to_string(), "debug");
    }
}
