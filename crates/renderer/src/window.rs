//! winit host for a [`ShaderCanvas`] backed by glow.
//!
//! The event loop thread owns the window, the GL context and the canvas. The
//! host activates the canvas once the surface exists, forwards left-button
//! drags, redraws on the [`FrameScheduler`] cadence and tears the canvas down
//! before the context goes away.

use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use glutin::config::{ConfigTemplateBuilder, GlConfig};
use glutin::context::{
    ContextApi, ContextAttributesBuilder, GlProfile, NotCurrentGlContext, Version,
};
use glutin::display::{GetGlDisplay, GlDisplay};
use glutin_winit::{DisplayBuilder, GlWindow};
use raw_window_handle::HasWindowHandle;
use tracing::{error, info, trace};
use winit::application::ApplicationHandler;
use winit::dpi::{LogicalPosition, LogicalSize, PhysicalPosition, PhysicalSize};
use winit::event::{ElementState, MouseButton, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::canvas::ShaderCanvas;
use crate::error::CanvasError;
use crate::gpu::{CurrentContext, GlBackend, GlowBackend};
use crate::runtime::FrameScheduler;
use crate::types::{RendererConfig, SurfaceSize};

/// Window plus the GL backend bound to it. The backend is declared first so
/// the context and surface drop before the window.
struct WindowState {
    backend: GlowBackend,
    window: Window,
    cursor: LogicalPosition<f32>,
}

impl WindowState {
    fn surface_size(&self) -> SurfaceSize {
        let size = self.window.inner_size();
        SurfaceSize::from_physical(size.width, size.height, self.window.scale_factor())
    }

    fn track_cursor(&mut self, position: PhysicalPosition<f64>) -> LogicalPosition<f32> {
        self.cursor = position.to_logical(self.window.scale_factor());
        self.cursor
    }
}

struct CanvasApp {
    config: RendererConfig,
    canvas: ShaderCanvas<GlowBackend>,
    scheduler: FrameScheduler,
    state: Option<WindowState>,
    error: Option<anyhow::Error>,
}

impl CanvasApp {
    fn new(config: RendererConfig) -> Self {
        let canvas = ShaderCanvas::new(config.sources.clone(), config.options.clone());
        let scheduler = FrameScheduler::new(config.target_fps);
        Self {
            config,
            canvas,
            scheduler,
            state: None,
            error: None,
        }
    }

    fn create_window(&self, event_loop: &ActiveEventLoop) -> Result<WindowState> {
        let (width, height) = self.config.surface_size;
        let attributes = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(LogicalSize::new(width, height));
        let template = ConfigTemplateBuilder::new().with_alpha_size(8);
        let (window, gl_config) = DisplayBuilder::new()
            .with_window_attributes(Some(attributes))
            .build(event_loop, template, |configs| {
                configs
                    .reduce(|best, candidate| {
                        if candidate.num_samples() > best.num_samples() {
                            candidate
                        } else {
                            best
                        }
                    })
                    .expect("no OpenGL config matches the requested template")
            })
            .map_err(|err| anyhow!("failed to create window and GL display: {err}"))?;
        let window = window.context("display builder returned no window")?;

        let raw_window_handle = window
            .window_handle()
            .map(|handle| handle.as_raw())
            .context("window has no native handle")?;
        let display = gl_config.display();
        let context_attributes = ContextAttributesBuilder::new()
            .with_context_api(ContextApi::OpenGl(Some(Version::new(3, 3))))
            .with_profile(GlProfile::Core)
            .build(Some(raw_window_handle));
        // SAFETY: the raw handle belongs to `window`, which outlives the context.
        let not_current = unsafe { display.create_context(&gl_config, &context_attributes) }
            .context("failed to create OpenGL 3.3 core context")?;

        let surface_attributes = window
            .build_surface_attributes(Default::default())
            .context("failed to describe window surface")?;
        // SAFETY: as above, the surface never outlives `window`.
        let surface = unsafe { display.create_window_surface(&gl_config, &surface_attributes) }
            .context("failed to create window surface")?;
        let context = not_current
            .make_current(&surface)
            .context("failed to make OpenGL context current")?;

        Ok(WindowState {
            backend: GlowBackend::new(context, surface),
            window,
            cursor: LogicalPosition::new(0.0, 0.0),
        })
    }

    fn start(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let state = self.create_window(event_loop)?;
        self.canvas.set_surface_size(state.surface_size());
        {
            let context = CurrentContext::check(&state.backend)?;
            self.canvas.activate(&context)?;
        }
        info!(
            title = %self.config.title,
            fps = ?self.config.target_fps,
            "canvas window ready"
        );
        state.window.request_redraw();
        self.state = Some(state);
        Ok(())
    }

    fn redraw(&mut self) -> Result<()> {
        let Some(state) = self.state.as_ref() else {
            return Ok(());
        };
        let size = state.surface_size();
        if !draw_frame(&mut self.canvas, &state.backend, size)? {
            return Ok(());
        }
        state
            .backend
            .swap_buffers()
            .map_err(|err| anyhow!("failed to present frame: {err}"))?;
        self.scheduler.mark_rendered(Instant::now());
        Ok(())
    }

    fn resize(&mut self, size: PhysicalSize<u32>) {
        if let Some(state) = self.state.as_ref() {
            state.backend.resize(size.width, size.height);
            self.canvas.set_surface_size(state.surface_size());
            state.window.request_redraw();
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        error!("{err:#}");
        self.shutdown();
        if self.error.is_none() {
            self.error = Some(err);
        }
        event_loop.exit();
    }

    /// Releases the canvas and drops the context, surface and window, in
    /// that order. Later events find no window and are ignored.
    fn shutdown(&mut self) {
        if let Some(state) = self.state.take() {
            if let Err(err) = release_canvas(&mut self.canvas, &state.backend) {
                error!(error = %err, "failed to release GPU resources");
            }
        }
    }
}

/// Draws a frame if the canvas still holds GPU resources. Returns whether a
/// frame was drawn; a redraw that arrives after teardown is skipped.
fn draw_frame<B: GlBackend>(
    canvas: &mut ShaderCanvas<B>,
    backend: &B,
    size: SurfaceSize,
) -> Result<bool, CanvasError> {
    if !canvas.is_active() {
        trace!("canvas inactive, skipping redraw");
        return Ok(false);
    }
    let context = CurrentContext::check(backend)?;
    canvas.redraw(&context, size)?;
    Ok(true)
}

/// Tears the canvas down if it currently holds GPU resources.
fn release_canvas<B: GlBackend>(
    canvas: &mut ShaderCanvas<B>,
    backend: &B,
) -> Result<(), CanvasError> {
    if !canvas.is_active() {
        return Ok(());
    }
    canvas.teardown(backend)
}

impl ApplicationHandler for CanvasApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }
        if let Err(err) = self.start(event_loop) {
            self.fail(event_loop, err);
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, id: WindowId, event: WindowEvent) {
        let Some(state) = self.state.as_mut() else {
            return;
        };
        if state.window.id() != id {
            return;
        }

        match event {
            WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                self.shutdown();
                event_loop.exit();
            }
            WindowEvent::Resized(size) => self.resize(size),
            WindowEvent::ScaleFactorChanged { .. } => {
                let size = state.window.inner_size();
                self.resize(size);
            }
            WindowEvent::CursorMoved { position, .. } => {
                let cursor = state.track_cursor(position);
                self.canvas.drag(cursor.x, cursor.y);
            }
            WindowEvent::MouseInput {
                state: button_state,
                button: MouseButton::Left,
                ..
            } => match button_state {
                ElementState::Pressed => {
                    let cursor = state.cursor;
                    self.canvas.press(cursor.x, cursor.y);
                }
                ElementState::Released => self.canvas.release(),
            },
            WindowEvent::RedrawRequested => {
                if let Err(err) = self.redraw() {
                    self.fail(event_loop, err);
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let Some(state) = self.state.as_ref() else {
            return;
        };
        let now = Instant::now();
        if self.scheduler.is_uncapped() {
            tracing::trace!("scheduler: uncapped, issuing redraw");
            state.window.request_redraw();
            event_loop.set_control_flow(ControlFlow::Poll);
        } else if self.scheduler.ready_for_frame(now) {
            tracing::trace!("scheduler: issuing redraw now");
            state.window.request_redraw();
            event_loop.set_control_flow(ControlFlow::Wait);
        } else if let Some(deadline) = self.scheduler.next_deadline() {
            let ms = deadline.saturating_duration_since(now).as_millis();
            tracing::trace!(deadline_ms = ms, "scheduler: waiting until next frame");
            event_loop.set_control_flow(ControlFlow::WaitUntil(deadline));
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.shutdown();
    }
}

/// Opens the window and drives the event loop until it closes.
pub fn run(config: RendererConfig) -> Result<()> {
    let event_loop = EventLoop::new().context("failed to initialize event loop")?;
    let mut app = CanvasApp::new(config);
    event_loop
        .run_app(&mut app)
        .map_err(|err| anyhow!("window event loop error: {err}"))?;
    match app.error.take() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::{tempdir, TempDir};

    use super::*;
    use crate::gpu::RecordingBackend;
    use crate::types::{CanvasOptions, ShaderSources};

    fn active_canvas(backend: &RecordingBackend) -> (TempDir, ShaderCanvas<RecordingBackend>) {
        let dir = tempdir().expect("tempdir");
        let vertex = dir.path().join("quad.vert");
        let fragment = dir.path().join("toy.frag");
        fs::write(&vertex, "#version 330 core\nvoid main() {}\n").expect("vertex");
        fs::write(&fragment, "#version 330 core\nvoid main() {}\n").expect("fragment");
        let options = CanvasOptions {
            texture_count: 0,
            ..CanvasOptions::default()
        };
        let mut canvas = ShaderCanvas::new(ShaderSources::with_shaders(vertex, fragment), options);
        let context = CurrentContext::check(backend).expect("current");
        canvas.activate(&context).expect("activation");
        (dir, canvas)
    }

    #[test]
    fn active_canvas_draws_a_frame() {
        let backend = RecordingBackend::new();
        let (_dir, mut canvas) = active_canvas(&backend);
        let drawn = draw_frame(&mut canvas, &backend, SurfaceSize::default()).expect("frame");
        assert!(drawn);
        assert_eq!(backend.draw_count(), 1);
        release_canvas(&mut canvas, &backend).expect("release");
    }

    #[test]
    fn redraw_pending_after_close_is_skipped() {
        let backend = RecordingBackend::new();
        let (_dir, mut canvas) = active_canvas(&backend);
        release_canvas(&mut canvas, &backend).expect("release");
        backend.clear_calls();

        let drawn = draw_frame(&mut canvas, &backend, SurfaceSize::default()).expect("no error");
        assert!(!drawn);
        assert!(backend.calls().is_empty());
    }

    #[test]
    fn releasing_twice_or_before_activation_is_quiet() {
        let backend = RecordingBackend::new();
        let mut idle: ShaderCanvas<RecordingBackend> =
            ShaderCanvas::new(ShaderSources::new(), CanvasOptions::default());
        release_canvas(&mut idle, &backend).expect("never activated");
        assert!(backend.calls().is_empty());

        let (_dir, mut canvas) = active_canvas(&backend);
        release_canvas(&mut canvas, &backend).expect("first release");
        release_canvas(&mut canvas, &backend).expect("second release");
        assert!(backend.live_objects().is_empty());
    }
}
