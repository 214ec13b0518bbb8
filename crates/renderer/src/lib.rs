//! Renderer crate for ShaderCanvas.
//!
//! A [`ShaderCanvas`] draws a ShaderToy-style fragment shader over a
//! full-screen quad, feeding it time, resolution, mouse and texture channels.
//! The overall flow is:
//!
//! ```text
//!   CLI / shadercanvas
//!          │ RendererConfig
//!          ▼
//!   Renderer::run ──▶ CanvasApp ──▶ winit event loop ──▶ ShaderCanvas::redraw()
//!                         │                                   │
//!                         └─▶ ShaderCanvas::activate()        └─▶ GlBackend ─▶ GL
//! ```
//!
//! The canvas never touches a GL loader directly. It issues calls through
//! [`gpu::GlBackend`] and every GPU operation takes a [`CurrentContext`]
//! guard, so "the context is current" is something the caller proves rather
//! than assumes. [`gpu::GlowBackend`] drives a real window;
//! [`gpu::RecordingBackend`] records calls for headless use.

pub mod canvas;
pub mod error;
pub mod gpu;
pub mod input;
pub mod runtime;
pub mod types;
mod window;

use anyhow::Result;

pub use canvas::ShaderCanvas;
pub use error::CanvasError;
pub use gpu::CurrentContext;
pub use input::{DragPhase, MouseState};
pub use runtime::{FrameScheduler, TimePolicy, TimeSample};
pub use types::{
    CanvasOptions, RendererConfig, ShaderSources, ShaderStage, SurfaceSize,
    DEFAULT_TEXTURE_COUNT, MAX_TEXTURE_UNITS,
};

/// Entry point that owns the configuration for a windowed canvas.
pub struct Renderer {
    config: RendererConfig,
}

impl Renderer {
    pub fn new(config: RendererConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Opens the window and blocks until it is closed or rendering fails.
    pub fn run(&self) -> Result<()> {
        window::run(self.config.clone())
    }
}
