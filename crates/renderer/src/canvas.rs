//! The shader canvas: GPU resource lifecycle, per-frame draw and pointer input.
//!
//! Types:
//! - [`ShaderCanvas`]: owns everything created at activation until teardown.
//!
//! Lifecycle: `new` (clock starts) -> `activate` (all-or-nothing) -> any
//! number of `redraw` calls -> `teardown`. Teardown before activation is
//! `NotInitialized`; teardown after teardown does nothing.

use tracing::{debug, info, trace, warn};

use crate::error::CanvasError;
use crate::gpu::channels::{self, decode_channels};
use crate::gpu::geometry::{self, QuadGeometry, QUAD_INDEX_COUNT};
use crate::gpu::program::{self, LinkedProgram};
use crate::gpu::uniforms::{self, FrameUniforms};
use crate::gpu::{CurrentContext, GlBackend};
use crate::input::MouseState;
use crate::runtime::{time_source_for_policy, BoxedTimeSource};
use crate::types::{CanvasOptions, ShaderSources, SurfaceSize};

struct GpuResources<B: GlBackend> {
    program: LinkedProgram<B>,
    geometry: QuadGeometry<B>,
    textures: Vec<B::Texture>,
    uniforms: FrameUniforms<B>,
}

impl<B: GlBackend> GpuResources<B> {
    fn release(mut self, backend: &B) {
        channels::release_channels(backend, &mut self.textures);
        backend.bind_vertex_array(None);
        backend.delete_buffer(self.geometry.index_buffer);
        backend.delete_buffer(self.geometry.vertex_buffer);
        backend.delete_vertex_array(self.geometry.vertex_array);
        self.program.release(backend);
    }
}

/// Renders a ShaderToy-style fragment shader over a full-screen quad.
pub struct ShaderCanvas<B: GlBackend> {
    sources: ShaderSources,
    options: CanvasOptions,
    clock: BoxedTimeSource,
    mouse: MouseState,
    surface: SurfaceSize,
    resources: Option<GpuResources<B>>,
    released: bool,
}

impl<B: GlBackend> ShaderCanvas<B> {
    /// Creates an inactive canvas and starts its clock.
    pub fn new(sources: ShaderSources, options: CanvasOptions) -> Self {
        let clock = time_source_for_policy(options.time_policy);
        Self::with_time_source(sources, options, clock)
    }

    /// Like [`ShaderCanvas::new`] with an explicit clock.
    pub fn with_time_source(
        sources: ShaderSources,
        options: CanvasOptions,
        clock: BoxedTimeSource,
    ) -> Self {
        Self {
            sources,
            options,
            clock,
            mouse: MouseState::default(),
            surface: SurfaceSize::default(),
            resources: None,
            released: false,
        }
    }

    pub fn sources(&self) -> &ShaderSources {
        &self.sources
    }

    pub fn options(&self) -> &CanvasOptions {
        &self.options
    }

    pub fn is_active(&self) -> bool {
        self.resources.is_some()
    }

    pub fn mouse(&self) -> &MouseState {
        &self.mouse
    }

    pub fn surface_size(&self) -> SurfaceSize {
        self.surface
    }

    /// Records the surface size used for pointer conversion and channel
    /// resolutions until the next redraw.
    pub fn set_surface_size(&mut self, size: SurfaceSize) {
        self.surface = size;
    }

    /// Compiles the program, uploads the quad and loads every texture.
    ///
    /// Either everything is created or nothing is; on error the canvas stays
    /// inactive. Activating an already active canvas does nothing.
    pub fn activate(&mut self, context: &CurrentContext<'_, B>) -> Result<(), CanvasError> {
        if self.resources.is_some() {
            debug!("shader canvas already active");
            return Ok(());
        }
        let backend = context.backend();
        let texture_count = self.options.texture_count;
        self.sources.validate(texture_count)?;

        let linked = program::build_program(backend, &self.sources)?;
        let geometry = match geometry::upload_quad(backend) {
            Ok(geometry) => geometry,
            Err(err) => {
                linked.release(backend);
                return Err(err);
            }
        };
        let mut resources = GpuResources {
            uniforms: FrameUniforms::locate(backend, linked.program),
            program: linked,
            geometry,
            textures: Vec::new(),
        };

        let images = match decode_channels(&self.sources, texture_count) {
            Ok(images) => images,
            Err(err) => {
                resources.release(backend);
                return Err(err);
            }
        };
        let textures = match channels::upload_channels(backend, &images) {
            Ok(textures) => textures,
            Err(err) => {
                resources.release(backend);
                return Err(err);
            }
        };
        resources.textures = textures;
        for (unit, image) in images.iter().enumerate() {
            uniforms::bind_channel_uniforms(
                backend,
                resources.program.program,
                unit,
                image,
                self.surface.device_pixel_ratio,
            );
        }

        info!(
            program = ?resources.program.program,
            textures = resources.textures.len(),
            "shader canvas activated"
        );
        self.resources = Some(resources);
        self.released = false;
        Ok(())
    }

    /// Draws one frame at `size`.
    pub fn redraw(
        &mut self,
        context: &CurrentContext<'_, B>,
        size: SurfaceSize,
    ) -> Result<(), CanvasError> {
        let resources = self.resources.as_ref().ok_or(CanvasError::NotInitialized)?;
        let backend = context.backend();
        if !backend.is_current() {
            return Err(CanvasError::ContextState);
        }
        self.surface = size;
        let time = self.clock.sample();

        let (width, height) = size.physical();
        backend.viewport(width, height);
        backend.use_program(Some(resources.program.program));
        resources
            .uniforms
            .apply(backend, size, self.mouse.as_uniform(), time);
        for (unit, texture) in resources.textures.iter().enumerate() {
            backend.active_texture_unit(unit as u32);
            backend.bind_texture(Some(*texture));
        }
        backend.bind_vertex_array(Some(resources.geometry.vertex_array));
        backend.draw_indexed_triangles(QUAD_INDEX_COUNT);
        trace!(
            seconds = time.seconds,
            frame = time.frame_index,
            width,
            height,
            "frame drawn"
        );
        Ok(())
    }

    /// Whether `teardown` has released the resources of a past activation.
    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Releases every GPU object, making the context current if needed.
    ///
    /// Fails with `NotInitialized` if the canvas was never activated; calling
    /// it again after a successful teardown does nothing.
    pub fn teardown(&mut self, backend: &B) -> Result<(), CanvasError> {
        if self.resources.is_none() {
            return if self.released {
                Ok(())
            } else {
                Err(CanvasError::NotInitialized)
            };
        }
        let context = CurrentContext::make_current(backend)?;
        if let Some(resources) = self.resources.take() {
            let textures = resources.textures.len();
            resources.release(context.backend());
            self.released = true;
            info!(textures, "shader canvas released GPU resources");
        }
        Ok(())
    }

    /// Left button pressed at logical `(x, y)`, top-left origin.
    pub fn press(&mut self, x: f32, y: f32) {
        self.mouse.press(x, y, self.surface.height);
    }

    /// Pointer moved to logical `(x, y)`; only consumed while dragging.
    pub fn drag(&mut self, x: f32, y: f32) {
        self.mouse.drag_to(x, y, self.surface.height);
    }

    /// Left button released.
    pub fn release(&mut self) {
        self.mouse.release();
    }
}

impl<B: GlBackend> Drop for ShaderCanvas<B> {
    fn drop(&mut self) {
        if self.resources.is_some() {
            warn!("shader canvas dropped without teardown; GPU objects leaked");
        }
    }
}
