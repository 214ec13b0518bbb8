//! ShaderToy uniform names and the per-frame uniform writer.
//!
//! Locations are looked up once after linking. Uniforms the program does not
//! declare (or that the GLSL compiler optimised away) are skipped silently on
//! every frame.

use chrono::{Datelike, Local, Timelike};
use tracing::debug;

use crate::gpu::backend::{GlBackend, TextureImage, UniformValue};
use crate::runtime::TimeSample;
use crate::types::SurfaceSize;

pub const RESOLUTION: &str = "iResolution";
pub const MOUSE: &str = "iMouse";
pub const TIME: &str = "iTime";
pub const TIME_DELTA: &str = "iTimeDelta";
pub const FRAME: &str = "iFrame";
pub const DATE: &str = "iDate";

/// `iChannel{index}`, the sampler for texture unit `index`.
pub fn channel_sampler(index: usize) -> String {
    format!("iChannel{index}")
}

/// Names `iChannelResolution` may be declared under for `index`: the array
/// element first, then the flat spelling some shaders use.
pub fn channel_resolution_candidates(index: usize) -> [String; 2] {
    [
        format!("iChannelResolution[{index}]"),
        format!("iChannelResolution{index}"),
    ]
}

/// `iDate`: year, month, day and seconds since local midnight.
pub fn current_date() -> [f32; 4] {
    let local_now = Local::now();
    let seconds_since_midnight = local_now.num_seconds_from_midnight() as f32
        + local_now.nanosecond() as f32 / 1_000_000_000.0;
    [
        local_now.year() as f32,
        local_now.month() as f32,
        local_now.day() as f32,
        seconds_since_midnight,
    ]
}

/// Per-frame uniform locations for a linked program.
pub(crate) struct FrameUniforms<B: GlBackend> {
    resolution: Option<B::UniformLocation>,
    mouse: Option<B::UniformLocation>,
    time: Option<B::UniformLocation>,
    time_delta: Option<B::UniformLocation>,
    frame: Option<B::UniformLocation>,
    date: Option<B::UniformLocation>,
}

impl<B: GlBackend> FrameUniforms<B> {
    pub fn locate(backend: &B, program: B::Program) -> Self {
        let lookup = |name: &str| {
            let location = backend.uniform_location(program, name);
            if location.is_none() {
                debug!(uniform = name, "shader does not use uniform");
            }
            location
        };
        Self {
            resolution: lookup(RESOLUTION),
            mouse: lookup(MOUSE),
            time: lookup(TIME),
            time_delta: lookup(TIME_DELTA),
            frame: lookup(FRAME),
            date: lookup(DATE),
        }
    }

    pub fn apply(&self, backend: &B, surface: SurfaceSize, mouse: [f32; 4], time: TimeSample) {
        let set = |location: &Option<B::UniformLocation>, value: UniformValue| {
            if let Some(location) = location {
                backend.set_uniform(location, value);
            }
        };
        set(
            &self.resolution,
            UniformValue::Vec3([
                surface.width as f32,
                surface.height as f32,
                surface.device_pixel_ratio,
            ]),
        );
        set(&self.mouse, UniformValue::Vec4(mouse));
        set(&self.time, UniformValue::Float(time.seconds));
        set(&self.time_delta, UniformValue::Float(time.delta));
        set(
            &self.frame,
            UniformValue::Int(time.frame_index.min(i32::MAX as u64) as i32),
        );
        if self.date.is_some() {
            set(&self.date, UniformValue::Vec4(current_date()));
        }
    }
}

/// Points `iChannel{unit}` at its texture unit and publishes the image size.
///
/// Expects the program to be in use.
pub(crate) fn bind_channel_uniforms<B: GlBackend>(
    backend: &B,
    program: B::Program,
    unit: usize,
    image: &TextureImage,
    device_pixel_ratio: f32,
) {
    if let Some(location) = backend.uniform_location(program, &channel_sampler(unit)) {
        backend.set_uniform(&location, UniformValue::Int(unit as i32));
    }
    let resolution = UniformValue::Vec3([
        image.width as f32,
        image.height as f32,
        device_pixel_ratio,
    ]);
    let location = channel_resolution_candidates(unit)
        .iter()
        .find_map(|name| backend.uniform_location(program, name));
    if let Some(location) = location {
        backend.set_uniform(&location, resolution);
    }
}
