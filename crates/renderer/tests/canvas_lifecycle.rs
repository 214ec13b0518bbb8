use std::fs;
use std::path::Path;
use std::time::Duration;

use image::{Rgba, RgbaImage};
use renderer::gpu::{GlCall, GlObject, RecordingBackend, UniformValue};
use renderer::runtime::{TimeSample, TimeSource};
use renderer::{
    CanvasError, CanvasOptions, CurrentContext, ShaderCanvas, ShaderSources, ShaderStage,
    SurfaceSize,
};
use tempfile::{tempdir, TempDir};

const VERTEX: &str = r#"#version 330 core
layout (location = 0) in vec3 aPos;
layout (location = 1) in vec2 aTexCoord;
void main() { gl_Position = vec4(aPos, 1.0); }
"#;

const FRAGMENT: &str = r#"#version 330 core
uniform vec3 iResolution;
uniform float iTime;
out vec4 fragColor;
void main() { fragColor = vec4(gl_FragCoord.xy / iResolution.xy, 0.5 + 0.5 * sin(iTime), 1.0); }
"#;

fn fixture(texture_count: usize) -> (TempDir, ShaderSources) {
    let dir = tempdir().expect("tempdir");
    let vertex = dir.path().join("quad.vert");
    let fragment = dir.path().join("toy.frag");
    fs::write(&vertex, VERTEX).expect("write vertex");
    fs::write(&fragment, FRAGMENT).expect("write fragment");
    let mut sources = ShaderSources::with_shaders(vertex, fragment);
    for index in 0..texture_count {
        let path = dir.path().join(format!("channel{index}.png"));
        write_png(&path, 4 + index as u32, 2);
        sources.set_texture(index, path);
    }
    (dir, sources)
}

fn write_png(path: &Path, width: u32, height: u32) {
    RgbaImage::from_pixel(width, height, Rgba([10, 20, 30, 255]))
        .save(path)
        .expect("write png");
}

fn options(texture_count: usize) -> CanvasOptions {
    CanvasOptions {
        texture_count,
        ..CanvasOptions::default()
    }
}

/// Clock that advances a fixed step per sample.
struct SteppingClock {
    seconds: f32,
    step: f32,
    frame: u64,
}

impl TimeSource for SteppingClock {
    fn sample(&mut self) -> TimeSample {
        let sample = TimeSample::new(self.seconds, self.step, self.frame);
        self.seconds += self.step;
        self.frame += 1;
        sample
    }
}

fn activate(
    canvas: &mut ShaderCanvas<RecordingBackend>,
    backend: &RecordingBackend,
) -> Result<(), CanvasError> {
    let context = CurrentContext::check(backend)?;
    canvas.activate(&context)
}

fn redraw(
    canvas: &mut ShaderCanvas<RecordingBackend>,
    backend: &RecordingBackend,
    size: SurfaceSize,
) -> Result<(), CanvasError> {
    let context = CurrentContext::check(backend)?;
    canvas.redraw(&context, size)
}

#[test]
fn each_redraw_issues_one_six_index_draw() {
    let (_dir, sources) = fixture(2);
    let backend = RecordingBackend::new();
    let mut canvas = ShaderCanvas::new(sources, options(2));
    activate(&mut canvas, &backend).expect("activation");
    assert!(canvas.is_active());

    for _ in 0..3 {
        redraw(&mut canvas, &backend, SurfaceSize::default()).expect("redraw");
    }
    let draws: Vec<_> = backend
        .calls()
        .into_iter()
        .filter(|call| matches!(call, GlCall::DrawIndexedTriangles { .. }))
        .collect();
    assert_eq!(draws, vec![GlCall::DrawIndexedTriangles { count: 6 }; 3]);
    assert_eq!(backend.draw_count(), 3);

    canvas.teardown(&backend).expect("teardown");
}

#[test]
fn activation_creates_exactly_one_of_each_object() {
    let (_dir, sources) = fixture(3);
    let backend = RecordingBackend::new();
    let mut canvas = ShaderCanvas::new(sources, options(3));
    activate(&mut canvas, &backend).expect("activation");

    let live = backend.live_objects();
    let count = |pred: fn(&GlObject) -> bool| live.iter().filter(|object| pred(object)).count();
    assert_eq!(count(|o| matches!(o, GlObject::Shader(_))), 2);
    assert_eq!(count(|o| matches!(o, GlObject::Program(_))), 1);
    assert_eq!(count(|o| matches!(o, GlObject::VertexArray(_))), 1);
    assert_eq!(count(|o| matches!(o, GlObject::Buffer(_))), 2);
    assert_eq!(count(|o| matches!(o, GlObject::Texture(_))), 3);

    canvas.teardown(&backend).expect("teardown");
}

#[test]
fn fragment_compile_error_leaves_nothing_behind() {
    let (_dir, sources) = fixture(1);
    let backend = RecordingBackend::new();
    backend.reject_stage(ShaderStage::Fragment, "0:4: error: syntax error");
    let mut canvas = ShaderCanvas::new(sources, options(1));

    let err = activate(&mut canvas, &backend).unwrap_err();
    match err {
        CanvasError::ShaderCompile { stage, path, log } => {
            assert_eq!(stage, ShaderStage::Fragment);
            assert!(path.ends_with("toy.frag"));
            assert!(log.contains("syntax error"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!canvas.is_active());
    assert_eq!(backend.bound_program(), None);
    assert!(backend.live_objects().is_empty());
    assert!(matches!(
        redraw(&mut canvas, &backend, SurfaceSize::default()),
        Err(CanvasError::NotInitialized)
    ));
}

#[test]
fn missing_texture_file_creates_no_texture() {
    let (dir, mut sources) = fixture(2);
    sources.set_texture(1, dir.path().join("nope.png"));
    let backend = RecordingBackend::new();
    let mut canvas = ShaderCanvas::new(sources, options(2));

    let err = activate(&mut canvas, &backend).unwrap_err();
    assert!(
        matches!(&err, CanvasError::TextureLoad { path, .. } if path.ends_with("nope.png")),
        "unexpected error: {err}"
    );
    assert!(!backend
        .calls()
        .iter()
        .any(|call| matches!(call, GlCall::CreateTexture(_))));
    assert!(backend.live_objects().is_empty());
    assert_eq!(backend.bound_program(), None);
}

#[test]
fn link_failure_is_reported_and_rolled_back() {
    let (_dir, sources) = fixture(0);
    let backend = RecordingBackend::new();
    backend.reject_link("error: vertex output not consumed");
    let mut canvas = ShaderCanvas::new(sources, options(0));

    let err = activate(&mut canvas, &backend).unwrap_err();
    assert!(matches!(err, CanvasError::ShaderLink { .. }));
    assert!(backend.live_objects().is_empty());
}

#[test]
fn missing_source_key_is_rejected_before_gpu_work() {
    let (_dir, sources) = fixture(1);
    let backend = RecordingBackend::new();
    let mut canvas = ShaderCanvas::new(sources, options(2));

    let err = activate(&mut canvas, &backend).unwrap_err();
    assert!(matches!(err, CanvasError::MissingSource { key } if key == "texture1"));
    assert!(backend.calls().is_empty());
}

#[test]
fn drag_produces_bottom_left_mouse_vector() {
    let (_dir, sources) = fixture(0);
    let backend = RecordingBackend::new();
    let mut canvas = ShaderCanvas::new(sources, options(0));
    let size = SurfaceSize::new(200, 100, 1.0);
    canvas.set_surface_size(size);
    activate(&mut canvas, &backend).expect("activation");

    canvas.press(10.0, 20.0);
    canvas.drag(15.0, 25.0);
    redraw(&mut canvas, &backend, size).expect("redraw");

    assert_eq!(
        backend.uniform_values("iMouse"),
        vec![UniformValue::Vec4([15.0, 74.0, 10.0, 79.0])]
    );
    canvas.teardown(&backend).expect("teardown");
}

#[test]
fn resolution_and_viewport_follow_surface_size() {
    let (_dir, sources) = fixture(1);
    let backend = RecordingBackend::new();
    let mut canvas = ShaderCanvas::new(sources, options(1));
    let size = SurfaceSize::new(640, 360, 2.0);
    canvas.set_surface_size(size);
    activate(&mut canvas, &backend).expect("activation");
    redraw(&mut canvas, &backend, size).expect("redraw");

    assert!(backend.calls().contains(&GlCall::Viewport {
        width: 1280,
        height: 720
    }));
    assert_eq!(
        backend.uniform_values("iResolution"),
        vec![UniformValue::Vec3([640.0, 360.0, 2.0])]
    );
    assert_eq!(
        backend.uniform_values("iChannelResolution[0]"),
        vec![UniformValue::Vec3([4.0, 2.0, 2.0])]
    );
    assert_eq!(backend.uniform_values("iChannel0"), vec![UniformValue::Int(0)]);
    canvas.teardown(&backend).expect("teardown");
}

#[test]
fn time_is_non_decreasing_and_independent_of_redraw_count() {
    let (_dir, sources) = fixture(0);
    let backend = RecordingBackend::new();
    let mut canvas = ShaderCanvas::new(sources, options(0));
    activate(&mut canvas, &backend).expect("activation");

    for _ in 0..5 {
        redraw(&mut canvas, &backend, SurfaceSize::default()).expect("redraw");
    }
    std::thread::sleep(Duration::from_millis(20));
    redraw(&mut canvas, &backend, SurfaceSize::default()).expect("redraw");

    let times: Vec<f32> = backend
        .uniform_values("iTime")
        .into_iter()
        .map(|value| match value {
            UniformValue::Float(seconds) => seconds,
            other => panic!("iTime set to {other:?}"),
        })
        .collect();
    assert_eq!(times.len(), 6);
    assert!(times.windows(2).all(|pair| pair[1] >= pair[0]));
    assert!(times[5] >= 0.02, "elapsed time did not advance: {times:?}");
    assert!(times[5] < 60.0);
    canvas.teardown(&backend).expect("teardown");
}

#[test]
fn injected_clock_drives_time_and_frame_uniforms() {
    let (_dir, sources) = fixture(0);
    let backend = RecordingBackend::new();
    let clock = Box::new(SteppingClock {
        seconds: 1.0,
        step: 0.5,
        frame: 0,
    });
    let mut canvas = ShaderCanvas::with_time_source(sources, options(0), clock);
    activate(&mut canvas, &backend).expect("activation");
    redraw(&mut canvas, &backend, SurfaceSize::default()).expect("redraw");
    redraw(&mut canvas, &backend, SurfaceSize::default()).expect("redraw");

    assert_eq!(
        backend.uniform_values("iTime"),
        vec![UniformValue::Float(1.0), UniformValue::Float(1.5)]
    );
    assert_eq!(
        backend.uniform_values("iFrame"),
        vec![UniformValue::Int(0), UniformValue::Int(1)]
    );
    assert_eq!(
        backend.uniform_values("iTimeDelta"),
        vec![UniformValue::Float(0.5), UniformValue::Float(0.5)]
    );
    canvas.teardown(&backend).expect("teardown");
}

#[test]
fn redraw_binds_units_in_order() {
    let (_dir, sources) = fixture(4);
    let backend = RecordingBackend::new();
    let mut canvas = ShaderCanvas::new(sources, options(4));
    activate(&mut canvas, &backend).expect("activation");
    backend.clear_calls();
    redraw(&mut canvas, &backend, SurfaceSize::default()).expect("redraw");

    let units: Vec<u32> = backend
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            GlCall::ActiveTextureUnit(unit) => Some(unit),
            _ => None,
        })
        .collect();
    assert_eq!(units, vec![0, 1, 2, 3]);
    canvas.teardown(&backend).expect("teardown");
}

#[test]
fn redraw_requires_current_context() {
    let (_dir, sources) = fixture(0);
    let backend = RecordingBackend::new();
    let mut canvas = ShaderCanvas::new(sources, options(0));
    activate(&mut canvas, &backend).expect("activation");

    backend.set_current(false);
    assert!(matches!(
        redraw(&mut canvas, &backend, SurfaceSize::default()),
        Err(CanvasError::ContextState)
    ));
    canvas.teardown(&backend).expect("teardown");
}

#[test]
fn teardown_releases_everything_once() {
    let (_dir, sources) = fixture(2);
    let backend = RecordingBackend::new();
    let mut canvas = ShaderCanvas::new(sources, options(2));
    activate(&mut canvas, &backend).expect("activation");
    redraw(&mut canvas, &backend, SurfaceSize::default()).expect("redraw");

    canvas.teardown(&backend).expect("teardown");
    assert!(backend.live_objects().is_empty());
    assert_eq!(backend.bound_program(), None);
    assert!(!canvas.is_active());

    assert!(canvas.is_released());

    backend.clear_calls();
    canvas.teardown(&backend).expect("second teardown");
    assert!(backend.calls().is_empty());
}

#[test]
fn teardown_reacquires_context_and_releases_it_again() {
    let (_dir, sources) = fixture(1);
    let backend = RecordingBackend::new();
    let mut canvas = ShaderCanvas::new(sources, options(1));
    activate(&mut canvas, &backend).expect("activation");

    backend.set_current(false);
    backend.clear_calls();
    canvas.teardown(&backend).expect("teardown");

    let calls = backend.calls();
    assert_eq!(calls.first(), Some(&GlCall::MakeCurrent));
    assert_eq!(calls.last(), Some(&GlCall::ReleaseCurrent));
    assert!(backend.live_objects().is_empty());
}

#[test]
fn teardown_before_activation_is_not_initialized() {
    let (_dir, sources) = fixture(0);
    let backend = RecordingBackend::new();
    let mut canvas: ShaderCanvas<RecordingBackend> = ShaderCanvas::new(sources, options(0));
    assert!(matches!(
        canvas.teardown(&backend),
        Err(CanvasError::NotInitialized)
    ));
    assert!(backend.calls().is_empty());
    assert!(!canvas.is_released());
}

#[test]
fn teardown_after_failed_activation_is_not_initialized() {
    let (_dir, sources) = fixture(0);
    let backend = RecordingBackend::new();
    backend.reject_link("error: vertex output not consumed");
    let mut canvas = ShaderCanvas::new(sources, options(0));
    activate(&mut canvas, &backend).unwrap_err();

    backend.clear_calls();
    assert!(matches!(
        canvas.teardown(&backend),
        Err(CanvasError::NotInitialized)
    ));
    assert!(backend.calls().is_empty());
}
