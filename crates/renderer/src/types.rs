use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::CanvasError;
use crate::runtime::TimePolicy;

/// ShaderToy exposes four input channels (`iChannel0-3`) by default.
pub const DEFAULT_TEXTURE_COUNT: usize = 4;

/// Upper bound on texture units; OpenGL 3.3 guarantees 16 in the fragment stage.
pub const MAX_TEXTURE_UNITS: usize = 16;

pub const VERTEX_KEY: &str = "vertex";
pub const FRAGMENT_KEY: &str = "fragment";
const TEXTURE_KEY_PREFIX: &str = "texture";

/// Returns the source key for texture channel `index` (`texture0`, `texture1`, ...).
pub fn texture_key(index: usize) -> String {
    format!("{TEXTURE_KEY_PREFIX}{index}")
}

/// Programmable stage a shader source belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    /// Source key the stage is looked up under.
    pub fn key(self) -> &'static str {
        match self {
            ShaderStage::Vertex => VERTEX_KEY,
            ShaderStage::Fragment => FRAGMENT_KEY,
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Key-to-path mapping describing the shader pair and texture files.
///
/// The mapping is handed to the canvas once and never mutated afterwards;
/// recognised keys are `vertex`, `fragment` and `texture0..textureN`. Unknown
/// keys are carried along untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ShaderSources {
    paths: BTreeMap<String, PathBuf>,
}

impl ShaderSources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience constructor for the required shader pair.
    pub fn with_shaders(vertex: impl Into<PathBuf>, fragment: impl Into<PathBuf>) -> Self {
        let mut sources = Self::new();
        sources.insert(VERTEX_KEY, vertex);
        sources.insert(FRAGMENT_KEY, fragment);
        sources
    }

    pub fn insert(&mut self, key: impl Into<String>, path: impl Into<PathBuf>) {
        self.paths.insert(key.into(), path.into());
    }

    /// Associates a texture path with the given channel.
    pub fn set_texture(&mut self, channel: usize, path: impl Into<PathBuf>) {
        self.insert(texture_key(channel), path);
    }

    pub fn get(&self, key: &str) -> Option<&Path> {
        self.paths.get(key).map(PathBuf::as_path)
    }

    pub fn shader(&self, stage: ShaderStage) -> Option<&Path> {
        self.get(stage.key())
    }

    pub fn texture(&self, channel: usize) -> Option<&Path> {
        self.get(&texture_key(channel))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Path)> {
        self.paths
            .iter()
            .map(|(key, path)| (key.as_str(), path.as_path()))
    }

    /// Number of texture keys present without a gap, starting at `texture0`.
    pub fn contiguous_texture_count(&self) -> usize {
        (0..MAX_TEXTURE_UNITS)
            .take_while(|index| self.texture(*index).is_some())
            .count()
    }

    /// Checks the keys activation needs before any GPU work starts.
    pub fn validate(&self, texture_count: usize) -> Result<(), CanvasError> {
        if texture_count > MAX_TEXTURE_UNITS {
            return Err(CanvasError::TooManyTextures {
                requested: texture_count,
                max: MAX_TEXTURE_UNITS,
            });
        }
        for stage in [ShaderStage::Vertex, ShaderStage::Fragment] {
            if self.shader(stage).is_none() {
                return Err(CanvasError::MissingSource {
                    key: stage.key().to_string(),
                });
            }
        }
        for channel in 0..texture_count {
            if self.texture(channel).is_none() {
                return Err(CanvasError::MissingSource {
                    key: texture_key(channel),
                });
            }
        }
        Ok(())
    }
}

impl FromIterator<(String, PathBuf)> for ShaderSources {
    fn from_iter<T: IntoIterator<Item = (String, PathBuf)>>(iter: T) -> Self {
        Self {
            paths: iter.into_iter().collect(),
        }
    }
}

/// Size of the drawable surface.
///
/// `width`/`height` are logical pixels (what pointer events report);
/// `device_pixel_ratio` scales them to the physical framebuffer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
    pub device_pixel_ratio: f32,
}

impl SurfaceSize {
    pub fn new(width: u32, height: u32, device_pixel_ratio: f32) -> Self {
        Self {
            width,
            height,
            device_pixel_ratio,
        }
    }

    /// Builds a logical size from a physical framebuffer size and scale factor.
    pub fn from_physical(width: u32, height: u32, scale_factor: f64) -> Self {
        let scale = if scale_factor > 0.0 { scale_factor } else { 1.0 };
        Self {
            width: (f64::from(width) / scale).round() as u32,
            height: (f64::from(height) / scale).round() as u32,
            device_pixel_ratio: scale as f32,
        }
    }

    /// Framebuffer size in physical pixels, never zero.
    pub fn physical(&self) -> (u32, u32) {
        let scale = self.device_pixel_ratio.max(f32::EPSILON);
        (
            ((self.width as f32 * scale).round() as u32).max(1),
            ((self.height as f32 * scale).round() as u32).max(1),
        )
    }
}

impl Default for SurfaceSize {
    fn default() -> Self {
        Self::new(800, 600, 1.0)
    }
}

/// Behaviour knobs for a [`crate::ShaderCanvas`].
#[derive(Debug, Clone, PartialEq)]
pub struct CanvasOptions {
    /// Number of `textureN` channels loaded at activation.
    pub texture_count: usize,
    /// Where `iTime` comes from.
    pub time_policy: TimePolicy,
}

impl Default for CanvasOptions {
    fn default() -> Self {
        Self {
            texture_count: DEFAULT_TEXTURE_COUNT,
            time_policy: TimePolicy::default(),
        }
    }
}

/// Immutable configuration passed to the window host at start-up.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Initial logical window size.
    pub surface_size: (u32, u32),
    /// Window title.
    pub title: String,
    /// Shader and texture paths.
    pub sources: ShaderSources,
    /// Canvas behaviour.
    pub options: CanvasOptions,
    /// Optional FPS cap; `None` redraws as fast as the event loop allows.
    pub target_fps: Option<f32>,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            surface_size: (800, 600),
            title: "ShaderCanvas".to_string(),
            sources: ShaderSources::default(),
            options: CanvasOptions::default(),
            target_fps: None,
        }
    }
}
