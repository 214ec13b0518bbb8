//! The narrow set of OpenGL operations the canvas needs.
//!
//! The canvas never talks to a GL loader directly; it goes through
//! [`GlBackend`], which is implemented by the glow backend for real windows and
//! by the recording backend for headless hosts and tests. Every method assumes
//! the backend's context is current; callers prove that with
//! [`crate::gpu::CurrentContext`].

use std::fmt;

use crate::types::ShaderStage;

/// Value written to a uniform location.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Int(i32),
    Float(f32),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
}

/// Buffer binding point used for static geometry uploads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferTarget {
    Vertices,
    Indices,
}

/// One float vertex attribute inside an interleaved buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    pub index: u32,
    /// Component count (3 for `vec3`).
    pub components: i32,
    /// Distance between consecutive vertices, in bytes.
    pub stride: i32,
    /// Offset of the first component, in bytes.
    pub offset: i32,
}

/// Decoded RGBA8 pixels ready for upload, rows already bottom-up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// Minification/magnification filters and wrapping applied to channel textures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplerParams {
    pub min_filter: Filter,
    pub mag_filter: Filter,
    pub wrap: Wrap,
}

impl Default for SamplerParams {
    fn default() -> Self {
        Self {
            min_filter: Filter::LinearMipmapLinear,
            mag_filter: Filter::Linear,
            wrap: Wrap::Repeat,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    Linear,
    LinearMipmapLinear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wrap {
    Repeat,
}

/// OpenGL operations issued by [`crate::ShaderCanvas`].
///
/// Fallible object creation reports the driver's message as a `String`, the
/// same convention glow uses; the canvas wraps it into a
/// [`crate::CanvasError`].
pub trait GlBackend {
    type Shader: Copy + fmt::Debug;
    type Program: Copy + fmt::Debug;
    type VertexArray: Copy + fmt::Debug;
    type Buffer: Copy + fmt::Debug;
    type Texture: Copy + fmt::Debug;
    type UniformLocation: fmt::Debug;

    /// Whether this backend's context is current on the calling thread.
    fn is_current(&self) -> bool;
    /// Makes the context current against its surface.
    fn make_current(&self) -> Result<(), String>;
    /// Releases a context made current by [`GlBackend::make_current`].
    fn release_current(&self);

    /// Compiles `source` for `stage`. On failure the shader object is already
    /// deleted and the info log is returned.
    fn compile_shader(&self, stage: ShaderStage, source: &str) -> Result<Self::Shader, String>;
    fn delete_shader(&self, shader: Self::Shader);
    /// Links both shaders into a program. On failure the program object is
    /// already deleted and the info log is returned.
    fn link_program(
        &self,
        vertex: Self::Shader,
        fragment: Self::Shader,
    ) -> Result<Self::Program, String>;
    fn use_program(&self, program: Option<Self::Program>);
    fn delete_program(&self, program: Self::Program);

    /// Looks a uniform up by its exact GLSL name; `None` when the program
    /// does not declare it or the compiler dropped it.
    fn uniform_location(
        &self,
        program: Self::Program,
        name: &str,
    ) -> Option<Self::UniformLocation>;
    fn set_uniform(&self, location: &Self::UniformLocation, value: UniformValue);

    fn create_vertex_array(&self) -> Result<Self::VertexArray, String>;
    fn bind_vertex_array(&self, vertex_array: Option<Self::VertexArray>);
    fn delete_vertex_array(&self, vertex_array: Self::VertexArray);
    fn create_buffer(&self) -> Result<Self::Buffer, String>;
    /// Binds `buffer` to `target` and uploads `data` with static usage.
    fn upload_static_buffer(&self, target: BufferTarget, buffer: Self::Buffer, data: &[u8]);
    /// Describes and enables a float attribute of the bound vertex buffer.
    fn enable_vertex_attribute(&self, attribute: VertexAttribute);
    fn delete_buffer(&self, buffer: Self::Buffer);
    /// Draws `count` `u32` indices from the bound element buffer as triangles.
    fn draw_indexed_triangles(&self, count: i32);

    fn create_texture(&self) -> Result<Self::Texture, String>;
    /// Selects texture unit `unit` (0-based) for subsequent binds.
    fn active_texture_unit(&self, unit: u32);
    fn bind_texture(&self, texture: Option<Self::Texture>);
    /// Uploads RGBA8 pixels to the bound texture, applies `sampler` and
    /// generates the mipmap chain.
    fn upload_texture(&self, image: &TextureImage, sampler: SamplerParams);
    fn delete_texture(&self, texture: Self::Texture);

    /// Sets the viewport to `width x height` physical pixels at the origin.
    fn viewport(&self, width: u32, height: u32);
}
