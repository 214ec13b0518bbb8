//! [`GlBackend`] over glow, bound to a glutin context and window surface.

use std::num::NonZeroU32;

use glow::HasContext;
use glutin::context::{PossiblyCurrentContext, PossiblyCurrentGlContext};
use glutin::display::{GetGlDisplay, GlDisplay};
use glutin::surface::{GlSurface, Surface, WindowSurface};
use tracing::{info, warn};

use crate::gpu::backend::{
    BufferTarget, Filter, GlBackend, SamplerParams, TextureImage, UniformValue, VertexAttribute,
    Wrap,
};
use crate::types::ShaderStage;

pub struct GlowBackend {
    gl: glow::Context,
    context: PossiblyCurrentContext,
    surface: Surface<WindowSurface>,
}

impl GlowBackend {
    /// Loads GL entry points through the context's display. The context must
    /// be current on the calling thread.
    pub fn new(context: PossiblyCurrentContext, surface: Surface<WindowSurface>) -> Self {
        let display = context.display();
        // SAFETY: the loader resolves symbols for the context that is current here.
        let gl = unsafe {
            glow::Context::from_loader_function_cstr(|symbol| display.get_proc_address(symbol))
        };
        // SAFETY: querying strings on the current context.
        let (version, renderer) = unsafe {
            (
                gl.get_parameter_string(glow::VERSION),
                gl.get_parameter_string(glow::RENDERER),
            )
        };
        info!(%version, %renderer, "OpenGL context ready");
        Self {
            gl,
            context,
            surface,
        }
    }

    pub fn swap_buffers(&self) -> Result<(), String> {
        self.surface
            .swap_buffers(&self.context)
            .map_err(|err| err.to_string())
    }

    /// Resizes the window surface; zero-sized requests are ignored.
    pub fn resize(&self, width: u32, height: u32) {
        if let (Some(width), Some(height)) = (NonZeroU32::new(width), NonZeroU32::new(height)) {
            self.surface.resize(&self.context, width, height);
        }
    }
}

fn buffer_target(target: BufferTarget) -> u32 {
    match target {
        BufferTarget::Vertices => glow::ARRAY_BUFFER,
        BufferTarget::Indices => glow::ELEMENT_ARRAY_BUFFER,
    }
}

fn filter(filter: Filter) -> i32 {
    (match filter {
        Filter::Linear => glow::LINEAR,
        Filter::LinearMipmapLinear => glow::LINEAR_MIPMAP_LINEAR,
    }) as i32
}

fn wrap(wrap: Wrap) -> i32 {
    (match wrap {
        Wrap::Repeat => glow::REPEAT,
    }) as i32
}

// SAFETY (all methods below): every call is issued on the thread owning the
// context, and callers hold a `CurrentContext` proving it is current.
impl GlBackend for GlowBackend {
    type Shader = glow::Shader;
    type Program = glow::Program;
    type VertexArray = glow::VertexArray;
    type Buffer = glow::Buffer;
    type Texture = glow::Texture;
    type UniformLocation = glow::UniformLocation;

    fn is_current(&self) -> bool {
        self.context.is_current()
    }

    fn make_current(&self) -> Result<(), String> {
        self.context
            .make_current(&self.surface)
            .map_err(|err| err.to_string())
    }

    fn release_current(&self) {
        if let Err(err) = self.context.make_not_current_in_place() {
            warn!(error = %err, "failed to release graphics context");
        }
    }

    fn compile_shader(&self, stage: ShaderStage, source: &str) -> Result<glow::Shader, String> {
        let kind = match stage {
            ShaderStage::Vertex => glow::VERTEX_SHADER,
            ShaderStage::Fragment => glow::FRAGMENT_SHADER,
        };
        unsafe {
            let shader = self.gl.create_shader(kind)?;
            self.gl.shader_source(shader, source);
            self.gl.compile_shader(shader);
            if !self.gl.get_shader_compile_status(shader) {
                let log = self.gl.get_shader_info_log(shader);
                self.gl.delete_shader(shader);
                return Err(log);
            }
            Ok(shader)
        }
    }

    fn delete_shader(&self, shader: glow::Shader) {
        unsafe { self.gl.delete_shader(shader) }
    }

    fn link_program(
        &self,
        vertex: glow::Shader,
        fragment: glow::Shader,
    ) -> Result<glow::Program, String> {
        unsafe {
            let program = self.gl.create_program()?;
            self.gl.attach_shader(program, vertex);
            self.gl.attach_shader(program, fragment);
            self.gl.link_program(program);
            if !self.gl.get_program_link_status(program) {
                let log = self.gl.get_program_info_log(program);
                self.gl.detach_shader(program, vertex);
                self.gl.detach_shader(program, fragment);
                self.gl.delete_program(program);
                return Err(log);
            }
            Ok(program)
        }
    }

    fn use_program(&self, program: Option<glow::Program>) {
        unsafe { self.gl.use_program(program) }
    }

    fn delete_program(&self, program: glow::Program) {
        unsafe { self.gl.delete_program(program) }
    }

    fn uniform_location(
        &self,
        program: glow::Program,
        name: &str,
    ) -> Option<glow::UniformLocation> {
        unsafe { self.gl.get_uniform_location(program, name) }
    }

    fn set_uniform(&self, location: &glow::UniformLocation, value: UniformValue) {
        unsafe {
            match value {
                UniformValue::Int(v) => self.gl.uniform_1_i32(Some(location), v),
                UniformValue::Float(v) => self.gl.uniform_1_f32(Some(location), v),
                UniformValue::Vec3([x, y, z]) => self.gl.uniform_3_f32(Some(location), x, y, z),
                UniformValue::Vec4([x, y, z, w]) => {
                    self.gl.uniform_4_f32(Some(location), x, y, z, w)
                }
            }
        }
    }

    fn create_vertex_array(&self) -> Result<glow::VertexArray, String> {
        unsafe { self.gl.create_vertex_array() }
    }

    fn bind_vertex_array(&self, vertex_array: Option<glow::VertexArray>) {
        unsafe { self.gl.bind_vertex_array(vertex_array) }
    }

    fn delete_vertex_array(&self, vertex_array: glow::VertexArray) {
        unsafe { self.gl.delete_vertex_array(vertex_array) }
    }

    fn create_buffer(&self) -> Result<glow::Buffer, String> {
        unsafe { self.gl.create_buffer() }
    }

    fn upload_static_buffer(&self, target: BufferTarget, buffer: glow::Buffer, data: &[u8]) {
        let target = buffer_target(target);
        unsafe {
            self.gl.bind_buffer(target, Some(buffer));
            self.gl.buffer_data_u8_slice(target, data, glow::STATIC_DRAW);
        }
    }

    fn enable_vertex_attribute(&self, attribute: VertexAttribute) {
        unsafe {
            self.gl.vertex_attrib_pointer_f32(
                attribute.index,
                attribute.components,
                glow::FLOAT,
                false,
                attribute.stride,
                attribute.offset,
            );
            self.gl.enable_vertex_attrib_array(attribute.index);
        }
    }

    fn delete_buffer(&self, buffer: glow::Buffer) {
        unsafe { self.gl.delete_buffer(buffer) }
    }

    fn draw_indexed_triangles(&self, count: i32) {
        unsafe {
            self.gl
                .draw_elements(glow::TRIANGLES, count, glow::UNSIGNED_INT, 0)
        }
    }

    fn create_texture(&self) -> Result<glow::Texture, String> {
        unsafe { self.gl.create_texture() }
    }

    fn active_texture_unit(&self, unit: u32) {
        unsafe { self.gl.active_texture(glow::TEXTURE0 + unit) }
    }

    fn bind_texture(&self, texture: Option<glow::Texture>) {
        unsafe { self.gl.bind_texture(glow::TEXTURE_2D, texture) }
    }

    fn upload_texture(&self, image: &TextureImage, sampler: SamplerParams) {
        unsafe {
            self.gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                glow::RGBA8 as i32,
                image.width as i32,
                image.height as i32,
                0,
                glow::RGBA,
                glow::UNSIGNED_BYTE,
                glow::PixelUnpackData::Slice(Some(image.pixels.as_slice())),
            );
            self.gl
                .tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_S, wrap(sampler.wrap));
            self.gl
                .tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_T, wrap(sampler.wrap));
            self.gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_MIN_FILTER,
                filter(sampler.min_filter),
            );
            self.gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_MAG_FILTER,
                filter(sampler.mag_filter),
            );
            self.gl.generate_mipmap(glow::TEXTURE_2D);
        }
    }

    fn delete_texture(&self, texture: glow::Texture) {
        unsafe { self.gl.delete_texture(texture) }
    }

    fn viewport(&self, width: u32, height: u32) {
        unsafe { self.gl.viewport(0, 0, width as i32, height as i32) }
    }
}
