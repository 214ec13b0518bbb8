//! Headless [`GlBackend`] that records every call.
//!
//! Handles are plain integers handed out from a counter, uniform locations are
//! the uniform names themselves, and the backend keeps track of which objects
//! are still alive so hosts and tests can check for leaks. It can be told to
//! reject a shader stage, a link, a texture allocation or a context switch.

use std::cell::{Cell, RefCell};
use std::collections::BTreeSet;

use crate::gpu::backend::{
    BufferTarget, GlBackend, SamplerParams, TextureImage, UniformValue, VertexAttribute,
};
use crate::types::ShaderStage;

/// Record of a backend call for inspection.
#[derive(Debug, Clone, PartialEq)]
pub enum GlCall {
    MakeCurrent,
    ReleaseCurrent,
    CompileShader { stage: ShaderStage, shader: u32 },
    RejectShader { stage: ShaderStage },
    DeleteShader(u32),
    LinkProgram { program: u32, vertex: u32, fragment: u32 },
    RejectLink,
    UseProgram(Option<u32>),
    DeleteProgram(u32),
    SetUniform { name: String, value: UniformValue },
    CreateVertexArray(u32),
    BindVertexArray(Option<u32>),
    DeleteVertexArray(u32),
    CreateBuffer(u32),
    UploadBuffer {
        target: BufferTarget,
        buffer: u32,
        bytes: usize,
    },
    EnableVertexAttribute(VertexAttribute),
    DeleteBuffer(u32),
    DrawIndexedTriangles { count: i32 },
    CreateTexture(u32),
    ActiveTextureUnit(u32),
    BindTexture(Option<u32>),
    UploadTexture {
        width: u32,
        height: u32,
        sampler: SamplerParams,
    },
    DeleteTexture(u32),
    Viewport { width: u32, height: u32 },
}

/// A GPU object the recording backend considers alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum GlObject {
    Shader(u32),
    Program(u32),
    VertexArray(u32),
    Buffer(u32),
    Texture(u32),
}

#[derive(Debug)]
pub struct RecordingBackend {
    calls: RefCell<Vec<GlCall>>,
    live: RefCell<BTreeSet<GlObject>>,
    next_id: Cell<u32>,
    current: Cell<bool>,
    bound_program: Cell<Option<u32>>,
    declared_uniforms: RefCell<Option<BTreeSet<String>>>,
    rejected_stage: RefCell<Option<(ShaderStage, String)>>,
    rejected_link: RefCell<Option<String>>,
    refuse_make_current: Cell<bool>,
    failing_texture: Cell<Option<usize>>,
    textures_created: Cell<usize>,
}

impl Default for RecordingBackend {
    fn default() -> Self {
        Self {
            calls: RefCell::new(Vec::new()),
            live: RefCell::new(BTreeSet::new()),
            next_id: Cell::new(1),
            current: Cell::new(true),
            bound_program: Cell::new(None),
            declared_uniforms: RefCell::new(None),
            rejected_stage: RefCell::new(None),
            rejected_link: RefCell::new(None),
            refuse_make_current: Cell::new(false),
            failing_texture: Cell::new(None),
            textures_created: Cell::new(0),
        }
    }
}

impl RecordingBackend {
    /// Creates a backend whose context starts out current.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_current(&self, current: bool) {
        self.current.set(current);
    }

    /// Makes [`GlBackend::make_current`] fail from now on.
    pub fn refuse_make_current(&self) {
        self.refuse_make_current.set(true);
    }

    /// Fails compilation of `stage` with the given info log.
    pub fn reject_stage(&self, stage: ShaderStage, log: impl Into<String>) {
        *self.rejected_stage.borrow_mut() = Some((stage, log.into()));
    }

    /// Fails linking with the given info log.
    pub fn reject_link(&self, log: impl Into<String>) {
        *self.rejected_link.borrow_mut() = Some(log.into());
    }

    /// Fails the `index`-th texture allocation (0-based).
    pub fn fail_texture_allocation(&self, index: usize) {
        self.failing_texture.set(Some(index));
    }

    /// Restricts uniform lookups to `names`; by default every name resolves.
    pub fn declare_uniforms<I, S>(&self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        *self.declared_uniforms.borrow_mut() = Some(names.into_iter().map(Into::into).collect());
    }

    pub fn calls(&self) -> Vec<GlCall> {
        self.calls.borrow().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    pub fn live_objects(&self) -> Vec<GlObject> {
        self.live.borrow().iter().copied().collect()
    }

    pub fn bound_program(&self) -> Option<u32> {
        self.bound_program.get()
    }

    pub fn draw_count(&self) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|call| matches!(call, GlCall::DrawIndexedTriangles { .. }))
            .count()
    }

    /// Every value written to the uniform called `name`, oldest first.
    pub fn uniform_values(&self, name: &str) -> Vec<UniformValue> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|call| match call {
                GlCall::SetUniform { name: set, value } if set == name => Some(*value),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: GlCall) {
        self.calls.borrow_mut().push(call);
    }

    fn allocate(&self, object: impl FnOnce(u32) -> GlObject) -> u32 {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.live.borrow_mut().insert(object(id));
        id
    }

    fn free(&self, object: GlObject) {
        self.live.borrow_mut().remove(&object);
    }
}

impl GlBackend for RecordingBackend {
    type Shader = u32;
    type Program = u32;
    type VertexArray = u32;
    type Buffer = u32;
    type Texture = u32;
    type UniformLocation = String;

    fn is_current(&self) -> bool {
        self.current.get()
    }

    fn make_current(&self) -> Result<(), String> {
        if self.refuse_make_current.get() {
            return Err("surface is gone".to_string());
        }
        self.record(GlCall::MakeCurrent);
        self.current.set(true);
        Ok(())
    }

    fn release_current(&self) {
        self.record(GlCall::ReleaseCurrent);
        self.current.set(false);
    }

    fn compile_shader(&self, stage: ShaderStage, _source: &str) -> Result<u32, String> {
        let rejected = self.rejected_stage.borrow().clone();
        if let Some((rejected_stage, log)) = rejected {
            if rejected_stage == stage {
                self.record(GlCall::RejectShader { stage });
                return Err(log);
            }
        }
        let shader = self.allocate(GlObject::Shader);
        self.record(GlCall::CompileShader { stage, shader });
        Ok(shader)
    }

    fn delete_shader(&self, shader: u32) {
        self.free(GlObject::Shader(shader));
        self.record(GlCall::DeleteShader(shader));
    }

    fn link_program(&self, vertex: u32, fragment: u32) -> Result<u32, String> {
        if let Some(log) = self.rejected_link.borrow().clone() {
            self.record(GlCall::RejectLink);
            return Err(log);
        }
        let program = self.allocate(GlObject::Program);
        self.record(GlCall::LinkProgram {
            program,
            vertex,
            fragment,
        });
        Ok(program)
    }

    fn use_program(&self, program: Option<u32>) {
        self.bound_program.set(program);
        self.record(GlCall::UseProgram(program));
    }

    fn delete_program(&self, program: u32) {
        if self.bound_program.get() == Some(program) {
            self.bound_program.set(None);
        }
        self.free(GlObject::Program(program));
        self.record(GlCall::DeleteProgram(program));
    }

    fn uniform_location(&self, _program: u32, name: &str) -> Option<String> {
        match self.declared_uniforms.borrow().as_ref() {
            Some(declared) if !declared.contains(name) => None,
            _ => Some(name.to_string()),
        }
    }

    fn set_uniform(&self, location: &String, value: UniformValue) {
        self.record(GlCall::SetUniform {
            name: location.clone(),
            value,
        });
    }

    fn create_vertex_array(&self) -> Result<u32, String> {
        let vertex_array = self.allocate(GlObject::VertexArray);
        self.record(GlCall::CreateVertexArray(vertex_array));
        Ok(vertex_array)
    }

    fn bind_vertex_array(&self, vertex_array: Option<u32>) {
        self.record(GlCall::BindVertexArray(vertex_array));
    }

    fn delete_vertex_array(&self, vertex_array: u32) {
        self.free(GlObject::VertexArray(vertex_array));
        self.record(GlCall::DeleteVertexArray(vertex_array));
    }

    fn create_buffer(&self) -> Result<u32, String> {
        let buffer = self.allocate(GlObject::Buffer);
        self.record(GlCall::CreateBuffer(buffer));
        Ok(buffer)
    }

    fn upload_static_buffer(&self, target: BufferTarget, buffer: u32, data: &[u8]) {
        self.record(GlCall::UploadBuffer {
            target,
            buffer,
            bytes: data.len(),
        });
    }

    fn enable_vertex_attribute(&self, attribute: VertexAttribute) {
        self.record(GlCall::EnableVertexAttribute(attribute));
    }

    fn delete_buffer(&self, buffer: u32) {
        self.free(GlObject::Buffer(buffer));
        self.record(GlCall::DeleteBuffer(buffer));
    }

    fn draw_indexed_triangles(&self, count: i32) {
        self.record(GlCall::DrawIndexedTriangles { count });
    }

    fn create_texture(&self) -> Result<u32, String> {
        let index = self.textures_created.get();
        self.textures_created.set(index + 1);
        if self.failing_texture.get() == Some(index) {
            return Err("out of texture memory".to_string());
        }
        let texture = self.allocate(GlObject::Texture);
        self.record(GlCall::CreateTexture(texture));
        Ok(texture)
    }

    fn active_texture_unit(&self, unit: u32) {
        self.record(GlCall::ActiveTextureUnit(unit));
    }

    fn bind_texture(&self, texture: Option<u32>) {
        self.record(GlCall::BindTexture(texture));
    }

    fn upload_texture(&self, image: &TextureImage, sampler: SamplerParams) {
        self.record(GlCall::UploadTexture {
            width: image.width,
            height: image.height,
            sampler,
        });
    }

    fn delete_texture(&self, texture: u32) {
        self.free(GlObject::Texture(texture));
        self.record(GlCall::DeleteTexture(texture));
    }

    fn viewport(&self, width: u32, height: u32) {
        self.record(GlCall::Viewport { width, height });
    }
}
