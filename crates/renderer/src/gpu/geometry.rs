//! Static full-screen quad shared by every frame.

use bytemuck::{Pod, Zeroable};

use crate::error::CanvasError;
use crate::gpu::backend::{BufferTarget, GlBackend, VertexAttribute};

/// Interleaved quad vertex: NDC position followed by texture coordinate.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct QuadVertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
}

const fn vertex(x: f32, y: f32, u: f32, v: f32) -> QuadVertex {
    QuadVertex {
        position: [x, y, 0.0],
        uv: [u, v],
    }
}

/// Top-right, bottom-right, bottom-left, top-left.
pub const QUAD_VERTICES: [QuadVertex; 4] = [
    vertex(1.0, 1.0, 1.0, 1.0),
    vertex(1.0, -1.0, 1.0, 0.0),
    vertex(-1.0, -1.0, 0.0, 0.0),
    vertex(-1.0, 1.0, 0.0, 1.0),
];

pub const QUAD_INDICES: [u32; 6] = [0, 1, 3, 1, 2, 3];

pub const QUAD_INDEX_COUNT: i32 = QUAD_INDICES.len() as i32;

const FLOAT_SIZE: i32 = std::mem::size_of::<f32>() as i32;
const VERTEX_STRIDE: i32 = 5 * FLOAT_SIZE;

pub const POSITION_ATTRIBUTE: VertexAttribute = VertexAttribute {
    index: 0,
    components: 3,
    stride: VERTEX_STRIDE,
    offset: 0,
};

pub const TEXCOORD_ATTRIBUTE: VertexAttribute = VertexAttribute {
    index: 1,
    components: 2,
    stride: VERTEX_STRIDE,
    offset: 3 * FLOAT_SIZE,
};

/// VAO with its vertex and element buffers.
pub struct QuadGeometry<B: GlBackend> {
    pub vertex_array: B::VertexArray,
    pub vertex_buffer: B::Buffer,
    pub index_buffer: B::Buffer,
}

/// Handles allocated so far, so a failed upload can be rolled back.
pub(crate) struct PartialGeometry<B: GlBackend> {
    pub vertex_array: Option<B::VertexArray>,
    pub vertex_buffer: Option<B::Buffer>,
    pub index_buffer: Option<B::Buffer>,
}

impl<B: GlBackend> Default for PartialGeometry<B> {
    fn default() -> Self {
        Self {
            vertex_array: None,
            vertex_buffer: None,
            index_buffer: None,
        }
    }
}

impl<B: GlBackend> PartialGeometry<B> {
    pub fn release(&mut self, backend: &B) {
        if let Some(buffer) = self.index_buffer.take() {
            backend.delete_buffer(buffer);
        }
        if let Some(buffer) = self.vertex_buffer.take() {
            backend.delete_buffer(buffer);
        }
        if let Some(vertex_array) = self.vertex_array.take() {
            backend.delete_vertex_array(vertex_array);
        }
    }
}

/// Allocates the VAO/VBO/EBO triple and uploads the quad as static data.
pub(crate) fn upload_quad<B: GlBackend>(backend: &B) -> Result<QuadGeometry<B>, CanvasError> {
    let mut partial = PartialGeometry::<B>::default();
    match build(backend, &mut partial) {
        Ok(geometry) => Ok(geometry),
        Err(err) => {
            backend.bind_vertex_array(None);
            partial.release(backend);
            Err(err)
        }
    }
}

fn build<B: GlBackend>(
    backend: &B,
    partial: &mut PartialGeometry<B>,
) -> Result<QuadGeometry<B>, CanvasError> {
    let vertex_array = backend
        .create_vertex_array()
        .map_err(|message| CanvasError::gpu("vertex array allocation", message))?;
    partial.vertex_array = Some(vertex_array);
    let vertex_buffer = backend
        .create_buffer()
        .map_err(|message| CanvasError::gpu("vertex buffer allocation", message))?;
    partial.vertex_buffer = Some(vertex_buffer);
    let index_buffer = backend
        .create_buffer()
        .map_err(|message| CanvasError::gpu("index buffer allocation", message))?;
    partial.index_buffer = Some(index_buffer);

    backend.bind_vertex_array(Some(vertex_array));
    backend.upload_static_buffer(
        BufferTarget::Vertices,
        vertex_buffer,
        bytemuck::cast_slice(&QUAD_VERTICES),
    );
    // The element binding is VAO state, so it must be uploaded while the VAO is bound.
    backend.upload_static_buffer(
        BufferTarget::Indices,
        index_buffer,
        bytemuck::cast_slice(&QUAD_INDICES),
    );
    backend.enable_vertex_attribute(POSITION_ATTRIBUTE);
    backend.enable_vertex_attribute(TEXCOORD_ATTRIBUTE);
    backend.bind_vertex_array(None);

    *partial = PartialGeometry::default();
    Ok(QuadGeometry {
        vertex_array,
        vertex_buffer,
        index_buffer,
    })
}
