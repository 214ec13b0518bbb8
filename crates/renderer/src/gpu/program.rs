use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::CanvasError;
use crate::gpu::backend::GlBackend;
use crate::types::{ShaderSources, ShaderStage};

/// Vertex and fragment shader objects plus the program they link into.
pub struct LinkedProgram<B: GlBackend> {
    pub program: B::Program,
    pub vertex: B::Shader,
    pub fragment: B::Shader,
}

impl<B: GlBackend> LinkedProgram<B> {
    /// Unbinds and deletes the program and both shader objects.
    pub(crate) fn release(self, backend: &B) {
        backend.use_program(None);
        backend.delete_program(self.program);
        backend.delete_shader(self.vertex);
        backend.delete_shader(self.fragment);
    }
}

/// Reads a shader source file as UTF-8.
pub fn read_stage(stage: ShaderStage, path: &Path) -> Result<String, CanvasError> {
    fs::read_to_string(path).map_err(|source| CanvasError::ShaderRead {
        stage,
        path: path.to_path_buf(),
        source,
    })
}

/// Reads, compiles and links the vertex/fragment pair, then makes the program
/// current. On failure no shader or program object survives.
pub(crate) fn build_program<B: GlBackend>(
    backend: &B,
    sources: &ShaderSources,
) -> Result<LinkedProgram<B>, CanvasError> {
    let vertex = compile_stage(backend, sources, ShaderStage::Vertex)?;
    let fragment = match compile_stage(backend, sources, ShaderStage::Fragment) {
        Ok(shader) => shader,
        Err(err) => {
            backend.delete_shader(vertex);
            return Err(err);
        }
    };
    let program = match backend.link_program(vertex, fragment) {
        Ok(program) => program,
        Err(log) => {
            backend.delete_shader(vertex);
            backend.delete_shader(fragment);
            return Err(CanvasError::ShaderLink { log });
        }
    };
    backend.use_program(Some(program));
    debug!(program = ?program, "linked shader program");
    Ok(LinkedProgram {
        program,
        vertex,
        fragment,
    })
}

fn compile_stage<B: GlBackend>(
    backend: &B,
    sources: &ShaderSources,
    stage: ShaderStage,
) -> Result<B::Shader, CanvasError> {
    let path = sources
        .shader(stage)
        .ok_or_else(|| CanvasError::MissingSource {
            key: stage.key().to_string(),
        })?;
    let source = read_stage(stage, path)?;
    let shader = backend
        .compile_shader(stage, &source)
        .map_err(|log| CanvasError::ShaderCompile {
            stage,
            path: path.to_path_buf(),
            log,
        })?;
    debug!(%stage, path = %path.display(), "compiled shader stage");
    Ok(shader)
}
