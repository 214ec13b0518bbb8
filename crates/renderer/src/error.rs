use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::types::ShaderStage;

/// Failures reported by [`crate::ShaderCanvas`] operations.
///
/// None of these are transient; the canvas never retries and leaves the
/// decision to the host.
#[derive(Debug, Error)]
pub enum CanvasError {
    #[error("failed to compile {stage} shader {}: {log}", path.display())]
    ShaderCompile {
        stage: ShaderStage,
        path: PathBuf,
        log: String,
    },
    #[error("failed to read {stage} shader {}", path.display())]
    ShaderRead {
        stage: ShaderStage,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to link shader program: {log}")]
    ShaderLink { log: String },
    #[error("failed to load texture {}: {reason}", path.display())]
    TextureLoad { path: PathBuf, reason: String },
    #[error("shader sources are missing required key `{key}`")]
    MissingSource { key: String },
    #[error("{requested} textures requested but only {max} texture units are available")]
    TooManyTextures { requested: usize, max: usize },
    #[error("canvas has not been activated")]
    NotInitialized,
    #[error("graphics context is not current")]
    ContextState,
    #[error("GPU {operation} failed: {message}")]
    Gpu {
        operation: &'static str,
        message: String,
    },
}

impl CanvasError {
    pub(crate) fn gpu(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Gpu {
            operation,
            message: message.into(),
        }
    }
}
