//! GPU plumbing behind [`crate::ShaderCanvas`].
//!
//! - `backend` defines the [`GlBackend`] seam and its value types.
//! - `context` provides the [`CurrentContext`] guard every GPU call requires.
//! - `glow_backend` implements the seam over glow + glutin for real windows.
//! - `recording` implements it headlessly, recording each call.
//! - `program` reads, compiles and links the shader pair.
//! - `geometry` owns the static quad layout and its VAO/VBO/EBO upload.
//! - `channels` decodes texture files and uploads them to sequential units.
//! - `uniforms` knows the ShaderToy uniform names and writes them per frame.

pub mod backend;
pub mod channels;
mod context;
pub mod geometry;
mod glow_backend;
pub mod program;
pub mod recording;
pub mod uniforms;

pub use backend::{GlBackend, SamplerParams, TextureImage, UniformValue};
pub use context::CurrentContext;
pub use glow_backend::GlowBackend;
pub use recording::{GlCall, GlObject, RecordingBackend};
