//! Shader building and pipeline state caching.

pub mod pipeline;
pub mod preprocessor;
pub mod shader_builder;

pub use pipeline::{
    GraphicsPipelineStateHandle, PipelineStateCache, PipelineStateCacheContext,
    PipelineStateCacheManager, PipelineStateSignature, ThreadedPipelineStateCompiler,
};
pub use preprocessor::{PassThroughPreprocessor, ShaderPreprocessor};
pub use shader_builder::{BuildShader, ShaderBuilder};
