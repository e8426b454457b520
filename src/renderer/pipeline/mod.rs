//! Pipeline state management
//!
//! - `pipeline_key`: fixed-function state and its stable hash
//! - `signature`: the cache key of one permutation
//! - `cache` / `cache_manager`: entries and miss handling with fallbacks
//! - `compiler`: asynchronous and synchronous compilation
//! - `shader_cache`: built shader sources, shared between pipeline states

pub mod cache;
pub mod cache_manager;
pub mod compiler;
pub mod pipeline_key;
pub mod shader_cache;
pub mod signature;

pub use cache::{
    CompilationResultSink, GraphicsPipelineState, GraphicsPipelineStateHandle, PipelineStateCache,
};
pub use cache_manager::{PipelineStateCacheContext, PipelineStateCacheManager};
pub use compiler::{
    PipelineShaders, PipelineStateCompiler, PipelineStateFactory, ThreadedPipelineStateCompiler,
};
pub use pipeline_key::SerializedGraphicsPipelineState;
pub use shader_cache::{ShaderCache, ShaderCacheManager};
pub use signature::PipelineStateSignature;
