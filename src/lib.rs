//! Shader permutation building and pipeline state caching.
//!
//! - [`ShaderBuilder`] expands shader blueprints written in a small macro
//!   language (`@property`, `@foreach`, `@piece`, `@counter`, ...).
//! - [`PipelineStateSignature`] reduces a material blueprint, fixed-function
//!   state and shader properties to a 32-bit cache key.
//! - [`PipelineStateCacheManager`] serves pipeline states per signature,
//!   falling back to cached, less detailed permutations while the exact one
//!   compiles in the background.

pub mod errors;
pub mod renderer;
pub mod resources;
pub mod settings;
pub mod utils;

pub use errors::{CompileError, ShaderSyntaxError, SyntaxErrorKind};
pub use renderer::pipeline::{
    CompilationResultSink, GraphicsPipelineState, GraphicsPipelineStateHandle, PipelineShaders,
    PipelineStateCache, PipelineStateCacheContext, PipelineStateCacheManager,
    PipelineStateCompiler, PipelineStateFactory, PipelineStateSignature,
    SerializedGraphicsPipelineState, ShaderCache, ShaderCacheManager,
    ThreadedPipelineStateCompiler,
};
pub use renderer::{BuildShader, PassThroughPreprocessor, ShaderBuilder, ShaderPreprocessor};
pub use resources::{
    MaterialBlueprint, ShaderBlueprint, ShaderPiece, ShaderProperties, ShaderResourceProvider,
    ShaderResourceRegistry, ShaderType, VisualImportance,
};
pub use settings::{PipelineStateCompilerSettings, ShaderBuilderSettings};
pub use utils::{
    AssetId, MaterialBlueprintResourceId, PipelineStateSignatureId, ShaderBlueprintResourceId,
    ShaderCombinationId, ShaderPieceResourceId, ShaderPropertyId, StringId,
};
