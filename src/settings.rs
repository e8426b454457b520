//! Pipeline State Cache Settings
//!
//! Plain configuration structs passed into constructors. Both derive serde
//! with `#[serde(default)]`, so a host can embed them in its own config file
//! and omit any field.
//!
//! ```rust,ignore
//! use pso_cache::settings::PipelineStateCompilerSettings;
//!
//! let settings = PipelineStateCompilerSettings {
//!     number_of_compiler_threads: 4,
//!     ..Default::default()
//! };
//! ```

use serde::{Deserialize, Serialize};

/// Limits for the shader macro engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShaderBuilderSettings {
    /// Upper bound on re-expansion passes for nested `@foreach`/`@property`
    /// blocks and for the piece collect/insert loop. Exceeding it is a
    /// syntax error.
    pub max_expansion_passes: u32,
}

impl Default for ShaderBuilderSettings {
    fn default() -> Self {
        Self {
            max_expansion_passes: 32,
        }
    }
}

/// Configuration of [`ThreadedPipelineStateCompiler`].
///
/// [`ThreadedPipelineStateCompiler`]: crate::renderer::pipeline::compiler::ThreadedPipelineStateCompiler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineStateCompilerSettings {
    /// When disabled, cache misses always compile on the calling thread and
    /// no fallback is searched.
    pub asynchronous_compilation_enabled: bool,
    /// Worker threads serving asynchronous requests. At least one is spawned.
    pub number_of_compiler_threads: u32,
    pub shader_builder: ShaderBuilderSettings,
}

impl Default for PipelineStateCompilerSettings {
    fn default() -> Self {
        Self {
            asynchronous_compilation_enabled: true,
            number_of_compiler_threads: 2,
            shader_builder: ShaderBuilderSettings::default(),
        }
    }
}
