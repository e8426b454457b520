//! Error Types
//!
//! Two families of failures exist in this crate:
//!
//! - **Shader syntax errors** are produced by the macro engine. They never
//!   abort a build: each one is logged and collected into
//!   [`BuildShader::syntax_errors`], and the offending construct contributes
//!   no text.
//! - **Compile errors** come from the collaborators that turn final shader
//!   text into GPU objects ([`ShaderPreprocessor`], [`PipelineStateFactory`]).
//!   The compiler logs them; the pipeline state cache never sees them.
//!
//! [`BuildShader::syntax_errors`]: crate::renderer::shader_builder::BuildShader
//! [`ShaderPreprocessor`]: crate::renderer::preprocessor::ShaderPreprocessor
//! [`PipelineStateFactory`]: crate::renderer::pipeline::compiler::PipelineStateFactory

use thiserror::Error;

use crate::resources::ShaderType;
use crate::utils::{PipelineStateSignatureId, ShaderBlueprintResourceId};

/// What went wrong inside the shader macro language.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyntaxErrorKind {
    /// A block (`@foreach`, `@property`, `@piece`) without matching `@end`.
    #[error("@{0} block without matching @end")]
    UnterminatedBlock(&'static str),

    /// An `@end` or `@else` left over after every block was resolved.
    #[error("@{0} without an open block")]
    StrayBlockEnd(&'static str),

    #[error("unmatched parenthesis after @{0}")]
    UnmatchedParenthesis(&'static str),

    #[error("malformed arguments to @{directive}: {reason}")]
    MalformedArguments {
        directive: &'static str,
        reason: String,
    },

    #[error("@{directive} expects {expected} argument(s), got {got}")]
    ArgumentCount {
        directive: &'static str,
        expected: &'static str,
        got: usize,
    },

    /// First definition wins, the duplicate is dropped.
    #[error("@piece '{0}' already defined")]
    DuplicatePiece(String),

    #[error("@insertpiece references unknown piece '{0}'")]
    UnknownPiece(String),

    #[error("unexpected @else")]
    UnexpectedElse,

    #[error("invalid @property expression: {0}")]
    InvalidExpression(String),

    #[error("@{0} divides by zero")]
    DivisionByZero(&'static str),

    /// Nested expansion did not settle within the configured pass budget.
    #[error("@{directive} did not reach a fixed point within {passes} passes")]
    ExpansionLimitExceeded {
        directive: &'static str,
        passes: u32,
    },
}

/// One diagnostic emitted while building a shader.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("line {line}: {kind}")]
pub struct ShaderSyntaxError {
    /// 1-based line within the text being processed when the error was found.
    pub line: usize,
    pub kind: SyntaxErrorKind,
}

/// A failure while turning shader text into GPU objects.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    #[error("Shader blueprint {0} is not registered")]
    MissingShaderBlueprint(ShaderBlueprintResourceId),

    #[error("Shader preprocessing failed: {0}")]
    Preprocessor(String),

    #[error("Native {stage} shader compilation failed: {details}")]
    Shader { stage: &'static str, details: String },

    #[error("Pipeline state {signature} creation failed: {details}")]
    PipelineState {
        signature: PipelineStateSignatureId,
        details: String,
    },
}

impl CompileError {
    #[must_use]
    pub fn shader(stage: ShaderType, details: impl Into<String>) -> Self {
        CompileError::Shader {
            stage: stage.name(),
            details: details.into(),
        }
    }
}

/// Alias for `Result<T, CompileError>`.
pub type Result<T> = std::result::Result<T, CompileError>;
