//! Native shader preprocessor hook.
//!
//! The last builder step hands the expanded text to a C-style preprocessor
//! (`#define`, `#if`, `#include`). Which one depends on the shading language
//! of the host renderer, so it is injected as a trait object.

use crate::errors::Result;

/// Text → text transform run after all macro stages.
pub trait ShaderPreprocessor: Send + Sync {
    fn preprocess(&self, source: &str) -> Result<String>;
}

/// Returns the source unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassThroughPreprocessor;

impl ShaderPreprocessor for PassThroughPreprocessor {
    fn preprocess(&self, source: &str) -> Result<String> {
        Ok(source.to_owned())
    }
}

impl<F> ShaderPreprocessor for F
where
    F: Fn(&str) -> Result<String> + Send + Sync,
{
    fn preprocess(&self, source: &str) -> Result<String> {
        self(source)
    }
}
