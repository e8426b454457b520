//! Resource definitions consumed by the shader builder and the pipeline
//! state cache. None of them touch the GPU:
//! - `ShaderProperties`: sorted property set
//! - `ShaderBlueprint` / `ShaderPiece`: macro sources
//! - `MaterialBlueprint`: the material system's contract

pub mod material_blueprint;
pub mod shader_blueprint;
pub mod shader_properties;

pub use material_blueprint::{
    MaterialBlueprint, NUMBER_OF_SHADER_TYPES, ShaderType, VisualImportance,
};
pub use shader_blueprint::{
    ShaderBlueprint, ShaderPiece, ShaderResourceProvider, ShaderResourceRegistry,
};
pub use shader_properties::ShaderProperties;
