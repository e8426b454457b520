pub mod hash;
pub mod string_id;

pub use string_id::{
    AssetId, MaterialBlueprintResourceId, PipelineStateSignatureId, ShaderBlueprintResourceId,
    ShaderCombinationId, ShaderPieceResourceId, ShaderPropertyId, StringId,
};
