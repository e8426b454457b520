//! Pipeline state signature.
//!
//! The cache key of a pipeline state: material blueprint, fixed-function
//! state hash and shader properties, reduced to one 32-bit id.
//!
//! Per stage, only the properties its shader blueprint references take part
//! in the hash. Two property sets that differ only in properties no stage
//! looks at produce the same signature and share one pipeline state.
//!
//! 32-bit collisions are not detected. Two different inputs with the same id
//! alias the same cache entry.

use crate::resources::{
    MaterialBlueprint, NUMBER_OF_SHADER_TYPES, ShaderProperties, ShaderResourceProvider,
    ShaderType,
};
use crate::utils::hash::{FNV1A_INITIAL_HASH_32, fold_i32, fold_u32};
use crate::utils::{
    MaterialBlueprintResourceId, PipelineStateSignatureId, ShaderBlueprintResourceId,
    ShaderCombinationId,
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineStateSignature {
    material_blueprint_resource_id: MaterialBlueprintResourceId,
    serialized_pipeline_state_hash: u32,
    shader_properties: ShaderProperties,
    // Derived
    shader_blueprint_resource_ids: [Option<ShaderBlueprintResourceId>; NUMBER_OF_SHADER_TYPES],
    shader_combination_ids: [Option<ShaderCombinationId>; NUMBER_OF_SHADER_TYPES],
    pipeline_state_signature_id: PipelineStateSignatureId,
}

impl PipelineStateSignature {
    #[must_use]
    pub fn new(
        material_blueprint: &dyn MaterialBlueprint,
        resources: &dyn ShaderResourceProvider,
        serialized_pipeline_state_hash: u32,
        shader_properties: &ShaderProperties,
    ) -> Self {
        let mut signature = Self::default();
        signature.set(
            material_blueprint,
            resources,
            serialized_pipeline_state_hash,
            shader_properties,
        );
        signature
    }

    /// Recomputes every derived id from the given inputs.
    ///
    /// A stage without a shader blueprint, or whose blueprint is not
    /// registered, is skipped and keeps no combination id.
    pub fn set(
        &mut self,
        material_blueprint: &dyn MaterialBlueprint,
        resources: &dyn ShaderResourceProvider,
        serialized_pipeline_state_hash: u32,
        shader_properties: &ShaderProperties,
    ) {
        self.material_blueprint_resource_id = material_blueprint.id();
        self.serialized_pipeline_state_hash = serialized_pipeline_state_hash;
        self.shader_properties.clone_from(shader_properties);

        let mut signature_id =
            fold_u32(self.material_blueprint_resource_id.id(), FNV1A_INITIAL_HASH_32);
        signature_id = fold_u32(serialized_pipeline_state_hash, signature_id);

        for shader_type in ShaderType::ALL {
            let stage = shader_type.index();
            let blueprint_id = material_blueprint.shader_blueprint_resource_id(shader_type);
            self.shader_blueprint_resource_ids[stage] = blueprint_id;
            self.shader_combination_ids[stage] = None;

            let Some(blueprint_id) = blueprint_id else {
                continue;
            };
            let Some(blueprint) = resources.shader_blueprint(blueprint_id) else {
                log::trace!(
                    "Pipeline state signature: {} shader blueprint {blueprint_id} not registered",
                    shader_type.name()
                );
                continue;
            };

            let mut combination_id = fold_u32(blueprint_id.id(), FNV1A_INITIAL_HASH_32);
            for (property_id, value) in shader_properties.iter() {
                if blueprint.references_shader_property(property_id) {
                    combination_id = fold_u32(property_id.id(), combination_id);
                    combination_id = fold_i32(value, combination_id);
                }
            }

            self.shader_combination_ids[stage] =
                Some(ShaderCombinationId::from_raw(combination_id));
            signature_id = fold_u32(combination_id, signature_id);
        }

        self.pipeline_state_signature_id = PipelineStateSignatureId::from_raw(signature_id);
    }

    #[inline]
    #[must_use]
    pub fn material_blueprint_resource_id(&self) -> MaterialBlueprintResourceId {
        self.material_blueprint_resource_id
    }

    #[inline]
    #[must_use]
    pub fn serialized_pipeline_state_hash(&self) -> u32 {
        self.serialized_pipeline_state_hash
    }

    #[inline]
    #[must_use]
    pub fn shader_properties(&self) -> &ShaderProperties {
        &self.shader_properties
    }

    #[inline]
    #[must_use]
    pub fn shader_blueprint_resource_id(
        &self,
        shader_type: ShaderType,
    ) -> Option<ShaderBlueprintResourceId> {
        self.shader_blueprint_resource_ids[shader_type.index()]
    }

    #[inline]
    #[must_use]
    pub fn shader_combination_id(&self, shader_type: ShaderType) -> Option<ShaderCombinationId> {
        self.shader_combination_ids[shader_type.index()]
    }

    #[inline]
    #[must_use]
    pub fn pipeline_state_signature_id(&self) -> PipelineStateSignatureId {
        self.pipeline_state_signature_id
    }
}
