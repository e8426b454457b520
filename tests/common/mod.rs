//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use rustc_hash::FxHashMap;

use pso_cache::{
    AssetId, GraphicsPipelineState, MaterialBlueprint, MaterialBlueprintResourceId,
    PipelineStateSignatureId, ShaderBlueprint, ShaderBlueprintResourceId, ShaderPropertyId,
    ShaderResourceRegistry, ShaderType, VisualImportance,
};

pub const VERTEX_SOURCE: &str = "@property(A) a @end@property(B) b @end";
pub const FRAGMENT_SOURCE: &str = "@property(C) c @end@property(D) d @end";

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn vertex_blueprint_id() -> ShaderBlueprintResourceId {
    ShaderBlueprintResourceId::from_name("Test/Vertex")
}

pub fn fragment_blueprint_id() -> ShaderBlueprintResourceId {
    ShaderBlueprintResourceId::from_name("Test/Fragment")
}

/// Vertex stage references `A` and `B`, fragment stage `C` and `D`.
pub fn registry() -> ShaderResourceRegistry {
    let mut registry = ShaderResourceRegistry::new();
    registry.insert_shader_blueprint(
        vertex_blueprint_id(),
        ShaderBlueprint::new(AssetId::from_name("test.vert"), VERTEX_SOURCE, &[]),
    );
    registry.insert_shader_blueprint(
        fragment_blueprint_id(),
        ShaderBlueprint::new(AssetId::from_name("test.frag"), FRAGMENT_SOURCE, &[]),
    );
    registry
}

pub fn id(name: &str) -> ShaderPropertyId {
    ShaderPropertyId::from_name(name)
}

#[derive(Debug, Clone)]
pub struct TestMaterialBlueprint {
    pub id: MaterialBlueprintResourceId,
    pub fully_loaded: bool,
    pub stages: [Option<ShaderBlueprintResourceId>; 5],
    pub importance: FxHashMap<ShaderPropertyId, VisualImportance>,
}

impl TestMaterialBlueprint {
    /// Vertex and fragment stages; every property weighs 0 until configured.
    pub fn new() -> Self {
        let mut stages = [None; 5];
        stages[ShaderType::Vertex.index()] = Some(vertex_blueprint_id());
        stages[ShaderType::Fragment.index()] = Some(fragment_blueprint_id());
        Self {
            id: MaterialBlueprintResourceId::from_name("Test/Material"),
            fully_loaded: true,
            stages,
            importance: FxHashMap::default(),
        }
    }

    pub fn with_importance(mut self, name: &str, importance: VisualImportance) -> Self {
        self.importance.insert(id(name), importance);
        self
    }
}

impl MaterialBlueprint for TestMaterialBlueprint {
    fn id(&self) -> MaterialBlueprintResourceId {
        self.id
    }

    fn is_fully_loaded(&self) -> bool {
        self.fully_loaded
    }

    fn shader_blueprint_resource_id(
        &self,
        shader_type: ShaderType,
    ) -> Option<ShaderBlueprintResourceId> {
        self.stages[shader_type.index()]
    }

    fn visual_importance_of_shader_property(&self, id: ShaderPropertyId) -> VisualImportance {
        self.importance
            .get(&id)
            .copied()
            .unwrap_or(VisualImportance::Weight(0))
    }
}

#[derive(Debug)]
pub struct TestPipelineState {
    pub signature_id: PipelineStateSignatureId,
    pub vertex_source: Option<String>,
}

impl GraphicsPipelineState for TestPipelineState {
    fn pipeline_state_signature_id(&self) -> PipelineStateSignatureId {
        self.signature_id
    }
}

pub fn test_pipeline_state(signature_id: PipelineStateSignatureId) -> Arc<TestPipelineState> {
    Arc::new(TestPipelineState {
        signature_id,
        vertex_source: None,
    })
}
