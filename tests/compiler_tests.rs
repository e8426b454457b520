//! Pipeline State Compiler Tests
//!
//! Tests for:
//! - Synchronous compilation through the shader cache and the factory
//! - Asynchronous compilation replacing a fallback
//! - Shader source deduplication
//! - Failure handling: factory errors, missing shader blueprints
//! - Settings deserialization

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use pso_cache::errors::{CompileError, Result};
use pso_cache::{
    GraphicsPipelineStateHandle, PipelineShaders, PipelineStateCacheContext,
    PipelineStateCacheManager, PipelineStateCompilerSettings, PipelineStateFactory,
    PipelineStateSignature, SerializedGraphicsPipelineState, ShaderBlueprintResourceId,
    ShaderBuilderSettings, ShaderProperties, ShaderType, ThreadedPipelineStateCompiler,
    VisualImportance,
};

use common::{TestMaterialBlueprint, TestPipelineState, registry};

/// Creates [`TestPipelineState`]s carrying the built vertex source.
#[derive(Default)]
struct CountingFactory {
    created: AtomicUsize,
    fail: AtomicBool,
}

impl PipelineStateFactory for CountingFactory {
    fn create_graphics_pipeline_state(
        &self,
        signature: &PipelineStateSignature,
        shaders: &PipelineShaders,
    ) -> Result<GraphicsPipelineStateHandle> {
        if self.fail.load(Ordering::Relaxed) {
            return Err(CompileError::PipelineState {
                signature: signature.pipeline_state_signature_id(),
                details: "rejected by test factory".to_owned(),
            });
        }
        self.created.fetch_add(1, Ordering::Relaxed);
        Ok(Arc::new(TestPipelineState {
            signature_id: signature.pipeline_state_signature_id(),
            vertex_source: shaders[ShaderType::Vertex.index()]
                .as_ref()
                .map(|shader| shader.source_code().to_owned()),
        }))
    }
}

fn synchronous_settings() -> PipelineStateCompilerSettings {
    PipelineStateCompilerSettings {
        asynchronous_compilation_enabled: false,
        ..Default::default()
    }
}

fn compiler(
    settings: PipelineStateCompilerSettings,
) -> (ThreadedPipelineStateCompiler, Arc<CountingFactory>) {
    common::init_logger();
    let factory = Arc::new(CountingFactory::default());
    let compiler =
        ThreadedPipelineStateCompiler::new(settings, Arc::new(registry()), factory.clone());
    (compiler, factory)
}

fn request(
    manager: &mut PipelineStateCacheManager,
    material: &TestMaterialBlueprint,
    compiler: &ThreadedPipelineStateCompiler,
    properties: &ShaderProperties,
    allow_emergency: bool,
) -> Option<GraphicsPipelineStateHandle> {
    let context = PipelineStateCacheContext {
        material_blueprint: material,
        resources: compiler.resources().as_ref(),
        compiler,
    };
    manager.get_graphics_pipeline_state_cache_by_combination(
        context,
        SerializedGraphicsPipelineState::default().hash(),
        properties,
        allow_emergency,
    )
}

fn signature_id(
    material: &TestMaterialBlueprint,
    compiler: &ThreadedPipelineStateCompiler,
    properties: &ShaderProperties,
) -> pso_cache::PipelineStateSignatureId {
    PipelineStateSignature::new(
        material,
        compiler.resources().as_ref(),
        SerializedGraphicsPipelineState::default().hash(),
        properties,
    )
    .pipeline_state_signature_id()
}

// ============================================================================
// Synchronous Compilation
// ============================================================================

#[test]
fn synchronous_compile_builds_every_used_stage() {
    let (compiler, factory) = compiler(synchronous_settings());
    let material = TestMaterialBlueprint::new();
    let mut manager = PipelineStateCacheManager::new();
    let properties = ShaderProperties::from(&[("A", 1)][..]);

    let handle = request(&mut manager, &material, &compiler, &properties, true).unwrap();

    assert_eq!(
        handle.pipeline_state_signature_id(),
        signature_id(&material, &compiler, &properties)
    );
    assert_eq!(factory.created.load(Ordering::Relaxed), 1);
    // Vertex and fragment, no geometry.
    assert_eq!(compiler.shader_cache_manager().len(), 2);

    let signature = PipelineStateSignature::new(
        &material,
        compiler.resources().as_ref(),
        SerializedGraphicsPipelineState::default().hash(),
        &properties,
    );
    let vertex = compiler
        .shader_cache_manager()
        .get(signature.shader_combination_id(ShaderType::Vertex).unwrap())
        .unwrap();
    assert_eq!(vertex.source_code(), " a ");
    assert_eq!(vertex.shader_type(), ShaderType::Vertex);
}

#[test]
fn identical_sources_are_shared_between_combinations() {
    let (compiler, factory) = compiler(synchronous_settings());
    let material = TestMaterialBlueprint::new();
    let mut manager = PipelineStateCacheManager::new();

    let one = ShaderProperties::from(&[("A", 1)][..]);
    let two = ShaderProperties::from(&[("A", 2)][..]);
    request(&mut manager, &material, &compiler, &one, true).unwrap();
    request(&mut manager, &material, &compiler, &two, true).unwrap();

    assert_eq!(factory.created.load(Ordering::Relaxed), 2);
    // Two vertex combinations and one fragment combination, but both vertex
    // combinations expand to the same text.
    assert_eq!(compiler.shader_cache_manager().len(), 3);
    assert_eq!(compiler.shader_cache_manager().unique_source_count(), 2);

    compiler.shader_cache_manager().clear();
    assert!(compiler.shader_cache_manager().is_empty());
}

#[test]
fn factory_failure_leaves_entry_empty() {
    let (compiler, factory) = compiler(synchronous_settings());
    factory.fail.store(true, Ordering::Relaxed);
    let material = TestMaterialBlueprint::new();
    let mut manager = PipelineStateCacheManager::new();
    let properties = ShaderProperties::new();

    assert!(request(&mut manager, &material, &compiler, &properties, true).is_none());

    let entry = manager
        .get(signature_id(&material, &compiler, &properties))
        .unwrap();
    assert!(!entry.has_graphics_pipeline_state());
}

#[test]
fn missing_shader_blueprint_fails_compile() {
    let (compiler, factory) = compiler(synchronous_settings());
    let mut material = TestMaterialBlueprint::new();
    material.stages[ShaderType::Geometry.index()] =
        Some(ShaderBlueprintResourceId::from_name("Test/Unregistered"));
    let mut manager = PipelineStateCacheManager::new();

    assert!(request(&mut manager, &material, &compiler, &ShaderProperties::new(), true).is_none());
    assert_eq!(factory.created.load(Ordering::Relaxed), 0);
}

// ============================================================================
// Asynchronous Compilation
// ============================================================================

#[test]
fn asynchronous_compile_replaces_fallback() {
    let (compiler, factory) = compiler(PipelineStateCompilerSettings::default());
    let material = TestMaterialBlueprint::new().with_importance("A", VisualImportance::Weight(1));
    let mut manager = PipelineStateCacheManager::new();

    // No fallback exists yet: compiled on this thread.
    let base = request(&mut manager, &material, &compiler, &ShaderProperties::new(), true).unwrap();
    assert_eq!(factory.created.load(Ordering::Relaxed), 1);

    let properties = ShaderProperties::from(&[("A", 1)][..]);
    let fallback = request(&mut manager, &material, &compiler, &properties, true).unwrap();
    assert!(Arc::ptr_eq(&fallback, &base));

    compiler.wait_until_idle();
    assert_eq!(compiler.pending_request_count(), 0);

    let requested_id = signature_id(&material, &compiler, &properties);
    let entry = manager.get(requested_id).unwrap();
    assert!(!entry.is_using_fallback());

    let compiled = request(&mut manager, &material, &compiler, &properties, true).unwrap();
    assert_eq!(compiled.pipeline_state_signature_id(), requested_id);
    assert!(!Arc::ptr_eq(&compiled, &base));
    assert_eq!(factory.created.load(Ordering::Relaxed), 2);
}

#[test]
fn dropping_compiler_drains_queued_requests() {
    let (compiler, factory) = compiler(PipelineStateCompilerSettings {
        number_of_compiler_threads: 1,
        ..Default::default()
    });
    let material = TestMaterialBlueprint::new();
    let mut manager = PipelineStateCacheManager::new();

    request(&mut manager, &material, &compiler, &ShaderProperties::new(), true).unwrap();
    for value in 1..=4 {
        let properties = ShaderProperties::from(&[("C", value)][..]);
        request(&mut manager, &material, &compiler, &properties, true).unwrap();
    }
    drop(compiler);

    assert_eq!(factory.created.load(Ordering::Relaxed), 5);
    assert!(manager.iter().all(|entry| !entry.is_using_fallback()));
}

#[test]
fn cleared_entries_are_not_compiled() {
    let (compiler, factory) = compiler(PipelineStateCompilerSettings {
        number_of_compiler_threads: 1,
        ..Default::default()
    });
    let material = TestMaterialBlueprint::new();
    let mut manager = PipelineStateCacheManager::new();

    request(&mut manager, &material, &compiler, &ShaderProperties::new(), true).unwrap();
    let properties = ShaderProperties::from(&[("C", 1)][..]);
    request(&mut manager, &material, &compiler, &properties, true).unwrap();
    manager.clear_cache();
    compiler.wait_until_idle();

    // Either compiled before the clear or skipped as orphaned, never twice.
    assert!(factory.created.load(Ordering::Relaxed) <= 2);
    assert!(manager.is_empty());
}

// ============================================================================
// Settings
// ============================================================================

#[test]
fn settings_deserialize_with_defaults() -> anyhow::Result<()> {
    let settings: PipelineStateCompilerSettings =
        serde_json::from_str(r#"{ "number_of_compiler_threads": 8 }"#)?;
    assert_eq!(settings.number_of_compiler_threads, 8);
    assert!(settings.asynchronous_compilation_enabled);
    assert_eq!(settings.shader_builder, ShaderBuilderSettings::default());

    let settings: PipelineStateCompilerSettings =
        serde_json::from_str(r#"{ "shader_builder": { "max_expansion_passes": 4 } }"#)?;
    assert_eq!(settings.shader_builder.max_expansion_passes, 4);

    let round_trip: PipelineStateCompilerSettings =
        serde_json::from_str(&serde_json::to_string(&settings)?)?;
    assert_eq!(round_trip, settings);
    Ok(())
}
