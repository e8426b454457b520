//! Pipeline State Cache Manager
//!
//! One manager per material blueprint. Maps a pipeline state signature to
//! its [`PipelineStateCache`] entry and decides how a miss is served.
//!
//! # Miss Handling
//!
//! Compiling a pipeline state can take long enough to drop frames. With
//! asynchronous compilation enabled, a miss first searches for a cached
//! permutation with fewer shader properties:
//!
//! 1. drop the remaining non-mandatory property with the lowest visual
//!    importance (first one wins on ties), recompute the signature, look it up;
//! 2. repeat until an entry with a handle is found or only mandatory
//!    properties remain;
//! 3. if nothing was found and the caller forbids emergency synchronous
//!    compilation, try the signature without any property.
//!
//! A new entry is always registered for the requested signature. With a
//! fallback it borrows the fallback's handle and is queued for background
//! compilation; without one it is compiled on the calling thread.
//!
//! Entries are never evicted individually. [`clear_cache`] drops all of them.
//!
//! [`clear_cache`]: PipelineStateCacheManager::clear_cache

use rustc_hash::FxHashMap;

use super::cache::{GraphicsPipelineStateHandle, PipelineStateCache};
use super::compiler::PipelineStateCompiler;
use super::signature::PipelineStateSignature;
use crate::resources::{MaterialBlueprint, ShaderProperties, ShaderResourceProvider};
use crate::utils::{PipelineStateSignatureId, ShaderPropertyId};

/// Collaborators consulted on every request.
#[derive(Clone, Copy)]
pub struct PipelineStateCacheContext<'a> {
    pub material_blueprint: &'a dyn MaterialBlueprint,
    pub resources: &'a dyn ShaderResourceProvider,
    pub compiler: &'a dyn PipelineStateCompiler,
}

#[derive(Debug, Default)]
pub struct PipelineStateCacheManager {
    caches: FxHashMap<PipelineStateSignatureId, PipelineStateCache>,
    // Scratch signatures reused across requests.
    signature: PipelineStateSignature,
    fallback_signature: PipelineStateSignature,
}

impl PipelineStateCacheManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the pipeline state to draw with for the given combination.
    ///
    /// On a hit the current handle is returned as is, even if it is still a
    /// fallback. `None` only when a synchronous compile failed to produce a
    /// handle; the compiler has logged why.
    ///
    /// # Panics
    ///
    /// If the material blueprint is not fully loaded.
    pub fn get_graphics_pipeline_state_cache_by_combination(
        &mut self,
        context: PipelineStateCacheContext<'_>,
        serialized_pipeline_state_hash: u32,
        shader_properties: &ShaderProperties,
        allow_emergency_synchronous_compilation: bool,
    ) -> Option<GraphicsPipelineStateHandle> {
        let material_blueprint = context.material_blueprint;
        assert!(
            material_blueprint.is_fully_loaded(),
            "Material blueprint {} must be fully loaded before requesting pipeline states",
            material_blueprint.id()
        );

        self.signature.set(
            material_blueprint,
            context.resources,
            serialized_pipeline_state_hash,
            shader_properties,
        );
        let signature_id = self.signature.pipeline_state_signature_id();

        if let Some(cache) = self.caches.get(&signature_id) {
            let handle = cache.graphics_pipeline_state();
            if handle.is_none() {
                log::trace!("Pipeline state {signature_id}: cached entry has no pipeline state");
            }
            return handle;
        }

        let asynchronous = context.compiler.is_asynchronous_compilation_enabled();
        let fallback = if asynchronous {
            self.find_fallback(
                context,
                serialized_pipeline_state_hash,
                shader_properties,
                allow_emergency_synchronous_compilation,
            )
        } else {
            None
        };

        let cache = self
            .caches
            .entry(signature_id)
            .or_insert_with(|| PipelineStateCache::new(self.signature.clone()));

        if let Some(fallback) = fallback {
            log::debug!(
                "Pipeline state {signature_id}: using fallback {} while compiling",
                fallback.pipeline_state_signature_id()
            );
            cache.use_fallback(fallback);
            context.compiler.add_asynchronous_compiler_request(cache);
        } else {
            if asynchronous {
                log::warn!("Pipeline state {signature_id}: no fallback, compiling synchronously");
            } else {
                log::debug!("Pipeline state {signature_id}: compiling synchronously");
            }
            context
                .compiler
                .instant_synchronous_compiler_request(material_blueprint, cache);
        }

        let handle = cache.graphics_pipeline_state();
        if handle.is_none() {
            log::error!("Pipeline state {signature_id}: no pipeline state available");
        }
        handle
    }

    /// Walks towards less detailed permutations until a cached one is found.
    fn find_fallback(
        &mut self,
        context: PipelineStateCacheContext<'_>,
        serialized_pipeline_state_hash: u32,
        shader_properties: &ShaderProperties,
        allow_emergency_synchronous_compilation: bool,
    ) -> Option<GraphicsPipelineStateHandle> {
        let mut fallback_properties = shader_properties.clone();

        while let Some(id) =
            least_important_property(context.material_blueprint, &fallback_properties)
        {
            fallback_properties.remove_property_value(id);
            if let Some(handle) =
                self.cached_handle(context, serialized_pipeline_state_hash, &fallback_properties)
            {
                return Some(handle);
            }
        }

        if !allow_emergency_synchronous_compilation {
            fallback_properties.clear();
            return self.cached_handle(
                context,
                serialized_pipeline_state_hash,
                &fallback_properties,
            );
        }
        None
    }

    /// Handle of the entry for `shader_properties`, if that entry has one.
    fn cached_handle(
        &mut self,
        context: PipelineStateCacheContext<'_>,
        serialized_pipeline_state_hash: u32,
        shader_properties: &ShaderProperties,
    ) -> Option<GraphicsPipelineStateHandle> {
        self.fallback_signature.set(
            context.material_blueprint,
            context.resources,
            serialized_pipeline_state_hash,
            shader_properties,
        );
        self.caches
            .get(&self.fallback_signature.pipeline_state_signature_id())
            .and_then(PipelineStateCache::graphics_pipeline_state)
    }

    #[must_use]
    pub fn get(&self, signature_id: PipelineStateSignatureId) -> Option<&PipelineStateCache> {
        self.caches.get(&signature_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.caches.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.caches.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PipelineStateCache> {
        self.caches.values()
    }

    /// Drops every entry and the handles they hold.
    pub fn clear_cache(&mut self) {
        log::debug!("Pipeline state cache: clearing {} entries", self.caches.len());
        self.caches.clear();
    }
}

/// The non-mandatory property with the lowest weight, the first one on ties.
fn least_important_property(
    material_blueprint: &dyn MaterialBlueprint,
    shader_properties: &ShaderProperties,
) -> Option<ShaderPropertyId> {
    let mut lowest: Option<(ShaderPropertyId, i32)> = None;
    for (id, _) in shader_properties.iter() {
        if let Some(weight) = material_blueprint
            .visual_importance_of_shader_property(id)
            .weight()
            && lowest.is_none_or(|(_, lowest_weight)| weight < lowest_weight)
        {
            lowest = Some((id, weight));
        }
    }
    lowest.map(|(id, _)| id)
}
