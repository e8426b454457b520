//! Shader Cache Manager
//!
//! Caches built shader source per [`ShaderCombinationId`], so every pipeline
//! state that shares a stage permutation builds it once.
//!
//! Different combinations can still expand to the same final text (a property
//! only toggles a block another property already hides). Entries are therefore
//! also deduplicated by the xxh3-128 of the final source: both combinations
//! receive the same [`ShaderCache`] and the RHI compiles it once.
//!
//! | Lookup | Key | Hit means |
//! |--------|-----|-----------|
//! | combination | `ShaderCombinationId` | no macro expansion needed |
//! | source      | xxh3-128 of final text | no native compile needed |
//!
//! Internally synchronized: compiler workers share one manager and build
//! outside the lock.

use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use xxhash_rust::xxh3::xxh3_128;

use super::signature::PipelineStateSignature;
use crate::errors::{CompileError, Result};
use crate::renderer::shader_builder::{BuildShader, ShaderBuilder};
use crate::resources::{ShaderResourceProvider, ShaderType};
use crate::utils::{AssetId, ShaderCombinationId};

/// Final source of one shader stage permutation.
#[derive(Debug)]
pub struct ShaderCache {
    source_hash: u128,
    shader_type: ShaderType,
    source_code: String,
    asset_ids: SmallVec<[AssetId; 8]>,
    combined_asset_file_hashes: u64,
}

impl ShaderCache {
    /// xxh3-128 of [`source_code`](Self::source_code).
    #[inline]
    #[must_use]
    pub fn source_hash(&self) -> u128 {
        self.source_hash
    }

    #[inline]
    #[must_use]
    pub fn shader_type(&self) -> ShaderType {
        self.shader_type
    }

    #[inline]
    #[must_use]
    pub fn source_code(&self) -> &str {
        &self.source_code
    }

    #[inline]
    #[must_use]
    pub fn asset_ids(&self) -> &[AssetId] {
        &self.asset_ids
    }

    /// Changes whenever any contributing source file changes.
    #[inline]
    #[must_use]
    pub fn combined_asset_file_hashes(&self) -> u64 {
        self.combined_asset_file_hashes
    }
}

#[derive(Debug, Default)]
struct ShaderCacheTables {
    by_combination: FxHashMap<ShaderCombinationId, Arc<ShaderCache>>,
    by_source: FxHashMap<u128, Arc<ShaderCache>>,
}

#[derive(Debug, Default)]
pub struct ShaderCacheManager {
    tables: Mutex<ShaderCacheTables>,
}

impl ShaderCacheManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the built shader for one stage of `signature`.
    ///
    /// `Ok(None)` for stages the material blueprint does not use.
    pub fn get_or_build_shader(
        &self,
        builder: &mut ShaderBuilder,
        resources: &dyn ShaderResourceProvider,
        signature: &PipelineStateSignature,
        shader_type: ShaderType,
    ) -> Result<Option<Arc<ShaderCache>>> {
        let Some(blueprint_id) = signature.shader_blueprint_resource_id(shader_type) else {
            return Ok(None);
        };
        let (Some(combination_id), Some(blueprint)) = (
            signature.shader_combination_id(shader_type),
            resources.shader_blueprint(blueprint_id),
        ) else {
            return Err(CompileError::MissingShaderBlueprint(blueprint_id));
        };

        if let Some(cached) = self.get(combination_id) {
            return Ok(Some(cached));
        }

        let mut build =
            builder.create_source_code(resources, blueprint, signature.shader_properties());
        if build.has_syntax_error() {
            log::warn!(
                "Shader cache: {} shader {combination_id} built with {} syntax error(s)",
                shader_type.name(),
                build.syntax_errors.len()
            );
        }
        if let Some(err) = build.preprocessor_error.take() {
            return Err(err);
        }

        Ok(Some(self.insert(combination_id, shader_type, build)))
    }

    #[must_use]
    pub fn get(&self, combination_id: ShaderCombinationId) -> Option<Arc<ShaderCache>> {
        self.tables.lock().by_combination.get(&combination_id).cloned()
    }

    fn insert(
        &self,
        combination_id: ShaderCombinationId,
        shader_type: ShaderType,
        build: BuildShader,
    ) -> Arc<ShaderCache> {
        let source_hash = xxh3_128(build.source_code.as_bytes());
        let mut guard = self.tables.lock();
        let tables = &mut *guard;

        let existing = tables
            .by_source
            .get(&source_hash)
            .filter(|existing| existing.shader_type == shader_type)
            .cloned();
        let shader = if let Some(existing) = existing {
            log::trace!("Shader cache: {combination_id} shares source {source_hash:032x}");
            existing
        } else {
            let shader = Arc::new(ShaderCache {
                source_hash,
                shader_type,
                source_code: build.source_code,
                asset_ids: build.asset_ids,
                combined_asset_file_hashes: build.combined_asset_file_hashes,
            });
            tables.by_source.insert(source_hash, Arc::clone(&shader));
            shader
        };

        tables
            .by_combination
            .insert(combination_id, Arc::clone(&shader));
        shader
    }

    /// Number of cached stage combinations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.lock().by_combination.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.lock().by_combination.is_empty()
    }

    /// Number of distinct final source texts.
    #[must_use]
    pub fn unique_source_count(&self) -> usize {
        self.tables.lock().by_source.len()
    }

    /// Drops every cached shader, e.g. after a shader asset changed on disk.
    pub fn clear(&self) {
        let mut tables = self.tables.lock();
        tables.by_combination.clear();
        tables.by_source.clear();
    }
}
