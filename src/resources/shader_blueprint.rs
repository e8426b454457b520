//! Shader blueprints and shader pieces
//!
//! A shader blueprint is the macro source of one shader stage. It may include
//! shader pieces: shared source files that only define `@piece` blocks and
//! adjust properties, processed ahead of the blueprint.
//!
//! Loading from disk is the host's job. [`ShaderResourceRegistry`] is the
//! in-memory provider used by tools and tests.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::renderer::shader_builder::ShaderBuilder;
use crate::resources::ShaderProperties;
use crate::utils::hash::fnv1a_64;
use crate::utils::{AssetId, ShaderBlueprintResourceId, ShaderPieceResourceId, ShaderPropertyId};

/// A shared source fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderPiece {
    asset_id: AssetId,
    source_code: String,
}

impl ShaderPiece {
    #[must_use]
    pub fn new(asset_id: AssetId, source_code: impl Into<String>) -> Self {
        Self {
            asset_id,
            source_code: source_code.into(),
        }
    }

    #[inline]
    #[must_use]
    pub fn asset_id(&self) -> AssetId {
        self.asset_id
    }

    #[inline]
    #[must_use]
    pub fn source_code(&self) -> &str {
        &self.source_code
    }
}

/// Macro source of one shader stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderBlueprint {
    asset_id: AssetId,
    source_code: String,
    include_shader_piece_resource_ids: SmallVec<[ShaderPieceResourceId; 4]>,
    /// Only these properties take part in the stage's combination id.
    referenced_shader_properties: ShaderProperties,
}

impl ShaderBlueprint {
    /// Creates a blueprint and collects the properties its source refers to.
    #[must_use]
    pub fn new(
        asset_id: AssetId,
        source_code: impl Into<String>,
        include_shader_piece_resource_ids: &[ShaderPieceResourceId],
    ) -> Self {
        let source_code = source_code.into();
        let referenced_shader_properties =
            ShaderBuilder::referenced_shader_properties(&source_code);
        Self {
            asset_id,
            source_code,
            include_shader_piece_resource_ids: SmallVec::from_slice(
                include_shader_piece_resource_ids,
            ),
            referenced_shader_properties,
        }
    }

    #[inline]
    #[must_use]
    pub fn asset_id(&self) -> AssetId {
        self.asset_id
    }

    #[inline]
    #[must_use]
    pub fn source_code(&self) -> &str {
        &self.source_code
    }

    #[inline]
    #[must_use]
    pub fn include_shader_piece_resource_ids(&self) -> &[ShaderPieceResourceId] {
        &self.include_shader_piece_resource_ids
    }

    #[inline]
    #[must_use]
    pub fn referenced_shader_properties(&self) -> &ShaderProperties {
        &self.referenced_shader_properties
    }

    /// Marks a property as relevant even though the source does not name it,
    /// e.g. one consumed only by an included piece.
    pub fn add_referenced_shader_property(&mut self, id: ShaderPropertyId) {
        self.referenced_shader_properties.set_property_value(id, 0);
    }

    #[must_use]
    pub fn references_shader_property(&self, id: ShaderPropertyId) -> bool {
        self.referenced_shader_properties.has_property_value(id)
    }
}

/// Resource lookups needed to build shaders and signatures.
pub trait ShaderResourceProvider {
    fn shader_blueprint(&self, id: ShaderBlueprintResourceId) -> Option<&ShaderBlueprint>;

    fn shader_piece(&self, id: ShaderPieceResourceId) -> Option<&ShaderPiece>;

    /// 64-bit content hash of a source asset.
    fn asset_file_hash(&self, asset_id: AssetId) -> Option<u64>;
}

/// In-memory [`ShaderResourceProvider`].
#[derive(Debug, Clone, Default)]
pub struct ShaderResourceRegistry {
    blueprints: FxHashMap<ShaderBlueprintResourceId, ShaderBlueprint>,
    pieces: FxHashMap<ShaderPieceResourceId, ShaderPiece>,
    asset_file_hashes: FxHashMap<AssetId, u64>,
}

impl ShaderResourceRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a piece. Its file hash defaults to the FNV-1a 64 of its source.
    pub fn insert_shader_piece(&mut self, id: ShaderPieceResourceId, piece: ShaderPiece) {
        self.asset_file_hashes
            .entry(piece.asset_id())
            .or_insert_with(|| fnv1a_64(piece.source_code().as_bytes()));
        self.pieces.insert(id, piece);
    }

    /// Registers a blueprint.
    ///
    /// Properties referenced by already registered include pieces are merged
    /// into the blueprint's referenced set, so register pieces first.
    pub fn insert_shader_blueprint(
        &mut self,
        id: ShaderBlueprintResourceId,
        mut blueprint: ShaderBlueprint,
    ) {
        for piece_id in blueprint.include_shader_piece_resource_ids.clone() {
            match self.pieces.get(&piece_id) {
                Some(piece) => {
                    let referenced =
                        ShaderBuilder::referenced_shader_properties(piece.source_code());
                    for (property_id, _) in referenced.iter() {
                        blueprint.add_referenced_shader_property(property_id);
                    }
                }
                None => log::warn!(
                    "Shader blueprint {id}: include piece {piece_id} registered after the blueprint"
                ),
            }
        }
        self.asset_file_hashes
            .entry(blueprint.asset_id())
            .or_insert_with(|| fnv1a_64(blueprint.source_code().as_bytes()));
        self.blueprints.insert(id, blueprint);
    }

    /// Overrides the file hash of an asset, e.g. with the hash stored in a package.
    pub fn set_asset_file_hash(&mut self, asset_id: AssetId, file_hash: u64) {
        self.asset_file_hashes.insert(asset_id, file_hash);
    }

    #[must_use]
    pub fn shader_blueprint_count(&self) -> usize {
        self.blueprints.len()
    }
}

impl ShaderResourceProvider for ShaderResourceRegistry {
    fn shader_blueprint(&self, id: ShaderBlueprintResourceId) -> Option<&ShaderBlueprint> {
        self.blueprints.get(&id)
    }

    fn shader_piece(&self, id: ShaderPieceResourceId) -> Option<&ShaderPiece> {
        self.pieces.get(&id)
    }

    fn asset_file_hash(&self, asset_id: AssetId) -> Option<u64> {
        self.asset_file_hashes.get(&asset_id).copied()
    }
}
