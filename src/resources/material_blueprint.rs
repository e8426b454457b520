//! Material blueprint contract
//!
//! The material system itself lives outside this crate. The pipeline state
//! cache only needs to know which shader blueprint feeds each stage and how
//! visually important each shader property is.

use crate::utils::{MaterialBlueprintResourceId, ShaderBlueprintResourceId, ShaderPropertyId};

/// Number of programmable graphics shader stages.
pub const NUMBER_OF_SHADER_TYPES: usize = 5;

/// Programmable graphics stages, in the fixed order used for hashing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ShaderType {
    Vertex = 0,
    TessellationControl = 1,
    TessellationEvaluation = 2,
    Geometry = 3,
    Fragment = 4,
}

impl ShaderType {
    pub const ALL: [ShaderType; NUMBER_OF_SHADER_TYPES] = [
        ShaderType::Vertex,
        ShaderType::TessellationControl,
        ShaderType::TessellationEvaluation,
        ShaderType::Geometry,
        ShaderType::Fragment,
    ];

    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            ShaderType::Vertex => "vertex",
            ShaderType::TessellationControl => "tessellation control",
            ShaderType::TessellationEvaluation => "tessellation evaluation",
            ShaderType::Geometry => "geometry",
            ShaderType::Fragment => "fragment",
        }
    }
}

/// How much a shader property contributes to the final image.
///
/// During fallback search the property with the lowest weight is dropped
/// first. Mandatory properties are never dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VisualImportance {
    Mandatory,
    Weight(i32),
}

impl VisualImportance {
    /// The weight, or `None` for mandatory properties.
    #[inline]
    #[must_use]
    pub fn weight(self) -> Option<i32> {
        match self {
            VisualImportance::Mandatory => None,
            VisualImportance::Weight(weight) => Some(weight),
        }
    }
}

/// What the pipeline state cache needs from a material blueprint.
pub trait MaterialBlueprint {
    fn id(&self) -> MaterialBlueprintResourceId;

    /// Whether the blueprint and all of its shader blueprints are loaded.
    fn is_fully_loaded(&self) -> bool;

    /// The shader blueprint bound to `shader_type`, `None` for unused stages.
    fn shader_blueprint_resource_id(
        &self,
        shader_type: ShaderType,
    ) -> Option<ShaderBlueprintResourceId>;

    fn visual_importance_of_shader_property(&self, id: ShaderPropertyId) -> VisualImportance;
}
