//! String identifiers
//!
//! Human readable names (shader property names, piece names, resource names)
//! are turned into compact 32-bit identifiers with FNV-1a. Unlike an interner
//! there is no table to consult: the same name always produces the same id,
//! in every process, so ids can be baked into assets and cache keys.

use std::fmt;

use super::hash::fnv1a_32;

/// A 32-bit identifier derived from a string.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct StringId(u32);

impl StringId {
    /// Hashes `name` into an identifier.
    #[inline]
    #[must_use]
    pub const fn new(name: &str) -> Self {
        Self(fnv1a_32(name.as_bytes()))
    }

    /// Wraps an already computed id.
    #[inline]
    #[must_use]
    pub const fn from_raw(id: u32) -> Self {
        Self(id)
    }

    #[inline]
    #[must_use]
    pub const fn id(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for StringId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StringId({:#010x})", self.0)
    }
}

impl From<&str> for StringId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Declares a strongly-typed 32-bit identifier.
///
/// All ids share the same representation but distinct newtypes prevent
/// mixing up, say, a material blueprint id with a shader blueprint id.
macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
        pub struct $name(u32);

        impl $name {
            /// Hashes a human readable name into an id.
            #[inline]
            #[must_use]
            pub const fn from_name(name: &str) -> Self {
                Self(fnv1a_32(name.as_bytes()))
            }

            #[inline]
            #[must_use]
            pub const fn from_raw(id: u32) -> Self {
                Self(id)
            }

            #[inline]
            #[must_use]
            pub const fn id(self) -> u32 {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({:#010x})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{:#010x}", self.0)
            }
        }

        impl From<StringId> for $name {
            fn from(id: StringId) -> Self {
                Self(id.id())
            }
        }
    };
}

define_id!(
    /// Identifies a shader property (`@property(NAME)` et al.).
    ShaderPropertyId
);
define_id!(MaterialBlueprintResourceId);
define_id!(ShaderBlueprintResourceId);
define_id!(ShaderPieceResourceId);
define_id!(
    /// Identifies a source asset; used to look up its file hash.
    AssetId
);
define_id!(
    /// Hash of one shader stage: blueprint id plus the referenced properties.
    ShaderCombinationId
);
define_id!(
    /// Hash of a complete pipeline state signature, the cache key.
    PipelineStateSignatureId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_name_same_id() {
        assert_eq!(StringId::new("USE_NORMAL_MAP"), StringId::new("USE_NORMAL_MAP"));
        assert_ne!(StringId::new("USE_NORMAL_MAP"), StringId::new("USE_AO_MAP"));
    }

    #[test]
    fn test_const_evaluation() {
        const LIGHTING: ShaderPropertyId = ShaderPropertyId::from_name("Lighting");
        assert_eq!(LIGHTING, ShaderPropertyId::from(StringId::new("Lighting")));
    }
}
