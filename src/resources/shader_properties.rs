//! Shader Property System
//!
//! A shader property is a named integer switch that steers how a shader
//! blueprint expands (`@property(USE_NORMAL_MAP)`, `@foreach(NUM_LIGHTS, n)`).
//!
//! # Ordering
//!
//! [`ShaderProperties`] keeps its entries sorted by [`ShaderPropertyId`].
//! Iteration order, and therefore every hash built by walking the set, does
//! not depend on insertion order:
//!
//! ```rust,ignore
//! use pso_cache::resources::ShaderProperties;
//!
//! let mut properties = ShaderProperties::new();
//! properties.set("NUM_LIGHTS", 4);
//! properties.set("USE_NORMAL_MAP", 1);
//!
//! assert_eq!(properties.get("NUM_LIGHTS"), Some(4));
//! ```

use smallvec::SmallVec;

use crate::utils::ShaderPropertyId;

/// An ordered set of `(ShaderPropertyId, i32)` pairs.
///
/// # Performance
///
/// - Lookup: O(log n), binary search
/// - Insertion: O(n) worst case, most sets hold a handful of entries
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ShaderProperties {
    properties: SmallVec<[(ShaderPropertyId, i32); 16]>,
}

impl ShaderProperties {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            properties: SmallVec::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            properties: SmallVec::with_capacity(capacity),
        }
    }

    /// Set a property by name.
    pub fn set(&mut self, name: &str, value: i32) {
        self.set_property_value(ShaderPropertyId::from_name(name), value);
    }

    /// Get a property by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<i32> {
        self.get_property_value(ShaderPropertyId::from_name(name))
    }

    /// Upsert, keeping the sequence sorted by id.
    pub fn set_property_value(&mut self, id: ShaderPropertyId, value: i32) {
        match self.properties.binary_search_by_key(&id, |&(k, _)| k) {
            Ok(idx) => self.properties[idx].1 = value,
            Err(idx) => self.properties.insert(idx, (id, value)),
        }
    }

    /// Merge another set into this one; values from `other` win.
    pub fn set_property_values(&mut self, other: &ShaderProperties) {
        for &(id, value) in &other.properties {
            self.set_property_value(id, value);
        }
    }

    #[inline]
    #[must_use]
    pub fn get_property_value(&self, id: ShaderPropertyId) -> Option<i32> {
        self.properties
            .binary_search_by_key(&id, |&(k, _)| k)
            .ok()
            .map(|idx| self.properties[idx].1)
    }

    /// Like [`Self::get_property_value`] but yields `default` when absent.
    #[inline]
    #[must_use]
    pub fn get_property_value_or(&self, id: ShaderPropertyId, default: i32) -> i32 {
        self.get_property_value(id).unwrap_or(default)
    }

    #[inline]
    #[must_use]
    pub fn has_property_value(&self, id: ShaderPropertyId) -> bool {
        self.properties
            .binary_search_by_key(&id, |&(k, _)| k)
            .is_ok()
    }

    pub fn remove_property_value(&mut self, id: ShaderPropertyId) -> bool {
        if let Ok(idx) = self.properties.binary_search_by_key(&id, |&(k, _)| k) {
            self.properties.remove(idx);
            true
        } else {
            false
        }
    }

    /// Drop every property whose value is zero.
    ///
    /// A zero-valued property and an absent one evaluate identically inside
    /// the shader builder, so pruning them lets equivalent sets hash equally.
    pub fn optimize(&mut self) {
        self.properties.retain(|&mut (_, value)| value != 0);
    }

    #[inline]
    pub fn clear(&mut self) {
        self.properties.clear();
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Iterate entries in ascending id order.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (ShaderPropertyId, i32)> + '_ {
        self.properties.iter().copied()
    }

    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[(ShaderPropertyId, i32)] {
        &self.properties
    }
}

impl FromIterator<(ShaderPropertyId, i32)> for ShaderProperties {
    fn from_iter<I: IntoIterator<Item = (ShaderPropertyId, i32)>>(iter: I) -> Self {
        let mut result = Self::new();
        for (id, value) in iter {
            result.set_property_value(id, value);
        }
        result
    }
}

impl From<&[(&str, i32)]> for ShaderProperties {
    fn from(properties: &[(&str, i32)]) -> Self {
        let mut result = Self::with_capacity(properties.len());
        for &(name, value) in properties {
            result.set(name, value);
        }
        result
    }
}
