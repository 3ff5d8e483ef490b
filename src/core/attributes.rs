// src/core/attributes.rs

//! # Attributes
//!
//! Every property declares a closed table of attributes. An attribute either has a
//! default value or is required (no default). The table is fixed at construction time;
//! only the current values change between uses.

use crate::core::property::PropertyError;
use std::collections::BTreeMap;

/// Declares one attribute of a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeSpec {
    /// The attribute name, e.g. `sep`.
    pub name: &'static str,
    /// The value after a reset. `None` means the attribute is required.
    pub default: Option<&'static str>,
}

impl AttributeSpec {
    /// A required attribute without default.
    pub const fn required(name: &'static str) -> Self {
        Self {
            name,
            default: None,
        }
    }

    /// An optional attribute with a default value.
    pub const fn optional(name: &'static str, default: &'static str) -> Self {
        Self {
            name,
            default: Some(default),
        }
    }
}

/// The attribute store owned by a property: declared specs plus current values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes {
    specs: Vec<AttributeSpec>,
    values: BTreeMap<&'static str, Option<String>>,
}

impl Attributes {
    /// Builds a store from a descriptor table, rejecting duplicate names.
    /// All values start at their defaults.
    pub fn new(specs: Vec<AttributeSpec>) -> Result<Self, PropertyError> {
        let mut values = BTreeMap::new();
        for spec in &specs {
            if values
                .insert(spec.name, spec.default.map(str::to_string))
                .is_some()
            {
                return Err(PropertyError::DuplicateAttribute {
                    attribute: spec.name.to_string(),
                });
            }
        }
        Ok(Self { specs, values })
    }

    /// The declared attributes, in declaration order.
    pub fn specs(&self) -> &[AttributeSpec] {
        &self.specs
    }

    /// Restores every attribute to its default. Returns whether any value changed.
    pub fn reset(&mut self) -> bool {
        let mut changed = false;
        for spec in &self.specs {
            let default = spec.default.map(str::to_string);
            if let Some(slot) = self.values.get_mut(spec.name) {
                if *slot != default {
                    *slot = default;
                    changed = true;
                }
            }
        }
        changed
    }

    /// Whether `key` is a declared attribute.
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Returns the current value of a declared attribute (`None` if required and unset).
    pub fn get(&self, key: &str) -> Option<Option<&str>> {
        self.values.get(key).map(Option::as_deref)
    }

    /// Sets a declared attribute. Returns `false` if the key is not declared.
    pub fn set(&mut self, key: &str, value: impl Into<String>) -> bool {
        match self.values.get_mut(key) {
            Some(slot) => {
                *slot = Some(value.into());
                true
            }
            None => false,
        }
    }

    /// Convenience accessor for property kinds: the value if declared and set.
    pub fn value(&self, key: &str) -> Option<&str> {
        self.get(key).flatten()
    }
}
