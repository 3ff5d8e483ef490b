// src/core/kinds.rs

//! # Property kinds
//!
//! The simple variants: constants, variables, closure-backed computed properties and
//! the workspace file properties. Operators and control flow live in their own modules.

use crate::core::{
    attributes::{AttributeSpec, Attributes},
    files,
    property::{Freshness, Property, PropertyError, PropertyKind},
    property_maps::PropertyMaps,
};
use std::path::PathBuf;

/// A value fixed at construction.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConstantKind;

impl PropertyKind for ConstantKind {
    fn freshness(&self) -> Freshness {
        Freshness::Constant
    }

    fn update(
        &self,
        property: &Property,
        _context: &mut PropertyMaps,
    ) -> Result<Option<String>, PropertyError> {
        Ok(property.cached_value())
    }
}

/// A scoped variable. Its value only changes through `Property::set_value`.
#[derive(Debug, Clone, Copy, Default)]
pub struct VariableKind;

impl PropertyKind for VariableKind {
    fn freshness(&self) -> Freshness {
        Freshness::Cached
    }

    fn is_lazy(&self) -> bool {
        true
    }

    fn update(
        &self,
        property: &Property,
        _context: &mut PropertyMaps,
    ) -> Result<Option<String>, PropertyError> {
        Ok(property.cached_value())
    }
}

type ComputeFn = dyn Fn(&Property, &mut PropertyMaps) -> Result<String, PropertyError>;

/// A property whose value comes from a closure.
pub struct ComputedKind {
    freshness: Freshness,
    lazy: bool,
    attributes: Vec<AttributeSpec>,
    compute: Box<ComputeFn>,
}

impl ComputedKind {
    fn with(
        freshness: Freshness,
        lazy: bool,
        attributes: Vec<AttributeSpec>,
        compute: impl Fn(&Property, &mut PropertyMaps) -> Result<String, PropertyError> + 'static,
    ) -> Self {
        Self {
            freshness,
            lazy,
            attributes,
            compute: Box::new(compute),
        }
    }

    /// Recomputed on every read.
    pub fn eager(
        attributes: Vec<AttributeSpec>,
        compute: impl Fn(&Property, &mut PropertyMaps) -> Result<String, PropertyError> + 'static,
    ) -> Self {
        Self::with(Freshness::Eager, false, attributes, compute)
    }

    /// Never current; recomputed on every read.
    pub fn uncached(
        attributes: Vec<AttributeSpec>,
        compute: impl Fn(&Property, &mut PropertyMaps) -> Result<String, PropertyError> + 'static,
    ) -> Self {
        Self::with(Freshness::Uncached, false, attributes, compute)
    }

    /// Recomputed when stale. Lazy reads return the cached value.
    pub fn cached(
        attributes: Vec<AttributeSpec>,
        compute: impl Fn(&Property, &mut PropertyMaps) -> Result<String, PropertyError> + 'static,
    ) -> Self {
        Self::with(Freshness::Cached, true, attributes, compute)
    }
}

impl std::fmt::Debug for ComputedKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComputedKind")
            .field("freshness", &self.freshness)
            .field("lazy", &self.lazy)
            .field("attributes", &self.attributes)
            .finish_non_exhaustive()
    }
}

impl PropertyKind for ComputedKind {
    fn freshness(&self) -> Freshness {
        self.freshness
    }

    fn attributes(&self) -> Vec<AttributeSpec> {
        self.attributes.clone()
    }

    fn is_lazy(&self) -> bool {
        self.lazy
    }

    fn update(
        &self,
        property: &Property,
        context: &mut PropertyMaps,
    ) -> Result<Option<String>, PropertyError> {
        (self.compute)(property, context).map(Some)
    }
}

// --- FILES ---

type PathSupplier = dyn Fn() -> Option<PathBuf>;
type PathListSupplier = dyn Fn() -> Vec<PathBuf>;

/// A single path from a deferred supplier, e.g. the current document.
///
/// Attributes: `rel` (make relative to this directory), `squote` and `dquote`
/// (wrap in quotes when `true`). A supplier returning `None` yields `""`.
pub struct FileKind {
    supplier: Box<PathSupplier>,
}

impl FileKind {
    /// Wraps a path supplier.
    pub fn new(supplier: impl Fn() -> Option<PathBuf> + 'static) -> Self {
        Self {
            supplier: Box::new(supplier),
        }
    }
}

impl std::fmt::Debug for FileKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileKind").finish_non_exhaustive()
    }
}

fn path_attributes() -> Vec<AttributeSpec> {
    vec![
        AttributeSpec::optional("rel", ""),
        AttributeSpec::optional("squote", ""),
        AttributeSpec::optional("dquote", ""),
    ]
}

impl PropertyKind for FileKind {
    fn freshness(&self) -> Freshness {
        Freshness::Eager
    }

    fn attributes(&self) -> Vec<AttributeSpec> {
        path_attributes()
    }

    fn update(
        &self,
        property: &Property,
        _context: &mut PropertyMaps,
    ) -> Result<Option<String>, PropertyError> {
        let attrs = property.attributes();
        Ok(Some(match (self.supplier)() {
            Some(path) => format_with(&attrs, &path),
            None => String::new(),
        }))
    }
}

/// A list of paths from a deferred supplier, e.g. all open documents.
///
/// Same attributes as [`FileKind`] plus `sep`, the separator of the produced list.
pub struct FileListKind {
    supplier: Box<PathListSupplier>,
}

impl FileListKind {
    /// Wraps a path list supplier.
    pub fn new(supplier: impl Fn() -> Vec<PathBuf> + 'static) -> Self {
        Self {
            supplier: Box::new(supplier),
        }
    }
}

impl std::fmt::Debug for FileListKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileListKind").finish_non_exhaustive()
    }
}

impl PropertyKind for FileListKind {
    fn freshness(&self) -> Freshness {
        Freshness::Uncached
    }

    fn attributes(&self) -> Vec<AttributeSpec> {
        let mut specs = vec![AttributeSpec::optional(
            "sep",
            crate::constants::PATH_SEPARATOR,
        )];
        specs.extend(path_attributes());
        specs
    }

    fn update(
        &self,
        property: &Property,
        _context: &mut PropertyMaps,
    ) -> Result<Option<String>, PropertyError> {
        let attrs = property.attributes();
        let sep = attrs.value("sep").unwrap_or_default();
        let formatted: Vec<String> = (self.supplier)()
            .iter()
            .map(|path| format_with(&attrs, path))
            .collect();
        Ok(Some(formatted.join(sep)))
    }
}

fn format_with(attrs: &Attributes, path: &std::path::Path) -> String {
    files::format_path(
        path,
        attrs.value("rel").unwrap_or_default(),
        attrs.value("squote").unwrap_or_default(),
        attrs.value("dquote").unwrap_or_default(),
    )
}
