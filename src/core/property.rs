// src/core/property.rs

//! # Property
//!
//! A `Property` is a named, documented unit of computation producing a string. Its
//! behaviour comes from a `PropertyKind`; the property itself owns the attribute store,
//! the cached value, the "current" flag and the listeners of its invalidations.
//!
//! Properties are shared (`Rc`) between a template context and its clones, so all
//! per-use state lives behind `Cell`/`RefCell`. No borrow is held while a kind's
//! `update` runs, which lets a property be referenced again from inside its own
//! evaluation (e.g. nested `var` blocks).

use crate::core::{
    attributes::{AttributeSpec, Attributes},
    invalidation,
    kinds::{ConstantKind, VariableKind},
    property_maps::PropertyMaps,
    substitution::{self, Mode},
};
use std::{
    cell::{Cell, RefCell},
    collections::HashSet,
    fmt,
    rc::{Rc, Weak},
};
use thiserror::Error;

/// Shared handle to a property.
pub type PropertyRef = Rc<Property>;

/// Programmer and configuration errors of the property engine.
///
/// User-input problems never show up here; they are reported in-band through
/// [`error_value`] and [`error_detail`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PropertyError {
    /// A property was constructed with an empty name.
    #[error("A property name cannot be empty.")]
    EmptyName,
    /// The attribute key was not declared by the property.
    #[error("Property '{property}' has no attribute '{attribute}'.")]
    UnknownAttribute {
        /// The property whose table was consulted.
        property: String,
        /// The undeclared key.
        attribute: String,
    },
    /// An attribute table declares the same name twice.
    #[error("Attribute '{attribute}' is declared more than once.")]
    DuplicateAttribute {
        /// The duplicated name.
        attribute: String,
    },
    /// A property tried to listen to its own invalidation.
    #[error("Property '{property}' cannot listen to its own invalidation.")]
    SelfListen {
        /// The offending property.
        property: String,
    },
    /// Invalidation reached the same property twice in one pass.
    #[error(
        "Invalidation cycle detected at property '{property}'. Invalidation has been deactivated."
    )]
    InvalidationCycle {
        /// The property that was visited twice.
        property: String,
    },
    /// A property had no value after being updated.
    #[error("Property '{property}' has no value after update.")]
    ValueNotSet {
        /// The property that produced no value.
        property: String,
    },
    /// Lookup in a category that does not exist.
    #[error("Unknown property category '{category}'.")]
    UnknownCategory {
        /// The missing category.
        category: String,
    },
    /// A variable would shadow a property that is not a variable.
    #[error("Name '{name}' is already used by a property that is not a variable.")]
    ReservedName {
        /// The rejected variable name.
        name: String,
    },
    /// No variable with that name is in scope.
    #[error("No variable named '{name}' is in scope.")]
    NoSuchVariable {
        /// The missing variable.
        name: String,
    },
    /// Template expansion nested too deeply.
    #[error("Maximum expansion depth ({depth}) exceeded while expanding '{reference}'.")]
    DepthExceeded {
        /// The configured maximum.
        depth: u32,
        /// The reference or template being expanded when the limit was hit.
        reference: String,
    },
    /// The template could not be parsed.
    #[error("Malformed template at offset {offset}: {reason}")]
    Syntax {
        /// Byte offset of the offending reference.
        offset: usize,
        /// What is wrong with it.
        reason: String,
    },
}

/// The in-band error value of a property, e.g. `(add Error...)`.
pub fn error_value(name: &str) -> String {
    format!("({} Error...)", name)
}

/// The in-band error value with a detail message, e.g. `(file.mv Error: not found...)`.
pub fn error_detail(name: &str, detail: impl fmt::Display) -> String {
    format!("({} Error: {}...)", name, detail)
}

/// How a kind's value relates to its cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Fixed at construction. Always current, never recomputed.
    Constant,
    /// Reports current, but every read recomputes.
    Eager,
    /// Never current. Every read recomputes.
    Uncached,
    /// Recomputed only after an invalidation or an attribute change.
    Cached,
}

/// The behaviour behind a property.
pub trait PropertyKind {
    /// Cache policy of this kind.
    fn freshness(&self) -> Freshness;

    /// The attribute table. Evaluated once, when the property is built.
    fn attributes(&self) -> Vec<AttributeSpec> {
        Vec::new()
    }

    /// Attributes whose text is stored as written instead of being expanded first.
    fn is_raw_attribute(&self, _name: &str) -> bool {
        false
    }

    /// Whether `get_lazy` may return a stale cached value.
    fn is_lazy(&self) -> bool {
        false
    }

    /// Whether the call site must expand the produced value as a template.
    fn yields_template(&self) -> bool {
        false
    }

    /// Computes the value from the property's attributes and the context.
    ///
    /// Missing or malformed attributes produce an in-band error value, not an `Err`.
    fn update(
        &self,
        property: &Property,
        context: &mut PropertyMaps,
    ) -> Result<Option<String>, PropertyError>;
}

/// A named, documented, lazily or eagerly computed string value.
pub struct Property {
    name: String,
    help: String,
    kind: Box<dyn PropertyKind>,
    attributes: RefCell<Attributes>,
    value: RefCell<Option<String>>,
    current: Cell<bool>,
    listeners: RefCell<Vec<Weak<Property>>>,
}

impl Property {
    /// Builds a property from a kind. The kind's attribute table is validated here.
    pub fn new(
        name: impl Into<String>,
        help: impl Into<String>,
        kind: impl PropertyKind + 'static,
    ) -> Result<PropertyRef, PropertyError> {
        Self::build(name.into(), help.into(), Box::new(kind), None)
    }

    /// A property whose value never changes.
    pub fn constant(
        name: impl Into<String>,
        value: impl Into<String>,
        help: impl Into<String>,
    ) -> Result<PropertyRef, PropertyError> {
        Self::build(
            name.into(),
            help.into(),
            Box::new(ConstantKind),
            Some(value.into()),
        )
    }

    /// A scoped variable holding `value` until `set_value` replaces it.
    pub fn variable(
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<PropertyRef, PropertyError> {
        let name = name.into();
        let help = format!("Variable '{}'.", name);
        Self::build(name, help, Box::new(VariableKind), Some(value.into()))
    }

    fn build(
        name: String,
        help: String,
        kind: Box<dyn PropertyKind>,
        value: Option<String>,
    ) -> Result<PropertyRef, PropertyError> {
        if name.is_empty() {
            return Err(PropertyError::EmptyName);
        }
        let attributes = Attributes::new(kind.attributes())?;
        let current = value.is_some();
        Ok(Rc::new(Self {
            name,
            help,
            kind,
            attributes: RefCell::new(attributes),
            value: RefCell::new(value),
            current: Cell::new(current),
            listeners: RefCell::new(Vec::new()),
        }))
    }

    /// The property name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The help text.
    pub fn help(&self) -> &str {
        &self.help
    }

    /// The behaviour of this property.
    pub fn kind(&self) -> &dyn PropertyKind {
        self.kind.as_ref()
    }

    // --- VALUE ---

    /// Whether the cached value can be used as is.
    pub fn is_current(&self) -> bool {
        match self.kind.freshness() {
            Freshness::Constant | Freshness::Eager => true,
            Freshness::Uncached => false,
            Freshness::Cached => self.current.get(),
        }
    }

    /// Returns the value, recomputing it first if the kind requires it.
    pub fn get_current(&self, context: &mut PropertyMaps) -> Result<String, PropertyError> {
        let needs_update = match self.kind.freshness() {
            Freshness::Constant => false,
            Freshness::Eager | Freshness::Uncached => true,
            Freshness::Cached => !self.current.get(),
        };

        if needs_update {
            log::trace!("Updating property '{}'.", self.name);
            let value = self.kind.update(self, context)?;
            *self.value.borrow_mut() = value;
            self.current.set(true);
        }

        self.value
            .borrow()
            .clone()
            .ok_or_else(|| PropertyError::ValueNotSet {
                property: self.name.clone(),
            })
    }

    /// Returns the cached value without recomputing, for kinds that allow it.
    /// Every other kind behaves like `get_current`.
    pub fn get_lazy(&self, context: &mut PropertyMaps) -> Result<String, PropertyError> {
        if self.kind.is_lazy() {
            let cached = self.value.borrow().clone();
            if let Some(value) = cached {
                return Ok(value);
            }
        }
        self.get_current(context)
    }

    /// The cached value, possibly stale, possibly unset.
    pub fn cached_value(&self) -> Option<String> {
        self.value.borrow().clone()
    }

    /// Replaces the value and marks it current. Used by variables.
    pub fn set_value(&self, value: impl Into<String>) {
        *self.value.borrow_mut() = Some(value.into());
        self.current.set(true);
    }

    fn mark_stale(&self) {
        if self.kind.freshness() == Freshness::Cached {
            self.current.set(false);
        }
    }

    // --- ATTRIBUTES ---

    /// Restores every attribute to its default.
    pub fn reset_attributes(&self) {
        let changed = self.attributes.borrow_mut().reset();
        if changed {
            self.mark_stale();
        }
    }

    /// Sets one declared attribute.
    pub fn set_attribute(&self, key: &str, value: impl Into<String>) -> Result<(), PropertyError> {
        let value = value.into();
        let mut attributes = self.attributes.borrow_mut();
        let changed = match attributes.get(key) {
            None => return Err(self.unknown_attribute(key)),
            Some(old) => old != Some(value.as_str()),
        };
        attributes.set(key, value);
        drop(attributes);

        if changed {
            self.mark_stale();
        }
        Ok(())
    }

    /// Reads one declared attribute (`None` if required and unset).
    pub fn get_attribute(&self, key: &str) -> Result<Option<String>, PropertyError> {
        self.attributes
            .borrow()
            .get(key)
            .map(|value| value.map(str::to_string))
            .ok_or_else(|| self.unknown_attribute(key))
    }

    /// Sets several attributes from a template reference.
    ///
    /// Values are expanded first (except the kind's raw attributes); nothing is set
    /// unless every key is declared.
    pub fn set_attributes(
        &self,
        attributes: &[(String, String)],
        context: &mut PropertyMaps,
        mode: Mode,
    ) -> Result<(), PropertyError> {
        for (key, value) in self.expand_attributes(attributes, context, mode)? {
            self.set_attribute(&key, value)?;
        }
        Ok(())
    }

    /// Validates every key and expands every non-raw value, without setting anything.
    ///
    /// Expansion may evaluate this very property (nested references), so callers set
    /// the returned values only once all of them are known.
    pub fn expand_attributes(
        &self,
        attributes: &[(String, String)],
        context: &mut PropertyMaps,
        mode: Mode,
    ) -> Result<Vec<(String, String)>, PropertyError> {
        if let Some((key, _)) = attributes
            .iter()
            .find(|(key, _)| !self.attributes.borrow().contains(key))
        {
            return Err(self.unknown_attribute(key));
        }

        let mut expanded = Vec::with_capacity(attributes.len());
        for (key, value) in attributes {
            let value = if self.kind.is_raw_attribute(key) {
                value.clone()
            } else {
                substitution::expand(value, context, mode)?
            };
            expanded.push((key.clone(), value));
        }
        Ok(expanded)
    }

    /// A snapshot of the current attribute values.
    pub fn attributes(&self) -> Attributes {
        self.attributes.borrow().clone()
    }

    /// The declared attribute table.
    pub fn attribute_specs(&self) -> Vec<AttributeSpec> {
        self.attributes.borrow().specs().to_vec()
    }

    fn unknown_attribute(&self, key: &str) -> PropertyError {
        log::error!(
            "Attribute '{}' is not declared by property '{}'.",
            key,
            self.name
        );
        PropertyError::UnknownAttribute {
            property: self.name.clone(),
            attribute: key.to_string(),
        }
    }

    // --- INVALIDATION ---

    /// Marks this property stale and propagates to every listener, transitively.
    ///
    /// Reaching the same property twice in one pass deactivates invalidation
    /// engine-wide (see [`invalidation`]) and returns `InvalidationCycle`.
    pub fn invalidate(&self) -> Result<(), PropertyError> {
        if !invalidation::is_active() {
            return Ok(());
        }
        let mut visited = HashSet::new();
        self.invalidate_pass(&mut visited)
    }

    fn invalidate_pass(&self, visited: &mut HashSet<*const Self>) -> Result<(), PropertyError> {
        if !visited.insert(self as *const Self) {
            invalidation::deactivate();
            return Err(PropertyError::InvalidationCycle {
                property: self.name.clone(),
            });
        }

        self.mark_stale();

        let listeners: Vec<PropertyRef> = self
            .listeners
            .borrow()
            .iter()
            .filter_map(Weak::upgrade)
            .collect();
        for listener in listeners {
            log::trace!("'{}' invalidates '{}'.", self.name, listener.name);
            listener.invalidate_pass(visited)?;
        }
        Ok(())
    }

    /// Makes this property stale whenever `other` is invalidated.
    pub fn listen_to_invalidates_of(self: &Rc<Self>, other: &Self) -> Result<(), PropertyError> {
        if std::ptr::eq(Rc::as_ptr(self), other) {
            log::error!("Property '{}' tried to listen to itself.", self.name);
            return Err(PropertyError::SelfListen {
                property: self.name.clone(),
            });
        }
        let mut listeners = other.listeners.borrow_mut();
        listeners.retain(|weak| weak.strong_count() > 0);
        listeners.push(Rc::downgrade(self));
        Ok(())
    }

    /// The live properties listening to this one.
    pub fn listeners(&self) -> Vec<PropertyRef> {
        self.listeners
            .borrow()
            .iter()
            .filter_map(Weak::upgrade)
            .collect()
    }
}

impl fmt::Debug for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("name", &self.name)
            .field("freshness", &self.kind.freshness())
            .field("value", &self.value.borrow())
            .field("current", &self.current.get())
            .field("attributes", &self.attributes.borrow())
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value.borrow().as_deref().unwrap_or(""))
    }
}
