// src/core/property_maps.rs

//! # Property Maps
//!
//! The evaluation context: properties grouped by category, a stack of scoped
//! variables, the option store and the expansion depth counter.
//!
//! A template is built once with every built-in property. Each evaluation runs on a
//! `clone()` of it: built-in properties are shared, variable bindings and options are
//! snapshotted, so the clone can be changed without touching the template.

use crate::{
    constants::{CONFIG_CATEGORY, CONFIG_PREFIX, MAX_RECURSION_DEPTH, VARIABLES_CATEGORY},
    core::{
        builtins,
        options::OptionStore,
        property::{Property, PropertyError, PropertyRef},
        substitution::Mode,
    },
    models::{SharedWorkspace, WorkspaceState},
};
use std::{
    cell::RefCell,
    collections::{BTreeMap, HashMap},
    rc::Rc,
};
use tempfile::TempPath;

/// Category → (name → property), plus scoped variables.
#[derive(Debug, Default)]
pub struct PropertyMaps {
    categories: BTreeMap<String, BTreeMap<String, PropertyRef>>,
    variables: HashMap<String, Vec<PropertyRef>>,
    options: OptionStore,
    workspace: SharedWorkspace,
    depth: u32,
    mode: Mode,
    temp_files: Vec<TempPath>,
}

impl PropertyMaps {
    /// An empty context without any built-in property.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the template context with every built-in property registered.
    pub fn template(
        options: BTreeMap<String, String>,
        workspace: WorkspaceState,
    ) -> Result<Self, PropertyError> {
        let mut maps = Self {
            options: OptionStore::new(options),
            workspace: Rc::new(RefCell::new(workspace)),
            ..Self::default()
        };
        builtins::register(&mut maps)?;
        log::debug!(
            "Template context built with {} properties.",
            maps.categories.values().map(BTreeMap::len).sum::<usize>()
        );
        Ok(maps)
    }

    // --- LOOKUP ---

    /// Finds a property by name in any category. Variables are searched first.
    pub fn get_property(&self, name: &str) -> Option<PropertyRef> {
        self.innermost(name).or_else(|| {
            self.categories
                .values()
                .find_map(|properties| properties.get(name).cloned())
        })
    }

    /// Finds a property in one category.
    pub fn get_property_in(
        &self,
        category: &str,
        name: &str,
    ) -> Result<Option<PropertyRef>, PropertyError> {
        if category == VARIABLES_CATEGORY {
            return Ok(self.innermost(name));
        }
        self.categories
            .get(category)
            .map(|properties| properties.get(name).cloned())
            .ok_or_else(|| PropertyError::UnknownCategory {
                category: category.to_string(),
            })
    }

    /// The category a property is registered in.
    pub fn category_of(&self, name: &str) -> Option<&str> {
        if self.variables.contains_key(name) {
            return Some(VARIABLES_CATEGORY);
        }
        self.categories
            .iter()
            .find(|(_, properties)| properties.contains_key(name))
            .map(|(category, _)| category.as_str())
    }

    /// Inserts or replaces a property, creating the category if needed.
    pub fn set_property(&mut self, category: &str, property: PropertyRef) {
        log::trace!(
            "Registering property '{}' in category '{}'.",
            property.name(),
            category
        );
        self.categories
            .entry(category.to_string())
            .or_default()
            .insert(property.name().to_string(), property);
    }

    /// Every category with its properties, sorted by name. Variables come last and
    /// list only their innermost binding.
    pub fn categories(&self) -> Vec<(String, Vec<PropertyRef>)> {
        let mut listing: Vec<(String, Vec<PropertyRef>)> = self
            .categories
            .iter()
            .map(|(category, properties)| (category.clone(), properties.values().cloned().collect()))
            .collect();

        if !self.variables.is_empty() {
            let mut names: Vec<&String> = self.variables.keys().collect();
            names.sort();
            let variables = names
                .into_iter()
                .filter_map(|name| self.innermost(name))
                .collect();
            listing.push((VARIABLES_CATEGORY.to_string(), variables));
        }
        listing
    }

    // --- VARIABLES ---

    fn innermost(&self, name: &str) -> Option<PropertyRef> {
        self.variables.get(name).and_then(|stack| stack.last().cloned())
    }

    fn is_reserved(&self, name: &str) -> bool {
        self.categories
            .values()
            .any(|properties| properties.contains_key(name))
    }

    /// Pushes a new binding, shadowing any outer binding of the same name.
    pub fn add_variable(&mut self, name: &str, value: &str) -> Result<(), PropertyError> {
        if self.is_reserved(name) {
            log::debug!("Variable '{}' would shadow a built-in property.", name);
            return Err(PropertyError::ReservedName {
                name: name.to_string(),
            });
        }
        let variable = Property::variable(name, value)?;
        self.variables
            .entry(name.to_string())
            .or_default()
            .push(variable);
        Ok(())
    }

    /// Replaces the value of the innermost binding.
    pub fn set_variable(&mut self, name: &str, value: &str) -> Result<(), PropertyError> {
        let variable = self
            .innermost(name)
            .ok_or_else(|| PropertyError::NoSuchVariable {
                name: name.to_string(),
            })?;
        variable.set_value(value);
        variable.invalidate()
    }

    /// Pops the innermost binding, restoring the outer one if any.
    pub fn remove_variable(&mut self, name: &str) -> Result<(), PropertyError> {
        let stack = self
            .variables
            .get_mut(name)
            .ok_or_else(|| PropertyError::NoSuchVariable {
                name: name.to_string(),
            })?;
        stack.pop();
        if stack.is_empty() {
            self.variables.remove(name);
        }
        Ok(())
    }

    // --- OPTIONS & WORKSPACE ---

    /// The shared option store.
    pub fn options(&self) -> &OptionStore {
        &self.options
    }

    /// The shared workspace state that file properties read from.
    pub fn workspace(&self) -> SharedWorkspace {
        Rc::clone(&self.workspace)
    }

    /// Records a changed configuration option and invalidates `config.<name>`.
    ///
    /// Only this context sees the change; the template and other clones keep their own
    /// options.
    pub fn set_option(&mut self, name: &str, value: &str) -> Result<(), PropertyError> {
        let changed = self.options.set(name, value);
        let property_name = format!("{}{}", CONFIG_PREFIX, name);

        let property = match self.get_property(&property_name) {
            Some(property) => property,
            None => {
                let property = builtins::config_property(name, self.options.clone())?;
                self.set_property(CONFIG_CATEGORY, Rc::clone(&property));
                property
            }
        };

        if changed {
            log::debug!("Option '{}' changed. Invalidating '{}'.", name, property_name);
            property.invalidate()?;
        }
        Ok(())
    }

    // --- EXPANSION STATE ---

    /// Enters one more level of template expansion.
    pub(crate) fn enter(&mut self, reference: &str) -> Result<(), PropertyError> {
        if self.depth >= MAX_RECURSION_DEPTH {
            log::error!(
                "Maximum expansion depth ({}) exceeded while expanding '{}'.",
                MAX_RECURSION_DEPTH,
                reference
            );
            return Err(PropertyError::DepthExceeded {
                depth: MAX_RECURSION_DEPTH,
                reference: reference.to_string(),
            });
        }
        self.depth += 1;
        Ok(())
    }

    /// Leaves one level of template expansion.
    pub(crate) fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// The mode of the expansion currently running.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Switches the expansion mode, returning the previous one.
    pub(crate) fn swap_mode(&mut self, mode: Mode) -> Mode {
        std::mem::replace(&mut self.mode, mode)
    }

    /// Keeps a temporary file alive until this context is dropped.
    pub(crate) fn keep_temp_file(&mut self, path: TempPath) {
        self.temp_files.push(path);
    }
}

impl Clone for PropertyMaps {
    /// Shares the built-in properties, except `config.*`: the options are snapshotted
    /// and the clone gets its own config properties over the copy. Each variable binding
    /// becomes a fresh variable. Temporary files stay with the original.
    fn clone(&self) -> Self {
        let variables = self
            .variables
            .iter()
            .map(|(name, stack)| {
                let snapshot = stack
                    .iter()
                    .filter_map(|variable| {
                        Property::variable(name.as_str(), variable.cached_value().unwrap_or_default())
                            .ok()
                    })
                    .collect();
                (name.clone(), snapshot)
            })
            .collect();

        let mut copy = Self {
            categories: self.categories.clone(),
            variables,
            options: self.options.snapshot(),
            workspace: Rc::clone(&self.workspace),
            depth: self.depth,
            mode: self.mode,
            temp_files: Vec::new(),
        };
        if copy.categories.contains_key(CONFIG_CATEGORY) {
            if let Err(e) = builtins::register_config(&mut copy) {
                log::error!("Failed to rebuild config properties of a clone: {}", e);
            }
        }
        copy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::MISC_CATEGORY;
    use crate::core::substitution::expand;

    #[test]
    fn test_variables_shadow_and_restore() {
        let mut maps = PropertyMaps::new();
        let mut context = PropertyMaps::new();
        maps.add_variable("x", "outer").unwrap();
        maps.add_variable("x", "inner").unwrap();

        let value = maps.get_property("x").unwrap().get_current(&mut context).unwrap();
        assert_eq!(value, "inner");

        maps.set_variable("x", "changed").unwrap();
        let value = maps.get_property("x").unwrap().get_current(&mut context).unwrap();
        assert_eq!(value, "changed");

        maps.remove_variable("x").unwrap();
        let value = maps.get_property("x").unwrap().get_current(&mut context).unwrap();
        assert_eq!(value, "outer");

        maps.remove_variable("x").unwrap();
        assert!(maps.get_property("x").is_none());
        assert_eq!(
            maps.remove_variable("x"),
            Err(PropertyError::NoSuchVariable {
                name: "x".to_string()
            })
        );
    }

    #[test]
    fn test_variable_cannot_shadow_builtin() {
        let mut maps = PropertyMaps::new();
        maps.set_property(MISC_CATEGORY, Property::constant("echo", "", "").unwrap());
        assert!(matches!(
            maps.add_variable("echo", "x"),
            Err(PropertyError::ReservedName { .. })
        ));
        assert!(maps.get_property_in(VARIABLES_CATEGORY, "echo").unwrap().is_none());
    }

    #[test]
    fn test_set_variable_requires_binding() {
        let mut maps = PropertyMaps::new();
        assert!(matches!(
            maps.set_variable("missing", "1"),
            Err(PropertyError::NoSuchVariable { .. })
        ));
    }

    #[test]
    fn test_unknown_category() {
        let maps = PropertyMaps::new();
        assert_eq!(
            maps.get_property_in("Nope", "x").unwrap_err(),
            PropertyError::UnknownCategory {
                category: "Nope".to_string()
            }
        );
    }

    #[test]
    fn test_clone_snapshots_variables() {
        let mut maps = PropertyMaps::new();
        maps.set_property(MISC_CATEGORY, Property::constant("k", "v", "").unwrap());
        maps.add_variable("x", "1").unwrap();

        let mut copy = maps.clone();
        copy.set_variable("x", "2").unwrap();
        copy.add_variable("y", "3").unwrap();

        let original = maps.get_property("x").unwrap();
        assert_eq!(original.cached_value().as_deref(), Some("1"));
        assert!(maps.get_property("y").is_none());
        assert!(Rc::ptr_eq(
            &maps.get_property("k").unwrap(),
            &copy.get_property("k").unwrap()
        ));
    }

    #[test]
    fn test_depth_is_bounded() {
        let mut maps = PropertyMaps::new();
        for _ in 0..MAX_RECURSION_DEPTH {
            maps.enter("t").unwrap();
        }
        assert!(matches!(
            maps.enter("t"),
            Err(PropertyError::DepthExceeded { .. })
        ));
        maps.leave();
        assert!(maps.enter("t").is_ok());
    }

    #[test]
    fn test_option_overrides_stay_in_the_clone() {
        let mut options = BTreeMap::new();
        options.insert("master.jvm.xmx".to_string(), "256m".to_string());
        let template = PropertyMaps::template(options, WorkspaceState::default()).unwrap();

        let mut copy = template.clone();
        copy.set_option("master.jvm.xmx", "1g").unwrap();
        copy.set_option("font", "mono").unwrap();
        assert_eq!(
            expand("${config.master.jvm.xmx} ${config.font}", &mut copy, Mode::Current).unwrap(),
            "1g mono"
        );
        assert_eq!(
            expand("${config.master.jvm.args.combined}", &mut copy, Mode::Current).unwrap(),
            "-Xmx1g"
        );

        let mut fresh = template.clone();
        assert_eq!(
            expand("${config.master.jvm.xmx} ${config.font}", &mut fresh, Mode::Current).unwrap(),
            "256m ${config.font}"
        );
        assert_eq!(template.options().get("master.jvm.xmx").as_deref(), Some("256m"));
        assert!(template.options().get("font").is_none());
        assert!(template.get_property("config.font").is_none());
    }

    #[test]
    fn test_set_option_registers_and_invalidates() {
        let mut maps = PropertyMaps::new();
        let mut context = PropertyMaps::new();
        maps.set_option("font.size", "12").unwrap();

        let property = maps.get_property("config.font.size").unwrap();
        assert_eq!(property.get_current(&mut context).unwrap(), "12");
        assert_eq!(maps.category_of("config.font.size"), Some(CONFIG_CATEGORY));

        maps.set_option("font.size", "14").unwrap();
        assert!(!property.is_current());
        assert_eq!(property.get_lazy(&mut context).unwrap(), "12");
        assert_eq!(property.get_current(&mut context).unwrap(), "14");
    }
}
