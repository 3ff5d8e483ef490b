// src/core/options.rs

//! The configuration option map that `config.*` properties read from.

use std::{cell::RefCell, collections::BTreeMap, rc::Rc};

/// Shared, mutable name → value map of configuration options.
///
/// Cloning the store shares the underlying map between the `config.*` properties of
/// one context. A cloned context takes a [`snapshot`](Self::snapshot) instead.
#[derive(Debug, Clone, Default)]
pub struct OptionStore(Rc<RefCell<BTreeMap<String, String>>>);

impl OptionStore {
    /// Builds a store from an initial option map.
    pub fn new(options: BTreeMap<String, String>) -> Self {
        Self(Rc::new(RefCell::new(options)))
    }

    /// An independent copy of the current options.
    pub fn snapshot(&self) -> Self {
        Self::new(self.0.borrow().clone())
    }

    /// The value of an option, if set.
    pub fn get(&self, name: &str) -> Option<String> {
        self.0.borrow().get(name).cloned()
    }

    /// Sets an option. Returns whether the stored value changed.
    pub fn set(&self, name: &str, value: impl Into<String>) -> bool {
        let value = value.into();
        let mut options = self.0.borrow_mut();
        if options.get(name) == Some(&value) {
            return false;
        }
        options.insert(name.to_string(), value);
        true
    }

    /// All option names, sorted.
    pub fn names(&self) -> Vec<String> {
        self.0.borrow().keys().cloned().collect()
    }
}
