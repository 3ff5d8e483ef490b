// src/core/mod.rs

pub mod attributes;
pub mod builtins;
pub mod config_loader;
pub mod control_flow;
pub mod files;
pub mod invalidation;
pub mod kinds;
pub mod operators;
pub mod options;
pub mod paths;
pub mod property;
pub mod property_maps;
pub mod substitution;
pub mod xml;
