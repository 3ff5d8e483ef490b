// src/cli/handlers/commons.rs

// This module contains shared functions used by multiple handlers.

use anyhow::{Result, anyhow};
use colored::Colorize;

use crate::core::property::Property;

/// Parses "KEY=VALUE" strings into pairs, keeping their order.
pub fn parse_key_value_pairs(pairs: &[String]) -> Result<Vec<(String, String)>> {
    pairs
        .iter()
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) => Ok((key.trim().to_string(), value.to_string())),
            None => Err(anyhow!(
                "Invalid format for key-value pair: '{}'. Expected 'KEY=VALUE'.",
                pair
            )),
        })
        .collect()
}

/// One line per attribute: name and default, or `required`.
pub fn attribute_lines(property: &Property) -> Vec<String> {
    property
        .attribute_specs()
        .iter()
        .map(|spec| match spec.default {
            Some(default) => format!("{}=\"{}\"", spec.name, default.escape_debug()),
            None => format!("{} ({})", spec.name, "required".red()),
        })
        .collect()
}
