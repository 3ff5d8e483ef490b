// src/core/paths.rs

use crate::constants::{CONFIG_DIR_NAME, CONFIG_FILENAME};
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while locating or expanding paths.
#[derive(Error, Debug)]
pub enum PathError {
    /// The platform has no user configuration directory.
    #[error("Could not find system config directory.")]
    ConfigDirNotFound,
    /// `~` or an environment variable in a path could not be expanded.
    #[error("Failed to expand path '{template}': {reason}")]
    Expansion {
        /// The path as written.
        template: String,
        /// Why expansion failed, e.g. an undefined variable.
        reason: String,
    },
}

/// Returns the path to the propmaps configuration directory (e.g. `~/.config/propmaps`).
/// The directory is not created.
pub fn get_config_dir() -> Result<PathBuf, PathError> {
    dirs::config_dir()
        .map(|dir| dir.join(CONFIG_DIR_NAME))
        .ok_or(PathError::ConfigDirNotFound)
}

/// Returns the path to the default `config.toml`.
pub fn get_config_path() -> Result<PathBuf, PathError> {
    get_config_dir().map(|dir| dir.join(CONFIG_FILENAME))
}

/// Expands a path template string, resolving the home directory (`~`) and
/// environment variables (`$VAR` or `${VAR}`).
pub fn expand_path(template: &str) -> Result<PathBuf, PathError> {
    let expanded = shellexpand::full(template).map_err(|e| PathError::Expansion {
        template: template.to_string(),
        reason: e.to_string(),
    })?;
    Ok(PathBuf::from(expanded.into_owned()))
}
