//! # Config Loader
//!
//! Reads `config.toml` into a [`ConfigFile`]: the option map behind `config.*`
//! properties and the workspace state behind the file properties. Paths in the
//! workspace section go through `~`/environment variable expansion.

use crate::{
    core::paths::{self, PathError},
    models::{ConfigFile, WorkspaceState},
};
use std::{
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

/// Errors raised while loading the configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("Could not read config file '{path}': {source}")]
    Io {
        /// The file that failed.
        path: String,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },
    /// The file is not valid TOML for a `ConfigFile`.
    #[error("Failed to parse config file '{path}': {source}")]
    TomlParse {
        /// The file that failed.
        path: String,
        /// The underlying error.
        #[source]
        source: toml::de::Error,
    },
    /// A path could not be resolved.
    #[error(transparent)]
    Path(#[from] PathError),
}

/// Loads the configuration.
///
/// An explicit `path` must exist. Without one, the default location is used and a
/// missing file yields the default (empty) configuration.
pub fn load(path: Option<&Path>) -> Result<ConfigFile, ConfigError> {
    let (path, explicit) = match path {
        Some(path) => (path.to_path_buf(), true),
        None => (paths::get_config_path()?, false),
    };

    if !explicit && !path.exists() {
        log::debug!(
            "No config file at '{}'. Using defaults.",
            path.display()
        );
        return Ok(ConfigFile::default());
    }

    log::debug!("Loading config file '{}'.", path.display());
    let content = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse(&content, &path)
}

/// Parses the content of a config file. `path` is only used in error messages.
pub fn parse(content: &str, path: &Path) -> Result<ConfigFile, ConfigError> {
    let mut config: ConfigFile = toml::from_str(content).map_err(|source| ConfigError::TomlParse {
        path: path.display().to_string(),
        source,
    })?;
    expand_workspace(&mut config.workspace)?;
    Ok(config)
}

fn expand_one(path: &Path) -> Result<PathBuf, PathError> {
    paths::expand_path(&path.to_string_lossy())
}

fn expand_all(paths: &mut [PathBuf]) -> Result<(), PathError> {
    for path in paths.iter_mut() {
        *path = expand_one(path)?;
    }
    Ok(())
}

fn expand_workspace(workspace: &mut WorkspaceState) -> Result<(), PathError> {
    for path in [
        &mut workspace.current_file,
        &mut workspace.working_dir,
        &mut workspace.build_dir,
        &mut workspace.project_root,
    ]
    .into_iter()
    .flatten()
    {
        *path = expand_one(path)?;
    }
    expand_all(&mut workspace.open_files)?;
    expand_all(&mut workspace.project_files)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_full_file() {
        let content = r#"
[options]
"master.jvm.xmx" = "512m"
"master.jvm.args" = "-ea"

[workspace]
current_file = "/p/src/Main.java"
open_files = ["/p/src/Main.java", "/p/src/Util.java"]
main_class = "app.Main"
"#;
        let config = parse(content, Path::new("config.toml")).unwrap();
        assert_eq!(config.options.get("master.jvm.xmx").map(String::as_str), Some("512m"));
        assert_eq!(
            config.workspace.current_file,
            Some(PathBuf::from("/p/src/Main.java"))
        );
        assert_eq!(config.workspace.open_files.len(), 2);
        assert_eq!(config.workspace.main_class.as_deref(), Some("app.Main"));
        assert_eq!(config.workspace.build_dir, None);
    }

    #[test]
    fn test_parse_expands_home() {
        let Some(home) = dirs::home_dir() else {
            return;
        };
        let config = parse("[workspace]\nproject_root = \"~/work\"\n", Path::new("c.toml")).unwrap();
        assert_eq!(config.workspace.project_root, Some(home.join("work")));
    }

    #[test]
    fn test_parse_rejects_unknown_fields() {
        assert!(matches!(
            parse("[workspace]\ncurrent = \"x\"\n", Path::new("c.toml")),
            Err(ConfigError::TomlParse { .. })
        ));
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        assert!(matches!(load(Some(&missing)), Err(ConfigError::Io { .. })));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("config.toml");
        fs::write(&file, "[options]\nfont = \"mono\"\n").unwrap();
        let config = load(Some(&file)).unwrap();
        assert_eq!(config.options.get("font").map(String::as_str), Some("mono"));
    }
}
