// src/models.rs

use serde::{Deserialize, Serialize};
use std::{cell::RefCell, collections::BTreeMap, path::PathBuf, rc::Rc};

// --- CONFIGURATION FILE MODELS ---
// What the user writes in config.toml.

/// The whole configuration file.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    /// Option name → value. Each option becomes a `config.<name>` property.
    pub options: BTreeMap<String, String>,
    /// The workspace that file properties describe.
    pub workspace: WorkspaceState,
}

/// The editor/workspace facts file properties read from.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct WorkspaceState {
    /// The document being edited.
    pub current_file: Option<PathBuf>,
    /// Every open document.
    pub open_files: Vec<PathBuf>,
    /// Every file of the current project.
    pub project_files: Vec<PathBuf>,
    /// The working directory of launched processes.
    pub working_dir: Option<PathBuf>,
    /// The build output directory.
    pub build_dir: Option<PathBuf>,
    /// The project root.
    pub project_root: Option<PathBuf>,
    /// The main class of the project.
    pub main_class: Option<String>,
}

/// Workspace state shared between a template context, its clones and the file
/// properties registered in it.
pub type SharedWorkspace = Rc<RefCell<WorkspaceState>>;
