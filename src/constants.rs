// src/constants.rs

/// The name of the directory containing propmaps configuration (in the system config dir).
pub const CONFIG_DIR_NAME: &str = "propmaps";

/// The name of the main configuration file (inside the config dir).
pub const CONFIG_FILENAME: &str = "config.toml";

/// Maximum nesting of template expansions before evaluation is aborted.
pub const MAX_RECURSION_DEPTH: u32 = 32;

/// The platform's list separator, used as the default delimiter of list attributes.
#[cfg(windows)]
pub const PATH_SEPARATOR: &str = ";";
/// The platform's list separator, used as the default delimiter of list attributes.
#[cfg(not(windows))]
pub const PATH_SEPARATOR: &str = ":";

/// The platform's line separator.
#[cfg(windows)]
pub const LINE_SEPARATOR: &str = "\r\n";
/// The platform's line separator.
#[cfg(not(windows))]
pub const LINE_SEPARATOR: &str = "\n";

/// Separates the commands of a process chain. Default output separator of `for`.
pub const PROCESS_SEPARATOR: &str = "\u{241E}";

// --- CATEGORIES ---

/// Reserved category holding scoped variables.
pub const VARIABLES_CATEGORY: &str = "Variables";
/// Properties derived from the process environment.
pub const ENVIRONMENT_CATEGORY: &str = "Environment";
/// Platform and process facts.
pub const SYSTEM_CATEGORY: &str = "System";
/// Properties derived from configuration options.
pub const CONFIG_CATEGORY: &str = "Config";
/// Workspace files and file system operations.
pub const FILE_CATEGORY: &str = "File";
/// Arithmetic, comparison, boolean, string and list operators.
pub const OPERATOR_CATEGORY: &str = "Operator";
/// `if`, `var`, `var.set` and `for`.
pub const CONTROL_FLOW_CATEGORY: &str = "Control Flow";
/// Everything else.
pub const MISC_CATEGORY: &str = "Misc";

/// Prefix of properties derived from environment variables.
pub const ENV_PREFIX: &str = "env.";
/// Prefix of properties derived from configuration options.
pub const CONFIG_PREFIX: &str = "config.";
