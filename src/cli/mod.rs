// src/cli/mod.rs

use clap::Parser;
use std::path::PathBuf;

pub mod dispatcher;
pub mod handlers;

/// propmaps: expands `${property attr="value"}` templates for external command lines.
///
/// Valid formats:
///    - `propmaps expand <TEMPLATE> [--lazy] [--var NAME=VALUE] [--option NAME=VALUE]`
///    - `propmaps list [--category <CATEGORY>]`
///    - `propmaps describe <NAME>`
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(disable_help_subcommand = true)]
pub struct Cli {
    /// Path of the configuration file. Defaults to `<config dir>/propmaps/config.toml`.
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// The action: `expand`, `list` or `describe`.
    pub action: Option<String>,

    /// All remaining arguments, passed to the action.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}
