// src/cli/dispatcher.rs

use anyhow::{Context, Result, anyhow};
use colored::Colorize;

use crate::{
    cli::{Cli, handlers},
    core::{config_loader, property_maps::PropertyMaps},
};

/// Defines a system command, its aliases, and its handler.
struct CommandDefinition {
    name: &'static str,
    aliases: &'static [&'static str],
    about: &'static str,
    handler: fn(Vec<String>, &PropertyMaps) -> Result<()>,
}

/// The single source of truth for all commands.
static COMMAND_REGISTRY: &[CommandDefinition] = &[
    CommandDefinition {
        name: "expand",
        aliases: &["x"],
        about: "Expands a template and prints the result.",
        handler: handlers::expand::handle,
    },
    CommandDefinition {
        name: "list",
        aliases: &["ls"],
        about: "Lists the available properties by category.",
        handler: handlers::list::handle,
    },
    CommandDefinition {
        name: "describe",
        aliases: &["desc"],
        about: "Shows the help and attributes of a property.",
        handler: handlers::describe::handle,
    },
];

/// Finds a command definition in the registry by its name or alias.
fn find_command(name: &str) -> Option<&'static CommandDefinition> {
    COMMAND_REGISTRY
        .iter()
        .find(|cmd| cmd.name == name || cmd.aliases.contains(&name))
}

fn print_commands() {
    println!("{}", "Commands:".yellow().bold());
    for command in COMMAND_REGISTRY {
        println!("  {:<10} {}", command.name.cyan(), command.about);
    }
}

/// Loads the configuration, builds the template context and runs the action.
pub fn dispatch(cli: Cli) -> Result<()> {
    log::debug!("Dispatching: {:?}", cli);

    let Some(action) = cli.action else {
        print_commands();
        return Ok(());
    };
    let command = find_command(&action).ok_or_else(|| {
        anyhow!(
            "Unknown command '{}'. Available: {}.",
            action,
            COMMAND_REGISTRY
                .iter()
                .map(|cmd| cmd.name)
                .collect::<Vec<_>>()
                .join(", ")
        )
    })?;

    let config = config_loader::load(cli.config.as_deref())?;
    let template = PropertyMaps::template(config.options, config.workspace)
        .context("Failed to build the property template")?;

    (command.handler)(cli.args, &template)
}
