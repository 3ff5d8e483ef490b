// src/cli/handlers/list.rs

use anyhow::{Result, anyhow};
use clap::Parser;
use colored::Colorize;

use crate::core::property_maps::PropertyMaps;

#[derive(Parser, Debug, Default)]
#[command(
    no_binary_name = true,
    about = "Lists the available properties by category."
)]
struct ListArgs {
    /// Only list this category (e.g. "File", "Operator").
    #[arg(long, short)]
    category: Option<String>,

    /// Show the help text of each property.
    #[arg(long)]
    help_text: bool,
}

pub fn handle(args: Vec<String>, template: &PropertyMaps) -> Result<()> {
    let list_args = ListArgs::try_parse_from(&args)?;
    let categories = template.categories();

    let selected: Vec<_> = match &list_args.category {
        Some(wanted) => categories
            .into_iter()
            .filter(|(category, _)| category.eq_ignore_ascii_case(wanted))
            .collect(),
        None => categories,
    };
    if selected.is_empty() {
        if let Some(wanted) = &list_args.category {
            return Err(anyhow!("Unknown property category '{}'.", wanted));
        }
    }

    for (category, properties) in selected {
        println!("\n{}", format!("--- {} ---", category).yellow().bold());
        for property in properties {
            if list_args.help_text {
                println!("  {:<36} {}", property.name().cyan(), property.help().dimmed());
            } else {
                println!("  {}", property.name().cyan());
            }
        }
    }
    Ok(())
}
