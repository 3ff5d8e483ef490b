// src/cli/handlers/describe.rs

use anyhow::{Result, anyhow};
use clap::Parser;
use colored::Colorize;

use crate::{
    cli::handlers::commons,
    core::{property::Freshness, property_maps::PropertyMaps},
};

#[derive(Parser, Debug, Default)]
#[command(
    no_binary_name = true,
    about = "Shows the help and attributes of a property."
)]
struct DescribeArgs {
    /// The property name, e.g. "file.find".
    name: String,
}

fn freshness_label(freshness: Freshness) -> &'static str {
    match freshness {
        Freshness::Constant => "constant",
        Freshness::Eager => "recomputed on every use",
        Freshness::Uncached => "never cached",
        Freshness::Cached => "cached until invalidated",
    }
}

pub fn handle(args: Vec<String>, template: &PropertyMaps) -> Result<()> {
    let describe_args = DescribeArgs::try_parse_from(&args)?;
    let property = template
        .get_property(&describe_args.name)
        .ok_or_else(|| anyhow!("Property '{}' not found.", describe_args.name))?;

    println!("\n--- {} '{}' ---", "Property".bold(), property.name().yellow());
    println!(
        "  {:<12} {}",
        "Category".blue(),
        template.category_of(property.name()).unwrap_or("-")
    );
    println!(
        "  {:<12} {}",
        "Evaluation".blue(),
        freshness_label(property.kind().freshness())
    );
    println!("  {:<12} {}", "Help".blue(), property.help());

    let attributes = commons::attribute_lines(&property);
    if attributes.is_empty() {
        println!("  {:<12} {}", "Attributes".blue(), "none".dimmed());
    } else {
        println!("  {}", "Attributes".blue());
        for line in attributes {
            println!("    {}", line);
        }
    }
    if property.kind().freshness() == Freshness::Constant {
        if let Some(value) = property.cached_value() {
            println!("  {:<12} {}", "Value".blue(), value);
        }
    }
    Ok(())
}
