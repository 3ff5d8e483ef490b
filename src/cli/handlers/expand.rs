// src/cli/handlers/expand.rs

use anyhow::{Context, Result};
use clap::Parser;

use crate::{
    cli::handlers::commons,
    core::{
        property_maps::PropertyMaps,
        substitution::{self, Mode},
    },
};

#[derive(Parser, Debug, Default)]
#[command(
    no_binary_name = true,
    about = "Expands a template and prints the result."
)]
struct ExpandArgs {
    /// The template, e.g. '${file.parent file="${current.file}"}'.
    template: String,

    /// Let lazy properties (configuration options, variables) use cached values.
    #[arg(long)]
    lazy: bool,

    /// Bind a variable for the expansion (e.g., "NAME=VALUE").
    #[arg(long, value_delimiter = ',', num_args = 1..)]
    var: Vec<String>,

    /// Override a configuration option for the expansion (e.g., "NAME=VALUE").
    #[arg(long, value_delimiter = ',', num_args = 1..)]
    option: Vec<String>,
}

pub fn handle(args: Vec<String>, template: &PropertyMaps) -> Result<()> {
    let expand_args = ExpandArgs::try_parse_from(&args)?;
    println!("{}", run(&expand_args, template)?);
    Ok(())
}

fn run(args: &ExpandArgs, template: &PropertyMaps) -> Result<String> {
    let mut context = template.clone();

    for (name, value) in commons::parse_key_value_pairs(&args.option)? {
        context
            .set_option(&name, &value)
            .with_context(|| format!("Failed to set option '{}'", name))?;
    }
    for (name, value) in commons::parse_key_value_pairs(&args.var)? {
        context
            .add_variable(&name, &value)
            .with_context(|| format!("Failed to bind variable '{}'", name))?;
    }

    let mode = if args.lazy { Mode::Lazy } else { Mode::Current };
    let expanded = substitution::expand(&args.template, &mut context, mode)
        .with_context(|| format!("Failed to expand '{}'", args.template))?;
    log::debug!("Expanded '{}' to '{}'.", args.template, expanded);
    Ok(expanded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WorkspaceState;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    fn template() -> PropertyMaps {
        PropertyMaps::template(BTreeMap::new(), WorkspaceState::default()).unwrap()
    }

    fn args(list: &[&str]) -> ExpandArgs {
        ExpandArgs::try_parse_from(list).unwrap()
    }

    #[test]
    fn test_expand_with_variables() {
        let template = template();
        let out = run(&args(&["[${who}] ${add op1=\"${n}\" op2=\"1\"}", "--var", "who=me,n=41"]), &template)
            .unwrap();
        assert_eq!(out, "[me] 42");
        // The template itself is left untouched.
        assert!(template.get_property("who").is_none());
    }

    #[test]
    fn test_expand_with_option_override() {
        let template = template();
        let out = run(
            &args(&["${config.master.jvm.args.combined}", "--option", "master.jvm.xmx=1g"]),
            &template,
        )
        .unwrap();
        assert_eq!(out, "-Xmx1g");

        // A later expansion on the same template starts from the configured options.
        let out = run(&args(&["${config.master.jvm.xmx}|${config.master.jvm.args.combined}"]), &template)
            .unwrap();
        assert_eq!(out, "|");
    }

    #[test]
    fn test_expand_reports_syntax_errors() {
        let template = template();
        assert!(run(&args(&["${echo text=\"x\""]), &template).is_err());
    }
}
