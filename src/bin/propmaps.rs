// src/bin/propmaps.rs

use clap::Parser;
use colored::*;
use propmaps::cli::{Cli, dispatcher};

/// The main entry point of the `propmaps` application.
/// It sets up logging, parses arguments, dispatches to the correct handler,
/// and performs centralized error handling.
fn main() {
    env_logger::init();

    if let Err(e) = dispatcher::dispatch(Cli::parse()) {
        eprintln!("\n{}: {:#}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}
