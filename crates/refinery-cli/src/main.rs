//! Refinery CLI - clean tabular datasets.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let result = commands::load_config(cli.config.as_deref()).and_then(|config| match cli.command {
        Commands::Check {
            file,
            json,
            z_threshold,
        } => commands::check::run(file, config, json, z_threshold, cli.verbose),

        Commands::Clean(args) => commands::clean::run(args, config, cli.verbose),
    });

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
