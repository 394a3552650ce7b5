//! Packwright - content packaging pipeline
//!
//! Builds content packages, the version manifest and the asset map for a
//! project, and inspects or loads the results.

use clap::Parser;
use miette::Diagnostic;

mod cli;
mod commands;

use cli::{Cli, Commands};

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp(None)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Build(args) => commands::build::run(cli.project, args),
        Commands::Manifest(args) => commands::manifest::run(args),
        Commands::Resolve(args) => commands::resolve::run(cli.project, args),
        Commands::Completions(args) => commands::completions::run(args),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        if let Some(help) = e.help() {
            eprintln!("  help: {}", help);
        }
        std::process::exit(1);
    }
}
