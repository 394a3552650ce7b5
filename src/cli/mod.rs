//! CLI definitions using clap derive API
//!
//! This module is organized into submodules for each command's argument types:
//! - build: Build command arguments
//! - manifest: Manifest inspection arguments
//! - resolve: Logical name resolution arguments
//! - completions: Completions command arguments

use clap::builder::{Styles, styling::AnsiColor};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod build;
pub mod completions;
pub mod manifest;
pub mod resolve;

pub use build::BuildArgs;
pub use completions::CompletionsArgs;
pub use manifest::ManifestArgs;
pub use resolve::ResolveArgs;

/// Packwright - content packaging and package loading
#[derive(Parser, Debug)]
#[command(
    name = "packwright",
    author,
    version,
    color = clap::ColorChoice::Always,
    styles = Styles::styled()
        .header(AnsiColor::Green.on_default().bold())
        .usage(AnsiColor::Green.on_default().bold())
        .literal(AnsiColor::Cyan.on_default().bold())
        .placeholder(AnsiColor::Cyan.on_default()),
    about = "Package game content into dependency-ordered archives",
    long_about = "Packwright assigns a project's content files to packages, validates their \
                  dependency graph, and writes one archive per package together with a \
                  version manifest and an asset map for the runtime loader.",
    after_help = "\x1b[1m\x1b[32mExamples:\x1b[0m\n   \
                  packwright build -o build --platform linux --channel default  \x1b[90m# Full build\x1b[0m\n   \
                  packwright build -o build --platform linux --channel dev --editor-only\n   \
                  packwright manifest build/default/manifest.txt               \x1b[90m# Inspect a manifest\x1b[0m\n   \
                  packwright resolve hero                                      \x1b[90m# Find an asset's package\x1b[0m\n\n\
                  "
)]
pub struct Cli {
    /// Project directory (defaults to current directory)
    #[arg(long, short = 'p', global = true, env = "PACKWRIGHT_PROJECT")]
    pub project: Option<PathBuf>,

    /// Enable verbose output
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build packages, manifest and asset map
    Build(BuildArgs),

    /// Parse and print a version manifest
    Manifest(ManifestArgs),

    /// Show which package holds a logical asset name
    Resolve(ResolveArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}
