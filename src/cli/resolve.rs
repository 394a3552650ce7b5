use clap::Parser;
use std::path::PathBuf;

/// Arguments for the resolve command
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:\n  \
                  Show where an asset lives:\n    packwright resolve hero\n\n\
                  Load it through the runtime loader:\n    packwright resolve hero --load\n\n\
                  Look in another channel:\n    packwright resolve hero -o build -c beta")]
pub struct ResolveArgs {
    /// Logical asset name (case-insensitive)
    pub name: String,

    /// Build output directory; relative paths are taken from the project root
    #[arg(long, short = 'o', default_value = "build")]
    pub output: PathBuf,

    /// Release channel
    #[arg(long, short = 'c', default_value = "default")]
    pub channel: String,

    /// Load the asset with the configured loading mode and report its size
    #[arg(long)]
    pub load: bool,
}
