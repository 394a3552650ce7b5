use clap::Parser;
use std::path::PathBuf;

/// Arguments for the manifest command
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:\n  \
                  Print a manifest:\n    packwright manifest build/default/manifest.txt\n\n\
                  Check archives against it:\n    packwright manifest build/default/manifest.txt --verify")]
pub struct ManifestArgs {
    /// Path to a manifest.txt
    pub file: PathBuf,

    /// Hash every archive next to the manifest and compare
    #[arg(long)]
    pub verify: bool,
}
