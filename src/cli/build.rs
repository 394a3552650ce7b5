use clap::Parser;
use packwright::archive::Compression;
use std::path::PathBuf;

/// Arguments for the build command
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:\n  \
                  Build every package for one channel:\n    packwright build -o build --platform linux --channel default\n\n\
                  Stamp versions into the manifest:\n    packwright build -o build --platform linux --channel default --code-version 3 --asset-version 12\n\n\
                  Validate and write the asset map only:\n    packwright build -o build --platform linux --channel dev --editor-only")]
pub struct BuildArgs {
    /// Output directory; relative paths are taken from the project root
    #[arg(long, short = 'o')]
    pub output: PathBuf,

    /// Target platform recorded in the manifest
    #[arg(long)]
    pub platform: String,

    /// Release channel; artifacts go to <output>/<channel>
    #[arg(long, short = 'c')]
    pub channel: String,

    /// Code version, first half of the manifest version
    #[arg(long, default_value = "1")]
    pub code_version: String,

    /// Asset version, second half of the manifest version
    #[arg(long, default_value = "0")]
    pub asset_version: String,

    /// Compression label recorded in archive headers (none, chunked, lz4);
    /// payloads are stored uncompressed
    #[arg(long, default_value = "none")]
    pub compression: Compression,

    /// Stop after the asset map; no archives or manifest
    #[arg(long)]
    pub editor_only: bool,

    /// Hide the progress bar
    #[arg(long)]
    pub no_progress: bool,
}
