//! Build command implementation

use std::path::{Path, PathBuf};

use console::{Style, Term};
use packwright::archive::ARCHIVE_FORMAT_VERSION;
use packwright::error::Result;
use packwright::pipeline::{BuildOutcome, BuildSettings, Packager};

use crate::cli::BuildArgs;

pub fn run(project: Option<PathBuf>, args: BuildArgs) -> Result<()> {
    let project_root = super::project_root(project)?;
    let output = resolve_output(&project_root, &args.output);

    let show_progress = !args.no_progress && Term::stderr().is_term();
    let mut packager = Packager::new(&project_root)?.with_progress(show_progress);
    packager.initialize(
        BuildSettings::new(output, args.platform, args.channel)
            .with_versions(args.code_version, args.asset_version)
            .with_compression(args.compression),
    );

    let outcome = packager.run(args.editor_only)?;
    print_outcome(&outcome, args.editor_only);
    Ok(())
}

/// Relative output paths are taken from the project root
fn resolve_output(project_root: &Path, output: &Path) -> PathBuf {
    if output.is_absolute() {
        output.to_path_buf()
    } else {
        project_root.join(output)
    }
}

fn print_outcome(outcome: &BuildOutcome, editor_only: bool) {
    let bold = Style::new().bold();
    let what = if editor_only { "Validated" } else { "Built" };
    let format = if editor_only {
        String::new()
    } else {
        format!(", archive format {}", ARCHIVE_FORMAT_VERSION)
    };
    println!(
        "{} {} packages ({} assets{}) in {}",
        Style::new().green().bold().apply_to(what),
        outcome.packages.len(),
        outcome.asset_count,
        format,
        outcome.channel_dir.display()
    );

    for package in &outcome.packages {
        let size = outcome
            .manifest
            .as_ref()
            .and_then(|m| m.find(&package.name))
            .map(|entry| format!(", {} bytes", entry.size_bytes))
            .unwrap_or_default();
        println!(
            "  {} {} assets{}",
            bold.apply_to(&package.name),
            package.assets.len(),
            size
        );
        if !package.dependencies.is_empty() {
            println!(
                "    {} {}",
                Style::new().dim().apply_to("depends on"),
                package.dependencies.join(", ")
            );
        }
    }

    if !outcome.warnings.is_empty() {
        println!();
        for warning in &outcome.warnings {
            println!("{} {}", Style::new().yellow().bold().apply_to("warning:"), warning);
        }
    }
}
