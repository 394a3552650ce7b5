//! Manifest command implementation

use std::path::Path;

use console::Style;
use packwright::error::{Result, manifest::archive_mismatch};
use packwright::hash::{hash_file, verify_hash};
use packwright::manifest::Manifest;

use crate::cli::ManifestArgs;

pub fn run(args: ManifestArgs) -> Result<()> {
    let parsed = Manifest::load(&args.file)?;
    let manifest = &parsed.manifest;
    let bold = Style::new().bold();

    println!("{} {}", bold.apply_to("Version:"), manifest.version);
    println!("{} {}", bold.apply_to("Platform:"), manifest.platform);
    println!("{} {}", bold.apply_to("Channel:"), manifest.channel);
    println!("{}", bold.apply_to("Packages:"));

    let width = manifest
        .packages
        .iter()
        .map(|p| p.name.len())
        .max()
        .unwrap_or(0);
    for package in &manifest.packages {
        println!(
            "  {:<width$}  {}  {} bytes",
            Style::new().cyan().apply_to(&package.name),
            Style::new().dim().apply_to(&package.content_hash),
            package.size_bytes,
            width = width
        );
    }

    for warning in &parsed.warnings {
        println!("{} {}", Style::new().yellow().bold().apply_to("warning:"), warning);
    }

    if args.verify {
        let dir = args.file.parent().unwrap_or_else(|| Path::new("."));
        verify(manifest, dir)?;
        println!(
            "{} {} archives match",
            Style::new().green().bold().apply_to("Verified"),
            manifest.packages.len()
        );
    }
    Ok(())
}

/// Compare every archive in `dir` against its manifest entry
fn verify(manifest: &Manifest, dir: &Path) -> Result<()> {
    let mut problems = Vec::new();
    for package in &manifest.packages {
        let path = dir.join(&package.name);
        if !path.is_file() {
            problems.push((package.name.clone(), "archive missing".to_string()));
            continue;
        }
        let (hash, size) = hash_file(&path)?;
        if size != package.size_bytes {
            problems.push((
                package.name.clone(),
                format!("size {} but manifest says {}", size, package.size_bytes),
            ));
        } else if !verify_hash(&package.content_hash, &hash) {
            problems.push((package.name.clone(), "hash differs".to_string()));
        }
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(archive_mismatch(&problems))
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use packwright::error::PackError;
    use packwright::hash::hash_bytes;
    use packwright::manifest::PackageEntry;
    use tempfile::TempDir;

    fn manifest_with(name: &str, bytes: &[u8]) -> Manifest {
        let mut manifest = Manifest::new("1.0", "linux", "default");
        manifest.packages.push(PackageEntry {
            name: name.to_string(),
            content_hash: hash_bytes(bytes),
            size_bytes: bytes.len() as u64,
        });
        manifest
    }

    #[test]
    fn test_verify_matching_archive() {
        let temp = TempDir::new().expect("temp dir");
        std::fs::write(temp.path().join("ui"), b"archive").expect("write");
        assert!(verify(&manifest_with("ui", b"archive"), temp.path()).is_ok());
    }

    #[test]
    fn test_verify_reports_missing_and_changed() {
        let temp = TempDir::new().expect("temp dir");
        std::fs::write(temp.path().join("ui"), b"archivX").expect("write");
        let mut manifest = manifest_with("ui", b"archive");
        manifest.packages.push(PackageEntry {
            name: "maps".to_string(),
            content_hash: hash_bytes(b"maps"),
            size_bytes: 4,
        });

        let err = verify(&manifest, temp.path()).expect_err("mismatch");
        assert!(matches!(err, PackError::ArchiveMismatch { count: 2, .. }));
        assert!(err.to_string().contains("ui: hash differs"));
        assert!(err.to_string().contains("maps: archive missing"));
    }
}
