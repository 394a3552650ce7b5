//! Package descriptor discovery
//!
//! Descriptors are YAML files anywhere below the descriptor directory. They
//! are returned sorted by file path so builds are reproducible.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::domain::PackageDescriptor;
use crate::error::{PackError, Result, config::parse_failed as config_parse_failed, fs::read_failed};
use crate::naming::to_forward_slashes;

/// A descriptor and the file it was read from
#[derive(Debug, Clone)]
pub struct DescriptorFile {
    pub path: PathBuf,
    pub descriptor: PackageDescriptor,
}

impl DescriptorFile {
    /// Path shown in diagnostics
    pub fn origin(&self) -> String {
        to_forward_slashes(&self.path)
    }
}

/// Load every descriptor below `dir`.
///
/// # Errors
///
/// Returns `NoDescriptors` when the directory is missing or holds no
/// descriptor files, and a parse error naming the first bad file.
pub fn load_descriptors(dir: &Path) -> Result<Vec<DescriptorFile>> {
    if !dir.is_dir() {
        return Err(PackError::NoDescriptors {
            path: dir.display().to_string(),
        });
    }

    let mut paths: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(walkdir::DirEntry::into_path)
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"))
        })
        .collect();
    paths.sort();

    if paths.is_empty() {
        return Err(PackError::NoDescriptors {
            path: dir.display().to_string(),
        });
    }

    let mut descriptors = Vec::with_capacity(paths.len());
    for path in paths {
        let yaml = std::fs::read_to_string(&path).map_err(|e| read_failed(&path, e))?;
        let descriptor = PackageDescriptor::from_yaml(&yaml).map_err(|e| match e {
            PackError::ConfigParseFailed { reason, .. } => {
                config_parse_failed(path.display().to_string(), reason)
            }
            other => other,
        })?;
        log::debug!(
            "Loaded descriptor {} -> {}",
            path.display(),
            descriptor.effective_name()
        );
        descriptors.push(DescriptorFile { path, descriptor });
    }

    Ok(descriptors)
}
