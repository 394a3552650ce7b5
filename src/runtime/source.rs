//! Where package bytes come from
//!
//! The loader has one code path; the loading mode only selects which
//! [`PackageSource`] it reads through:
//!
//! - [`DirectSource`]: assets read from the project tree via the asset map
//! - [`LocalSource`]: built archives in a package directory
//! - [`StagedSource`]: archives in a staging directory, checked against the
//!   manifest and retried with exponential backoff

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

use crate::archive::{ArchiveEntry, Compression, PackageArchive};
use crate::config::{LoadMode, RetryConfig, RuntimeConfig};
use crate::error::{LoadError, Result, config::invalid as config_invalid};
use crate::hash::{hash_bytes, verify_hash};
use crate::manifest::Manifest;

use super::catalog::Catalog;

/// Opens packages by id
#[async_trait]
pub trait PackageSource: Send + Sync {
    /// Open `package`, blocking the calling thread for I/O
    fn open(&self, package: &str) -> std::result::Result<PackageArchive, LoadError>;

    /// Open `package` without blocking the runtime
    async fn open_async(&self, package: &str) -> std::result::Result<PackageArchive, LoadError> {
        self.open(package)
    }
}

/// Build the source selected by `config`.
///
/// `local` reads `package_dir` (default: the channel directory); `staged`
/// reads `staging_dir` (same default) and requires a manifest.
pub fn source_for(
    config: &RuntimeConfig,
    project_root: &Path,
    channel_dir: &Path,
    catalog: &Arc<Catalog>,
) -> Result<Box<dyn PackageSource>> {
    let resolve = |dir: &Option<PathBuf>| match dir {
        Some(d) if d.is_absolute() => d.clone(),
        Some(d) => project_root.join(d),
        None => channel_dir.to_path_buf(),
    };

    let source: Box<dyn PackageSource> = match config.mode {
        LoadMode::Direct => Box::new(DirectSource::new(project_root, Arc::clone(catalog))),
        LoadMode::Local => Box::new(LocalSource::new(resolve(&config.package_dir))),
        LoadMode::Staged => {
            let manifest = catalog.manifest().cloned().ok_or_else(|| {
                config_invalid(format!(
                    "staged loading needs a manifest in {}",
                    channel_dir.display()
                ))
            })?;
            Box::new(StagedSource::new(
                resolve(&config.staging_dir),
                manifest,
                config.retry,
            ))
        }
    };
    log::debug!("Runtime loading mode: {:?}", config.mode);
    Ok(source)
}

fn decode_archive(package: &str, bytes: &[u8]) -> std::result::Result<PackageArchive, LoadError> {
    let archive = PackageArchive::decode(bytes).map_err(|reason| LoadError::io(package, reason))?;
    if !archive.name.eq_ignore_ascii_case(package) {
        return Err(LoadError::io(
            package,
            format!("archive holds package '{}'", archive.name),
        ));
    }
    Ok(archive)
}

/// Serves packages straight from the project tree. No build artifacts
/// besides the asset map are needed.
pub struct DirectSource {
    project_root: PathBuf,
    catalog: Arc<Catalog>,
}

impl DirectSource {
    pub fn new(project_root: &Path, catalog: Arc<Catalog>) -> Self {
        Self {
            project_root: project_root.to_path_buf(),
            catalog,
        }
    }
}

#[async_trait]
impl PackageSource for DirectSource {
    fn open(&self, package: &str) -> std::result::Result<PackageArchive, LoadError> {
        if !self.catalog.contains_package(package) {
            return Err(LoadError::PackageNotFound {
                package: package.to_string(),
            });
        }

        let mut archive = PackageArchive::new(
            package,
            self.catalog.package_dependencies(package).to_vec(),
            Compression::None,
        );
        for record in self.catalog.package_assets(package) {
            let file = find_case_insensitive(&self.project_root, &record.asset_path)
                .ok_or_else(|| LoadError::io(package, format!("{} not found", record.asset_path)))?;
            let data = std::fs::read(&file)
                .map_err(|e| LoadError::io(package, format!("{}: {}", file.display(), e)))?;
            archive.entries.push(ArchiveEntry {
                name: record.asset_name_value.clone(),
                path: record.asset_path.clone(),
                data,
            });
        }
        Ok(archive)
    }
}

/// Asset map paths are lowercase; the files on disk may not be.
fn find_case_insensitive(root: &Path, canonical: &str) -> Option<PathBuf> {
    let direct = root.join(canonical);
    if direct.is_file() {
        return Some(direct);
    }

    let mut current = root.to_path_buf();
    for component in Path::new(canonical).components() {
        let Component::Normal(wanted) = component else {
            return None;
        };
        let wanted = wanted.to_string_lossy().to_lowercase();
        let found = std::fs::read_dir(&current)
            .ok()?
            .filter_map(std::result::Result::ok)
            .find(|e| e.file_name().to_string_lossy().to_lowercase() == wanted)?;
        current = found.path();
    }
    current.is_file().then_some(current)
}

/// Reads archives named after their package from one directory
pub struct LocalSource {
    dir: PathBuf,
}

impl LocalSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl PackageSource for LocalSource {
    fn open(&self, package: &str) -> std::result::Result<PackageArchive, LoadError> {
        let path = self.dir.join(package);
        if !path.is_file() {
            return Err(LoadError::PackageNotFound {
                package: package.to_string(),
            });
        }
        let bytes = std::fs::read(&path)
            .map_err(|e| LoadError::io(package, format!("{}: {}", path.display(), e)))?;
        decode_archive(package, &bytes)
    }
}

/// Reads archives from a staging directory. Every read is checked against
/// the manifest's size and hash; I/O and integrity failures are retried.
pub struct StagedSource {
    dir: PathBuf,
    manifest: Manifest,
    retry: RetryConfig,
}

impl StagedSource {
    pub fn new(dir: impl Into<PathBuf>, manifest: Manifest, retry: RetryConfig) -> Self {
        Self {
            dir: dir.into(),
            manifest,
            retry,
        }
    }

    fn attempt(&self, package: &str) -> std::result::Result<PackageArchive, LoadError> {
        let entry = self
            .manifest
            .find(package)
            .ok_or_else(|| LoadError::PackageNotFound {
                package: package.to_string(),
            })?;

        let path = self.dir.join(package);
        let bytes = std::fs::read(&path)
            .map_err(|e| LoadError::io(package, format!("{}: {}", path.display(), e)))?;

        if bytes.len() as u64 != entry.size_bytes {
            return Err(LoadError::IntegrityMismatch {
                package: package.to_string(),
                reason: format!("size {} but manifest says {}", bytes.len(), entry.size_bytes),
            });
        }
        let actual = hash_bytes(&bytes);
        if !verify_hash(&entry.content_hash, &actual) {
            return Err(LoadError::IntegrityMismatch {
                package: package.to_string(),
                reason: format!("hash {} but manifest says {}", actual, entry.content_hash),
            });
        }
        decode_archive(package, &bytes)
    }

    fn exhausted(&self, package: &str, last: &LoadError) -> LoadError {
        LoadError::RetriesExhausted {
            package: package.to_string(),
            attempts: self.retry.max_attempts.max(1),
            reason: last.to_string(),
        }
    }
}

fn is_retryable(err: &LoadError) -> bool {
    matches!(
        err,
        LoadError::Io { .. } | LoadError::IntegrityMismatch { .. }
    )
}

#[async_trait]
impl PackageSource for StagedSource {
    fn open(&self, package: &str) -> std::result::Result<PackageArchive, LoadError> {
        let attempts = self.retry.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.attempt(package) {
                Ok(archive) => return Ok(archive),
                Err(e) if !is_retryable(&e) => return Err(e),
                Err(e) if attempt >= attempts => return Err(self.exhausted(package, &e)),
                Err(e) => {
                    let delay = self.retry.delay_for(attempt);
                    log::warn!(
                        "Attempt {}/{} for package '{}' failed: {}; retrying in {:?}",
                        attempt,
                        attempts,
                        package,
                        e,
                        delay
                    );
                    std::thread::sleep(delay);
                    attempt += 1;
                }
            }
        }
    }

    async fn open_async(&self, package: &str) -> std::result::Result<PackageArchive, LoadError> {
        let attempts = self.retry.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.attempt(package) {
                Ok(archive) => return Ok(archive),
                Err(e) if !is_retryable(&e) => return Err(e),
                Err(e) if attempt >= attempts => return Err(self.exhausted(package, &e)),
                Err(e) => {
                    let delay = self.retry.delay_for(attempt);
                    log::warn!(
                        "Attempt {}/{} for package '{}' failed: {}; retrying in {:?}",
                        attempt,
                        attempts,
                        package,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
