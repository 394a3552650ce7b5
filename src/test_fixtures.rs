//! Test fixtures shared by the runtime unit tests.
//!
//! Builds catalogs and in-memory package sources with a single call:
//!
//! ```ignore
//! use crate::test_fixtures::{MemorySource, asset, catalog, package};
//!
//! let catalog = catalog(&[asset("a", "content/p1/a.txt", "p1", &[])]);
//! let source = MemorySource::new(vec![package("p1", &[], &[("a", b"alpha")])]);
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::archive::{ArchiveEntry, Compression, PackageArchive};
use crate::error::LoadError;
use crate::manifest::{AssetMap, AssetRecord};
use crate::runtime::{Catalog, PackageSource};

/// Asset map record; `deps` are asset paths
#[must_use]
pub fn asset(name: &str, path: &str, package: &str, deps: &[&str]) -> AssetRecord {
    AssetRecord {
        asset_name_value: name.to_string(),
        asset_path: path.to_string(),
        bundle_name: package.to_string(),
        direct_dependencies: deps.iter().map(|d| (*d).to_string()).collect(),
        all_dependencies: deps.iter().map(|d| (*d).to_string()).collect(),
    }
}

#[must_use]
pub fn catalog(records: &[AssetRecord]) -> Catalog {
    Catalog::new(AssetMap::new(records.to_vec()), None)
}

/// Archive holding `(logical name, bytes)` entries
#[must_use]
pub fn package(name: &str, deps: &[&str], entries: &[(&str, &[u8])]) -> PackageArchive {
    let mut archive = PackageArchive::new(
        name,
        deps.iter().map(|d| (*d).to_string()).collect(),
        Compression::None,
    );
    for (entry, data) in entries {
        archive.entries.push(ArchiveEntry {
            name: (*entry).to_string(),
            path: format!("{}/{}", name, entry),
            data: data.to_vec(),
        });
    }
    archive
}

#[derive(Default)]
struct Shelf {
    archives: HashMap<String, PackageArchive>,
    opens: HashMap<String, usize>,
}

/// Package source over in-memory archives. Clones share state, so a test
/// can keep one to inspect or change what the loader sees.
#[derive(Clone, Default)]
pub struct MemorySource {
    shelf: Arc<Mutex<Shelf>>,
}

impl MemorySource {
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn new(archives: Vec<PackageArchive>) -> Self {
        let source = Self::default();
        {
            let mut shelf = source.shelf.lock().expect("shelf lock");
            for archive in archives {
                shelf.archives.insert(archive.name.clone(), archive);
            }
        }
        source
    }

    /// How many times `package` was opened
    pub fn opens(&self, package: &str) -> usize {
        let shelf = self.shelf.lock().expect("shelf lock");
        shelf.opens.get(package).copied().unwrap_or(0)
    }

    pub fn remove(&self, package: &str) {
        let mut shelf = self.shelf.lock().expect("shelf lock");
        shelf.archives.remove(package);
    }
}

#[async_trait]
impl PackageSource for MemorySource {
    fn open(&self, package: &str) -> Result<PackageArchive, LoadError> {
        let mut shelf = self.shelf.lock().expect("shelf lock");
        *shelf.opens.entry(package.to_string()).or_default() += 1;
        shelf
            .archives
            .get(package)
            .cloned()
            .ok_or_else(|| LoadError::PackageNotFound {
                package: package.to_string(),
            })
    }
}
