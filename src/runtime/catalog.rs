//! What the runtime knows about a build before any package is opened
//!
//! The catalog joins the asset map (logical name to package) with the
//! optional version manifest (package to hash and size). Package dependency
//! edges are derived from the asset map: package `p` depends on `q` when an
//! asset in `p` directly references an asset in `q`.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::cycle::{Graph, find_cycles};
use crate::error::{LoadError, Result};
use crate::manifest::{ASSET_MAP_FILE, AssetMap, AssetRecord, MANIFEST_FILE, Manifest};

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    assets: AssetMap,
    manifest: Option<Manifest>,
    dependencies: BTreeMap<String, Vec<String>>,
}

impl Catalog {
    pub fn new(assets: AssetMap, manifest: Option<Manifest>) -> Self {
        let mut edges: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for record in assets.records() {
            let targets = edges.entry(record.bundle_name.clone()).or_default();
            for dep in &record.direct_dependencies {
                if let Some(target) = assets.get_by_path(dep) {
                    if target.bundle_name != record.bundle_name {
                        targets.insert(target.bundle_name.clone());
                    }
                }
            }
        }

        let dependencies = edges
            .into_iter()
            .map(|(package, targets)| (package, targets.into_iter().collect()))
            .collect();

        Self {
            assets,
            manifest,
            dependencies,
        }
    }

    /// Load `assetmap.json` and, when present, `manifest.txt` from a channel
    /// directory. Manifest warnings are logged.
    pub fn from_dir(channel_dir: &Path) -> Result<Self> {
        let assets = AssetMap::load(&channel_dir.join(ASSET_MAP_FILE))?;
        let manifest_path = channel_dir.join(MANIFEST_FILE);
        let manifest = if manifest_path.is_file() {
            let parsed = Manifest::load(&manifest_path)?;
            for warning in &parsed.warnings {
                log::warn!("{}: {}", manifest_path.display(), warning);
            }
            Some(parsed.manifest)
        } else {
            log::debug!("No manifest at {}", manifest_path.display());
            None
        };
        Ok(Self::new(assets, manifest))
    }

    pub fn assets(&self) -> &AssetMap {
        &self.assets
    }

    pub fn manifest(&self) -> Option<&Manifest> {
        self.manifest.as_ref()
    }

    /// Resolve a logical name (case-insensitive) to its record
    pub fn resolve(&self, logical_name: &str) -> std::result::Result<&AssetRecord, LoadError> {
        self.assets
            .get(logical_name)
            .ok_or_else(|| LoadError::AssetNotFound {
                name: logical_name.to_string(),
            })
    }

    pub fn contains_package(&self, package: &str) -> bool {
        self.dependencies.contains_key(package)
            || self
                .manifest
                .as_ref()
                .is_some_and(|m| m.find(package).is_some())
    }

    /// Packages `package` references directly, sorted
    pub fn package_dependencies(&self, package: &str) -> &[String] {
        self.dependencies
            .get(package)
            .map_or(&[][..], Vec::as_slice)
    }

    /// True when a dependency cycle is reachable from `package`. Only the
    /// packages `package` can pull in are walked.
    pub fn has_circular_dependency(&self, package: &str) -> bool {
        let mut reachable = Graph::new();
        let mut pending = vec![package.to_lowercase()];
        while let Some(current) = pending.pop() {
            if reachable.contains_key(&current) {
                continue;
            }
            let deps = self.package_dependencies(&current).to_vec();
            pending.extend(deps.iter().cloned());
            reachable.insert(current, deps);
        }

        let cycles = find_cycles(&reachable);
        for cycle in &cycles {
            log::warn!("Package '{}' reaches cycle {}", package, cycle.join(" -> "));
        }
        !cycles.is_empty()
    }

    /// Records of the assets embedded in `package`, in map order
    pub fn package_assets<'a>(&'a self, package: &'a str) -> impl Iterator<Item = &'a AssetRecord> {
        self.assets
            .records()
            .iter()
            .filter(move |r| r.bundle_name == package)
    }

    pub fn packages(&self) -> impl Iterator<Item = &str> {
        self.dependencies.keys().map(String::as_str)
    }
}
