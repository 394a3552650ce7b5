//! Runtime loader
//!
//! Resolves logical names through the [`Catalog`], loads the owning package
//! and its dependency closure through a [`PackageSource`], and caches decoded
//! assets keyed by `(package, asset)`.
//!
//! Reference accounting:
//! - each `load` of an asset adds one reference to its cache entry
//! - a cache entry holds one pinned reference on its package
//! - each loaded package holds one pinned reference on each direct dependency
//! - `load_package` adds one unpinned reference that `unload_package` gives back
//!
//! The public operations never panic and never return errors. Failures are
//! logged with the logical name and the package or asset it resolved to.

use std::any::Any;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::archive::ArchiveEntry;
use crate::config::RuntimeConfig;
use crate::error::{LoadError, Result};
use crate::manifest::AssetRecord;

use super::catalog::Catalog;
use super::graph::PackageLoadGraph;
use super::release::{Release, ReleaseQueue, ReleaseSender};
use super::scene::CancelToken;
use super::source::{PackageSource, source_for};

/// A type assets can be decoded into
pub trait Asset: Any + Send + Sync + Sized {
    fn decode(entry: &ArchiveEntry) -> std::result::Result<Self, String>;
}

impl Asset for Vec<u8> {
    fn decode(entry: &ArchiveEntry) -> std::result::Result<Self, String> {
        Ok(entry.data.clone())
    }
}

impl Asset for String {
    fn decode(entry: &ArchiveEntry) -> std::result::Result<Self, String> {
        String::from_utf8(entry.data.clone()).map_err(|e| e.to_string())
    }
}

impl Asset for serde_json::Value {
    fn decode(entry: &ArchiveEntry) -> std::result::Result<Self, String> {
        serde_json::from_slice(&entry.data).map_err(|e| e.to_string())
    }
}

type AssetKey = (String, String);

struct CachedAsset {
    ref_count: u32,
    decoded: Arc<dyn Any + Send + Sync>,
}

pub struct RuntimeLoader {
    catalog: Arc<Catalog>,
    source: Box<dyn PackageSource>,
    graph: PackageLoadGraph,
    cache: HashMap<AssetKey, CachedAsset>,
    releases: ReleaseQueue,
}

impl RuntimeLoader {
    pub fn new(catalog: Arc<Catalog>, source: Box<dyn PackageSource>) -> Self {
        Self {
            catalog,
            source,
            graph: PackageLoadGraph::new(),
            cache: HashMap::new(),
            releases: ReleaseQueue::new(),
        }
    }

    /// Open the build output in `channel_dir` with the source selected by
    /// `config`.
    pub fn open(project_root: &Path, channel_dir: &Path, config: &RuntimeConfig) -> Result<Self> {
        let catalog = Arc::new(Catalog::from_dir(channel_dir)?);
        let source = source_for(config, project_root, channel_dir, &catalog)?;
        log::info!(
            "Runtime catalog: {} assets in {} packages",
            catalog.assets().len(),
            catalog.packages().count()
        );
        Ok(Self::new(catalog, source))
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// Handle for queueing releases from other threads
    pub fn release_sender(&self) -> ReleaseSender {
        self.releases.sender()
    }

    /// Apply queued releases. Returns how many were applied.
    pub fn pump_releases(&mut self) -> usize {
        let pending = self.releases.drain();
        let count = pending.len();
        for release in pending {
            match release {
                Release::Asset(name) => {
                    self.unload_asset(&name);
                }
                Release::Package(package) => {
                    self.unload_package_ref(&package);
                }
            }
        }
        count
    }

    /// Load an asset, opening its package and dependencies if needed
    pub fn load<T: Asset>(&mut self, logical_name: &str) -> Option<Arc<T>> {
        self.pump_releases();
        match self.try_load::<T>(logical_name) {
            Ok(asset) => Some(asset),
            Err(e) => {
                log::error!("Failed to load '{}': {}", logical_name, e);
                None
            }
        }
    }

    /// Load an asset without blocking the runtime on package I/O.
    ///
    /// `on_progress` receives values in `0.0..=1.0`: dependency packages
    /// cover the first half, the asset's own package the second.
    pub async fn load_async<T: Asset>(
        &mut self,
        logical_name: &str,
        mut on_progress: impl FnMut(f32),
    ) -> Option<Arc<T>> {
        self.pump_releases();
        match self
            .load_async_with::<T>(logical_name, &mut on_progress, None)
            .await
        {
            Ok(asset) => Some(asset),
            Err(e) => {
                log::error!("Failed to load '{}': {}", logical_name, e);
                None
            }
        }
    }

    /// Give back one reference on an asset
    pub fn unload(&mut self, logical_name: &str) -> bool {
        self.pump_releases();
        self.unload_asset(logical_name)
    }

    /// Load entry `asset` straight from `package`, bypassing the asset map.
    /// Shares cache entries and references with [`RuntimeLoader::load`].
    pub fn load_from<T: Asset>(&mut self, package: &str, asset: &str) -> Option<Arc<T>> {
        self.pump_releases();
        let key = (package.to_lowercase(), asset.to_lowercase());
        match self.try_load_key::<T>(&key) {
            Ok(asset) => Some(asset),
            Err(e) => {
                log::error!("Failed to load '{}' from package '{}': {}", key.1, key.0, e);
                None
            }
        }
    }

    pub async fn load_from_async<T: Asset>(
        &mut self,
        package: &str,
        asset: &str,
        mut on_progress: impl FnMut(f32),
    ) -> Option<Arc<T>> {
        self.pump_releases();
        let key = (package.to_lowercase(), asset.to_lowercase());
        match self.load_key_async::<T>(&key, &mut on_progress, None).await {
            Ok(asset) => Some(asset),
            Err(e) => {
                log::error!("Failed to load '{}' from package '{}': {}", key.1, key.0, e);
                None
            }
        }
    }

    /// Give back a reference taken by `load_from`
    pub fn unload_from(&mut self, package: &str, asset: &str) -> bool {
        self.pump_releases();
        let key = (package.to_lowercase(), asset.to_lowercase());
        let label = format!("{}/{}", key.0, key.1);
        self.release_key(&key, &label)
    }

    /// Load a package and its dependencies, taking one reference on it
    pub fn load_package(&mut self, package: &str) -> bool {
        self.pump_releases();
        match self.acquire_package(package) {
            Ok(()) => true,
            Err(e) => {
                log::error!("Failed to load package '{}': {}", package, e);
                false
            }
        }
    }

    pub async fn load_package_async(
        &mut self,
        package: &str,
        mut on_progress: impl FnMut(f32),
    ) -> bool {
        self.pump_releases();
        match self
            .acquire_package_async(package, &mut on_progress, None)
            .await
        {
            Ok(()) => {
                on_progress(1.0);
                true
            }
            Err(e) => {
                log::error!("Failed to load package '{}': {}", package, e);
                false
            }
        }
    }

    /// Give back a reference taken by `load_package`. References held by
    /// dependent packages and cached assets cannot be given back here.
    pub fn unload_package(&mut self, package: &str) -> bool {
        self.pump_releases();
        self.unload_package_ref(package)
    }

    pub fn package_ref_count(&self, package: &str) -> u32 {
        self.graph.ref_count(package)
    }

    pub fn asset_ref_count(&self, logical_name: &str) -> u32 {
        self.catalog
            .resolve(logical_name)
            .ok()
            .and_then(|record| self.cache.get(&key_of(record)))
            .map_or(0, |cached| cached.ref_count)
    }

    pub fn is_package_loaded(&self, package: &str) -> bool {
        self.graph.is_loaded(package)
    }

    /// Loaded package ids, sorted
    pub fn loaded_packages(&self) -> Vec<String> {
        self.graph.loaded()
    }

    pub fn cached_asset_count(&self) -> usize {
        self.cache.len()
    }

    /// Drop every cached asset and loaded package regardless of counts
    pub fn unload_all(&mut self) {
        self.pump_releases();
        self.cache.clear();
        let dropped = self.graph.clear();
        if !dropped.is_empty() {
            log::info!("Unloaded all packages: {}", dropped.join(", "));
        }
    }

    fn try_load<T: Asset>(&mut self, logical_name: &str) -> std::result::Result<Arc<T>, LoadError> {
        let key = key_of(self.catalog.resolve(logical_name)?);
        self.try_load_key(&key)
    }

    fn try_load_key<T: Asset>(&mut self, key: &AssetKey) -> std::result::Result<Arc<T>, LoadError> {
        if let Some(hit) = self.cache_hit::<T>(key)? {
            return Ok(hit);
        }
        self.acquire_package(&key.0)?;
        self.decode_and_cache(key)
    }

    pub(crate) async fn load_async_with<T: Asset>(
        &mut self,
        logical_name: &str,
        on_progress: &mut dyn FnMut(f32),
        cancel: Option<&CancelToken>,
    ) -> std::result::Result<Arc<T>, LoadError> {
        let key = key_of(self.catalog.resolve(logical_name)?);
        self.load_key_async(&key, on_progress, cancel).await
    }

    async fn load_key_async<T: Asset>(
        &mut self,
        key: &AssetKey,
        on_progress: &mut dyn FnMut(f32),
        cancel: Option<&CancelToken>,
    ) -> std::result::Result<Arc<T>, LoadError> {
        if let Some(hit) = self.cache_hit::<T>(key)? {
            on_progress(1.0);
            return Ok(hit);
        }

        self.acquire_package_async(&key.0, on_progress, cancel)
            .await?;
        let asset = self.decode_and_cache(key)?;
        on_progress(1.0);
        Ok(asset)
    }

    fn cache_hit<T: Asset>(
        &mut self,
        key: &AssetKey,
    ) -> std::result::Result<Option<Arc<T>>, LoadError> {
        let Some(cached) = self.cache.get_mut(key) else {
            return Ok(None);
        };
        let typed = Arc::clone(&cached.decoded)
            .downcast::<T>()
            .map_err(|_| LoadError::TypeMismatch {
                package: key.0.clone(),
                asset: key.1.clone(),
            })?;
        cached.ref_count += 1;
        Ok(Some(typed))
    }

    /// Decode from the loaded package. Consumes the unpinned reference the
    /// caller took: it is pinned by the new cache entry, or released on
    /// failure.
    fn decode_and_cache<T: Asset>(
        &mut self,
        key: &AssetKey,
    ) -> std::result::Result<Arc<T>, LoadError> {
        let (package, asset_name) = (key.0.as_str(), key.1.as_str());
        let decoded = match self.graph.get(package) {
            Some(handle) => match handle.archive.entry(asset_name) {
                Some(entry) => T::decode(entry).map_err(|reason| LoadError::Decode {
                    package: package.to_string(),
                    asset: asset_name.to_string(),
                    reason,
                }),
                None => Err(LoadError::AssetMissing {
                    package: package.to_string(),
                    asset: asset_name.to_string(),
                }),
            },
            None => Err(LoadError::PackageNotFound {
                package: package.to_string(),
            }),
        };

        match decoded {
            Ok(asset) => {
                let asset = Arc::new(asset);
                self.graph.pin(package);
                self.cache.insert(
                    key.clone(),
                    CachedAsset {
                        ref_count: 1,
                        decoded: Arc::clone(&asset) as Arc<dyn Any + Send + Sync>,
                    },
                );
                log::debug!("Cached '{}' from package '{}'", asset_name, package);
                Ok(asset)
            }
            Err(e) => {
                self.unload_package_ref(package);
                Err(e)
            }
        }
    }

    fn dependencies_of(catalog: &Catalog) -> impl Fn(&str) -> Vec<String> + '_ {
        move |package| catalog.package_dependencies(package).to_vec()
    }

    /// Take one unpinned reference on `package`, loading it and its
    /// dependency closure first when needed.
    fn acquire_package(&mut self, package: &str) -> std::result::Result<(), LoadError> {
        if self.graph.retain(package) {
            return Ok(());
        }
        if !self.catalog.contains_package(package) {
            return Err(LoadError::PackageNotFound {
                package: package.to_string(),
            });
        }

        let plan = self
            .graph
            .load_plan(package, Self::dependencies_of(&self.catalog))?;
        let mut opened = Vec::with_capacity(plan.len());
        for id in &plan {
            match self.source.open(id) {
                Ok(archive) => {
                    let deps = self.catalog.package_dependencies(id).to_vec();
                    self.graph.insert(id, archive, deps);
                    opened.push(id.clone());
                }
                Err(e) => {
                    self.roll_back(&opened);
                    self.graph.finish_loading(&plan);
                    return Err(e);
                }
            }
        }
        self.graph.finish_loading(&plan);
        self.graph.retain(package);
        Ok(())
    }

    async fn acquire_package_async(
        &mut self,
        package: &str,
        on_progress: &mut dyn FnMut(f32),
        cancel: Option<&CancelToken>,
    ) -> std::result::Result<(), LoadError> {
        if self.graph.retain(package) {
            return Ok(());
        }
        if !self.catalog.contains_package(package) {
            return Err(LoadError::PackageNotFound {
                package: package.to_string(),
            });
        }

        let plan = self
            .graph
            .load_plan(package, Self::dependencies_of(&self.catalog))?;
        let dependency_count = plan.len().saturating_sub(1);
        let mut opened = Vec::with_capacity(plan.len());

        for (i, id) in plan.iter().enumerate() {
            let result = self.source.open_async(id).await;
            tokio::task::yield_now().await;

            let failure = match result {
                Ok(archive) => {
                    let deps = self.catalog.package_dependencies(id).to_vec();
                    self.graph.insert(id, archive, deps);
                    opened.push(id.clone());
                    cancel
                        .filter(|token| token.is_cancelled())
                        .map(|_| LoadError::Cancelled {
                            name: package.to_string(),
                        })
                }
                Err(e) => Some(e),
            };
            if let Some(e) = failure {
                self.roll_back(&opened);
                self.graph.finish_loading(&plan);
                return Err(e);
            }

            if i < dependency_count {
                on_progress(0.5 * (i + 1) as f32 / dependency_count as f32);
            } else {
                on_progress(0.5);
            }
        }

        self.graph.finish_loading(&plan);
        self.graph.retain(package);
        Ok(())
    }

    fn roll_back(&mut self, opened: &[String]) {
        for id in opened.iter().rev() {
            let removed = self.graph.discard(id);
            self.evict(&removed);
        }
    }

    fn evict(&mut self, packages: &[String]) {
        if packages.is_empty() {
            return;
        }
        let before = self.cache.len();
        self.cache.retain(|(package, _), _| !packages.contains(package));
        let evicted = before - self.cache.len();
        if evicted > 0 {
            log::debug!("Evicted {} cached assets", evicted);
        }
    }

    fn unload_asset(&mut self, logical_name: &str) -> bool {
        let record = match self.catalog.resolve(logical_name) {
            Ok(record) => record.clone(),
            Err(e) => {
                log::error!("Cannot unload '{}': {}", logical_name, e);
                return false;
            }
        };
        self.release_key(&key_of(&record), logical_name)
    }

    fn release_key(&mut self, key: &AssetKey, label: &str) -> bool {
        let Some(cached) = self.cache.get_mut(key) else {
            log::warn!(
                "Unload of '{}' ({}/{}) which is not loaded",
                label,
                key.0,
                key.1
            );
            return false;
        };

        cached.ref_count -= 1;
        if cached.ref_count == 0 {
            self.cache.remove(key);
            let removed = self.graph.unpin(&key.0);
            self.evict(&removed);
        }
        true
    }

    fn unload_package_ref(&mut self, package: &str) -> bool {
        if !self.graph.is_loaded(package) {
            log::warn!("Unload of package '{}' which is not loaded", package);
            return false;
        }
        match self.graph.unload(package) {
            Some(removed) => {
                self.evict(&removed);
                true
            }
            None => {
                log::warn!(
                    "Package '{}' is still referenced by dependent packages or cached assets",
                    package
                );
                false
            }
        }
    }
}

fn key_of(record: &AssetRecord) -> AssetKey {
    (record.bundle_name.clone(), record.asset_name_value.clone())
}
