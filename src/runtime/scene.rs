//! Scene loading on top of the [`RuntimeLoader`]
//!
//! A scene is an asset whose package is its own scene package. Each loaded
//! scene keeps one [`SceneHandle`]; the handle holds a single reference on the
//! scene asset for as long as the scene stays loaded, however many times it
//! was requested.
//!
//! All operations take `&self`, so several `load_scene` futures can be in
//! flight at once. Requests are registered as loading immediately and take
//! turns on the loader; `status` and `progress` report every pending load.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::LoadError;

use super::catalog::Catalog;
use super::loader::RuntimeLoader;
use super::release::ReleaseSender;

/// Cooperative cancellation flag, checked at every suspension point
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SceneMode {
    /// Unload every other scene once this one has loaded
    Exclusive,
    #[default]
    Additive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneState {
    /// Requested, not yet loaded
    Loading,
    /// Fully loaded, waiting for `activate`
    Loaded,
    Active,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SceneLoadOptions {
    pub mode: SceneMode,
    pub activate_on_load: bool,
}

impl Default for SceneLoadOptions {
    fn default() -> Self {
        Self {
            mode: SceneMode::Additive,
            activate_on_load: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SceneLoadResult {
    Loaded,
    /// The scene was already loaded; its reference count went up
    AlreadyLoaded,
    Cancelled,
    Failed(LoadError),
}

impl SceneLoadResult {
    pub fn is_loaded(&self) -> bool {
        matches!(self, SceneLoadResult::Loaded | SceneLoadResult::AlreadyLoaded)
    }
}

#[derive(Debug, Clone)]
pub struct SceneHandle {
    pub ref_count: u32,
    pub owning_package: String,
    pub mode: SceneMode,
    pub state: SceneState,
    pub data: Arc<Vec<u8>>,
}

type ProgressCallback = Box<dyn FnMut(f32) + Send>;

struct InFlight {
    progress: f32,
    requests: u32,
}

#[derive(Default)]
struct SceneTable {
    scenes: BTreeMap<String, SceneHandle>,
    loading: HashMap<String, InFlight>,
    subscribers: HashMap<String, Vec<ProgressCallback>>,
}

/// Keeps a request registered as loading until its future ends, including
/// when the future is dropped mid-load.
struct LoadingGuard<'a> {
    table: &'a Mutex<SceneTable>,
    key: String,
}

impl<'a> LoadingGuard<'a> {
    fn register(table: &'a Mutex<SceneTable>, key: &str) -> Self {
        lock(table)
            .loading
            .entry(key.to_string())
            .or_insert(InFlight {
                progress: 0.0,
                requests: 0,
            })
            .requests += 1;
        Self {
            table,
            key: key.to_string(),
        }
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        let mut table = lock(self.table);
        if let Some(in_flight) = table.loading.get_mut(&self.key) {
            in_flight.requests -= 1;
            if in_flight.requests == 0 {
                table.loading.remove(&self.key);
            }
        }
    }
}

fn lock(table: &Mutex<SceneTable>) -> MutexGuard<'_, SceneTable> {
    table.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct SceneLoader {
    loader: tokio::sync::Mutex<RuntimeLoader>,
    catalog: Arc<Catalog>,
    releases: ReleaseSender,
    table: Mutex<SceneTable>,
}

impl SceneLoader {
    pub fn new(loader: RuntimeLoader) -> Self {
        Self {
            catalog: Arc::clone(loader.catalog()),
            releases: loader.release_sender(),
            loader: tokio::sync::Mutex::new(loader),
            table: Mutex::new(SceneTable::default()),
        }
    }

    /// Exclusive access to the underlying loader, with queued scene
    /// releases already applied. Scene loads wait while it is held.
    pub async fn loader(&self) -> tokio::sync::MutexGuard<'_, RuntimeLoader> {
        let mut loader = self.loader.lock().await;
        loader.pump_releases();
        loader
    }

    /// True when the asset map knows a scene by this name
    pub fn scene_exists(&self, name: &str) -> bool {
        self.catalog.resolve(name).is_ok()
    }

    /// Receive progress for the next load of `name`. Subscriptions end when
    /// that load finishes, whatever its outcome.
    pub fn subscribe(&self, name: &str, callback: impl FnMut(f32) + Send + 'static) {
        self.table()
            .subscribers
            .entry(name.to_lowercase())
            .or_default()
            .push(Box::new(callback));
    }

    /// Load a scene.
    ///
    /// `cancel` is checked before any work, after every package the load
    /// opens, and once more before the scene is recorded. A cancelled or
    /// failed load gives back everything it took and leaves other scenes
    /// untouched, in exclusive mode too.
    pub async fn load_scene(
        &self,
        name: &str,
        options: SceneLoadOptions,
        cancel: &CancelToken,
        mut on_progress: impl FnMut(f32),
    ) -> SceneLoadResult {
        let key = name.to_lowercase();
        if cancel.is_cancelled() {
            self.table().subscribers.remove(&key);
            log::info!("Load of scene '{}' cancelled before it started", key);
            return SceneLoadResult::Cancelled;
        }

        let _registered = LoadingGuard::register(&self.table, &key);
        let result = self.run_load(&key, options, cancel, &mut on_progress).await;
        self.table().subscribers.remove(&key);
        result
    }

    async fn run_load(
        &self,
        key: &str,
        options: SceneLoadOptions,
        cancel: &CancelToken,
        on_progress: &mut dyn FnMut(f32),
    ) -> SceneLoadResult {
        let mut loader = self.loader().await;
        if cancel.is_cancelled() {
            log::info!("Load of scene '{}' cancelled while queued", key);
            return SceneLoadResult::Cancelled;
        }

        let already_loaded = match self.table().scenes.get_mut(key) {
            Some(handle) => {
                handle.ref_count += 1;
                handle.mode = options.mode;
                if options.activate_on_load {
                    handle.state = SceneState::Active;
                }
                true
            }
            None => false,
        };
        if already_loaded {
            if options.mode == SceneMode::Exclusive {
                self.drop_others(&mut loader, key);
            }
            self.report(key, on_progress, 1.0);
            return SceneLoadResult::AlreadyLoaded;
        }

        let result = {
            let mut report = |progress: f32| self.report(key, &mut *on_progress, progress);
            loader
                .load_async_with::<Vec<u8>>(key, &mut report, Some(cancel))
                .await
        };

        let data = match result {
            Ok(data) => data,
            Err(LoadError::Cancelled { .. }) => {
                log::info!("Load of scene '{}' cancelled", key);
                return SceneLoadResult::Cancelled;
            }
            Err(e) => {
                log::error!("Failed to load scene '{}': {}", key, e);
                return SceneLoadResult::Failed(e);
            }
        };

        if cancel.is_cancelled() {
            loader.unload(key);
            log::info!("Load of scene '{}' cancelled", key);
            return SceneLoadResult::Cancelled;
        }

        if options.mode == SceneMode::Exclusive {
            self.drop_others(&mut loader, key);
        }

        let owning_package = self
            .catalog
            .resolve(key)
            .map(|record| record.bundle_name.clone())
            .unwrap_or_default();
        let state = if options.activate_on_load {
            SceneState::Active
        } else {
            SceneState::Loaded
        };
        log::info!("Scene '{}' loaded from package '{}'", key, owning_package);
        self.table().scenes.insert(
            key.to_string(),
            SceneHandle {
                ref_count: 1,
                owning_package,
                mode: options.mode,
                state,
                data,
            },
        );
        SceneLoadResult::Loaded
    }

    /// Flip a loaded scene to active
    pub fn activate(&self, name: &str) -> bool {
        match self.table().scenes.get_mut(&name.to_lowercase()) {
            Some(handle) => {
                handle.state = SceneState::Active;
                true
            }
            None => {
                log::warn!("Cannot activate scene '{}': not loaded", name);
                false
            }
        }
    }

    /// Give back one reference; the scene and its asset reference go at zero
    pub fn unload_scene(&self, name: &str) -> bool {
        let key = name.to_lowercase();
        let dropped = {
            let mut table = self.table();
            let Some(handle) = table.scenes.get_mut(&key) else {
                log::warn!("Unload of scene '{}' which is not loaded", name);
                return false;
            };
            handle.ref_count -= 1;
            handle.ref_count == 0 && table.scenes.remove(&key).is_some()
        };
        if dropped {
            log::debug!("Unloading scene '{}'", key);
            self.releases.release_asset(key);
        }
        true
    }

    pub fn unload_all(&self) {
        let names: Vec<String> = std::mem::take(&mut self.table().scenes)
            .into_keys()
            .collect();
        for name in names {
            log::debug!("Unloading scene '{}'", name);
            self.releases.release_asset(name);
        }
    }

    /// `Loading` while a request is pending and the scene is not yet loaded
    pub fn status(&self, name: &str) -> Option<SceneState> {
        let key = name.to_lowercase();
        let table = self.table();
        match table.scenes.get(&key) {
            Some(handle) => Some(handle.state),
            None => table.loading.get(&key).map(|_| SceneState::Loading),
        }
    }

    /// Load progress in `0.0..=1.0`; `1.0` once loaded, `None` when the
    /// scene is neither loaded nor requested
    pub fn progress(&self, name: &str) -> Option<f32> {
        let key = name.to_lowercase();
        let table = self.table();
        if table.scenes.contains_key(&key) {
            return Some(1.0);
        }
        table.loading.get(&key).map(|in_flight| in_flight.progress)
    }

    pub fn ref_count(&self, name: &str) -> u32 {
        self.table()
            .scenes
            .get(&name.to_lowercase())
            .map_or(0, |h| h.ref_count)
    }

    pub fn handle(&self, name: &str) -> Option<SceneHandle> {
        self.table().scenes.get(&name.to_lowercase()).cloned()
    }

    /// Loaded scene names, sorted
    pub fn loaded_scenes(&self) -> Vec<String> {
        self.table().scenes.keys().cloned().collect()
    }

    fn table(&self) -> MutexGuard<'_, SceneTable> {
        lock(&self.table)
    }

    fn report(&self, key: &str, on_progress: &mut dyn FnMut(f32), progress: f32) {
        on_progress(progress);
        let mut callbacks = {
            let mut table = self.table();
            if let Some(in_flight) = table.loading.get_mut(key) {
                in_flight.progress = progress;
            }
            table.subscribers.remove(key).unwrap_or_default()
        };
        for callback in callbacks.iter_mut() {
            callback(progress);
        }
        if !callbacks.is_empty() {
            let mut table = self.table();
            let added = table.subscribers.remove(key).unwrap_or_default();
            callbacks.extend(added);
            table.subscribers.insert(key.to_string(), callbacks);
        }
    }

    fn drop_others(&self, loader: &mut RuntimeLoader, key: &str) {
        let others: Vec<String> = {
            let mut table = self.table();
            let names: Vec<String> = table.scenes.keys().filter(|k| *k != key).cloned().collect();
            for name in &names {
                table.scenes.remove(name);
            }
            names
        };
        for other in others {
            log::debug!("Unloading scene '{}' for exclusive '{}'", other, key);
            loader.unload(&other);
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use crate::test_fixtures::{MemorySource, asset, catalog, package};

    fn scenes() -> SceneLoader {
        let catalog = catalog(&[
            asset("shared", "content/common/shared.txt", "common", &[]),
            asset(
                "level1",
                "content/levels/level1.scene",
                "level1-scene",
                &["content/common/shared.txt"],
            ),
            asset(
                "level2",
                "content/levels/level2.scene",
                "level2-scene",
                &["content/common/shared.txt"],
            ),
            asset("level3", "content/levels/level3.scene", "level3-scene", &[]),
        ]);
        let source = MemorySource::new(vec![
            package("common", &[], &[("shared", b"shared")]),
            package("level1-scene", &["common"], &[("level1", b"one")]),
            package("level2-scene", &["common"], &[("level2", b"two")]),
            package("level3-scene", &[], &[("level3", b"three")]),
        ]);
        SceneLoader::new(RuntimeLoader::new(Arc::new(catalog), Box::new(source)))
    }

    fn exclusive() -> SceneLoadOptions {
        SceneLoadOptions {
            mode: SceneMode::Exclusive,
            activate_on_load: true,
        }
    }

    #[tokio::test]
    async fn test_additive_scenes_coexist() {
        let scenes = scenes();
        let token = CancelToken::new();
        let options = SceneLoadOptions::default();

        assert_eq!(
            scenes.load_scene("level1", options, &token, |_| {}).await,
            SceneLoadResult::Loaded
        );
        assert_eq!(
            scenes.load_scene("Level3", options, &token, |_| {}).await,
            SceneLoadResult::Loaded
        );
        assert_eq!(scenes.loaded_scenes(), ["level1", "level3"]);
        assert_eq!(scenes.status("level1"), Some(SceneState::Active));
        assert_eq!(scenes.progress("level1"), Some(1.0));
        let handle = scenes.handle("level1").expect("level1");
        assert_eq!(handle.owning_package, "level1-scene");
        assert_eq!(handle.data.as_slice(), b"one");
    }

    #[tokio::test]
    async fn test_exclusive_unloads_others() {
        let scenes = scenes();
        let token = CancelToken::new();
        scenes
            .load_scene("level1", SceneLoadOptions::default(), &token, |_| {})
            .await;
        let result = scenes.load_scene("level3", exclusive(), &token, |_| {}).await;

        assert_eq!(result, SceneLoadResult::Loaded);
        assert_eq!(scenes.loaded_scenes(), ["level3"]);
        assert_eq!(scenes.loader().await.loaded_packages(), ["level3-scene"]);
    }

    #[tokio::test]
    async fn test_exclusive_keeps_shared_packages_open() {
        let scenes = scenes();
        let token = CancelToken::new();
        scenes
            .load_scene("level1", SceneLoadOptions::default(), &token, |_| {})
            .await;
        scenes.load_scene("level2", exclusive(), &token, |_| {}).await;

        assert_eq!(scenes.loaded_scenes(), ["level2"]);
        assert_eq!(
            scenes.loader().await.loaded_packages(),
            ["common", "level2-scene"]
        );
    }

    #[tokio::test]
    async fn test_failed_exclusive_load_keeps_other_scenes() {
        let scenes = scenes();
        let token = CancelToken::new();
        scenes
            .load_scene("level1", SceneLoadOptions::default(), &token, |_| {})
            .await;

        let result = scenes.load_scene("nosuchscene", exclusive(), &token, |_| {}).await;
        assert!(matches!(
            result,
            SceneLoadResult::Failed(LoadError::AssetNotFound { .. })
        ));
        assert_eq!(scenes.loaded_scenes(), ["level1"]);
        assert_eq!(
            scenes.loader().await.loaded_packages(),
            ["common", "level1-scene"]
        );
    }

    #[tokio::test]
    async fn test_cancelled_exclusive_load_keeps_other_scenes() {
        let scenes = scenes();
        scenes
            .load_scene("level1", SceneLoadOptions::default(), &CancelToken::new(), |_| {})
            .await;

        let token = CancelToken::new();
        let trigger = token.clone();
        let result = scenes
            .load_scene("level3", exclusive(), &token, move |_| trigger.cancel())
            .await;
        assert_eq!(result, SceneLoadResult::Cancelled);
        assert_eq!(scenes.loaded_scenes(), ["level1"]);
        assert_eq!(
            scenes.loader().await.loaded_packages(),
            ["common", "level1-scene"]
        );
    }

    #[tokio::test]
    async fn test_overlapping_loads_report_loading_state() {
        let scenes = scenes();
        let token = CancelToken::new();
        let observed = Mutex::new(Vec::new());

        let (first, second) = tokio::join!(
            scenes.load_scene("level1", SceneLoadOptions::default(), &token, |_| {
                observed
                    .lock()
                    .expect("lock")
                    .push((scenes.status("level2"), scenes.progress("level2")));
            }),
            scenes.load_scene("level2", SceneLoadOptions::default(), &token, |_| {}),
        );

        assert_eq!(first, SceneLoadResult::Loaded);
        assert_eq!(second, SceneLoadResult::Loaded);
        let observed = observed.into_inner().expect("lock");
        assert!(observed.contains(&(Some(SceneState::Loading), Some(0.0))));
        assert_eq!(scenes.loaded_scenes(), ["level1", "level2"]);
        assert_eq!(scenes.status("level2"), Some(SceneState::Active));
        assert_eq!(scenes.status("level3"), None);
        assert_eq!(scenes.progress("level3"), None);
    }

    #[tokio::test]
    async fn test_overlapping_loads_of_one_scene_share_it() {
        let scenes = scenes();
        let token = CancelToken::new();
        let options = SceneLoadOptions::default();

        let (first, second) = tokio::join!(
            scenes.load_scene("level1", options, &token, |_| {}),
            scenes.load_scene("level1", options, &token, |_| {}),
        );
        assert_eq!(first, SceneLoadResult::Loaded);
        assert_eq!(second, SceneLoadResult::AlreadyLoaded);
        assert_eq!(scenes.ref_count("level1"), 2);
        assert_eq!(scenes.loader().await.asset_ref_count("level1"), 1);
    }

    #[tokio::test]
    async fn test_deferred_activation() {
        let scenes = scenes();
        let options = SceneLoadOptions {
            mode: SceneMode::Additive,
            activate_on_load: false,
        };
        scenes
            .load_scene("level3", options, &CancelToken::new(), |_| {})
            .await;
        assert_eq!(scenes.status("level3"), Some(SceneState::Loaded));
        assert!(scenes.activate("level3"));
        assert_eq!(scenes.status("level3"), Some(SceneState::Active));
        assert!(!scenes.activate("missing"));
    }

    #[tokio::test]
    async fn test_refcount_and_unload() {
        let scenes = scenes();
        let token = CancelToken::new();
        let options = SceneLoadOptions::default();
        scenes.load_scene("level1", options, &token, |_| {}).await;
        assert_eq!(
            scenes.load_scene("level1", options, &token, |_| {}).await,
            SceneLoadResult::AlreadyLoaded
        );
        assert_eq!(scenes.ref_count("level1"), 2);

        assert!(scenes.unload_scene("level1"));
        assert_eq!(
            scenes.loader().await.loaded_packages(),
            ["common", "level1-scene"]
        );
        assert!(scenes.unload_scene("level1"));
        assert!(scenes.loaded_scenes().is_empty());
        assert!(scenes.loader().await.loaded_packages().is_empty());
        assert!(!scenes.unload_scene("level1"));
    }

    #[tokio::test]
    async fn test_cancelled_load_leaves_no_references() {
        let scenes = scenes();
        let token = CancelToken::new();
        token.cancel();
        let result = scenes
            .load_scene("level1", SceneLoadOptions::default(), &token, |_| {})
            .await;
        assert_eq!(result, SceneLoadResult::Cancelled);
        assert!(scenes.loaded_scenes().is_empty());
        assert_eq!(scenes.status("level1"), None);
        assert!(scenes.loader().await.loaded_packages().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_during_load_rolls_back() {
        let scenes = scenes();
        let token = CancelToken::new();
        let trigger = token.clone();
        let result = scenes
            .load_scene("level1", SceneLoadOptions::default(), &token, move |_| {
                trigger.cancel();
            })
            .await;
        assert_eq!(result, SceneLoadResult::Cancelled);
        assert!(scenes.loaded_scenes().is_empty());
        let loader = scenes.loader().await;
        assert!(loader.loaded_packages().is_empty());
        assert_eq!(loader.cached_asset_count(), 0);
    }

    #[tokio::test]
    async fn test_subscribers_receive_progress() {
        let scenes = scenes();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        scenes.subscribe("level1", move |p| sink.lock().expect("lock").push(p));

        scenes
            .load_scene("level1", SceneLoadOptions::default(), &CancelToken::new(), |_| {})
            .await;
        let seen = seen.lock().expect("lock");
        assert_eq!(seen.last().copied(), Some(1.0));
        assert!(seen.len() >= 2);
    }

    #[tokio::test]
    async fn test_unknown_scene_fails() {
        let scenes = scenes();
        assert!(!scenes.scene_exists("nowhere"));
        assert!(scenes.scene_exists("Level2"));
        let result = scenes
            .load_scene("nowhere", SceneLoadOptions::default(), &CancelToken::new(), |_| {})
            .await;
        assert!(matches!(
            result,
            SceneLoadResult::Failed(LoadError::AssetNotFound { .. })
        ));
        assert_eq!(scenes.status("nowhere"), None);
    }

    #[tokio::test]
    async fn test_unload_all() {
        let scenes = scenes();
        let token = CancelToken::new();
        let options = SceneLoadOptions::default();
        scenes.load_scene("level1", options, &token, |_| {}).await;
        scenes.load_scene("level3", options, &token, |_| {}).await;
        scenes.unload_all();
        assert!(scenes.loaded_scenes().is_empty());
        assert!(scenes.loader().await.loaded_packages().is_empty());
    }
}
