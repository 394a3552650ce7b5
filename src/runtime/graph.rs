//! Reference-counted table of loaded packages
//!
//! Every loaded package has one handle. Its `ref_count` is the number of
//! outstanding references of any kind; `pinned` is the share of those held by
//! loaded dependent packages and cached assets. Callers outside the loader
//! can only give back the remainder, so a dependency can never be unloaded
//! while a dependent still holds it.
//!
//! Releasing the last reference removes the handle first and only then
//! releases one reference on each direct dependency, so dependents are always
//! gone before their dependencies.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::archive::PackageArchive;
use crate::error::LoadError;

#[derive(Debug, Clone)]
pub struct LoadedPackage {
    pub package_id: String,
    pub ref_count: u32,
    pub pinned: u32,
    pub archive: Arc<PackageArchive>,
    dependencies: Vec<String>,
}

impl LoadedPackage {
    /// Packages this one holds a reference on
    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }
}

#[derive(Debug, Default)]
pub struct PackageLoadGraph {
    handles: HashMap<String, LoadedPackage>,
    /// Packages with a load in progress
    loading: HashSet<String>,
}

impl PackageLoadGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, package: &str) -> Option<&LoadedPackage> {
        self.handles.get(package)
    }

    pub fn is_loaded(&self, package: &str) -> bool {
        self.handles.contains_key(package)
    }

    pub fn ref_count(&self, package: &str) -> u32 {
        self.handles.get(package).map_or(0, |h| h.ref_count)
    }

    pub fn is_loading(&self, package: &str) -> bool {
        self.loading.contains(package)
    }

    /// Loaded package ids, sorted
    pub fn loaded(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.handles.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Packages to open, dependencies first, so that `root` can be loaded.
    /// Already loaded packages and their closures are skipped. Every planned
    /// package is marked as loading until [`Self::finish_loading`].
    ///
    /// # Errors
    ///
    /// `CircularDependency` when the dependency walk revisits a package on
    /// its current path, or reaches a package whose load is already running.
    pub fn load_plan<F>(&mut self, root: &str, dependencies_of: F) -> Result<Vec<String>, LoadError>
    where
        F: Fn(&str) -> Vec<String>,
    {
        if self.is_loaded(root) {
            return Ok(Vec::new());
        }
        if self.loading.contains(root) {
            return Err(LoadError::CircularDependency {
                chain: format!("{} is already loading", root),
            });
        }

        let mut plan = Vec::new();
        let mut done: HashSet<String> = HashSet::new();
        let mut on_path: HashSet<String> = HashSet::new();
        // (package, its dependencies, index of the next one to visit)
        let mut stack: Vec<(String, Vec<String>, usize)> =
            vec![(root.to_string(), dependencies_of(root), 0)];
        on_path.insert(root.to_string());

        while let Some(top) = stack.last_mut() {
            if top.2 >= top.1.len() {
                let (package, _, _) = stack.pop().unwrap_or_default();
                on_path.remove(&package);
                done.insert(package.clone());
                plan.push(package);
                continue;
            }

            let next = top.1[top.2].clone();
            top.2 += 1;

            if self.is_loaded(&next) || done.contains(&next) {
                continue;
            }
            if on_path.contains(&next) || self.loading.contains(&next) {
                let start = stack.iter().position(|(p, _, _)| *p == next);
                let mut chain: Vec<&str> = match start {
                    Some(i) => stack[i..].iter().map(|(p, _, _)| p.as_str()).collect(),
                    None => stack.iter().map(|(p, _, _)| p.as_str()).collect(),
                };
                chain.push(&next);
                return Err(LoadError::CircularDependency {
                    chain: chain.join(" -> "),
                });
            }

            on_path.insert(next.clone());
            let deps = dependencies_of(&next);
            stack.push((next, deps, 0));
        }

        self.loading.extend(plan.iter().cloned());
        Ok(plan)
    }

    pub fn finish_loading(&mut self, plan: &[String]) {
        for package in plan {
            self.loading.remove(package);
        }
    }

    /// Add a freshly opened package with no references of its own. It takes
    /// one pinned reference on each direct dependency, which must already be
    /// loaded.
    pub fn insert(&mut self, package: &str, archive: PackageArchive, dependencies: Vec<String>) {
        let mut held = Vec::with_capacity(dependencies.len());
        for dep in dependencies {
            match self.handles.get_mut(&dep) {
                Some(handle) => {
                    handle.ref_count += 1;
                    handle.pinned += 1;
                    held.push(dep);
                }
                None => log::error!(
                    "Package '{}' depends on '{}' which is not loaded",
                    package,
                    dep
                ),
            }
        }

        log::debug!("Loaded package '{}'", package);
        self.handles.insert(
            package.to_string(),
            LoadedPackage {
                package_id: package.to_string(),
                ref_count: 0,
                pinned: 0,
                archive: Arc::new(archive),
                dependencies: held,
            },
        );
    }

    /// Take an unpinned reference
    pub fn retain(&mut self, package: &str) -> bool {
        match self.handles.get_mut(package) {
            Some(handle) => {
                handle.ref_count += 1;
                true
            }
            None => false,
        }
    }

    /// Turn one unpinned reference into a pinned one
    pub fn pin(&mut self, package: &str) -> bool {
        match self.handles.get_mut(package) {
            Some(handle) if handle.ref_count > handle.pinned => {
                handle.pinned += 1;
                true
            }
            _ => false,
        }
    }

    /// Give back a pinned reference. Returns the packages that were unloaded.
    pub fn unpin(&mut self, package: &str) -> Vec<String> {
        self.release_all(vec![(package.to_string(), true)])
    }

    /// Give back an unpinned reference. Returns the packages that were
    /// unloaded, or `None` when every remaining reference is pinned.
    pub fn unload(&mut self, package: &str) -> Option<Vec<String>> {
        let handle = self.handles.get(package)?;
        if handle.ref_count <= handle.pinned {
            return None;
        }
        Some(self.release_all(vec![(package.to_string(), false)]))
    }

    /// Remove a package nobody references, releasing its dependencies.
    /// Used to roll back a partially completed load.
    pub fn discard(&mut self, package: &str) -> Vec<String> {
        match self.handles.get(package) {
            Some(handle) if handle.ref_count == 0 => {}
            _ => return Vec::new(),
        }
        let Some(handle) = self.handles.remove(package) else {
            return Vec::new();
        };
        log::debug!("Discarded package '{}'", package);

        let mut removed = vec![package.to_string()];
        let work = handle
            .dependencies
            .into_iter()
            .rev()
            .map(|dep| (dep, true))
            .collect();
        removed.extend(self.release_all(work));
        removed
    }

    /// Drop every handle regardless of counts
    pub fn clear(&mut self) -> Vec<String> {
        let ids = self.loaded();
        self.handles.clear();
        ids
    }

    fn release_all(&mut self, mut work: Vec<(String, bool)>) -> Vec<String> {
        let mut removed = Vec::new();

        while let Some((package, pinned_ref)) = work.pop() {
            let Some(handle) = self.handles.get_mut(&package) else {
                log::warn!("Release of package '{}' which is not loaded", package);
                continue;
            };
            handle.ref_count = handle.ref_count.saturating_sub(1);
            if pinned_ref {
                handle.pinned = handle.pinned.saturating_sub(1);
            }
            if handle.ref_count > 0 {
                continue;
            }

            if let Some(handle) = self.handles.remove(&package) {
                log::debug!("Unloaded package '{}'", package);
                work.extend(handle.dependencies.into_iter().rev().map(|dep| (dep, true)));
                removed.push(package);
            }
        }

        removed
    }
}
