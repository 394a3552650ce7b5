//! Dependency collection
//!
//! Asset formats are opaque to the pipeline: a [`DependencyInspector`] reports
//! which files an asset references directly. The collector turns those reports
//! into direct and transitive dependency lists on every [`ResourceNode`],
//! creating synthetic nodes for referenced files no package claims.
//! References to ignored files are dropped. Files a sprite atlas references
//! are folded into the atlas: their nodes go away and references to them
//! point at the atlas.
//!
//! The default inspector reads sidecar files: `ui/button.prefab` declares its
//! references in `ui/button.prefab.deps`, one project-relative path per line.
//!
//! ```text
//! # button.prefab.deps
//! content/ui/atlas.png
//! content/shared/click.wav
//! ```

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};

use crate::config::ProjectConfig;
use crate::domain::{ResourceNode, UNASSIGNED_PACKAGE};
use crate::error::{Result, fs::read_failed, graph::missing_dependencies};
use crate::naming::{self, PathPolicy};
use crate::pipeline::filter::PathFilter;

/// Extension of dependency sidecar files
pub const SIDECAR_EXTENSION: &str = "deps";

/// Reports the files an asset references directly
pub trait DependencyInspector {
    /// Paths referenced by `node`, absolute or relative to the project root
    fn direct_dependencies(&self, node: &ResourceNode) -> Result<Vec<PathBuf>>;
}

/// Reads `<asset>.deps` sidecar files
#[derive(Debug, Default, Clone, Copy)]
pub struct SidecarInspector;

impl SidecarInspector {
    pub fn sidecar_path(source_file: &Path) -> PathBuf {
        let mut name = source_file.as_os_str().to_owned();
        name.push(".");
        name.push(SIDECAR_EXTENSION);
        PathBuf::from(name)
    }
}

impl DependencyInspector for SidecarInspector {
    fn direct_dependencies(&self, node: &ResourceNode) -> Result<Vec<PathBuf>> {
        let sidecar = Self::sidecar_path(&node.source_file);
        if !sidecar.is_file() {
            return Ok(Vec::new());
        }
        let text = std::fs::read_to_string(&sidecar).map_err(|e| read_failed(&sidecar, e))?;
        Ok(text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(PathBuf::from)
            .collect())
    }
}

/// Outcome of a successful collection
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DependencyReport {
    /// Non-fatal findings, already logged
    pub warnings: Vec<String>,
    /// Number of synthetic nodes created
    pub synthetic: usize,
    /// Number of nodes folded into sprite atlases
    pub atlas_members: usize,
}

/// Computes dependency lists for a set of resource nodes
pub struct DependencyCollector<'a> {
    policy: &'a PathPolicy,
    config: &'a ProjectConfig,
    inspector: &'a dyn DependencyInspector,
}

impl<'a> DependencyCollector<'a> {
    pub fn new(
        policy: &'a PathPolicy,
        config: &'a ProjectConfig,
        inspector: &'a dyn DependencyInspector,
    ) -> Self {
        Self {
            policy,
            config,
            inspector,
        }
    }

    /// Fill `direct_dependencies` and `all_dependencies` on every node,
    /// appending synthetic nodes for unclaimed dependencies.
    ///
    /// # Errors
    ///
    /// Returns `MissingDependency` listing every reference to a file that
    /// does not exist. Inspector failures are propagated.
    pub fn collect(&self, nodes: &mut Vec<ResourceNode>) -> Result<DependencyReport> {
        let ignore = PathFilter::new(&self.config.ignore)?;
        let mut report = DependencyReport::default();
        let mut missing: Vec<(String, String)> = Vec::new();
        let mut index: HashMap<String, usize> = nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.path.clone(), i))
            .collect();
        let mut queue: VecDeque<usize> = (0..nodes.len()).collect();

        while let Some(current) = queue.pop_front() {
            let raw = self.inspector.direct_dependencies(&nodes[current])?;
            let mut direct: Vec<String> = Vec::with_capacity(raw.len());

            for dep in raw {
                let referrer = nodes[current].path.clone();
                let canonical = match self.policy.to_canonical_path(&dep) {
                    Ok(canonical) => canonical,
                    Err(e) => {
                        let message = format!("{} references {}", referrer, e);
                        log::warn!("{}", message);
                        report.warnings.push(message);
                        continue;
                    }
                };
                if canonical == referrer || direct.contains(&canonical) {
                    continue;
                }
                if ignore.matches(&self.policy.relative_to_content(&canonical)) {
                    log::debug!("{} references ignored {}", referrer, canonical);
                    continue;
                }

                if !index.contains_key(&canonical) {
                    let source_file = if dep.is_absolute() {
                        dep.clone()
                    } else {
                        self.policy.project_root().join(&dep)
                    };
                    if !source_file.is_file() {
                        missing.push((referrer, canonical));
                        continue;
                    }
                    if !self.policy.is_under_package_root(&canonical) {
                        let message = format!(
                            "{} depends on {} outside the content root '{}'",
                            referrer,
                            canonical,
                            self.policy.content_root()
                        );
                        log::warn!("{}", message);
                        report.warnings.push(message);
                    }

                    let node = self.synthetic_node(&canonical, source_file);
                    log::debug!(
                        "Synthetic node {} in package '{}'",
                        node.path,
                        node.package_id
                    );
                    index.insert(canonical.clone(), nodes.len());
                    queue.push_back(nodes.len());
                    nodes.push(node);
                    report.synthetic += 1;
                }

                direct.push(canonical);
            }

            nodes[current].direct_dependencies = direct;
        }

        if !missing.is_empty() {
            for (referrer, target) in &missing {
                log::error!("Missing dependency: {} -> {}", referrer, target);
            }
            return Err(missing_dependencies(&missing));
        }

        report.atlas_members = self.fold_atlas_members(nodes);
        if report.atlas_members > 0 {
            index = nodes
                .iter()
                .enumerate()
                .map(|(i, n)| (n.path.clone(), i))
                .collect();
        }

        let closures: Vec<Vec<String>> = (0..nodes.len())
            .map(|i| transitive_closure(nodes, &index, i))
            .collect();
        for (node, all) in nodes.iter_mut().zip(closures) {
            node.all_dependencies = all;
        }

        Ok(report)
    }

    /// Drop every node an atlas references directly and point references to
    /// it at the atlas. Returns how many nodes were dropped.
    fn fold_atlas_members(&self, nodes: &mut Vec<ResourceNode>) -> usize {
        let extension = self.config.atlas_extension.as_str();
        let is_atlas = |path: &str| naming::has_extension(path, extension);

        let mut owner: HashMap<String, String> = HashMap::new();
        for atlas in nodes.iter().filter(|n| is_atlas(&n.path)) {
            for member in atlas.direct_dependencies.iter().filter(|d| !is_atlas(d)) {
                owner
                    .entry(member.clone())
                    .or_insert_with(|| atlas.path.clone());
            }
        }
        if owner.is_empty() {
            return 0;
        }

        for node in nodes.iter_mut() {
            let mut direct = Vec::with_capacity(node.direct_dependencies.len());
            for dep in std::mem::take(&mut node.direct_dependencies) {
                let target = owner.get(&dep).cloned().unwrap_or(dep);
                if target != node.path && !direct.contains(&target) {
                    direct.push(target);
                }
            }
            node.direct_dependencies = direct;
        }

        let before = nodes.len();
        nodes.retain(|n| match owner.get(&n.path) {
            Some(atlas) => {
                log::debug!("{} is packed into atlas {}", n.path, atlas);
                false
            }
            None => true,
        });
        before - nodes.len()
    }

    fn synthetic_node(&self, canonical: &str, source_file: PathBuf) -> ResourceNode {
        let logical = naming::logical_name(canonical);
        let package = if naming::is_scene(canonical, &self.config.scene_extension) {
            naming::scene_package_for(&logical, &self.config.scene_package_suffix)
        } else {
            UNASSIGNED_PACKAGE.to_string()
        };
        let mut node = ResourceNode::new(
            canonical,
            source_file,
            logical,
            self.policy.content_relative(canonical),
            package,
        );
        node.synthetic = true;
        node
    }
}

/// Breadth-first transitive dependencies of `nodes[start]`, excluding itself
fn transitive_closure(
    nodes: &[ResourceNode],
    index: &HashMap<String, usize>,
    start: usize,
) -> Vec<String> {
    let mut seen: HashSet<&str> = HashSet::new();
    seen.insert(nodes[start].path.as_str());
    let mut order = Vec::new();
    let mut queue: VecDeque<usize> = VecDeque::from([start]);

    while let Some(current) = queue.pop_front() {
        for dep in &nodes[current].direct_dependencies {
            if seen.insert(dep.as_str()) {
                order.push(dep.clone());
                if let Some(&next) = index.get(dep) {
                    queue.push_back(next);
                }
            }
        }
    }

    order
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use crate::error::PackError;
    use tempfile::TempDir;

    struct Fixture {
        temp: TempDir,
        policy: PathPolicy,
        config: ProjectConfig,
    }

    impl Fixture {
        fn new() -> Self {
            let temp = TempDir::new().expect("temp dir");
            let policy = PathPolicy::new(temp.path(), "content");
            Self {
                temp,
                policy,
                config: ProjectConfig::default(),
            }
        }

        fn write(&self, path: &str, content: &str) {
            let full = self.temp.path().join(path);
            std::fs::create_dir_all(full.parent().expect("parent")).expect("mkdir");
            std::fs::write(full, content).expect("write");
        }

        fn node(&self, path: &str, package: &str) -> ResourceNode {
            self.write(path, "data");
            ResourceNode::new(
                path,
                self.policy.project_root().join(path),
                naming::logical_name(path),
                self.policy.content_relative(path),
                package,
            )
        }

        fn collect(&self, nodes: &mut Vec<ResourceNode>) -> Result<DependencyReport> {
            DependencyCollector::new(&self.policy, &self.config, &SidecarInspector).collect(nodes)
        }
    }

    #[test]
    fn test_direct_and_transitive() {
        let fx = Fixture::new();
        let mut nodes = vec![
            fx.node("content/ui/a.prefab", "ui"),
            fx.node("content/ui/b.mat", "ui"),
            fx.node("content/ui/c.png", "ui"),
        ];
        fx.write("content/ui/a.prefab.deps", "# refs\ncontent/ui/b.mat\n\n");
        fx.write("content/ui/b.mat.deps", "content/ui/c.png\n");

        let report = fx.collect(&mut nodes).expect("collect");
        assert_eq!(report.synthetic, 0);
        assert_eq!(nodes[0].direct_dependencies, ["content/ui/b.mat"]);
        assert_eq!(
            nodes[0].all_dependencies,
            ["content/ui/b.mat", "content/ui/c.png"]
        );
        assert!(nodes[2].all_dependencies.is_empty());
    }

    #[test]
    fn test_unclaimed_dependency_becomes_synthetic() {
        let fx = Fixture::new();
        let mut nodes = vec![fx.node("content/ui/a.prefab", "ui")];
        fx.write("content/shared/font.ttf", "font");
        fx.write("content/ui/a.prefab.deps", "content/shared/font.ttf\n");

        let report = fx.collect(&mut nodes).expect("collect");
        assert_eq!(report.synthetic, 1);
        let synthetic = &nodes[1];
        assert!(synthetic.synthetic);
        assert_eq!(synthetic.package_id, UNASSIGNED_PACKAGE);
        assert_eq!(synthetic.logical_name, "font");
    }

    #[test]
    fn test_synthetic_scene_gets_own_package() {
        let fx = Fixture::new();
        let mut nodes = vec![fx.node("content/ui/menu.prefab", "ui")];
        fx.write("content/levels/intro.scene", "scene");
        fx.write("content/ui/menu.prefab.deps", "content/levels/intro.scene\n");

        fx.collect(&mut nodes).expect("collect");
        assert_eq!(nodes[1].package_id, "intro-scene");
    }

    #[test]
    fn test_missing_dependencies_all_reported() {
        let fx = Fixture::new();
        let mut nodes = vec![
            fx.node("content/ui/a.prefab", "ui"),
            fx.node("content/ui/b.prefab", "ui"),
        ];
        fx.write("content/ui/a.prefab.deps", "content/ui/gone1.png\n");
        fx.write("content/ui/b.prefab.deps", "content/ui/gone2.png\n");

        let err = fx.collect(&mut nodes).expect_err("missing");
        assert!(matches!(err, PackError::MissingDependency { count: 2, .. }));
        assert!(err.to_string().contains("gone1.png"));
        assert!(err.to_string().contains("gone2.png"));
    }

    #[test]
    fn test_outside_content_root_warns() {
        let fx = Fixture::new();
        let mut nodes = vec![fx.node("content/ui/a.prefab", "ui")];
        fx.write("vendor/lib.bin", "bin");
        fx.write("content/ui/a.prefab.deps", "vendor/lib.bin\n");

        let report = fx.collect(&mut nodes).expect("collect");
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("outside the content root"));
        assert_eq!(nodes[0].direct_dependencies, ["vendor/lib.bin"]);
    }

    #[test]
    fn test_self_and_duplicate_references_ignored() {
        let fx = Fixture::new();
        let mut nodes = vec![
            fx.node("content/ui/a.prefab", "ui"),
            fx.node("content/ui/b.png", "ui"),
        ];
        fx.write(
            "content/ui/a.prefab.deps",
            "content/ui/a.prefab\ncontent/ui/b.png\nCONTENT/UI/B.PNG\n",
        );

        fx.collect(&mut nodes).expect("collect");
        assert_eq!(nodes[0].direct_dependencies, ["content/ui/b.png"]);
    }

    #[test]
    fn test_ignored_dependencies_dropped() {
        let fx = Fixture::new();
        let mut nodes = vec![fx.node("content/ui/a.prefab", "ui")];
        fx.write("content/scripts/hud.cs", "class Hud {}");
        fx.write("content/ui/resources/icon.png", "icon");
        fx.write("content/ui/b.png", "b");
        fx.write(
            "content/ui/a.prefab.deps",
            "content/scripts/hud.cs\ncontent/ui/resources/icon.png\ncontent/ui/b.png\n",
        );

        let report = fx.collect(&mut nodes).expect("collect");
        assert_eq!(report.synthetic, 1);
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].direct_dependencies, ["content/ui/b.png"]);
    }

    #[test]
    fn test_atlas_sprites_fold_into_atlas() {
        let fx = Fixture::new();
        let mut nodes = vec![
            fx.node("content/ui/icons.spriteatlas", "ui"),
            fx.node("content/ui/icons/heart.png", "ui"),
            fx.node("content/ui/icons/star.png", "ui"),
            fx.node("content/ui/hud.prefab", "ui"),
            fx.node("content/ui/logo.png", "ui"),
        ];
        fx.write(
            "content/ui/icons.spriteatlas.deps",
            "content/ui/icons/heart.png\ncontent/ui/icons/star.png\n",
        );
        fx.write(
            "content/ui/hud.prefab.deps",
            "content/ui/icons/heart.png\ncontent/ui/icons/star.png\ncontent/ui/logo.png\n",
        );

        let report = fx.collect(&mut nodes).expect("collect");
        assert_eq!(report.atlas_members, 2);
        let paths: Vec<&str> = nodes.iter().map(|n| n.path.as_str()).collect();
        assert_eq!(
            paths,
            [
                "content/ui/icons.spriteatlas",
                "content/ui/hud.prefab",
                "content/ui/logo.png"
            ]
        );
        assert!(nodes[0].direct_dependencies.is_empty());
        assert_eq!(
            nodes[1].direct_dependencies,
            ["content/ui/icons.spriteatlas", "content/ui/logo.png"]
        );
        assert_eq!(
            nodes[1].all_dependencies,
            ["content/ui/icons.spriteatlas", "content/ui/logo.png"]
        );
    }

    #[test]
    fn test_cyclic_references_terminate() {
        let fx = Fixture::new();
        let mut nodes = vec![
            fx.node("content/ui/a.mat", "ui"),
            fx.node("content/ui/b.mat", "ui"),
        ];
        fx.write("content/ui/a.mat.deps", "content/ui/b.mat\n");
        fx.write("content/ui/b.mat.deps", "content/ui/a.mat\n");

        fx.collect(&mut nodes).expect("collect");
        assert_eq!(nodes[0].all_dependencies, ["content/ui/b.mat"]);
        assert_eq!(nodes[1].all_dependencies, ["content/ui/a.mat"]);
    }
}
