//! Mutable state threaded through the pipeline stages

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use crate::config::ProjectConfig;
use crate::cycle::Graph;
use crate::domain::{PackagePlan, ResourceNode};
use crate::manifest::Manifest;
use crate::naming::PathPolicy;

use super::BuildSettings;

/// State of one build. Owned by the call to `Packager::run`, never shared.
pub struct BuildContext<'a> {
    pub settings: &'a BuildSettings,
    pub config: &'a ProjectConfig,
    pub policy: PathPolicy,
    pub editor_only: bool,

    /// Packaging rules, deepest source first
    pub plans: Vec<PackagePlan>,

    /// Every packageable item, direct and synthetic
    pub nodes: Vec<ResourceNode>,

    /// Package id to indices into `nodes`, sorted by path
    pub package_assets: BTreeMap<String, Vec<usize>>,

    /// Package id to the package ids it references
    pub package_graph: Graph,

    /// Archive file per package, filled by the archiver stage
    pub archives: BTreeMap<String, PathBuf>,

    pub manifest: Option<Manifest>,

    /// Non-fatal findings collected across stages
    pub warnings: Vec<String>,
}

impl<'a> BuildContext<'a> {
    pub fn new(
        project_root: &Path,
        settings: &'a BuildSettings,
        config: &'a ProjectConfig,
        editor_only: bool,
    ) -> Self {
        Self {
            settings,
            config,
            policy: PathPolicy::new(project_root, &config.content_root),
            editor_only,
            plans: Vec::new(),
            nodes: Vec::new(),
            package_assets: BTreeMap::new(),
            package_graph: Graph::new(),
            archives: BTreeMap::new(),
            manifest: None,
            warnings: Vec::new(),
        }
    }

    /// Index from canonical path to position in `nodes`
    pub fn node_index(&self) -> HashMap<&str, usize> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.path.as_str(), i))
            .collect()
    }

    /// Output directory for this build's channel
    pub fn channel_dir(&self) -> PathBuf {
        self.settings.channel_dir()
    }
}
