//! Resource domain types

use std::path::PathBuf;

use crate::collision::Named;

/// One packageable content item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceNode {
    /// Canonical path, unique per build
    pub path: String,

    /// Location on disk
    pub source_file: PathBuf,

    /// Runtime identifier, unique after collision resolution
    pub logical_name: String,

    /// Path relative to the content root without extension
    pub disambiguation: String,

    /// Package this item is embedded in
    pub package_id: String,

    /// One-hop dependencies (canonical paths)
    pub direct_dependencies: Vec<String>,

    /// Transitive closure of `direct_dependencies`
    pub all_dependencies: Vec<String>,

    /// Created for a dependency outside every configured package
    pub synthetic: bool,
}

impl ResourceNode {
    pub fn new(
        path: impl Into<String>,
        source_file: PathBuf,
        logical_name: impl Into<String>,
        disambiguation: impl Into<String>,
        package_id: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            source_file,
            logical_name: logical_name.into(),
            disambiguation: disambiguation.into(),
            package_id: package_id.into(),
            direct_dependencies: Vec::new(),
            all_dependencies: Vec::new(),
            synthetic: false,
        }
    }
}

impl Named for ResourceNode {
    fn name(&self) -> &str {
        &self.logical_name
    }

    fn set_name(&mut self, name: String) {
        self.logical_name = name;
    }

    fn disambiguation_path(&self) -> &str {
        &self.disambiguation
    }
}
