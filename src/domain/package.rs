//! Package descriptors and their resolved build plans

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::collision::Named;
use crate::error::{Result, config::invalid as config_invalid};

/// Package that receives dependencies outside every configured package
pub const UNASSIGNED_PACKAGE: &str = "unassigned";

/// A packaging rule as written in a descriptor YAML file
///
/// ```yaml
/// name: common
/// source: content/ui/common
/// recursive: true
/// filters: ["*.png"]
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PackageDescriptor {
    /// Package name; defaults to the last segment of `source`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Project-relative source directory
    pub source: String,

    /// Include files in subdirectories
    #[serde(default = "default_recursive")]
    pub recursive: bool,

    /// Glob filters relative to `source`; empty means every file
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<String>,
}

fn default_recursive() -> bool {
    true
}

impl PackageDescriptor {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            name: None,
            source: source.into(),
            recursive: true,
            filters: Vec::new(),
        }
    }

    /// Parse a descriptor from YAML
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let descriptor: Self = serde_yaml::from_str(yaml)?;
        descriptor.validate()?;
        Ok(descriptor)
    }

    /// Check the fields that do not depend on the project layout
    pub fn validate(&self) -> Result<()> {
        let source = self.source.trim().trim_matches('/');
        if source.is_empty() {
            return Err(config_invalid("package descriptor has an empty source"));
        }
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err(config_invalid(format!(
                    "package descriptor for '{}' has an empty name",
                    self.source
                )));
            }
            if name.contains(['/', '\\', ' ']) {
                return Err(config_invalid(format!(
                    "package name '{}' must not contain separators or spaces",
                    name
                )));
            }
        }
        if self.effective_name() == UNASSIGNED_PACKAGE {
            return Err(config_invalid(format!(
                "package name '{}' is reserved",
                UNASSIGNED_PACKAGE
            )));
        }
        Ok(())
    }

    /// Name before collision resolution, lowercased
    pub fn effective_name(&self) -> String {
        match &self.name {
            Some(name) => name.trim().to_lowercase(),
            None => self
                .source
                .trim()
                .trim_matches('/')
                .rsplit(['/', '\\'])
                .next()
                .unwrap_or_default()
                .to_lowercase(),
        }
    }
}

/// A validated descriptor resolved against the project layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackagePlan {
    /// Unique package id after collision resolution
    pub name: String,

    /// Canonical source directory
    pub source: String,

    /// Source directory on disk
    pub source_dir: PathBuf,

    /// Source directory relative to the content root
    pub disambiguation: String,

    pub recursive: bool,

    pub filters: Vec<String>,

    /// Descriptor file this plan came from, for diagnostics
    pub origin: String,
}

impl PackagePlan {
    /// Number of segments in the source directory
    pub fn depth(&self) -> usize {
        self.source.split('/').filter(|s| !s.is_empty()).count()
    }
}

impl Named for PackagePlan {
    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: String) {
        self.name = name;
    }

    fn disambiguation_path(&self) -> &str {
        &self.disambiguation
    }
}
