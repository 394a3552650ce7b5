//! Project configuration (packwright.yaml) data structures
//!
//! Every field has a default, so a project without a `packwright.yaml`
//! builds with the conventional layout:
//!
//! ```yaml
//! content_root: content
//! descriptor_dir: packaging
//! scene_extension: scene
//! scene_package_suffix: -scene
//! atlas_extension: spriteatlas
//! max_rename_depth: 20
//! ignore: ["**/*.deps", "**/*.meta", "**/*.cs", "**/resources/**", "packages/**"]
//! runtime:
//!   mode: local
//!   retry:
//!     max_attempts: 3
//!     initial_delay_ms: 1000
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::collision::DEFAULT_MAX_RENAME_DEPTH;
use crate::error::{
    Result,
    config::{invalid as config_invalid, parse_failed as config_parse_failed},
    fs::read_failed,
};

/// File name of the project configuration
pub const PROJECT_CONFIG_FILE: &str = "packwright.yaml";

/// Sidecar and metadata files, scripts, runtime-only `resources`
/// directories, and the `packages` tree holding build output
pub const DEFAULT_IGNORE: &[&str] = &[
    "**/*.deps",
    "**/*.meta",
    "**/*.cs",
    "**/resources/**",
    "packages/**",
];

/// Project configuration (packwright.yaml)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ProjectConfig {
    /// Project-relative directory holding packageable content
    pub content_root: String,

    /// Project-relative directory holding package descriptor files
    pub descriptor_dir: String,

    /// Extension identifying scene files
    pub scene_extension: String,

    /// Suffix appended to a scene's name to form its package name
    pub scene_package_suffix: String,

    /// Extension of sprite atlases. Files an atlas references are packed
    /// into it and never packaged on their own.
    pub atlas_extension: String,

    /// Ceiling on collision rename rounds
    pub max_rename_depth: usize,

    /// Globs (relative to the content root) never packaged and never
    /// recorded as dependencies
    pub ignore: Vec<String>,

    pub runtime: RuntimeConfig,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            content_root: "content".to_string(),
            descriptor_dir: "packaging".to_string(),
            scene_extension: "scene".to_string(),
            scene_package_suffix: "-scene".to_string(),
            atlas_extension: "spriteatlas".to_string(),
            max_rename_depth: DEFAULT_MAX_RENAME_DEPTH,
            ignore: DEFAULT_IGNORE.iter().map(|p| (*p).to_string()).collect(),
            runtime: RuntimeConfig::default(),
        }
    }
}

/// How the runtime loader obtains package bytes
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LoadMode {
    /// Read assets straight from the project tree through the asset map
    Direct,
    /// Read built archives from a local package directory
    #[default]
    Local,
    /// Read archives from a staging directory, verified and retried
    Staged,
}

/// Runtime loader settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct RuntimeConfig {
    pub mode: LoadMode,

    /// Directory of built archives for `local` mode; defaults to the build output
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package_dir: Option<PathBuf>,

    /// Directory archives are fetched from in `staged` mode
    #[serde(skip_serializing_if = "Option::is_none")]
    pub staging_dir: Option<PathBuf>,

    pub retry: RetryConfig,
}

/// Bounded retry with exponential backoff
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 1000,
        }
    }
}

impl RetryConfig {
    /// Delay before retry number `attempt` (1-based): doubles every attempt
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u64 << attempt.saturating_sub(1).min(16);
        Duration::from_millis(self.initial_delay_ms.saturating_mul(factor))
    }
}

impl ProjectConfig {
    /// Parse project configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `packwright.yaml` from `project_root`, or defaults when absent
    pub fn load(project_root: &Path) -> Result<Self> {
        let path = project_root.join(PROJECT_CONFIG_FILE);
        if !path.is_file() {
            log::debug!(
                "No {} in {}, using defaults",
                PROJECT_CONFIG_FILE,
                project_root.display()
            );
            return Ok(Self::default());
        }

        let yaml = std::fs::read_to_string(&path).map_err(|e| read_failed(&path, e))?;
        let config: Self = serde_yaml::from_str(&yaml)
            .map_err(|e| config_parse_failed(path.display().to_string(), e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let content_root = self.content_root.trim().trim_matches('/');
        if content_root.is_empty() {
            return Err(config_invalid("content_root must not be empty"));
        }
        if content_root.split('/').any(|segment| segment == "..") {
            return Err(config_invalid("content_root must stay inside the project"));
        }
        if self.descriptor_dir.trim().is_empty() {
            return Err(config_invalid("descriptor_dir must not be empty"));
        }
        if self.scene_extension.trim_start_matches('.').is_empty() {
            return Err(config_invalid("scene_extension must not be empty"));
        }
        if self.max_rename_depth == 0 {
            return Err(config_invalid("max_rename_depth must be at least 1"));
        }
        if self.runtime.retry.max_attempts == 0 {
            return Err(config_invalid("runtime.retry.max_attempts must be at least 1"));
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use crate::error::PackError;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_when_missing() {
        let temp = TempDir::new().expect("temp dir");
        let config = ProjectConfig::load(temp.path()).expect("defaults");
        assert_eq!(config, ProjectConfig::default());
        assert_eq!(config.max_rename_depth, 20);
        assert_eq!(config.runtime.mode, LoadMode::Local);
        assert_eq!(config.atlas_extension, "spriteatlas");
    }

    #[test]
    fn test_default_ignore_excludes_scripts_and_runtime_folders() {
        let ignore = crate::pipeline::filter::PathFilter::new(&ProjectConfig::default().ignore)
            .expect("valid globs");
        assert!(ignore.matches("ui/hud.prefab.deps"));
        assert!(ignore.matches("ui/hud.png.meta"));
        assert!(ignore.matches("scripts/player.cs"));
        assert!(ignore.matches("ui/resources/icon.png"));
        assert!(ignore.matches("resources/icon.png"));
        assert!(ignore.matches("packages/linux/core"));
        assert!(!ignore.matches("ui/hud.png"));
        assert!(!ignore.matches("ui/packages/box.png"));
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = ProjectConfig::from_yaml("content_root: assets\nruntime:\n  mode: staged\n")
            .expect("valid config");
        assert_eq!(config.content_root, "assets");
        assert_eq!(config.descriptor_dir, "packaging");
        assert_eq!(config.runtime.mode, LoadMode::Staged);
        assert_eq!(config.runtime.retry.max_attempts, 3);
    }

    #[test]
    fn test_invalid_yaml_reports_path() {
        let temp = TempDir::new().expect("temp dir");
        std::fs::write(temp.path().join(PROJECT_CONFIG_FILE), "content_root: [unclosed")
            .expect("write config");
        let err = ProjectConfig::load(temp.path()).expect_err("invalid yaml");
        assert!(matches!(err, PackError::ConfigParseFailed { .. }));
        assert!(err.to_string().contains(PROJECT_CONFIG_FILE));
    }

    #[test]
    fn test_validation_rejects_zero_depth() {
        let err = ProjectConfig::from_yaml("max_rename_depth: 0\n").expect_err("zero depth");
        assert!(err.to_string().contains("max_rename_depth"));
    }

    #[test]
    fn test_validation_rejects_escaping_content_root() {
        assert!(ProjectConfig::from_yaml("content_root: ../elsewhere\n").is_err());
    }

    #[test]
    fn test_retry_delay_doubles() {
        let retry = RetryConfig {
            max_attempts: 3,
            initial_delay_ms: 100,
        };
        assert_eq!(retry.delay_for(1), Duration::from_millis(100));
        assert_eq!(retry.delay_for(2), Duration::from_millis(200));
        assert_eq!(retry.delay_for(3), Duration::from_millis(400));
    }
}
