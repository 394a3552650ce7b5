//! Path and naming policy
//!
//! Every packageable item is identified by a canonical path: project-relative,
//! `/`-separated and lowercase. Runtime identifiers (logical asset names and
//! package names) are derived from canonical paths by the pure functions in
//! this module. All comparisons are case-insensitive.

use std::path::{Component, Path, PathBuf};

use normpath::PathExt;
use thiserror::Error;

/// Returned when a path does not live under the project root
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("path is not inside the project: {path}")]
pub struct NotAPackagePath {
    pub path: String,
}

/// Convert a path to a string with forward slashes
pub fn to_forward_slashes(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Maps on-disk locations to canonical paths and runtime names
#[derive(Debug, Clone)]
pub struct PathPolicy {
    project_root: PathBuf,
    content_root: String,
}

impl PathPolicy {
    /// Create a policy for `project_root` whose packageable content lives under
    /// `content_root` (a project-relative directory such as `content`).
    pub fn new(project_root: &Path, content_root: &str) -> Self {
        let project_root = project_root
            .normalize()
            .map(normpath::BasePathBuf::into_path_buf)
            .unwrap_or_else(|_| lexical_clean(project_root));
        let content_root = content_root
            .replace('\\', "/")
            .trim_matches('/')
            .to_lowercase();
        Self {
            project_root,
            content_root,
        }
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Canonical form of the content root (e.g. `content`)
    pub fn content_root(&self) -> &str {
        &self.content_root
    }

    /// Canonical path of `path`, which may be absolute or project-relative.
    ///
    /// # Errors
    ///
    /// Returns [`NotAPackagePath`] when the path escapes the project root.
    pub fn to_canonical_path(&self, path: &Path) -> Result<String, NotAPackagePath> {
        let absolute = if path.is_absolute() {
            path.normalize()
                .map(normpath::BasePathBuf::into_path_buf)
                .unwrap_or_else(|_| lexical_clean(path))
        } else {
            lexical_clean(&self.project_root.join(path))
        };

        let relative = absolute
            .strip_prefix(&self.project_root)
            .map_err(|_| NotAPackagePath {
                path: to_forward_slashes(path),
            })?;

        let segments: Vec<String> = relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(s) => Some(s.to_string_lossy().to_lowercase()),
                _ => None,
            })
            .collect();

        if segments.is_empty() {
            return Err(NotAPackagePath {
                path: to_forward_slashes(path),
            });
        }

        Ok(segments.join("/"))
    }

    /// True when a canonical path lies under the content root
    pub fn is_under_package_root(&self, canonical: &str) -> bool {
        is_within(&canonical.to_lowercase(), &self.content_root)
    }

    /// Path relative to the content root; paths outside it are returned whole
    pub fn relative_to_content(&self, canonical: &str) -> String {
        let canonical = canonical.to_lowercase();
        canonical
            .strip_prefix(self.content_root.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
            .map_or_else(|| canonical.clone(), str::to_string)
    }

    /// Path relative to the content root with the extension removed. Used as
    /// the disambiguation path when names collide.
    pub fn content_relative(&self, canonical: &str) -> String {
        let relative = self.relative_to_content(canonical);
        match relative.rsplit_once('/') {
            Some((dir, file)) => format!("{}/{}", dir, strip_extension(file)),
            None => strip_extension(&relative).to_string(),
        }
    }
}

/// True when `path` equals `root` or lies below it on a segment boundary
pub fn is_within(path: &str, root: &str) -> bool {
    if root.is_empty() {
        return true;
    }
    path == root
        || path
            .strip_prefix(root)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// Remove the last extension of a file name.
///
/// Names without a dot, with only a leading dot, or ending in a dot are
/// returned unchanged.
pub fn strip_extension(file_name: &str) -> &str {
    match file_name.rfind('.') {
        None | Some(0) => file_name,
        Some(i) if i + 1 == file_name.len() => file_name,
        Some(i) => &file_name[..i],
    }
}

/// Last segment of a canonical path
pub fn file_name(canonical: &str) -> &str {
    canonical.rsplit('/').next().unwrap_or(canonical)
}

/// Runtime name of the asset at `canonical`: lowercase file name without extension
pub fn logical_name(canonical: &str) -> String {
    strip_extension(file_name(canonical)).to_lowercase()
}

/// True when the file name at `canonical` ends in `.<extension>`, ignoring case
pub fn has_extension(canonical: &str, extension: &str) -> bool {
    let ext = extension.trim_start_matches('.');
    !ext.is_empty()
        && file_name(canonical)
            .to_lowercase()
            .strip_suffix(&ext.to_lowercase())
            .is_some_and(|stem| stem.len() > 1 && stem.ends_with('.'))
}

/// True when the file at `canonical` is a scene
pub fn is_scene(canonical: &str, scene_extension: &str) -> bool {
    has_extension(canonical, scene_extension)
}

/// Package name for a scene asset's logical name
pub fn scene_package_for(logical_name: &str, suffix: &str) -> String {
    format!("{}{}", logical_name.to_lowercase(), suffix)
}

/// Resolve `.` and `..` without touching the file system
fn lexical_clean(path: &Path) -> PathBuf {
    let mut cleaned = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !cleaned.pop() {
                    cleaned.push(component);
                }
            }
            other => cleaned.push(other),
        }
    }
    cleaned
}
