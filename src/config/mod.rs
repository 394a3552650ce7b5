//! Configuration file handling for Packwright
//!
//! This module contains data structures for:
//! - `packwright.yaml` - Project configuration (layout, naming, runtime loading)
//! - `packaging/*.yaml` - Package descriptors, one packaging rule per file

pub mod descriptors;
pub mod project;

pub use descriptors::{DescriptorFile, load_descriptors};
pub use project::{LoadMode, PROJECT_CONFIG_FILE, ProjectConfig, RetryConfig, RuntimeConfig};
