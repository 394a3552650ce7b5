//! Command implementations for the Packwright CLI

pub mod build;
pub mod completions;
pub mod manifest;
pub mod resolve;

use std::path::PathBuf;

use packwright::error::{PackError, Result};

/// The `--project` directory, or the current directory
pub fn project_root(project: Option<PathBuf>) -> Result<PathBuf> {
    match project {
        Some(path) => Ok(path),
        None => std::env::current_dir().map_err(|e| PackError::IoError {
            message: format!("Failed to get current directory: {}", e),
        }),
    }
}
