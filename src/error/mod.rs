//! Error types and handling for Packwright
//!
//! Uses `thiserror` for error definitions and `miette` for pretty diagnostics.
//!
//! Build-time failures are reported through [`PackError`]. The runtime loader
//! never surfaces errors through its public API; it logs a [`LoadError`] and
//! returns `None`/`false` instead.
//!
//! Convenience constructors are grouped by domain:
//! - [`config`]: project configuration and package descriptors
//! - [`graph`]: naming, dependency and cycle validation
//! - [`manifest`]: manifest and asset map artifacts
//! - [`fs`]: file system errors

pub mod config;
pub mod fs;
pub mod graph;
pub mod load;
pub mod manifest;

pub use load::LoadError;

use miette::Diagnostic;
use thiserror::Error;

/// Main error type for packaging operations
#[derive(Error, Diagnostic, Debug)]
pub enum PackError {
    // Configuration errors
    #[error("Failed to parse configuration file: {path}: {reason}")]
    #[diagnostic(code(packwright::config::parse_failed))]
    ConfigParseFailed { path: String, reason: String },

    #[error("Invalid configuration: {message}")]
    #[diagnostic(code(packwright::config::invalid))]
    ConfigInvalid { message: String },

    #[error("No package descriptors found under {path}")]
    #[diagnostic(
        code(packwright::config::no_descriptors),
        help("Add at least one descriptor YAML file naming a source directory")
    )]
    NoDescriptors { path: String },

    #[error("Package '{package}' matched no assets")]
    #[diagnostic(
        code(packwright::config::empty_package),
        help("Check the descriptor's source directory and filters")
    )]
    EmptyPackage { package: String },

    // Naming and graph validation errors
    #[error("Path is outside the project: {path}")]
    #[diagnostic(code(packwright::naming::not_a_package_path))]
    NotAPackagePath { path: String },

    #[error("Name conflict after {rounds} rename rounds:\n{details}")]
    #[diagnostic(
        code(packwright::naming::conflict),
        help("Rename one of the listed items or raise max_rename_depth")
    )]
    NameConflict { rounds: usize, details: String },

    #[error("{count} missing dependencies:\n{details}")]
    #[diagnostic(
        code(packwright::deps::missing),
        help("Restore the referenced files or remove the references")
    )]
    MissingDependency { count: usize, details: String },

    #[error("Circular asset dependency detected:\n{chain}")]
    #[diagnostic(
        code(packwright::cycle::asset),
        help("Break the reference loop between the listed assets")
    )]
    AssetCycle { chain: String },

    #[error("Circular package dependency detected:\n{chain}")]
    #[diagnostic(
        code(packwright::cycle::package),
        help("Move one of the listed assets so packages no longer reference each other")
    )]
    PackageCycle { chain: String },

    // Build state errors
    #[error("Packager was not initialized before execute_build")]
    #[diagnostic(code(packwright::build::not_initialized))]
    NotInitialized,

    #[error("Failed to archive package '{package}': {reason}")]
    #[diagnostic(code(packwright::build::archive_failed))]
    ArchiveFailed { package: String, reason: String },

    // Manifest errors
    #[error("Failed to parse manifest: {reason}")]
    #[diagnostic(code(packwright::manifest::parse_failed))]
    ManifestParse { reason: String },

    #[error("{count} archives do not match the manifest:\n{details}")]
    #[diagnostic(
        code(packwright::manifest::archive_mismatch),
        help("Rebuild the channel or re-fetch the listed archives")
    )]
    ArchiveMismatch { count: usize, details: String },

    #[error("Failed to parse asset map {path}: {reason}")]
    #[diagnostic(code(packwright::manifest::asset_map_invalid))]
    AssetMapParse { path: String, reason: String },

    // File system errors
    #[error("File not found: {path}")]
    #[diagnostic(code(packwright::fs::not_found))]
    FileNotFound { path: String },

    #[error("Failed to read file: {path}: {reason}")]
    #[diagnostic(code(packwright::fs::read_failed))]
    FileReadFailed { path: String, reason: String },

    #[error("Failed to write file: {path}: {reason}")]
    #[diagnostic(code(packwright::fs::write_failed))]
    FileWriteFailed { path: String, reason: String },

    #[error("IO error: {message}")]
    #[diagnostic(code(packwright::fs::io_error))]
    IoError { message: String },
}

impl From<std::io::Error> for PackError {
    fn from(err: std::io::Error) -> Self {
        PackError::IoError {
            message: err.to_string(),
        }
    }
}

impl From<serde_yaml::Error> for PackError {
    fn from(err: serde_yaml::Error) -> Self {
        PackError::ConfigParseFailed {
            path: "unknown".to_string(),
            reason: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for PackError {
    fn from(err: serde_json::Error) -> Self {
        PackError::AssetMapParse {
            path: "unknown".to_string(),
            reason: err.to_string(),
        }
    }
}

impl From<crate::naming::NotAPackagePath> for PackError {
    fn from(err: crate::naming::NotAPackagePath) -> Self {
        PackError::NotAPackagePath { path: err.path }
    }
}

/// Result type alias using miette for error handling
pub type Result<T> = miette::Result<T, PackError>;
