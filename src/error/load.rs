//! Runtime load errors
//!
//! The loader's public operations swallow these after logging them, so the
//! messages carry every identifier needed to trace a failure: the logical
//! name that was asked for and the package or asset it resolved to.

use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    #[error("No asset named '{name}' in the asset map")]
    #[diagnostic(code(packwright::load::asset_not_found))]
    AssetNotFound { name: String },

    #[error("Package '{package}' is not known to the catalog")]
    #[diagnostic(code(packwright::load::package_not_found))]
    PackageNotFound { package: String },

    #[error("Package '{package}' does not contain asset '{asset}'")]
    #[diagnostic(code(packwright::load::asset_missing))]
    AssetMissing { package: String, asset: String },

    #[error("Failed to read package '{package}': {reason}")]
    #[diagnostic(code(packwright::load::io))]
    Io { package: String, reason: String },

    #[error("Failed to decode asset '{asset}' from package '{package}': {reason}")]
    #[diagnostic(code(packwright::load::decode))]
    Decode {
        package: String,
        asset: String,
        reason: String,
    },

    #[error("Circular package dependency while loading: {chain}")]
    #[diagnostic(code(packwright::load::circular))]
    CircularDependency { chain: String },

    #[error("Gave up on package '{package}' after {attempts} attempts: {reason}")]
    #[diagnostic(code(packwright::load::retries_exhausted))]
    RetriesExhausted {
        package: String,
        attempts: u32,
        reason: String,
    },

    #[error("Package '{package}' failed its integrity check: {reason}")]
    #[diagnostic(code(packwright::load::integrity))]
    IntegrityMismatch { package: String, reason: String },

    #[error("Cached asset '{asset}' in package '{package}' has a different type")]
    #[diagnostic(code(packwright::load::type_mismatch))]
    TypeMismatch { package: String, asset: String },

    #[error("Load of '{name}' was cancelled")]
    #[diagnostic(code(packwright::load::cancelled))]
    Cancelled { name: String },
}

impl LoadError {
    pub fn io(package: impl Into<String>, reason: impl ToString) -> Self {
        LoadError::Io {
            package: package.into(),
            reason: reason.to_string(),
        }
    }
}
