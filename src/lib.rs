//! Packwright - content packaging and runtime package loading
//!
//! The build side walks a project's content tree, assigns every file to a
//! package according to descriptor files, resolves naming collisions,
//! validates the dependency graph and writes one archive per package plus a
//! version manifest and an asset map.
//!
//! The runtime side reads those artifacts back: it resolves logical asset
//! names, loads packages together with their dependencies, and keeps
//! reference counts so packages are released in dependency order.

pub mod archive;
pub mod collision;
pub mod config;
pub mod cycle;
pub mod deps;
pub mod domain;
pub mod error;
pub mod hash;
pub mod manifest;
pub mod naming;
pub mod pipeline;
pub mod progress;
pub mod runtime;
pub mod temp;

#[cfg(test)]
#[allow(clippy::expect_used)]
pub(crate) mod test_fixtures;

pub use error::{LoadError, PackError, Result};
pub use pipeline::{BuildOutcome, BuildSettings, Packager};
pub use runtime::{RuntimeLoader, SceneLoader};
