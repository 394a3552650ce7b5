//! Runtime side: loading packages produced by a build
//!
//! [`RuntimeLoader`] owns every piece of mutable runtime state (the package
//! table, the asset cache and the set of loads in progress). All of it is
//! changed only through the loader's public operations on the thread that
//! owns it; other threads queue releases through a [`ReleaseSender`].
//!
//! ## Usage
//!
//! ```rust,no_run
//! use packwright::config::RuntimeConfig;
//! use packwright::runtime::RuntimeLoader;
//!
//! let mut loader = RuntimeLoader::open(
//!     "my-project".as_ref(),
//!     "my-project/build/default".as_ref(),
//!     &RuntimeConfig::default(),
//! )?;
//! if let Some(text) = loader.load::<String>("readme") {
//!     println!("{}", text);
//!     loader.unload("readme");
//! }
//! # Ok::<(), packwright::error::PackError>(())
//! ```

pub mod catalog;
pub mod graph;
pub mod loader;
pub mod release;
pub mod scene;
pub mod source;

pub use catalog::Catalog;
pub use graph::{LoadedPackage, PackageLoadGraph};
pub use loader::{Asset, RuntimeLoader};
pub use release::{Release, ReleaseSender};
pub use scene::{
    CancelToken, SceneHandle, SceneLoadOptions, SceneLoadResult, SceneLoader, SceneMode,
    SceneState,
};
pub use source::{DirectSource, LocalSource, PackageSource, StagedSource, source_for};
