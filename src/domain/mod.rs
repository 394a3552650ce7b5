//! Domain models for Packwright
//!
//! These types are shared by the packaging pipeline and the runtime loader:
//! the identity of packageable resources, the packages they belong to and
//! the dependency edges between them.

pub mod package;
pub mod resource;

pub use package::{PackageDescriptor, PackagePlan, UNASSIGNED_PACKAGE};
pub use resource::ResourceNode;
