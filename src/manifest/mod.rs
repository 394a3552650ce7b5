//! Build artifacts consumed by the runtime loader
//!
//! - [`version`]: the line-oriented version manifest (`manifest.txt`)
//! - [`asset_map`]: the JSON asset map (`assetmap.json`)

pub mod asset_map;
pub mod version;

pub use asset_map::{ASSET_MAP_FILE, AssetMap, AssetRecord};
pub use version::{MANIFEST_FILE, Manifest, PackageEntry, ParsedManifest};
