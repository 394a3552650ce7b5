//! Asset map artifact (`assetmap.json`)
//!
//! A JSON array with one record per packaged asset. Field names are camelCase
//! and every value is lowercase:
//!
//! ```json
//! [{
//!   "assetNameValue": "button",
//!   "assetPath": "content/ui/button.prefab",
//!   "bundleName": "ui",
//!   "directDependencies": ["content/ui/atlas.png"],
//!   "allDependencies": ["content/ui/atlas.png"]
//! }]
//! ```

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::ResourceNode;
use crate::error::{
    Result,
    fs::{not_found, read_failed},
    manifest::asset_map_invalid,
};

/// File name of the asset map inside a channel directory
pub const ASSET_MAP_FILE: &str = "assetmap.json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AssetRecord {
    pub asset_name_value: String,
    pub asset_path: String,
    pub bundle_name: String,
    #[serde(default)]
    pub direct_dependencies: Vec<String>,
    #[serde(default)]
    pub all_dependencies: Vec<String>,
}

impl AssetRecord {
    fn normalized(mut self) -> Self {
        self.asset_name_value = self.asset_name_value.to_lowercase();
        self.asset_path = self.asset_path.to_lowercase();
        self.bundle_name = self.bundle_name.to_lowercase();
        for dep in self
            .direct_dependencies
            .iter_mut()
            .chain(self.all_dependencies.iter_mut())
        {
            *dep = dep.to_lowercase();
        }
        self
    }
}

impl From<&ResourceNode> for AssetRecord {
    fn from(node: &ResourceNode) -> Self {
        Self {
            asset_name_value: node.logical_name.clone(),
            asset_path: node.path.clone(),
            bundle_name: node.package_id.clone(),
            direct_dependencies: node.direct_dependencies.clone(),
            all_dependencies: node.all_dependencies.clone(),
        }
        .normalized()
    }
}

/// Asset records indexed by logical name and by path
#[derive(Debug, Clone, Default)]
pub struct AssetMap {
    records: Vec<AssetRecord>,
    by_name: HashMap<String, usize>,
    by_path: HashMap<String, usize>,
}

impl AssetMap {
    /// Build an index over `records`; the first record wins on duplicate names
    pub fn new(records: Vec<AssetRecord>) -> Self {
        let records: Vec<AssetRecord> = records.into_iter().map(AssetRecord::normalized).collect();
        let mut by_name = HashMap::with_capacity(records.len());
        let mut by_path = HashMap::with_capacity(records.len());
        for (i, record) in records.iter().enumerate() {
            if by_name.contains_key(&record.asset_name_value) {
                log::warn!(
                    "Duplicate asset name '{}' in asset map ({}); keeping the first",
                    record.asset_name_value,
                    record.asset_path
                );
            } else {
                by_name.insert(record.asset_name_value.clone(), i);
            }
            by_path.entry(record.asset_path.clone()).or_insert(i);
        }
        Self {
            records,
            by_name,
            by_path,
        }
    }

    /// Records for `nodes`, ordered by asset path
    pub fn from_nodes(nodes: &[ResourceNode]) -> Self {
        let mut records: Vec<AssetRecord> = nodes.iter().map(AssetRecord::from).collect();
        records.sort_by(|a, b| a.asset_path.cmp(&b.asset_path));
        Self::new(records)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let records: Vec<AssetRecord> =
            serde_json::from_str(json).map_err(|e| asset_map_invalid(ASSET_MAP_FILE, e))?;
        Ok(Self::new(records))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(not_found(path));
        }
        let json = std::fs::read_to_string(path).map_err(|e| read_failed(path, e))?;
        let records: Vec<AssetRecord> = serde_json::from_str(&json)
            .map_err(|e| asset_map_invalid(path.display().to_string(), e))?;
        Ok(Self::new(records))
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.records)?)
    }

    /// Record for a logical name (case-insensitive)
    pub fn get(&self, logical_name: &str) -> Option<&AssetRecord> {
        self.by_name
            .get(&logical_name.to_lowercase())
            .map(|&i| &self.records[i])
    }

    pub fn get_by_path(&self, path: &str) -> Option<&AssetRecord> {
        self.by_path
            .get(&path.to_lowercase())
            .map(|&i| &self.records[i])
    }

    pub fn records(&self) -> &[AssetRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
