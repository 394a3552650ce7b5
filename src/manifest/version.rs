//! Version manifest text format
//!
//! ```text
//! // optional comments
//! Versions : 1.4
//! Platform : linux
//! Channel : default
//! AssetBundles ui 9af2c1... 1024
//! ```
//!
//! Parsing is tolerant: malformed lines and duplicate package names are
//! reported as warnings and skipped. A manifest is only rejected when a
//! header is missing or no package line parsed.

use std::collections::HashSet;
use std::path::Path;

use crate::error::{Result, fs::read_failed, manifest::parse_failed};

/// File name of the version manifest inside a channel directory
pub const MANIFEST_FILE: &str = "manifest.txt";

const VERSIONS_KEY: &str = "Versions";
const PLATFORM_KEY: &str = "Platform";
const CHANNEL_KEY: &str = "Channel";
const PACKAGE_KEY: &str = "AssetBundles";

/// One archive listed in the manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageEntry {
    pub name: String,
    pub content_hash: String,
    pub size_bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Manifest {
    pub version: String,
    pub platform: String,
    pub channel: String,
    pub packages: Vec<PackageEntry>,
}

/// A parsed manifest together with the problems that were skipped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedManifest {
    pub manifest: Manifest,
    pub warnings: Vec<String>,
}

impl Manifest {
    pub fn new(
        version: impl Into<String>,
        platform: impl Into<String>,
        channel: impl Into<String>,
    ) -> Self {
        Self {
            version: version.into(),
            platform: platform.into(),
            channel: channel.into(),
            packages: Vec::new(),
        }
    }

    /// Entry for package `name`
    pub fn find(&self, name: &str) -> Option<&PackageEntry> {
        self.packages.iter().find(|p| p.name == name)
    }

    /// Parse manifest text.
    ///
    /// # Errors
    ///
    /// Fails when a header is missing or empty, or when no package line
    /// could be parsed.
    pub fn parse(text: &str) -> Result<ParsedManifest> {
        let mut manifest = Manifest::default();
        let mut warnings = Vec::new();
        let mut seen = HashSet::new();

        for (number, raw) in text.lines().enumerate() {
            let line = raw.trim();
            let line_no = number + 1;
            if line.is_empty() || line.starts_with("//") {
                continue;
            }

            if let Some(rest) = line.strip_prefix(PACKAGE_KEY) {
                match parse_package(rest) {
                    Some(entry) => {
                        if seen.insert(entry.name.clone()) {
                            manifest.packages.push(entry);
                        } else {
                            warnings.push(format!(
                                "line {}: duplicate package '{}' ignored",
                                line_no, entry.name
                            ));
                        }
                    }
                    None => warnings.push(format!("line {}: malformed package line: {}", line_no, line)),
                }
                continue;
            }

            let Some((key, value)) = line.split_once(':') else {
                warnings.push(format!("line {}: unrecognized line: {}", line_no, line));
                continue;
            };
            let value = value.trim().to_string();
            match key.trim() {
                VERSIONS_KEY => manifest.version = value,
                PLATFORM_KEY => manifest.platform = value,
                CHANNEL_KEY => manifest.channel = value,
                other => warnings.push(format!("line {}: unknown header '{}'", line_no, other)),
            }
        }

        for warning in &warnings {
            log::warn!("manifest {}", warning);
        }

        for (key, value) in [
            (VERSIONS_KEY, &manifest.version),
            (PLATFORM_KEY, &manifest.platform),
            (CHANNEL_KEY, &manifest.channel),
        ] {
            if value.is_empty() {
                return Err(parse_failed(format!("missing {} header", key)));
            }
        }
        if manifest.packages.is_empty() {
            return Err(parse_failed("no package entries"));
        }

        Ok(ParsedManifest { manifest, warnings })
    }

    /// Read and parse a manifest file
    pub fn load(path: &Path) -> Result<ParsedManifest> {
        let text = std::fs::read_to_string(path).map_err(|e| read_failed(path, e))?;
        Self::parse(&text)
    }

    /// Serialize in the format accepted by [`Manifest::parse`]
    pub fn to_text(&self) -> String {
        let mut text = format!(
            "{} : {}\n{} : {}\n{} : {}\n",
            VERSIONS_KEY, self.version, PLATFORM_KEY, self.platform, CHANNEL_KEY, self.channel
        );
        for entry in &self.packages {
            text.push_str(&format!(
                "{} {} {} {}\n",
                PACKAGE_KEY, entry.name, entry.content_hash, entry.size_bytes
            ));
        }
        text
    }
}

fn parse_package(rest: &str) -> Option<PackageEntry> {
    // The key must be followed by whitespace, not glued to the name
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let fields: Vec<&str> = rest.split_whitespace().collect();
    let [name, hash, size] = fields.as_slice() else {
        return None;
    };
    Some(PackageEntry {
        name: (*name).to_string(),
        content_hash: (*hash).to_string(),
        size_bytes: size.parse().ok()?,
    })
}
