//! Package archives
//!
//! One archive file per package, named after the package and written to the
//! channel directory. The file is a bincode encoding of [`PackageArchive`].
//! Archiving goes through the [`Archiver`] trait so a platform-native
//! archiver can replace [`PackFileArchiver`].

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::ResourceNode;
use crate::error::{PackError, Result, fs::read_failed};
use crate::temp::write_atomic;

/// Bumped whenever the archive layout changes
pub const ARCHIVE_FORMAT_VERSION: u32 = 1;

/// Compression label carried in each archive header.
///
/// The pack file archiver always stores payloads uncompressed; any other
/// value is a request passed through to the consumer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    #[default]
    None,
    Chunked,
    Lz4,
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Compression::None => "none",
            Compression::Chunked => "chunked",
            Compression::Lz4 => "lz4",
        };
        f.write_str(label)
    }
}

impl FromStr for Compression {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" | "uncompressed" => Ok(Compression::None),
            "chunked" | "chunk" => Ok(Compression::Chunked),
            "lz4" => Ok(Compression::Lz4),
            other => Err(format!(
                "unknown compression '{}', expected none, chunked or lz4",
                other
            )),
        }
    }
}

/// One asset stored in an archive
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Logical name
    pub name: String,
    /// Canonical source path
    pub path: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PackageArchive {
    pub format_version: u32,
    pub name: String,
    /// Packages this one references directly
    pub dependencies: Vec<String>,
    pub compression: Compression,
    pub entries: Vec<ArchiveEntry>,
}

impl PackageArchive {
    pub fn new(name: impl Into<String>, dependencies: Vec<String>, compression: Compression) -> Self {
        Self {
            format_version: ARCHIVE_FORMAT_VERSION,
            name: name.into(),
            dependencies,
            compression,
            entries: Vec::new(),
        }
    }

    /// Entry by logical name (case-insensitive)
    pub fn entry(&self, name: &str) -> Option<&ArchiveEntry> {
        self.entries
            .iter()
            .find(|e| e.name.eq_ignore_ascii_case(name))
    }

    pub fn encode(&self) -> std::result::Result<Vec<u8>, String> {
        bincode::serde::encode_to_vec(self, bincode::config::standard()).map_err(|e| e.to_string())
    }

    pub fn decode(bytes: &[u8]) -> std::result::Result<Self, String> {
        let (archive, _): (Self, usize) =
            bincode::serde::decode_from_slice(bytes, bincode::config::standard())
                .map_err(|e| e.to_string())?;
        if archive.format_version != ARCHIVE_FORMAT_VERSION {
            return Err(format!(
                "unsupported archive format version {}",
                archive.format_version
            ));
        }
        Ok(archive)
    }
}

/// Everything needed to archive one package
#[derive(Debug)]
pub struct ArchiveRequest<'a> {
    pub package: &'a str,
    pub dependencies: Vec<String>,
    pub compression: Compression,
    pub assets: Vec<&'a ResourceNode>,
}

/// Writes package archives
pub trait Archiver {
    /// Write the archive for `request` into `out_dir`, returning its path
    fn archive(&self, request: &ArchiveRequest<'_>, out_dir: &Path) -> Result<PathBuf>;
}

/// Default archiver producing bincode pack files
#[derive(Debug, Default, Clone, Copy)]
pub struct PackFileArchiver;

impl Archiver for PackFileArchiver {
    fn archive(&self, request: &ArchiveRequest<'_>, out_dir: &Path) -> Result<PathBuf> {
        let failed = |reason: String| PackError::ArchiveFailed {
            package: request.package.to_string(),
            reason,
        };

        let mut archive = PackageArchive::new(
            request.package,
            request.dependencies.clone(),
            request.compression,
        );
        for node in &request.assets {
            let data =
                std::fs::read(&node.source_file).map_err(|e| read_failed(&node.source_file, e))?;
            archive.entries.push(ArchiveEntry {
                name: node.logical_name.clone(),
                path: node.path.clone(),
                data,
            });
        }

        let bytes = archive.encode().map_err(failed)?;
        let target = out_dir.join(request.package);
        write_atomic(&target, &bytes)?;

        log::debug!(
            "Archived {} ({} assets, {} bytes)",
            request.package,
            archive.entries.len(),
            bytes.len()
        );
        Ok(target)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_compression_parse_and_display() {
        assert_eq!("LZ4".parse::<Compression>(), Ok(Compression::Lz4));
        assert_eq!("none".parse::<Compression>(), Ok(Compression::None));
        assert!("zip".parse::<Compression>().is_err());
        assert_eq!(Compression::Chunked.to_string(), "chunked");
        assert_eq!(Compression::default(), Compression::None);
    }

    #[test]
    fn test_pack_file_archiver_writes_decodable_archive() {
        let temp = TempDir::new().expect("temp dir");
        let source = temp.path().join("button.txt");
        std::fs::write(&source, "hello").expect("write");
        let node = ResourceNode::new("content/ui/button.txt", source, "button", "ui/button", "ui");

        let out = temp.path().join("out");
        std::fs::create_dir(&out).expect("mkdir");
        let request = ArchiveRequest {
            package: "ui",
            dependencies: vec!["shared".to_string()],
            compression: Compression::None,
            assets: vec![&node],
        };
        let path = PackFileArchiver.archive(&request, &out).expect("archive");
        assert_eq!(path, out.join("ui"));

        let archive =
            PackageArchive::decode(&std::fs::read(&path).expect("read")).expect("decode");
        assert_eq!(archive.name, "ui");
        assert_eq!(archive.dependencies, ["shared"]);
        assert_eq!(archive.entry("BUTTON").map(|e| e.data.as_slice()), Some(&b"hello"[..]));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(PackageArchive::decode(b"definitely not an archive").is_err());
    }

    #[test]
    fn test_decode_rejects_future_version() {
        let mut archive = PackageArchive::new("x", Vec::new(), Compression::None);
        archive.format_version = ARCHIVE_FORMAT_VERSION + 1;
        let bytes = archive.encode().expect("encode");
        assert!(PackageArchive::decode(&bytes).is_err());
    }
}
