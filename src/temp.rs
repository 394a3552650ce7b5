//! Atomic file writes
//!
//! Build artifacts are written to a temporary file in the destination
//! directory and renamed into place, so a reader never sees a partial file.

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::error::{Result, fs::write_failed};

/// Write `bytes` to `path`, replacing any existing file
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir).map_err(|e| write_failed(dir, e))?;

    let mut file = NamedTempFile::new_in(dir).map_err(|e| write_failed(path, e))?;
    file.write_all(bytes).map_err(|e| write_failed(path, e))?;
    file.persist(path).map_err(|e| write_failed(path, e.error))?;
    Ok(())
}
