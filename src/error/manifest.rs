//! Manifest errors

use super::PackError;

pub fn parse_failed(reason: impl Into<String>) -> PackError {
    PackError::ManifestParse {
        reason: reason.into(),
    }
}

pub fn asset_map_invalid(path: impl Into<String>, reason: impl ToString) -> PackError {
    PackError::AssetMapParse {
        path: path.into(),
        reason: reason.to_string(),
    }
}

/// Creates an archive mismatch error from `(package, problem)` pairs
pub fn archive_mismatch(problems: &[(String, String)]) -> PackError {
    let details = problems
        .iter()
        .map(|(package, problem)| format!("  {}: {}", package, problem))
        .collect::<Vec<_>>()
        .join("\n");
    PackError::ArchiveMismatch {
        count: problems.len(),
        details,
    }
}
