//! Naming, dependency and cycle errors
//!
//! These constructors format multi-item diagnostics so every offending
//! item appears in the error, one per line.

use super::PackError;

/// Creates a name conflict error from `(name, paths)` groups
pub fn name_conflict(rounds: usize, groups: &[(String, Vec<String>)]) -> PackError {
    let details = groups
        .iter()
        .map(|(name, paths)| format!("  {}: {}", name, paths.join(", ")))
        .collect::<Vec<_>>()
        .join("\n");
    PackError::NameConflict { rounds, details }
}

/// Creates a missing dependency error from `(referrer, missing)` pairs
pub fn missing_dependencies(missing: &[(String, String)]) -> PackError {
    let details = missing
        .iter()
        .map(|(referrer, target)| format!("  {} -> {}", referrer, target))
        .collect::<Vec<_>>()
        .join("\n");
    PackError::MissingDependency {
        count: missing.len(),
        details,
    }
}

fn format_cycles(cycles: &[Vec<String>]) -> String {
    cycles
        .iter()
        .map(|cycle| format!("  {}", cycle.join(" -> ")))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn asset_cycles(cycles: &[Vec<String>]) -> PackError {
    PackError::AssetCycle {
        chain: format_cycles(cycles),
    }
}

/// Creates a package cycle error; `attribution` lines name the asset
/// references that create each package edge.
pub fn package_cycles(cycles: &[Vec<String>], attribution: &[String]) -> PackError {
    let mut chain = format_cycles(cycles);
    for line in attribution {
        chain.push_str("\n    ");
        chain.push_str(line);
    }
    PackError::PackageCycle { chain }
}
