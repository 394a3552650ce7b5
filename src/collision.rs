//! Deterministic name collision resolution
//!
//! Logical asset names and package names must be unique across a build.
//! When two items share a name, each member of the colliding group is renamed
//! to the innermost `depth + 1` segments of its disambiguation path joined
//! with `_`. Rounds repeat with increasing depth until every name is unique
//! or the depth ceiling is reached.
//!
//! ```text
//! round 1:  content/foo.png      -> foo
//!           content/sub/foo.png  -> sub_foo
//! ```

use std::collections::BTreeMap;

use crate::error::{Result, graph::name_conflict};

/// Default ceiling on rename rounds
pub const DEFAULT_MAX_RENAME_DEPTH: usize = 20;

/// Anything that carries a build-wide unique name
pub trait Named {
    fn name(&self) -> &str;

    fn set_name(&mut self, name: String);

    /// `/`-separated path whose trailing segments disambiguate the name
    fn disambiguation_path(&self) -> &str;
}

/// Name derived from the innermost `depth + 1` segments of `path`
pub fn disambiguated_name(path: &str, depth: usize) -> String {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let start = segments.len().saturating_sub(depth + 1);
    segments[start..].join("_").to_lowercase()
}

/// Groups of indices sharing a name, keyed by that name
fn colliding_groups<T: Named>(items: &[T]) -> BTreeMap<String, Vec<usize>> {
    let mut groups: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for (index, item) in items.iter().enumerate() {
        groups
            .entry(item.name().to_lowercase())
            .or_default()
            .push(index);
    }
    groups.retain(|_, indices| indices.len() > 1);
    groups
}

/// Rename items until every name is unique.
///
/// Returns the number of renames performed. Items that never collide keep
/// their names, and running the resolver on an already unique set changes
/// nothing.
///
/// # Errors
///
/// Returns `NameConflict` listing every remaining offender when names are
/// still duplicated after `max_depth` rounds.
pub fn resolve_collisions<T: Named>(items: &mut [T], max_depth: usize) -> Result<usize> {
    let mut renamed = 0;

    for depth in 1..=max_depth {
        let groups = colliding_groups(items);
        if groups.is_empty() {
            return Ok(renamed);
        }

        for indices in groups.values() {
            for &index in indices {
                let candidate = disambiguated_name(items[index].disambiguation_path(), depth);
                if candidate != items[index].name() {
                    log::debug!(
                        "Renaming '{}' to '{}' ({})",
                        items[index].name(),
                        candidate,
                        items[index].disambiguation_path()
                    );
                    items[index].set_name(candidate);
                    renamed += 1;
                }
            }
        }
    }

    let groups = colliding_groups(items);
    if groups.is_empty() {
        return Ok(renamed);
    }

    let offenders: Vec<(String, Vec<String>)> = groups
        .into_iter()
        .map(|(name, indices)| {
            let paths = indices
                .iter()
                .map(|&i| items[i].disambiguation_path().to_string())
                .collect();
            (name, paths)
        })
        .collect();
    Err(name_conflict(max_depth, &offenders))
}
