//! Glob filters for descriptor sources and ignore lists
//!
//! Patterns without a `/` match the file name alone, so `*.png` selects PNG
//! files at any depth. Patterns with a `/` match the whole relative path.

use wax::{CandidatePath, Glob, Pattern};

use crate::error::{Result, config::invalid as config_invalid};

pub struct PathFilter {
    globs: Vec<(bool, Glob<'static>)>,
}

impl PathFilter {
    pub fn new(patterns: &[String]) -> Result<Self> {
        let globs = patterns
            .iter()
            .map(|pattern| {
                let pattern = pattern.trim().to_lowercase();
                let by_name = !pattern.contains('/');
                Glob::new(&pattern)
                    .map(|glob| (by_name, glob.into_owned()))
                    .map_err(|e| config_invalid(format!("invalid glob '{}': {}", pattern, e)))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { globs })
    }

    pub fn is_empty(&self) -> bool {
        self.globs.is_empty()
    }

    /// True when any pattern matches `relative` (a lowercase `/`-separated path)
    pub fn matches(&self, relative: &str) -> bool {
        let name = crate::naming::file_name(relative);
        self.globs.iter().any(|(by_name, glob)| {
            let candidate = if *by_name { name } else { relative };
            glob.matched(&CandidatePath::from(candidate)).is_some()
        })
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;

    fn filter(patterns: &[&str]) -> PathFilter {
        let patterns: Vec<String> = patterns.iter().map(|p| (*p).to_string()).collect();
        PathFilter::new(&patterns).expect("valid globs")
    }

    #[test]
    fn test_name_patterns_match_at_any_depth() {
        let f = filter(&["*.png"]);
        assert!(f.matches("a.png"));
        assert!(f.matches("sub/deep/a.png"));
        assert!(!f.matches("sub/a.wav"));
    }

    #[test]
    fn test_path_patterns_match_relative_path() {
        let f = filter(&["icons/**/*.png"]);
        assert!(f.matches("icons/small/a.png"));
        assert!(!f.matches("other/a.png"));
    }

    #[test]
    fn test_patterns_are_case_insensitive() {
        let f = filter(&["*.PNG"]);
        assert!(f.matches("a.png"));
    }

    #[test]
    fn test_invalid_glob() {
        assert!(PathFilter::new(&["a/**b/[".to_string()]).is_err());
    }
}
