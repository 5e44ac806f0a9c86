//! Mapping user-supplied path strings onto concrete paths.

use std::path::{Path, PathBuf};

/// Resolves path strings: absolute input as given, relative input under a
/// base directory.
#[derive(Debug, Clone, Default)]
pub struct PathResolver {
    base_dir: Option<PathBuf>,
}

impl PathResolver {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        PathResolver {
            base_dir: Some(base_dir.into()),
        }
    }

    /// Resolver rooted at the user's home directory, if one is known.
    pub fn from_home() -> Self {
        PathResolver {
            base_dir: dirs::home_dir(),
        }
    }

    /// Resolver that only accepts absolute paths.
    pub fn absolute_only() -> Self {
        Self::default()
    }

    pub fn base_dir(&self) -> Option<&Path> {
        self.base_dir.as_deref()
    }

    /// `None` for empty input, or for relative input without a base
    /// directory.
    pub fn resolve(&self, input: &str) -> Option<PathBuf> {
        if input.is_empty() {
            return None;
        }

        let candidate = Path::new(input);
        if candidate.is_absolute() {
            return Some(candidate.to_path_buf());
        }
        self.base_dir.as_ref().map(|base| base.join(candidate))
    }
}
