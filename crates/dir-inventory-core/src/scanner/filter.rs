use crate::config::ScanConfig;
use glob::Pattern;
use std::path::{Component, Path};
use tracing::error;

/// Leading character that marks a file or directory as hidden.
pub const HIDDEN_MARKER: char = '.';

pub fn is_hidden_name(name: &str) -> bool {
    name.starts_with(HIDDEN_MARKER)
}

/// Decides whether a path is kept by a scan: hidden policy, ignore globs and
/// symlink policy. Holds only the compiled form of the configuration.
#[derive(Debug, Clone)]
pub struct PathFilter {
    ignore_patterns: Vec<Pattern>,
    include_hidden: bool,
    follow_symlinks: bool,
}

impl PathFilter {
    pub fn new(config: &ScanConfig) -> Self {
        let ignore_patterns = config
            .ignore_patterns
            .iter()
            .filter_map(|glob| match Pattern::new(glob) {
                Ok(p) => Some(p),
                Err(e) => {
                    error!("Invalid glob pattern '{}': {}", glob, e);
                    None
                }
            })
            .collect();

        Self {
            ignore_patterns,
            include_hidden: config.include_hidden,
            follow_symlinks: config.follow_symlinks,
        }
    }

    pub fn follow_symlinks(&self) -> bool {
        self.follow_symlinks
    }

    /// Whether a file at `path` (`relative` to the scan root) is kept.
    pub fn accepts_file(&self, path: &Path, relative: &Path, is_symlink: bool) -> bool {
        if is_symlink && !self.follow_symlinks {
            return false;
        }
        !self.is_hidden(relative) && !self.is_ignored(path, relative)
    }

    /// Whether traversal descends into the directory at `path`.
    pub fn accepts_directory(&self, path: &Path, relative: &Path, is_symlink: bool) -> bool {
        self.accepts_file(path, relative, is_symlink)
    }

    /// True when any component below the root is hidden and hidden entries
    /// are excluded.
    pub fn is_hidden(&self, relative: &Path) -> bool {
        if self.include_hidden {
            return false;
        }
        relative.components().any(|component| match component {
            Component::Normal(name) => is_hidden_name(&name.to_string_lossy()),
            _ => false,
        })
    }

    /// Each glob is tested against the absolute path, the root-relative path
    /// and the bare file name.
    pub fn is_ignored(&self, path: &Path, relative: &Path) -> bool {
        let file_name = path.file_name().map(Path::new);
        self.ignore_patterns.iter().any(|pattern| {
            pattern.matches_path(path)
                || pattern.matches_path(relative)
                || file_name.is_some_and(|name| pattern.matches_path(name))
        })
    }
}
