use ahash::AHashSet;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Extension statistics key for files without an extension.
pub const NO_EXTENSION: &str = "(no extension)";

/// A file observed during one scan pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub name: String,
    pub path: PathBuf,
    pub relative_path: PathBuf,
    /// Lower-cased, without the leading dot.
    pub extension: Option<String>,
    pub size: u64,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
    pub hidden: bool,
}

impl FileRecord {
    /// File name without its final extension.
    pub fn stem(&self) -> &str {
        Path::new(&self.name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(&self.name)
    }

    pub fn directory(&self) -> Option<&Path> {
        self.path.parent()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryRecord {
    pub path: PathBuf,
    pub relative_path: PathBuf,
    pub depth: usize,
    pub parent_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionStat {
    pub count: usize,
    pub total_size: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    pub root: PathBuf,
    pub total_files: usize,
    pub total_size: u64,
    pub files: Vec<FileRecord>,
    pub directories: Vec<DirectoryRecord>,
    pub extension_stats: BTreeMap<String, ExtensionStat>,
}

impl ScanResult {
    /// Assemble a result from already-built file records, deriving the
    /// directory records and extension statistics the same way a scan does.
    pub fn from_files(root: impl Into<PathBuf>, files: Vec<FileRecord>) -> Self {
        let mut builder = ScanResultBuilder::new(root.into());
        for file in files {
            builder.push_file(file);
        }
        builder.finish()
    }

    pub fn extension_key(extension: Option<&str>) -> &str {
        extension.unwrap_or(NO_EXTENSION)
    }
}

/// Accumulates records while a scan is in progress. Directory records are
/// created the first time a file below them is pushed.
pub(crate) struct ScanResultBuilder {
    root: PathBuf,
    files: Vec<FileRecord>,
    directories: Vec<DirectoryRecord>,
    seen_dirs: AHashSet<PathBuf>,
    extension_stats: BTreeMap<String, ExtensionStat>,
    total_size: u64,
}

impl ScanResultBuilder {
    pub(crate) fn new(root: PathBuf) -> Self {
        Self {
            root,
            files: Vec::new(),
            directories: Vec::new(),
            seen_dirs: AHashSet::new(),
            extension_stats: BTreeMap::new(),
            total_size: 0,
        }
    }

    pub(crate) fn file_count(&self) -> usize {
        self.files.len()
    }

    pub(crate) fn push_file(&mut self, file: FileRecord) {
        self.register_ancestors(&file.relative_path);

        let key = ScanResult::extension_key(file.extension.as_deref()).to_string();
        let stat = self.extension_stats.entry(key).or_default();
        stat.count += 1;
        stat.total_size += file.size;
        self.total_size += file.size;

        self.files.push(file);
    }

    fn register_ancestors(&mut self, relative: &Path) {
        let Some(parent) = relative.parent() else {
            return;
        };

        let mut current = PathBuf::new();
        for component in parent.components() {
            let parent_abs = self.root.join(&current);
            current.push(component);
            let abs = self.root.join(&current);
            if self.seen_dirs.insert(abs.clone()) {
                self.directories.push(DirectoryRecord {
                    path: abs,
                    relative_path: current.clone(),
                    depth: current.components().count(),
                    parent_path: Some(parent_abs),
                });
            }
        }
    }

    pub(crate) fn finish(self) -> ScanResult {
        ScanResult {
            root: self.root,
            total_files: self.files.len(),
            total_size: self.total_size,
            files: self.files,
            directories: self.directories,
            extension_stats: self.extension_stats,
        }
    }
}

#[cfg(test)]
pub(crate) fn test_file(root: &Path, relative: &str, size: u64) -> FileRecord {
    let relative_path = PathBuf::from(relative);
    let name = relative_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = relative_path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase());
    let now = Utc::now();
    FileRecord {
        hidden: name.starts_with('.'),
        name,
        path: root.join(&relative_path),
        relative_path,
        extension,
        size,
        created: now,
        modified: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ancestors_are_deduplicated_in_insertion_order() {
        let root = PathBuf::from("/scan");
        let result = ScanResult::from_files(
            &root,
            vec![
                test_file(&root, "a/b/one.txt", 10),
                test_file(&root, "a/two.txt", 20),
                test_file(&root, "a/b/c/three.txt", 30),
                test_file(&root, "top.txt", 40),
            ],
        );

        let rels: Vec<_> = result
            .directories
            .iter()
            .map(|d| d.relative_path.to_string_lossy().into_owned())
            .collect();
        assert_eq!(rels, vec!["a", "a/b", "a/b/c"]);
        assert_eq!(result.directories[0].depth, 1);
        assert_eq!(result.directories[2].depth, 3);
        assert_eq!(result.directories[0].parent_path.as_deref(), Some(root.as_path()));
        assert_eq!(
            result.directories[1].parent_path.as_deref(),
            Some(Path::new("/scan/a"))
        );
    }

    #[test]
    fn test_totals_match_extension_stats() {
        let root = PathBuf::from("/scan");
        let result = ScanResult::from_files(
            &root,
            vec![
                test_file(&root, "a.PDF", 100),
                test_file(&root, "b.pdf", 50),
                test_file(&root, "Makefile", 7),
            ],
        );

        assert_eq!(result.total_files, result.files.len());
        let sum: u64 = result.extension_stats.values().map(|s| s.total_size).sum();
        assert_eq!(result.total_size, sum);
        assert_eq!(result.extension_stats["pdf"].count, 2);
        assert_eq!(result.extension_stats[NO_EXTENSION].total_size, 7);
    }

    #[test]
    fn test_stem() {
        let root = PathBuf::from("/scan");
        let file = test_file(&root, "ABC-1234_v2.1.dwg", 1);
        assert_eq!(file.stem(), "ABC-1234_v2.1");
    }
}
