use super::name::{has_iso_date, parse_name, ParsedName};
use crate::config::ScanConfig;
use crate::error::Result;
use crate::scanner::{validate_root, PathFilter};
use ahash::AHashSet;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const SEQUENTIAL_NUMBERING: &str = "Sequential numbering";
pub const DATE_BASED_NAMING: &str = "Date-based naming";
pub const VERSION_BASED_NAMING: &str = "Version-based naming";

/// Shorter common prefixes are not considered meaningful.
pub const MIN_PREFIX_LEN: usize = 4;

pub const META_ERROR: &str = "error";
pub const META_ENTRY_ERRORS: &str = "entry_errors";
pub const META_PROJECT_CODES: &str = "project_codes";
pub const META_MULTI_PROJECT: &str = "multi_project";

/// Naming summary for one directory, with one child per subdirectory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DirectoryGroup {
    pub path: PathBuf,
    pub pattern: Option<String>,
    pub project_code: Option<String>,
    pub common_prefix: Option<String>,
    pub file_count: usize,
    pub children: Vec<DirectoryGroup>,
    pub metadata: BTreeMap<String, Value>,
}

impl DirectoryGroup {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn is_multi_project(&self) -> bool {
        self.metadata
            .get(META_MULTI_PROJECT)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Every distinct code recorded for a multi-project directory.
    pub fn project_codes(&self) -> Vec<String> {
        self.metadata
            .get(META_PROJECT_CODES)
            .and_then(Value::as_array)
            .map(|codes| {
                codes
                    .iter()
                    .filter_map(|c| c.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn error(&self) -> Option<&str> {
        self.metadata.get(META_ERROR).and_then(Value::as_str)
    }

    /// The group for `path`, searching only the branch that can contain it.
    pub fn find(&self, path: &Path) -> Option<&DirectoryGroup> {
        if self.path == path {
            return Some(self);
        }
        self.children
            .iter()
            .filter(|child| path.starts_with(&child.path))
            .find_map(|child| child.find(path))
    }

    /// Number of groups in this tree, including this one.
    pub fn len(&self) -> usize {
        1 + self.children.iter().map(DirectoryGroup::len).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.file_count == 0 && self.children.is_empty()
    }

    /// This group's own facts without its children.
    pub fn summary(&self) -> Value {
        json!({
            "path": self.path,
            "pattern": self.pattern,
            "project_code": self.project_code,
            "common_prefix": self.common_prefix,
            "file_count": self.file_count,
            "metadata": self.metadata,
        })
    }

    fn record_project_codes(&mut self, codes: &BTreeSet<String>) {
        self.project_code = None;
        self.metadata.insert(META_MULTI_PROJECT.to_string(), json!(true));
        self.metadata
            .insert(META_PROJECT_CODES.to_string(), json!(codes));
    }
}

/// Builds `DirectoryGroup` trees from the filesystem, applying the same
/// filter policy as the traversal.
pub struct DirectoryAnalyzer {
    filter: PathFilter,
}

impl DirectoryAnalyzer {
    pub fn new(config: &ScanConfig) -> Self {
        Self {
            filter: PathFilter::new(config),
        }
    }

    pub fn analyze(&self, root: &Path) -> Result<DirectoryGroup> {
        let root = validate_root(root)?;
        let mut visited = AHashSet::new();
        visited.insert(root.clone());
        let group = self.analyze_dir(&root, &root, &mut visited);
        info!(
            "Analyzed {} directories under {}",
            group.len(),
            root.display()
        );
        Ok(group)
    }

    fn analyze_dir(
        &self,
        root: &Path,
        dir: &Path,
        visited: &mut AHashSet<PathBuf>,
    ) -> DirectoryGroup {
        let mut group = DirectoryGroup::new(dir);

        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(err) => {
                debug!("Error reading directory {}: {}", dir.display(), err);
                group
                    .metadata
                    .insert(META_ERROR.to_string(), json!(err.to_string()));
                return group;
            }
        };

        let mut file_names = Vec::new();
        let mut subdirs = Vec::new();
        let mut entry_errors = Vec::new();

        for entry_result in entries {
            let entry = match entry_result {
                Ok(entry) => entry,
                Err(err) => {
                    entry_errors.push(err.to_string());
                    continue;
                }
            };
            let path = entry.path();
            let file_type = match entry.file_type() {
                Ok(ft) => ft,
                Err(err) => {
                    entry_errors.push(format!("{}: {}", path.display(), err));
                    continue;
                }
            };

            let is_symlink = file_type.is_symlink();
            let (is_dir, is_file) = if is_symlink {
                if !self.filter.follow_symlinks() {
                    continue;
                }
                match fs::metadata(&path) {
                    Ok(meta) => (meta.is_dir(), meta.is_file()),
                    Err(err) => {
                        entry_errors.push(format!("{}: {}", path.display(), err));
                        continue;
                    }
                }
            } else {
                (file_type.is_dir(), file_type.is_file())
            };

            let relative = path.strip_prefix(root).unwrap_or(&path).to_path_buf();
            if is_dir {
                if self.filter.accepts_directory(&path, &relative, is_symlink) {
                    subdirs.push(path);
                }
            } else if is_file && self.filter.accepts_file(&path, &relative, is_symlink) {
                file_names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }

        if !entry_errors.is_empty() {
            group
                .metadata
                .insert(META_ENTRY_ERRORS.to_string(), json!(entry_errors));
        }

        file_names.sort();
        subdirs.sort();

        let parsed: Vec<(String, ParsedName)> = file_names
            .iter()
            .map(|name| {
                let stem = file_stem(name).to_string();
                let parsed = parse_name(&stem);
                (stem, parsed)
            })
            .collect();

        group.file_count = file_names.len();
        group.common_prefix = common_prefix(&file_names);
        group.pattern = detect_naming_pattern(&parsed);

        let codes: BTreeSet<String> = parsed
            .iter()
            .filter_map(|(_, p)| p.project_code.clone())
            .collect();
        match codes.len() {
            0 => {}
            1 => group.project_code = codes.into_iter().next(),
            _ => group.record_project_codes(&codes),
        }

        for subdir in subdirs {
            if self.filter.follow_symlinks() {
                let canonical = fs::canonicalize(&subdir).unwrap_or_else(|_| subdir.clone());
                if !visited.insert(canonical) {
                    debug!("Skipping already visited directory {}", subdir.display());
                    continue;
                }
            }
            let child = self.analyze_dir(root, &subdir, visited);
            group.children.push(child);
        }

        reconcile_project_codes(&mut group);
        group
    }
}

/// Fold child project codes into the parent. Children are complete before
/// this runs; only their summaries are read.
pub fn reconcile_project_codes(group: &mut DirectoryGroup) {
    let mut multi = group.is_multi_project();
    let mut codes: BTreeSet<String> = if multi {
        group.project_codes().into_iter().collect()
    } else {
        group.project_code.iter().cloned().collect()
    };

    for child in &group.children {
        let Some(code) = child.project_code.as_ref() else {
            continue;
        };
        if multi {
            codes.insert(code.clone());
            continue;
        }
        let current = group.project_code.clone();
        match current.as_ref() {
            None => {
                group.project_code = Some(code.clone());
                codes.insert(code.clone());
            }
            Some(existing) if existing == code => {}
            Some(_) => {
                multi = true;
                codes.insert(code.clone());
            }
        }
    }

    if multi {
        group.record_project_codes(&codes);
    }
}

/// Labels for each naming convention the stems satisfy, in evaluation order.
pub fn detect_naming_pattern(parsed: &[(String, ParsedName)]) -> Option<String> {
    let total = parsed.len();
    if total == 0 {
        return None;
    }
    let mut labels = Vec::new();

    let mut sequences: Vec<u64> = parsed.iter().filter_map(|(_, p)| p.sequence).collect();
    sequences.sort_unstable();
    sequences.dedup();
    if let (Some(first), Some(last)) = (sequences.first(), sequences.last()) {
        if sequences.len() == total && (last - first) as usize + 1 == total {
            labels.push(SEQUENTIAL_NUMBERING);
        }
    }

    let dated = parsed.iter().filter(|(stem, _)| has_iso_date(stem)).count();
    if dated * 2 > total {
        labels.push(DATE_BASED_NAMING);
    }

    let versioned = parsed.iter().filter(|(_, p)| p.version.is_some()).count();
    if versioned * 2 > total {
        labels.push(VERSION_BASED_NAMING);
    }

    if labels.is_empty() {
        None
    } else {
        Some(labels.join(" + "))
    }
}

/// Longest common prefix of the smallest and largest name.
pub fn common_prefix(names: &[String]) -> Option<String> {
    let first = names.iter().min()?;
    let last = names.iter().max()?;
    let prefix: String = first
        .chars()
        .zip(last.chars())
        .take_while(|(a, b)| a == b)
        .map(|(a, _)| a)
        .collect();
    if prefix.chars().count() >= MIN_PREFIX_LEN {
        Some(prefix)
    } else {
        None
    }
}

fn file_stem(name: &str) -> &str {
    Path::new(name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(names: &[&str]) -> Vec<(String, ParsedName)> {
        names
            .iter()
            .map(|n| (n.to_string(), parse_name(n)))
            .collect()
    }

    #[test]
    fn test_sequential_numbering() {
        let p = parsed(&["f-a1", "f-b2", "f-c3"]);
        assert_eq!(detect_naming_pattern(&p), None);

        let p = parsed(&["f_1_a", "f_2_a", "f_3_a", "f_4_a", "f_5_a"]);
        assert_eq!(detect_naming_pattern(&p).as_deref(), Some(SEQUENTIAL_NUMBERING));

        let gap = parsed(&["f_1_a", "f_2_a", "f_4_a"]);
        assert_eq!(detect_naming_pattern(&gap), None);

        // a trailing `_<n>` also reads as a version
        let p = parsed(&["f_1", "f_2", "f_3"]);
        assert_eq!(
            detect_naming_pattern(&p).as_deref(),
            Some("Sequential numbering + Version-based naming")
        );
    }

    #[test]
    fn test_labels_compose_in_order() {
        let p = parsed(&["log_2024-01-01_1", "log_2024-01-02_2", "log_2024-01-03_3"]);
        assert_eq!(
            detect_naming_pattern(&p).as_deref(),
            Some("Sequential numbering + Date-based naming + Version-based naming")
        );

        let p = parsed(&["plan_v1", "plan_v2", "notes"]);
        assert_eq!(detect_naming_pattern(&p).as_deref(), Some(VERSION_BASED_NAMING));

        // exactly half is not a majority
        let p = parsed(&["plan_v1", "notes"]);
        assert_eq!(detect_naming_pattern(&p), None);
    }

    #[test]
    fn test_common_prefix() {
        let names = vec![
            "report_b.txt".to_string(),
            "report_a.txt".to_string(),
            "report_c.txt".to_string(),
        ];
        assert_eq!(common_prefix(&names).as_deref(), Some("report_"));

        let short = vec!["abc1".to_string(), "abc2".to_string()];
        assert_eq!(common_prefix(&short), None);

        let exact = vec!["abcd1".to_string(), "abcd2".to_string()];
        assert_eq!(common_prefix(&exact).as_deref(), Some("abcd"));

        assert_eq!(common_prefix(&[]), None);
    }

    #[test]
    fn test_reconcile_inherits_single_child_code() {
        let mut parent = DirectoryGroup::new("/p");
        let mut child = DirectoryGroup::new("/p/a");
        child.project_code = Some("ABC-100".to_string());
        parent.children.push(child);

        reconcile_project_codes(&mut parent);
        assert_eq!(parent.project_code.as_deref(), Some("ABC-100"));
        assert!(!parent.is_multi_project());
    }

    #[test]
    fn test_reconcile_conflicting_children_downgrade_parent() {
        let mut parent = DirectoryGroup::new("/p");
        parent.project_code = Some("ABC-100".to_string());
        for (path, code) in [("/p/a", "ABC-100"), ("/p/b", "XYZ-200")] {
            let mut child = DirectoryGroup::new(path);
            child.project_code = Some(code.to_string());
            parent.children.push(child);
        }

        reconcile_project_codes(&mut parent);
        assert_eq!(parent.project_code, None);
        assert!(parent.is_multi_project());
        assert_eq!(parent.project_codes(), vec!["ABC-100", "XYZ-200"]);
    }

    #[test]
    fn test_find() {
        let mut root = DirectoryGroup::new("/p");
        let mut a = DirectoryGroup::new("/p/a");
        a.children.push(DirectoryGroup::new("/p/a/b"));
        root.children.push(a);
        root.children.push(DirectoryGroup::new("/p/ab"));

        assert_eq!(root.find(Path::new("/p/a/b")).unwrap().path, Path::new("/p/a/b"));
        assert_eq!(root.find(Path::new("/p/ab")).unwrap().path, Path::new("/p/ab"));
        assert!(root.find(Path::new("/q")).is_none());
        assert_eq!(root.len(), 4);
    }
}
