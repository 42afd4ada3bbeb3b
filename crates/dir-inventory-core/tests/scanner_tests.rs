use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tempfile::tempdir;

use dir_inventory_core::patterns::DirectoryAnalyzer;
use dir_inventory_core::scanner::NO_EXTENSION;
use dir_inventory_core::{Error, ProgressReporter, ScanConfig, Scanner, SilentReporter};

/// Layout:
///   root/
///     a.txt                (10 bytes)
///     README               (4 bytes)
///     .env                 (hidden)
///     .git/config          (hidden directory)
///     docs/
///       report.PDF           (20 bytes)
///       drafts/
///         one.md           (5 bytes)
///         scratch.tmp      (3 bytes)
///     build/
///       out.o              (7 bytes)
fn create_test_tree(root: &Path) {
    fs::create_dir_all(root.join("docs/drafts")).unwrap();
    fs::create_dir_all(root.join(".git")).unwrap();
    fs::create_dir_all(root.join("build")).unwrap();
    fs::write(root.join("a.txt"), vec![b'a'; 10]).unwrap();
    fs::write(root.join("README"), b"read").unwrap();
    fs::write(root.join(".env"), b"KEY=1").unwrap();
    fs::write(root.join(".git/config"), b"[core]").unwrap();
    fs::write(root.join("docs/report.PDF"), vec![b'p'; 20]).unwrap();
    fs::write(root.join("docs/drafts/one.md"), b"draft").unwrap();
    fs::write(root.join("docs/drafts/scratch.tmp"), b"tmp").unwrap();
    fs::write(root.join("build/out.o"), vec![b'o'; 7]).unwrap();
}

fn config(include_hidden: bool, ignore: &[&str]) -> ScanConfig {
    ScanConfig {
        max_depth: None,
        follow_symlinks: false,
        ignore_patterns: ignore.iter().map(|g| g.to_string()).collect(),
        include_hidden,
    }
}

fn relative_paths(paths: impl Iterator<Item = PathBuf>) -> BTreeSet<String> {
    paths
        .map(|p| p.to_string_lossy().replace('\\', "/"))
        .collect()
}

#[test]
fn test_totals_match_records_and_extension_stats() {
    let tmp = tempdir().unwrap();
    create_test_tree(tmp.path());

    let outcome = Scanner::new(&config(false, &[]))
        .scan(tmp.path(), &SilentReporter)
        .unwrap();
    let result = &outcome.result;

    assert!(!outcome.interrupted);
    assert!(outcome.warnings.is_empty());
    assert_eq!(result.total_files, result.files.len());
    assert_eq!(result.total_files, 6);
    assert_eq!(
        result.total_size,
        result.extension_stats.values().map(|s| s.total_size).sum::<u64>()
    );
    assert_eq!(result.total_size, 10 + 4 + 20 + 5 + 3 + 7);
    assert_eq!(
        result.extension_stats.values().map(|s| s.count).sum::<usize>(),
        result.total_files
    );

    // extensions are lower-cased; files without one share a sentinel key
    assert_eq!(result.extension_stats["pdf"].count, 1);
    assert_eq!(result.extension_stats[NO_EXTENSION].count, 1);
    assert_eq!(result.extension_stats[NO_EXTENSION].total_size, 4);
}

#[test]
fn test_hidden_entries_are_excluded_by_default() {
    let tmp = tempdir().unwrap();
    create_test_tree(tmp.path());

    let outcome = Scanner::new(&config(false, &[]))
        .scan(tmp.path(), &SilentReporter)
        .unwrap();
    assert!(outcome
        .result
        .files
        .iter()
        .all(|f| !f.name.starts_with('.') && !f.hidden));
    assert!(outcome
        .result
        .directories
        .iter()
        .all(|d| !d.relative_path.starts_with(".git")));

    let outcome = Scanner::new(&config(true, &[]))
        .scan(tmp.path(), &SilentReporter)
        .unwrap();
    let names: Vec<&str> = outcome.result.files.iter().map(|f| f.name.as_str()).collect();
    assert!(names.contains(&".env"));
    assert!(names.contains(&"config"));
    assert_eq!(outcome.result.total_files, 8);
    assert!(outcome
        .result
        .files
        .iter()
        .any(|f| f.name == ".env" && f.hidden));
}

#[test]
fn test_directory_records_are_exactly_the_ancestors() {
    let tmp = tempdir().unwrap();
    create_test_tree(tmp.path());

    let outcome = Scanner::new(&config(false, &[]))
        .scan(tmp.path(), &SilentReporter)
        .unwrap();
    let result = &outcome.result;

    let mut expected = BTreeSet::new();
    for file in &result.files {
        let mut parent = file.relative_path.parent();
        while let Some(dir) = parent {
            if dir.as_os_str().is_empty() {
                break;
            }
            expected.insert(dir.to_path_buf());
            parent = dir.parent();
        }
    }

    let recorded: Vec<PathBuf> = result
        .directories
        .iter()
        .map(|d| d.relative_path.clone())
        .collect();
    let unique: BTreeSet<PathBuf> = recorded.iter().cloned().collect();
    assert_eq!(recorded.len(), unique.len(), "directory records are unique");
    assert_eq!(
        relative_paths(unique.into_iter()),
        relative_paths(expected.into_iter())
    );

    for dir in &result.directories {
        assert_eq!(dir.depth, dir.relative_path.components().count());
        assert_eq!(dir.path, result.root.join(&dir.relative_path));
        let parent = dir.parent_path.as_ref().unwrap();
        assert_eq!(Some(parent.as_path()), dir.path.parent());
    }
}

#[test]
fn test_ignore_globs_skip_files_and_prune_directories() {
    let tmp = tempdir().unwrap();
    create_test_tree(tmp.path());

    let outcome = Scanner::new(&config(false, &["*.tmp", "build"]))
        .scan(tmp.path(), &SilentReporter)
        .unwrap();
    let files = relative_paths(outcome.result.files.iter().map(|f| f.relative_path.clone()));
    assert!(!files.contains("docs/drafts/scratch.tmp"));
    assert!(!files.contains("build/out.o"));
    assert!(files.contains("docs/drafts/one.md"));
    assert!(outcome
        .result
        .directories
        .iter()
        .all(|d| d.relative_path != Path::new("build")));
}

#[test]
fn test_invalid_root_fails_before_traversal() {
    let tmp = tempdir().unwrap();
    let scanner = Scanner::new(&ScanConfig::default());

    let missing = scanner.scan(&tmp.path().join("missing"), &SilentReporter);
    assert!(matches!(missing, Err(Error::InvalidPath { .. })));

    let file = tmp.path().join("plain.txt");
    fs::write(&file, b"x").unwrap();
    let not_dir = scanner.scan(&file, &SilentReporter);
    assert!(matches!(not_dir, Err(Error::InvalidPath { .. })));
}

/// Raises the cancel token once `stop_after` files have been reported.
struct CancelAfter {
    stop_after: usize,
    token: Arc<AtomicBool>,
}

impl ProgressReporter for CancelAfter {
    fn on_scan_progress(&self, files_found: usize, _current_path: &str) {
        if files_found >= self.stop_after {
            self.token.store(true, Ordering::Relaxed);
        }
    }
}

#[test]
fn test_interrupted_scan_returns_partial_result() {
    let tmp = tempdir().unwrap();
    for i in 0..10 {
        fs::write(tmp.path().join(format!("file_{:02}.txt", i)), b"12345").unwrap();
    }

    let token = Arc::new(AtomicBool::new(false));
    let reporter = CancelAfter {
        stop_after: 4,
        token: Arc::clone(&token),
    };
    let outcome = Scanner::new(&ScanConfig::default())
        .with_cancel_token(Arc::clone(&token))
        .scan(tmp.path(), &reporter)
        .unwrap();

    assert!(outcome.interrupted);
    assert_eq!(outcome.result.total_files, 4);
    assert_eq!(outcome.result.files.len(), 4);
    assert_eq!(outcome.result.total_size, 20);
    assert_eq!(outcome.result.files[0].name, "file_00.txt");
}

#[cfg(unix)]
#[test]
fn test_symlink_policy_and_loops() {
    use std::os::unix::fs::symlink;

    let tmp = tempdir().unwrap();
    let root = tmp.path();
    fs::create_dir_all(root.join("a")).unwrap();
    fs::write(root.join("a/file.txt"), b"data").unwrap();
    symlink(root.join("a"), root.join("a/loop")).unwrap();
    symlink(root.join("a/file.txt"), root.join("link.txt")).unwrap();

    let outcome = Scanner::new(&ScanConfig::default())
        .scan(root, &SilentReporter)
        .unwrap();
    let names: Vec<&str> = outcome.result.files.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["file.txt"]);
    assert!(outcome.warnings.is_empty());

    let following = ScanConfig {
        follow_symlinks: true,
        ..ScanConfig::default()
    };
    let outcome = Scanner::new(&following).scan(root, &SilentReporter).unwrap();
    assert!(!outcome.interrupted);
    assert!(outcome
        .result
        .files
        .iter()
        .any(|f| f.name == "link.txt"));
    assert!(!outcome.warnings.is_empty(), "the loop is reported as a warning");
    assert!(outcome.warnings.iter().all(|w| !w.is_access_denied()));
}

/// Locks `dir` and returns false when the current user can still read it
/// (running as root), in which case the caller skips its assertions.
#[cfg(unix)]
fn lock_directory(dir: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(dir, fs::Permissions::from_mode(0o000)).unwrap();
    if fs::read_dir(dir).is_ok() {
        unlock_directory(dir);
        return false;
    }
    true
}

#[cfg(unix)]
fn unlock_directory(dir: &Path) {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(dir, fs::Permissions::from_mode(0o755)).unwrap();
}

#[cfg(unix)]
fn create_locked_tree(root: &Path) {
    fs::create_dir_all(root.join("locked")).unwrap();
    fs::create_dir_all(root.join("open")).unwrap();
    fs::write(root.join("a.txt"), b"a").unwrap();
    fs::write(root.join("locked/secret.txt"), b"secret").unwrap();
    fs::write(root.join("open/b.txt"), b"b").unwrap();
}

#[cfg(unix)]
#[test]
fn test_unreadable_directory_becomes_access_denied_warning() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    create_locked_tree(root);
    let locked = root.join("locked");
    if !lock_directory(&locked) {
        return;
    }

    let outcome = Scanner::new(&ScanConfig::default()).scan(root, &SilentReporter);
    unlock_directory(&locked);
    let outcome = outcome.unwrap();

    assert!(!outcome.interrupted);
    let files = relative_paths(outcome.result.files.iter().map(|f| f.relative_path.clone()));
    assert_eq!(
        files,
        ["a.txt", "open/b.txt"]
            .iter()
            .map(|s| s.to_string())
            .collect::<BTreeSet<String>>()
    );
    assert_eq!(outcome.warnings.len(), 1);
    assert_eq!(outcome.access_denied_count(), 1);
    assert!(outcome.warnings[0].path().ends_with("locked"));
}

#[cfg(unix)]
#[test]
fn test_unreadable_directory_keeps_its_group_with_error() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    create_locked_tree(root);
    let locked = root.join("locked");
    if !lock_directory(&locked) {
        return;
    }

    let groups = DirectoryAnalyzer::new(&ScanConfig::default()).analyze(root);
    unlock_directory(&locked);
    let groups = groups.unwrap();

    assert_eq!(groups.file_count, 1);
    assert_eq!(groups.children.len(), 2);
    let locked_group = groups
        .children
        .iter()
        .find(|g| g.path.ends_with("locked"))
        .unwrap();
    assert!(locked_group.error().is_some());
    assert_eq!(locked_group.file_count, 0);

    let open_group = groups
        .children
        .iter()
        .find(|g| g.path.ends_with("open"))
        .unwrap();
    assert!(open_group.error().is_none());
    assert_eq!(open_group.file_count, 1);
}
