use super::filter::{is_hidden_name, PathFilter};
use super::record::{FileRecord, ScanResult, ScanResultBuilder};
use crate::config::ScanConfig;
use crate::error::{Error, Result, ScanWarning};
use crate::progress::{Progress, ProgressReporter};
use chrono::{DateTime, Utc};
use std::fs::{self, Metadata};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

/// What a traversal produced: the records, the entries it had to skip, and
/// whether it stopped early because it was cancelled.
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    pub result: ScanResult,
    pub warnings: Vec<ScanWarning>,
    pub interrupted: bool,
}

impl ScanOutcome {
    pub fn access_denied_count(&self) -> usize {
        self.warnings.iter().filter(|w| w.is_access_denied()).count()
    }
}

/// Recursive directory traversal producing a flat `ScanResult`.
pub struct Scanner {
    filter: PathFilter,
    cancel_token: Arc<AtomicBool>,
}

impl Scanner {
    pub fn new(config: &ScanConfig) -> Self {
        Self {
            filter: PathFilter::new(config),
            cancel_token: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_cancel_token(mut self, token: Arc<AtomicBool>) -> Self {
        self.cancel_token = token;
        self
    }

    pub fn cancel_token(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel_token)
    }

    pub fn filter(&self) -> &PathFilter {
        &self.filter
    }

    /// Walk `root` and collect every file the filter accepts.
    ///
    /// Fails only when `root` is not an existing directory. Unreadable entries
    /// are skipped and reported as warnings; cancellation returns whatever was
    /// collected so far.
    pub fn scan(&self, root: &Path, reporter: &dyn ProgressReporter) -> Result<ScanOutcome> {
        let root = validate_root(root)?;
        info!("Scanning {}", root.display());
        reporter.on_status(
            &format!("Scanning {}", root.display()),
            Progress::Indeterminate,
        );

        let mut builder = ScanResultBuilder::new(root.clone());
        let mut warnings = Vec::new();
        let mut interrupted = false;

        let walker = WalkDir::new(&root)
            .follow_links(self.filter.follow_symlinks())
            .sort_by_file_name()
            .min_depth(1)
            .into_iter()
            .filter_entry(|entry| self.descend_into(&root, entry));

        for entry_result in walker {
            if self.cancel_token.load(Ordering::Relaxed) {
                interrupted = true;
                break;
            }

            let entry = match entry_result {
                Ok(entry) => entry,
                Err(err) => {
                    let warning = walk_warning(&root, err);
                    debug!("{}", warning);
                    reporter.on_warning(&warning);
                    warnings.push(warning);
                    continue;
                }
            };

            if entry.file_type().is_dir() {
                continue;
            }

            let relative = match entry.path().strip_prefix(&root) {
                Ok(rel) => rel.to_path_buf(),
                Err(_) => continue,
            };
            if !self
                .filter
                .accepts_file(entry.path(), &relative, entry.path_is_symlink())
            {
                continue;
            }
            if !entry.file_type().is_file() {
                // sockets, fifos, dangling links
                continue;
            }

            match build_file_record(&entry, relative) {
                Ok(record) => {
                    builder.push_file(record);
                    reporter.on_scan_progress(
                        builder.file_count(),
                        &entry.path().to_string_lossy(),
                    );
                }
                Err(err) => {
                    let warning = io_warning(entry.path().to_path_buf(), &err);
                    debug!("{}", warning);
                    reporter.on_warning(&warning);
                    warnings.push(warning);
                }
            }
        }

        let result = builder.finish();
        if !warnings.is_empty() {
            warn!(
                "{} entries skipped while scanning {} ({} access denied)",
                warnings.len(),
                root.display(),
                warnings.iter().filter(|w| w.is_access_denied()).count()
            );
        }
        if interrupted {
            warn!(
                "Scan of {} interrupted after {} files",
                root.display(),
                result.total_files
            );
        } else {
            info!(
                "Scan of {} complete: {} files, {} directories, {} bytes",
                root.display(),
                result.total_files,
                result.directories.len(),
                result.total_size
            );
        }

        Ok(ScanOutcome {
            result,
            warnings,
            interrupted,
        })
    }

    fn descend_into(&self, root: &Path, entry: &DirEntry) -> bool {
        if !entry.file_type().is_dir() {
            return true;
        }
        match entry.path().strip_prefix(root) {
            Ok(relative) => {
                self.filter
                    .accepts_directory(entry.path(), relative, entry.path_is_symlink())
            }
            Err(_) => true,
        }
    }
}

/// The root must exist and be a directory; it is returned in canonical form.
pub fn validate_root(root: &Path) -> Result<PathBuf> {
    let metadata = fs::metadata(root).map_err(|e| Error::InvalidPath {
        path: root.to_path_buf(),
        reason: e.to_string(),
    })?;
    if !metadata.is_dir() {
        return Err(Error::InvalidPath {
            path: root.to_path_buf(),
            reason: "not a directory".to_string(),
        });
    }
    fs::canonicalize(root).map_err(|e| Error::InvalidPath {
        path: root.to_path_buf(),
        reason: e.to_string(),
    })
}

fn build_file_record(entry: &DirEntry, relative_path: PathBuf) -> io::Result<FileRecord> {
    let metadata = entry.metadata().map_err(io::Error::from)?;
    let name = entry.file_name().to_string_lossy().into_owned();
    let extension = entry
        .path()
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase());
    let (created, modified) = timestamps(&metadata)?;

    Ok(FileRecord {
        hidden: is_hidden_name(&name),
        name,
        path: entry.path().to_path_buf(),
        relative_path,
        extension,
        size: metadata.len(),
        created,
        modified,
    })
}

/// Birth time is not available everywhere; fall back to mtime.
fn timestamps(metadata: &Metadata) -> io::Result<(DateTime<Utc>, DateTime<Utc>)> {
    let modified = metadata.modified()?;
    let created = metadata.created().unwrap_or(modified);
    Ok((DateTime::<Utc>::from(created), DateTime::<Utc>::from(modified)))
}

fn io_warning(path: PathBuf, err: &io::Error) -> ScanWarning {
    if err.kind() == io::ErrorKind::PermissionDenied {
        ScanWarning::AccessDenied {
            path,
            message: err.to_string(),
        }
    } else {
        ScanWarning::Entry {
            path,
            message: err.to_string(),
        }
    }
}

fn walk_warning(root: &Path, err: walkdir::Error) -> ScanWarning {
    let path = err
        .path()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| root.to_path_buf());
    if let Some(ancestor) = err.loop_ancestor() {
        return ScanWarning::Entry {
            path,
            message: format!("filesystem loop back to {}", ancestor.display()),
        };
    }
    match err.io_error() {
        Some(io_err) => io_warning(path, io_err),
        None => ScanWarning::Entry {
            path,
            message: err.to_string(),
        },
    }
}
