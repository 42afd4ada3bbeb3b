use crate::config::AppConfig;
use crate::error::Result;
use crate::metadata::{EnrichedFile, MetadataEngine, PatternStat};
use crate::patterns::{DirectoryAnalyzer, DirectoryGroup};
use crate::progress::{ChannelReporter, PipelineEvent, Progress, ProgressReporter};
use crate::scanner::{ScanOutcome, ScanResult, Scanner};
use crate::storage::{MetadataCatalog, PlainCatalog, ScanStatus, StatsStore};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const TOP_PATTERNS: usize = 5;

/// Runs the scan-and-persist pipeline: traverse, record statistics,
/// analyze directory naming, tag files, write both catalogs.
pub struct ScanEngine {
    config: AppConfig,
    cancel_token: Arc<AtomicBool>,
    metadata: MetadataEngine,
}

#[derive(Debug)]
pub struct ScanReport {
    pub root: PathBuf,
    pub status: ScanStatus,
    pub scan_id: i64,
    pub catalog_id: i64,
    pub metadata_catalog_id: i64,
    pub total_files: usize,
    pub total_size: u64,
    pub total_directories: usize,
    pub warnings: usize,
    pub access_denied: usize,
    pub top_patterns: Vec<PatternStat>,
    pub scan_duration: Duration,
    pub analysis_duration: Duration,
    pub db_write_duration: Duration,
}

impl ScanReport {
    pub fn summary(&self) -> String {
        let mut text = format!(
            "{} files ({} bytes) in {} directories, status {}",
            self.total_files, self.total_size, self.total_directories, self.status
        );
        if self.warnings > 0 {
            text.push_str(&format!(
                ", {} entries skipped ({} access denied)",
                self.warnings, self.access_denied
            ));
        }
        text
    }
}

impl ScanEngine {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            cancel_token: Arc::new(AtomicBool::new(false)),
            metadata: MetadataEngine::new(),
        }
    }

    pub fn with_stats_db_path(mut self, path: &str) -> Self {
        self.config.stats_db_path = path.to_string();
        self
    }

    pub fn with_catalog_db_path(mut self, path: &str) -> Self {
        self.config.catalog_db_path = path.to_string();
        self
    }

    pub fn with_metadata_db_path(mut self, path: &str) -> Self {
        self.config.metadata_db_path = path.to_string();
        self
    }

    pub fn with_cancel_token(mut self, token: Arc<AtomicBool>) -> Self {
        self.cancel_token = token;
        self
    }

    /// Setting the token stops the traversal at the next entry. The token is
    /// cleared when the run it stopped finishes, so the engine can scan again.
    pub fn cancel_token(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel_token)
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn stats_store(&self) -> StatsStore {
        StatsStore::new(&self.config.stats_db_path)
    }

    pub fn catalog_store(&self) -> PlainCatalog {
        PlainCatalog::new(&self.config.catalog_db_path)
    }

    pub fn metadata_store(&self) -> MetadataCatalog {
        MetadataCatalog::new(&self.config.metadata_db_path)
    }

    /// Tag statistics gathered over every scan this engine has run.
    pub fn metadata_engine(&self) -> &MetadataEngine {
        &self.metadata
    }

    /// Traversal only, nothing is persisted.
    pub fn traverse(&self, root: &Path, reporter: &dyn ProgressReporter) -> Result<ScanOutcome> {
        Scanner::new(&self.config.scan)
            .with_cancel_token(self.cancel_token())
            .scan(root, reporter)
    }

    /// Run the full pipeline on `root`:
    /// 1. Traverse the tree (cancellable; a cancelled scan is saved as `partial`)
    /// 2. Save scan statistics
    /// 3. Analyze directory naming and tag every file
    /// 4. Write the plain and metadata catalogs in batches
    pub fn scan(&mut self, root: &Path, reporter: &dyn ProgressReporter) -> Result<ScanReport> {
        let report = self.run_pipeline(root, reporter);
        if self.cancel_token.swap(false, Ordering::Relaxed) {
            debug!("Cleared cancel request after scan of {}", root.display());
        }
        report
    }

    fn run_pipeline(
        &mut self,
        root: &Path,
        reporter: &dyn ProgressReporter,
    ) -> Result<ScanReport> {
        // Phase 1: Traverse
        let scan_start = Instant::now();
        let outcome = self.traverse(root, reporter)?;
        let scan_duration = scan_start.elapsed();

        let status = if outcome.interrupted {
            ScanStatus::Partial
        } else {
            ScanStatus::Completed
        };
        let ScanOutcome {
            result, warnings, ..
        } = &outcome;
        debug!(
            "Traversal completed in {:.2}s: {} files, {} directories, {} warnings",
            scan_duration.as_secs_f64(),
            result.total_files,
            result.directories.len(),
            warnings.len(),
        );
        if outcome.interrupted {
            warn!(
                "Scan of {} was interrupted after {} files",
                result.root.display(),
                result.total_files
            );
        }

        // Phase 2: Statistics
        let db_start = Instant::now();
        reporter.on_status("Saving scan statistics", Progress::Percent(40.0));
        let scan_id = self.stats_store().save_scan_results(result, status)?;
        let mut db_write_duration = db_start.elapsed();

        // Phase 3: Directory patterns and tags
        let analysis_start = Instant::now();
        let groups = self.analyze_directories(result, outcome.interrupted, reporter);
        reporter.on_status("Tagging files", Progress::Percent(60.0));
        let enriched = self.enrich(result, groups.as_ref());
        let analysis_duration = analysis_start.elapsed();
        debug!(
            "Analysis completed in {:.2}s: {} directory groups",
            analysis_duration.as_secs_f64(),
            groups.as_ref().map(DirectoryGroup::len).unwrap_or(0),
        );

        // Phase 4: Catalogs
        let db_start = Instant::now();
        reporter.on_status("Writing catalog", Progress::Percent(75.0));
        let catalog_id = self.catalog_store().create_catalog(result, status, reporter)?;
        reporter.on_status("Writing metadata catalog", Progress::Percent(90.0));
        let metadata_catalog_id = self.metadata_store().create_catalog_with_metadata(
            result,
            &enriched,
            status,
            reporter,
        )?;
        db_write_duration += db_start.elapsed();

        let report = ScanReport {
            root: result.root.clone(),
            status,
            scan_id,
            catalog_id,
            metadata_catalog_id,
            total_files: result.total_files,
            total_size: result.total_size,
            total_directories: result.directories.len(),
            warnings: warnings.len(),
            access_denied: outcome.access_denied_count(),
            top_patterns: self.metadata.most_common_patterns(TOP_PATTERNS),
            scan_duration,
            analysis_duration,
            db_write_duration,
        };

        info!("Scan of {} finished: {}", report.root.display(), report.summary());
        reporter.on_status("Done", Progress::Percent(100.0));
        reporter.on_complete(&report.summary());
        Ok(report)
    }

    /// Run [`scan`](Self::scan) on a worker thread. Progress arrives on the
    /// returned channel, which closes when the worker finishes.
    pub fn spawn(
        mut self,
        root: PathBuf,
    ) -> (JoinHandle<Result<ScanReport>>, Receiver<PipelineEvent>) {
        let (sender, receiver) = mpsc::channel();
        let handle = thread::spawn(move || {
            let reporter = ChannelReporter::new(sender);
            self.scan(&root, &reporter)
        });
        (handle, receiver)
    }

    /// Directory groups for the scanned tree. Skipped for an interrupted
    /// scan, and a failure here only loses the directory-derived tags.
    fn analyze_directories(
        &self,
        result: &ScanResult,
        interrupted: bool,
        reporter: &dyn ProgressReporter,
    ) -> Option<DirectoryGroup> {
        if interrupted || self.cancel_token.load(Ordering::Relaxed) {
            debug!("Skipping directory analysis for interrupted scan");
            return None;
        }
        reporter.on_status("Analyzing directory patterns", Progress::Percent(50.0));
        match DirectoryAnalyzer::new(&self.config.scan).analyze(&result.root) {
            Ok(group) => Some(group),
            Err(e) => {
                warn!("Directory analysis of {} failed: {}", result.root.display(), e);
                None
            }
        }
    }

    fn enrich(&mut self, result: &ScanResult, groups: Option<&DirectoryGroup>) -> Vec<EnrichedFile> {
        result
            .files
            .iter()
            .map(|file| {
                let group = groups.and_then(|root| file.directory().and_then(|dir| root.find(dir)));
                self.metadata.enrich(file, group)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::SilentReporter;
    use std::fs;

    fn engine_in(dir: &Path) -> ScanEngine {
        ScanEngine::new(AppConfig::default())
            .with_stats_db_path(&dir.join("stats.db").to_string_lossy())
            .with_catalog_db_path(&dir.join("catalog.db").to_string_lossy())
            .with_metadata_db_path(&dir.join("metadata.db").to_string_lossy())
    }

    #[test]
    fn test_scan_writes_all_stores() {
        let dbs = tempfile::tempdir().unwrap();
        let tree = tempfile::tempdir().unwrap();
        fs::create_dir_all(tree.path().join("sheets")).unwrap();
        fs::write(tree.path().join("sheets/plan_1.pdf"), b"one").unwrap();
        fs::write(tree.path().join("sheets/plan_2.pdf"), b"two").unwrap();
        fs::write(tree.path().join("readme.txt"), b"hello").unwrap();

        let mut engine = engine_in(dbs.path());
        let report = engine.scan(tree.path(), &SilentReporter).unwrap();

        assert_eq!(report.status, ScanStatus::Completed);
        assert_eq!(report.total_files, 3);
        assert_eq!(report.total_size, 11);
        assert_eq!(report.total_directories, 1);

        let details = engine.stats_store().get_scan_details(report.scan_id).unwrap();
        assert_eq!(details.summary.total_files, 3);
        let files = engine
            .catalog_store()
            .get_catalog_files(report.catalog_id, None)
            .unwrap();
        assert_eq!(files.len(), 3);

        let row = engine
            .metadata_store()
            .get_file_metadata(report.metadata_catalog_id, "sheets/plan_1.pdf")
            .unwrap();
        assert!(row.has_tag("dir-pattern:Sequential numbering"));
        assert!(row.directory_info.is_some());
    }

    #[test]
    fn test_engine_scans_again_after_cancelled_run() {
        let dbs = tempfile::tempdir().unwrap();
        let tree = tempfile::tempdir().unwrap();
        for name in ["a.txt", "b.txt", "c.txt"] {
            fs::write(tree.path().join(name), b"data").unwrap();
        }

        let mut engine = engine_in(dbs.path());
        let first = engine.scan(tree.path(), &SilentReporter).unwrap();
        assert_eq!(first.total_files, 3);

        engine.cancel_token().store(true, Ordering::Relaxed);
        let cancelled = engine.scan(tree.path(), &SilentReporter).unwrap();
        assert_eq!(cancelled.status, ScanStatus::Partial);
        assert_eq!(cancelled.total_files, 0);
        assert!(!engine.cancel_token().load(Ordering::Relaxed));

        let again = engine.scan(tree.path(), &SilentReporter).unwrap();
        assert_eq!(again.status, ScanStatus::Completed);
        assert_eq!(again.total_files, 3);

        let latest = engine
            .stats_store()
            .latest_scan_for(&again.root)
            .unwrap()
            .unwrap();
        assert_eq!(latest.id, again.scan_id);
        assert_eq!(latest.total_files, 3);
    }

    #[test]
    fn test_missing_root_fails_before_writing() {
        let dbs = tempfile::tempdir().unwrap();
        let mut engine = engine_in(dbs.path());
        let missing = dbs.path().join("does-not-exist");
        assert!(engine.scan(&missing, &SilentReporter).is_err());
        assert!(!dbs.path().join("stats.db").exists());
    }
}
