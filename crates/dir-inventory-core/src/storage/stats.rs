use super::migrations::StatsSchema;
use super::models::{ExtensionBreakdown, ScanDetails, ScanStatus, ScanSummary};
use super::sqlite::Store;
use crate::error::{Error, Result};
use crate::scanner::ScanResult;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Scan history without per-file rows: one `scan_results` row per scan
/// and its per-extension totals in `file_types`.
pub struct StatsStore {
    path: PathBuf,
}

impl Store for StatsStore {
    type Schema = StatsSchema;

    fn db_path(&self) -> &Path {
        &self.path
    }
}

impl StatsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Record one scan. Earlier scans of the same root are archived in the
    /// same transaction. Returns the new scan id.
    pub fn save_scan_results(&self, result: &ScanResult, status: ScanStatus) -> Result<i64> {
        let db = self.connect()?;
        let tx = db.connection().unchecked_transaction()?;
        let root = result.root.to_string_lossy();
        let now = chrono::Utc::now().to_rfc3339();

        let archived = tx.execute(
            "UPDATE scan_results SET status = ?1 WHERE root_path = ?2 AND status != ?1",
            params![ScanStatus::Archived, root],
        )?;
        tx.execute(
            "INSERT INTO scan_results (scan_date, root_path, total_files, total_size_bytes, status) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                now,
                root,
                result.total_files as i64,
                result.total_size as i64,
                status
            ],
        )?;
        let scan_id = tx.last_insert_rowid();
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO file_types (scan_id, extension, count, total_size_bytes) \
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for (extension, stat) in &result.extension_stats {
                stmt.execute(params![
                    scan_id,
                    extension,
                    stat.count as i64,
                    stat.total_size as i64
                ])?;
            }
        }
        tx.commit()?;

        if archived > 0 {
            debug!("Archived {} earlier scan(s) of {}", archived, root);
        }
        info!(
            "Saved scan {} for {} ({} files, {} extensions)",
            scan_id,
            root,
            result.total_files,
            result.extension_stats.len()
        );
        Ok(scan_id)
    }

    /// All scans, newest first.
    pub fn list_scans(&self) -> Result<Vec<ScanSummary>> {
        let db = self.connect()?;
        let mut stmt = db.connection().prepare(
            "SELECT id, scan_date, root_path, total_files, total_size_bytes, status \
             FROM scan_results ORDER BY id DESC",
        )?;
        let scans = stmt
            .query_map([], summary_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(scans)
    }

    /// The most recent non-archived scan of `root`, if any.
    pub fn latest_scan_for(&self, root: &Path) -> Result<Option<ScanSummary>> {
        let db = self.connect()?;
        let summary = db
            .connection()
            .query_row(
                "SELECT id, scan_date, root_path, total_files, total_size_bytes, status \
                 FROM scan_results WHERE root_path = ?1 AND status != ?2 \
                 ORDER BY id DESC LIMIT 1",
                params![root.to_string_lossy(), ScanStatus::Archived],
                summary_from_row,
            )
            .optional()?;
        Ok(summary)
    }

    /// One scan with its extension breakdown. Percentages are of the scan's
    /// file count and byte total; both are 0 for an empty scan.
    pub fn get_scan_details(&self, scan_id: i64) -> Result<ScanDetails> {
        let db = self.connect()?;
        let summary = find_summary(db.connection(), scan_id)?
            .ok_or_else(|| Error::NotFound(format!("scan {}", scan_id)))?;

        let mut stmt = db.connection().prepare(
            "SELECT extension, count, total_size_bytes FROM file_types \
             WHERE scan_id = ?1 ORDER BY total_size_bytes DESC, extension",
        )?;
        let extensions = stmt
            .query_map(params![scan_id], |row| {
                let count: i64 = row.get(1)?;
                let total_size_bytes: i64 = row.get(2)?;
                Ok(ExtensionBreakdown {
                    extension: row.get(0)?,
                    count,
                    total_size_bytes,
                    file_percentage: percentage(count, summary.total_files),
                    size_percentage: percentage(total_size_bytes, summary.total_size_bytes),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(ScanDetails {
            summary,
            extensions,
        })
    }
}

fn find_summary(conn: &Connection, scan_id: i64) -> Result<Option<ScanSummary>> {
    let summary = conn
        .query_row(
            "SELECT id, scan_date, root_path, total_files, total_size_bytes, status \
             FROM scan_results WHERE id = ?1",
            params![scan_id],
            summary_from_row,
        )
        .optional()?;
    Ok(summary)
}

pub(crate) fn summary_from_row(row: &Row<'_>) -> rusqlite::Result<ScanSummary> {
    Ok(ScanSummary {
        id: row.get(0)?,
        scan_date: row.get(1)?,
        root_path: row.get(2)?,
        total_files: row.get(3)?,
        total_size_bytes: row.get(4)?,
        status: row.get(5)?,
    })
}

fn percentage(part: i64, whole: i64) -> f64 {
    if whole <= 0 {
        0.0
    } else {
        part as f64 * 100.0 / whole as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::test_file;

    fn sample(root: &Path) -> ScanResult {
        ScanResult::from_files(
            root,
            vec![
                test_file(root, "a.txt", 100),
                test_file(root, "b.txt", 100),
                test_file(root, "docs/c.pdf", 200),
                test_file(root, "README", 0),
            ],
        )
    }

    #[test]
    fn test_scan_details_percentages() {
        let dir = tempfile::tempdir().unwrap();
        let store = StatsStore::new(dir.path().join("stats.db"));
        let root = dir.path().join("tree");
        let id = store
            .save_scan_results(&sample(&root), ScanStatus::Completed)
            .unwrap();

        let details = store.get_scan_details(id).unwrap();
        assert_eq!(details.summary.total_files, 4);
        assert_eq!(details.summary.total_size_bytes, 400);
        assert_eq!(details.extensions.len(), 3);

        let txt = details
            .extensions
            .iter()
            .find(|e| e.extension == "txt")
            .unwrap();
        assert_eq!(txt.count, 2);
        assert!((txt.file_percentage - 50.0).abs() < f64::EPSILON);
        assert!((txt.size_percentage - 50.0).abs() < f64::EPSILON);
        assert!(details
            .extensions
            .iter()
            .any(|e| e.extension == crate::scanner::NO_EXTENSION));
    }

    #[test]
    fn test_unknown_scan_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = StatsStore::new(dir.path().join("stats.db"));
        assert!(matches!(
            store.get_scan_details(42),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_rescan_archives_previous_rows() {
        let dir = tempfile::tempdir().unwrap();
        let store = StatsStore::new(dir.path().join("stats.db"));
        let root = dir.path().join("tree");
        let first = store
            .save_scan_results(&sample(&root), ScanStatus::Completed)
            .unwrap();
        let second = store
            .save_scan_results(&sample(&root), ScanStatus::Completed)
            .unwrap();

        let scans = store.list_scans().unwrap();
        assert_eq!(scans[0].id, second);
        assert_eq!(scans[0].status, ScanStatus::Completed);
        assert_eq!(scans[1].id, first);
        assert_eq!(scans[1].status, ScanStatus::Archived);
        assert_eq!(store.latest_scan_for(&root).unwrap().unwrap().id, second);
    }
}
