//! Per-file catalogs.
//!
//! A catalog is written as one parent row followed by its directory and
//! file rows in chunks of [`BATCH_SIZE`]. Each chunk commits on its own, so
//! a failure loses at most the chunk that failed; the parent row is then
//! marked `incomplete`.

use super::migrations::{CatalogSchema, MetadataSchema, Schema};
use super::models::{CatalogDirectory, CatalogFile, DirectoryTreeNode, ScanStatus, ScanSummary};
use super::sqlite::Store;
use super::stats::summary_from_row;
use crate::error::{Error, Result};
use crate::progress::ProgressReporter;
use crate::scanner::{DirectoryRecord, FileRecord, ScanResult};
use ahash::AHashMap;
use rusqlite::{params, Connection, OptionalExtension, Row, Statement};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

pub const BATCH_SIZE: usize = 1000;

pub const DIRECTORIES_TABLE: &str = "directories";
pub const FILES_TABLE: &str = "files";

/// Catalog store over schema `S`. The plain and metadata variants share
/// every query; the metadata variant adds the operations in
/// [`super::metadata`].
pub struct CatalogStore<S: Schema> {
    path: PathBuf,
    schema: PhantomData<S>,
}

pub type PlainCatalog = CatalogStore<CatalogSchema>;
pub type MetadataCatalog = CatalogStore<MetadataSchema>;

impl<S: Schema> Store for CatalogStore<S> {
    type Schema = S;

    fn db_path(&self) -> &Path {
        &self.path
    }
}

impl<S: Schema> CatalogStore<S> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            schema: PhantomData,
        }
    }

    /// Persist a scan as a new catalog. Returns the catalog id.
    ///
    /// On a failed batch the catalog row is marked `incomplete`, the rows of
    /// earlier batches stay in place, and the batch error is returned.
    pub fn create_catalog(
        &self,
        result: &ScanResult,
        status: ScanStatus,
        reporter: &dyn ProgressReporter,
    ) -> Result<i64> {
        self.persist(result, status, reporter, |conn, catalog_id| {
            write_batches(
                conn,
                FILES_TABLE,
                INSERT_FILE,
                &result.files,
                reporter,
                |stmt, file| insert_file(stmt, catalog_id, file),
            )
        })
    }

    /// Shared write path: parent row, directories, then the file rows
    /// produced by `write_files`.
    pub(crate) fn persist<F>(
        &self,
        result: &ScanResult,
        status: ScanStatus,
        reporter: &dyn ProgressReporter,
        write_files: F,
    ) -> Result<i64>
    where
        F: FnOnce(&Connection, i64) -> Result<usize>,
    {
        let db = self.connect()?;
        let conn = db.connection();
        let catalog_id = insert_catalog(conn, result, status)?;
        debug!(
            "Created catalog {} for {} in {} schema",
            catalog_id,
            result.root.display(),
            S::NAME
        );

        let written = write_batches(
            conn,
            DIRECTORIES_TABLE,
            INSERT_DIRECTORY,
            &result.directories,
            reporter,
            |stmt, dir| insert_directory(stmt, catalog_id, dir),
        )
        .and_then(|directories| write_files(conn, catalog_id).map(|files| (directories, files)));

        match written {
            Ok((directories, files)) => {
                info!(
                    "Catalog {} saved: {} directories, {} files ({})",
                    catalog_id, directories, files, status
                );
                Ok(catalog_id)
            }
            Err(e) => {
                error!("Catalog {} left incomplete: {}", catalog_id, e);
                set_status(conn, catalog_id, ScanStatus::Incomplete)?;
                Err(e)
            }
        }
    }

    /// All catalogs, newest first.
    pub fn list_catalogs(&self) -> Result<Vec<ScanSummary>> {
        let db = self.connect()?;
        let mut stmt = db.connection().prepare(
            "SELECT id, scan_date, root_path, total_files, total_size_bytes, status \
             FROM catalogs ORDER BY id DESC",
        )?;
        let catalogs = stmt
            .query_map([], summary_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(catalogs)
    }

    pub fn get_catalog(&self, catalog_id: i64) -> Result<ScanSummary> {
        let db = self.connect()?;
        find_catalog(db.connection(), catalog_id)
    }

    /// Files of one catalog ordered by relative path. `pattern` keeps only
    /// files whose relative path contains it (SQL `LIKE` wildcards apply).
    pub fn get_catalog_files(
        &self,
        catalog_id: i64,
        pattern: Option<&str>,
    ) -> Result<Vec<CatalogFile>> {
        let db = self.connect()?;
        find_catalog(db.connection(), catalog_id)?;

        let like = pattern.map(|p| format!("%{}%", p));
        let mut stmt = db.connection().prepare(&format!(
            "SELECT {} FROM files \
             WHERE catalog_id = ?1 AND (?2 IS NULL OR relative_path LIKE ?2) \
             ORDER BY relative_path",
            FILE_COLUMNS
        ))?;
        let files = stmt
            .query_map(params![catalog_id, like], file_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(files)
    }

    /// Directories of one catalog arranged as a forest under the scan root.
    pub fn get_directory_tree(&self, catalog_id: i64) -> Result<Vec<DirectoryTreeNode>> {
        let db = self.connect()?;
        let conn = db.connection();
        find_catalog(conn, catalog_id)?;

        let mut stmt = conn.prepare(
            "SELECT id, catalog_id, directory_path, relative_path, depth, parent_path \
             FROM directories WHERE catalog_id = ?1 ORDER BY depth, relative_path",
        )?;
        let directories = stmt
            .query_map(params![catalog_id], directory_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut counts_stmt = conn.prepare(
            "SELECT directory_path, COUNT(*) FROM files \
             WHERE catalog_id = ?1 GROUP BY directory_path",
        )?;
        let file_counts = counts_stmt
            .query_map(params![catalog_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?
            .collect::<rusqlite::Result<AHashMap<_, _>>>()?;

        Ok(build_tree(directories, &file_counts))
    }

    pub fn schema_version(&self) -> Result<u32> {
        self.initialize()
    }
}

const INSERT_DIRECTORY: &str = "INSERT INTO directories \
     (catalog_id, directory_path, relative_path, depth, parent_path) \
     VALUES (?1, ?2, ?3, ?4, ?5)";

const INSERT_FILE: &str = "INSERT INTO files \
     (catalog_id, file_name, directory_path, relative_path, extension, size_bytes, \
      created_date, modified_date, is_hidden) \
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)";

pub(crate) const FILE_COLUMNS: &str = "id, catalog_id, file_name, directory_path, relative_path, \
     extension, size_bytes, created_date, modified_date, is_hidden";

/// Insert the parent row after archiving earlier catalogs of the same root.
fn insert_catalog(conn: &Connection, result: &ScanResult, status: ScanStatus) -> Result<i64> {
    let tx = conn.unchecked_transaction()?;
    let root = result.root.to_string_lossy();
    let archived = tx.execute(
        "UPDATE catalogs SET status = ?1 WHERE root_path = ?2 AND status != ?1",
        params![ScanStatus::Archived, root],
    )?;
    tx.execute(
        "INSERT INTO catalogs (scan_date, root_path, total_files, total_size_bytes, status) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            chrono::Utc::now().to_rfc3339(),
            root,
            result.total_files as i64,
            result.total_size as i64,
            status
        ],
    )?;
    let catalog_id = tx.last_insert_rowid();
    tx.commit()?;
    if archived > 0 {
        debug!("Archived {} earlier catalog(s) of {}", archived, root);
    }
    Ok(catalog_id)
}

fn set_status(conn: &Connection, catalog_id: i64, status: ScanStatus) -> Result<()> {
    conn.execute(
        "UPDATE catalogs SET status = ?1 WHERE id = ?2",
        params![status, catalog_id],
    )?;
    Ok(())
}

fn find_catalog(conn: &Connection, catalog_id: i64) -> Result<ScanSummary> {
    conn.query_row(
        "SELECT id, scan_date, root_path, total_files, total_size_bytes, status \
         FROM catalogs WHERE id = ?1",
        params![catalog_id],
        summary_from_row,
    )
    .optional()?
    .ok_or_else(|| Error::NotFound(format!("catalog {}", catalog_id)))
}

/// Insert `rows` in chunks of [`BATCH_SIZE`], one transaction per chunk.
/// Each committed chunk is reported before the next one starts. Returns
/// the number of rows written; a failed chunk is rolled back and reported
/// as [`Error::BatchInsert`] with its 1-based batch number.
pub(crate) fn write_batches<T, F>(
    conn: &Connection,
    table: &'static str,
    sql: &str,
    rows: &[T],
    reporter: &dyn ProgressReporter,
    mut insert: F,
) -> Result<usize>
where
    F: FnMut(&mut Statement<'_>, &T) -> rusqlite::Result<usize>,
{
    let mut written = 0;
    for (index, chunk) in rows.chunks(BATCH_SIZE).enumerate() {
        let batch = index + 1;
        write_batch(conn, sql, chunk, &mut insert).map_err(|source| Error::BatchInsert {
            table,
            batch,
            source,
        })?;
        written += chunk.len();
        debug!("Committed batch {} of {} rows into {}", batch, chunk.len(), table);
        reporter.on_batch_persisted(table, chunk.len());
    }
    Ok(written)
}

fn write_batch<T, F>(conn: &Connection, sql: &str, chunk: &[T], insert: &mut F) -> rusqlite::Result<()>
where
    F: FnMut(&mut Statement<'_>, &T) -> rusqlite::Result<usize>,
{
    let tx = conn.unchecked_transaction()?;
    {
        let mut stmt = tx.prepare_cached(sql)?;
        for row in chunk {
            insert(&mut *stmt, row)?;
        }
    }
    tx.commit()
}

fn insert_directory(
    stmt: &mut Statement<'_>,
    catalog_id: i64,
    dir: &DirectoryRecord,
) -> rusqlite::Result<usize> {
    stmt.execute(params![
        catalog_id,
        dir.path.to_string_lossy(),
        dir.relative_path.to_string_lossy(),
        dir.depth as i64,
        dir.parent_path.as_ref().map(|p| p.to_string_lossy().into_owned()),
    ])
}

fn insert_file(stmt: &mut Statement<'_>, catalog_id: i64, file: &FileRecord) -> rusqlite::Result<usize> {
    stmt.execute(params![
        catalog_id,
        file.name,
        directory_path(file),
        file.relative_path.to_string_lossy(),
        file.extension,
        file.size as i64,
        file.created.to_rfc3339(),
        file.modified.to_rfc3339(),
        file.hidden,
    ])
}

pub(crate) fn directory_path(file: &FileRecord) -> String {
    file.directory()
        .map(|d| d.to_string_lossy().into_owned())
        .unwrap_or_default()
}

pub(crate) fn file_from_row(row: &Row<'_>) -> rusqlite::Result<CatalogFile> {
    Ok(CatalogFile {
        id: row.get(0)?,
        catalog_id: row.get(1)?,
        file_name: row.get(2)?,
        directory_path: row.get(3)?,
        relative_path: row.get(4)?,
        extension: row.get(5)?,
        size_bytes: row.get(6)?,
        created_date: row.get(7)?,
        modified_date: row.get(8)?,
        is_hidden: row.get(9)?,
    })
}

fn directory_from_row(row: &Row<'_>) -> rusqlite::Result<CatalogDirectory> {
    Ok(CatalogDirectory {
        id: row.get(0)?,
        catalog_id: row.get(1)?,
        directory_path: row.get(2)?,
        relative_path: row.get(3)?,
        depth: row.get(4)?,
        parent_path: row.get(5)?,
    })
}

/// Nest directories under their parents. Directories whose parent is not
/// itself a recorded directory become roots of the forest.
fn build_tree(
    directories: Vec<CatalogDirectory>,
    file_counts: &AHashMap<String, i64>,
) -> Vec<DirectoryTreeNode> {
    let known: ahash::AHashSet<String> = directories
        .iter()
        .map(|d| d.directory_path.clone())
        .collect();

    let mut children: AHashMap<String, Vec<CatalogDirectory>> = AHashMap::new();
    let mut roots = Vec::new();
    for dir in directories {
        match dir.parent_path.clone().filter(|p| known.contains(p)) {
            Some(parent) => children.entry(parent).or_default().push(dir),
            None => roots.push(dir),
        }
    }

    fn attach(
        dir: CatalogDirectory,
        children: &mut AHashMap<String, Vec<CatalogDirectory>>,
        file_counts: &AHashMap<String, i64>,
    ) -> DirectoryTreeNode {
        let kids = children.remove(&dir.directory_path).unwrap_or_default();
        DirectoryTreeNode {
            file_count: file_counts.get(&dir.directory_path).copied().unwrap_or(0),
            children: kids
                .into_iter()
                .map(|kid| attach(kid, children, file_counts))
                .collect(),
            directory: dir,
        }
    }

    roots
        .into_iter()
        .map(|dir| attach(dir, &mut children, file_counts))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::SilentReporter;
    use crate::scanner::test_file;

    #[test]
    fn test_directory_tree_nests_by_parent() {
        let dir = tempfile::tempdir().unwrap();
        let store = PlainCatalog::new(dir.path().join("catalog.db"));
        let root = PathBuf::from("/data/project");
        let result = ScanResult::from_files(
            &root,
            vec![
                test_file(&root, "a/one.txt", 1),
                test_file(&root, "a/b/two.txt", 2),
                test_file(&root, "a/b/three.txt", 3),
                test_file(&root, "c/four.txt", 4),
                test_file(&root, "top.txt", 5),
            ],
        );
        let id = store
            .create_catalog(&result, ScanStatus::Completed, &SilentReporter)
            .unwrap();

        let tree = store.get_directory_tree(id).unwrap();
        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].directory.relative_path, "a");
        assert_eq!(tree[0].file_count, 1);
        assert_eq!(tree[0].children.len(), 1);
        assert_eq!(tree[0].children[0].file_count, 2);
        assert_eq!(tree[1].directory.relative_path, "c");
        assert_eq!(tree.iter().map(|n| n.node_count()).sum::<usize>(), 3);
    }

    #[test]
    fn test_files_filtered_by_relative_path() {
        let dir = tempfile::tempdir().unwrap();
        let store = PlainCatalog::new(dir.path().join("catalog.db"));
        let root = PathBuf::from("/data/project");
        let result = ScanResult::from_files(
            &root,
            vec![
                test_file(&root, "drawings/A-101.pdf", 10),
                test_file(&root, "drawings/A-102.pdf", 10),
                test_file(&root, "notes.txt", 10),
            ],
        );
        let id = store
            .create_catalog(&result, ScanStatus::Completed, &SilentReporter)
            .unwrap();

        assert_eq!(store.get_catalog_files(id, None).unwrap().len(), 3);
        let drawings = store.get_catalog_files(id, Some("drawings")).unwrap();
        assert_eq!(drawings.len(), 2);
        assert!(drawings.iter().all(|f| f.extension.as_deref() == Some("pdf")));
        assert!(matches!(
            store.get_catalog_files(id + 1, None),
            Err(Error::NotFound(_))
        ));
    }
}
