use super::catalog::{
    directory_path, file_from_row, write_batches, MetadataCatalog, FILES_TABLE, FILE_COLUMNS,
};
use super::models::{CatalogFile, FileMetadataRow, ScanStatus};
use super::sqlite::Store;
use crate::error::{Error, Result};
use crate::metadata::tags::{insert_tag, TagSet};
use crate::metadata::{EnrichedFile, FileTag};
use crate::progress::ProgressReporter;
use crate::scanner::ScanResult;
use rusqlite::{params, Connection, OptionalExtension, Statement};
use tracing::{debug, info};

const INSERT_ENRICHED_FILE: &str = "INSERT INTO files \
     (catalog_id, file_name, directory_path, relative_path, extension, size_bytes, \
      created_date, modified_date, is_hidden, tags, category, subcategory, patterns, \
      parsed_info, directory_info) \
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)";

impl MetadataCatalog {
    /// Persist a scan together with the enrichment of each of its files.
    /// `enriched` supplies the file rows; `result` supplies the catalog
    /// totals and directories. Batching and failure handling are the same
    /// as [`create_catalog`](Self::create_catalog).
    pub fn create_catalog_with_metadata(
        &self,
        result: &ScanResult,
        enriched: &[EnrichedFile],
        status: ScanStatus,
        reporter: &dyn ProgressReporter,
    ) -> Result<i64> {
        self.persist(result, status, reporter, |conn, catalog_id| {
            write_batches(
                conn,
                FILES_TABLE,
                INSERT_ENRICHED_FILE,
                enriched,
                reporter,
                |stmt, file| insert_enriched(stmt, catalog_id, file),
            )
        })
    }

    /// Replace the tag list of one file row.
    pub fn update_file_tags(
        &self,
        catalog_id: i64,
        relative_path: &str,
        tags: &[FileTag],
    ) -> Result<()> {
        let db = self.connect()?;
        write_tags(db.connection(), catalog_id, relative_path, tags)
    }

    /// Add a user tag to a stored file. Returns false when the file already
    /// carried a user tag with that name.
    pub fn add_user_tag(&self, catalog_id: i64, relative_path: &str, name: &str) -> Result<bool> {
        let db = self.connect()?;
        let conn = db.connection();
        let mut tags: TagSet = read_tags(conn, catalog_id, relative_path)?
            .into_iter()
            .collect();
        let tag = FileTag::user(name);
        if tags.contains(&tag) {
            return Ok(false);
        }
        insert_tag(&mut tags, tag);
        let tags: Vec<FileTag> = tags.into_iter().collect();
        write_tags(conn, catalog_id, relative_path, &tags)?;
        debug!("Added user tag {} to {}", name, relative_path);
        Ok(true)
    }

    /// Remove every tag called `name` from a stored file, auto-generated
    /// ones included. Returns how many were removed.
    pub fn remove_tag(&self, catalog_id: i64, relative_path: &str, name: &str) -> Result<usize> {
        let db = self.connect()?;
        let conn = db.connection();
        let mut tags = read_tags(conn, catalog_id, relative_path)?;
        let before = tags.len();
        tags.retain(|t| t.name != name);
        let removed = before - tags.len();
        if removed > 0 {
            write_tags(conn, catalog_id, relative_path, &tags)?;
            debug!("Removed {} tag(s) {} from {}", removed, name, relative_path);
        }
        Ok(removed)
    }

    pub fn get_file_metadata(&self, catalog_id: i64, relative_path: &str) -> Result<FileMetadataRow> {
        let db = self.connect()?;
        let row = db
            .connection()
            .query_row(
                &format!(
                    "SELECT {}, category, subcategory, tags, patterns, parsed_info, directory_info \
                     FROM files WHERE catalog_id = ?1 AND relative_path = ?2",
                    FILE_COLUMNS
                ),
                params![catalog_id, relative_path],
                |row| {
                    Ok((
                        file_from_row(row)?,
                        row.get::<_, Option<String>>(10)?,
                        row.get::<_, Option<String>>(11)?,
                        row.get::<_, String>(12)?,
                        row.get::<_, String>(13)?,
                        row.get::<_, Option<String>>(14)?,
                        row.get::<_, Option<String>>(15)?,
                    ))
                },
            )
            .optional()?
            .ok_or_else(|| not_found(catalog_id, relative_path))?;

        let (file, category, subcategory, tags, patterns, parsed_info, directory_info) = row;
        Ok(FileMetadataRow {
            file,
            category,
            subcategory,
            tags: serde_json::from_str(&tags)?,
            patterns: serde_json::from_str(&patterns)?,
            parsed_info: parsed_info.as_deref().map(serde_json::from_str).transpose()?,
            directory_info: directory_info
                .as_deref()
                .map(serde_json::from_str)
                .transpose()?,
        })
    }

    /// Files of one catalog carrying a tag called `name`, from any source.
    pub fn files_with_tag(&self, catalog_id: i64, name: &str) -> Result<Vec<CatalogFile>> {
        let db = self.connect()?;
        let mut stmt = db.connection().prepare(&format!(
            "SELECT {} FROM files \
             WHERE catalog_id = ?1 AND EXISTS ( \
                 SELECT 1 FROM json_each(files.tags) \
                 WHERE json_extract(json_each.value, '$.name') = ?2) \
             ORDER BY relative_path",
            FILE_COLUMNS
        ))?;
        let files = stmt
            .query_map(params![catalog_id, name], file_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        info!("{} file(s) tagged {} in catalog {}", files.len(), name, catalog_id);
        Ok(files)
    }
}

fn insert_enriched(
    stmt: &mut Statement<'_>,
    catalog_id: i64,
    enriched: &EnrichedFile,
) -> rusqlite::Result<usize> {
    let file = &enriched.record;
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
        to_json(&enriched.tags)?,
        enriched.category.map(|c| c.main),
        enriched.category.map(|c| c.sub),
        to_json(&enriched.patterns)?,
        to_json(&enriched.parsed)?,
        enriched.directory_info.as_ref().map(to_json).transpose()?,
    ])
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> rusqlite::Result<String> {
    serde_json::to_string(value).map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
}

fn read_tags(conn: &Connection, catalog_id: i64, relative_path: &str) -> Result<Vec<FileTag>> {
    let json: String = conn
        .query_row(
            "SELECT tags FROM files WHERE catalog_id = ?1 AND relative_path = ?2",
            params![catalog_id, relative_path],
            |row| row.get(0),
        )
        .optional()?
        .ok_or_else(|| not_found(catalog_id, relative_path))?;
    Ok(serde_json::from_str(&json)?)
}

fn write_tags(
    conn: &Connection,
    catalog_id: i64,
    relative_path: &str,
    tags: &[FileTag],
) -> Result<()> {
    let updated = conn.execute(
        "UPDATE files SET tags = ?1 WHERE catalog_id = ?2 AND relative_path = ?3",
        params![serde_json::to_string(tags)?, catalog_id, relative_path],
    )?;
    if updated == 0 {
        return Err(not_found(catalog_id, relative_path));
    }
    Ok(())
}

fn not_found(catalog_id: i64, relative_path: &str) -> Error {
    Error::NotFound(format!("file {} in catalog {}", relative_path, catalog_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{MetadataEngine, TagSource};
    use crate::progress::SilentReporter;
    use crate::scanner::test_file;
    use std::path::PathBuf;

    fn stored_catalog(dir: &std::path::Path) -> (MetadataCatalog, i64) {
        let store = MetadataCatalog::new(dir.join("metadata.db"));
        let root = PathBuf::from("/data/job");
        let result = ScanResult::from_files(
            &root,
            vec![
                test_file(&root, "ABC-1234_v2.1_2023-05-01_FINAL.pdf", 2048),
                test_file(&root, "settings_backup.txt", 10),
            ],
        );
        let mut engine = MetadataEngine::new();
        let enriched: Vec<_> = result.files.iter().map(|f| engine.enrich(f, None)).collect();
        let id = store
            .create_catalog_with_metadata(&result, &enriched, ScanStatus::Completed, &SilentReporter)
            .unwrap();
        (store, id)
    }

    #[test]
    fn test_enrichment_is_stored_and_decoded() {
        let dir = tempfile::tempdir().unwrap();
        let (store, id) = stored_catalog(dir.path());

        let row = store
            .get_file_metadata(id, "ABC-1234_v2.1_2023-05-01_FINAL.pdf")
            .unwrap();
        assert_eq!(row.category.as_deref(), Some("document"));
        assert!(row.has_tag("project:ABC-1234"));
        assert!(row.has_tag("status:Final"));
        assert!(row.has_tag("size:small"));
        let parsed = row.parsed_info.unwrap();
        assert_eq!(parsed.version.as_deref(), Some("2.1"));
        assert!(row.directory_info.is_none());

        let configs = store.files_with_tag(id, "pattern:config").unwrap();
        assert_eq!(configs.len(), 1);
        assert_eq!(configs[0].relative_path, "settings_backup.txt");
    }

    #[test]
    fn test_user_tags_and_removal_by_name() {
        let dir = tempfile::tempdir().unwrap();
        let (store, id) = stored_catalog(dir.path());
        let path = "settings_backup.txt";

        assert!(store.add_user_tag(id, path, "keep").unwrap());
        assert!(!store.add_user_tag(id, path, "keep").unwrap());
        assert!(store.add_user_tag(id, path, "size:tiny").unwrap());

        let row = store.get_file_metadata(id, path).unwrap();
        let size_tags: Vec<_> = row.tags.iter().filter(|t| t.name == "size:tiny").collect();
        assert_eq!(size_tags.len(), 2);
        assert!(row
            .tags
            .iter()
            .any(|t| t.name == "keep" && t.source == TagSource::User));

        assert_eq!(store.remove_tag(id, path, "size:tiny").unwrap(), 2);
        assert!(!store.get_file_metadata(id, path).unwrap().has_tag("size:tiny"));
        assert_eq!(store.remove_tag(id, path, "size:tiny").unwrap(), 0);

        assert!(matches!(
            store.add_user_tag(id, "missing.txt", "keep"),
            Err(Error::NotFound(_))
        ));
    }
}
