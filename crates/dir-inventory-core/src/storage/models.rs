use crate::metadata::FileTag;
use crate::patterns::ParsedName;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Lifecycle of a persisted scan or catalog row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    Completed,
    /// The traversal was interrupted; the row holds what was collected.
    Partial,
    /// A write batch failed after earlier batches had committed.
    Incomplete,
    /// Superseded by a later scan of the same root.
    Archived,
}

impl ScanStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ScanStatus::Completed => "completed",
            ScanStatus::Partial => "partial",
            ScanStatus::Incomplete => "incomplete",
            ScanStatus::Archived => "archived",
        }
    }
}

impl fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown scan status: {0}")]
pub struct UnknownStatus(String);

impl FromStr for ScanStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "completed" => Ok(ScanStatus::Completed),
            "partial" => Ok(ScanStatus::Partial),
            "incomplete" => Ok(ScanStatus::Incomplete),
            "archived" => Ok(ScanStatus::Archived),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

impl ToSql for ScanStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for ScanStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

/// One row of `scan_results` or `catalogs`.
#[derive(Debug, Clone, Serialize)]
pub struct ScanSummary {
    pub id: i64,
    pub scan_date: String,
    pub root_path: String,
    pub total_files: i64,
    pub total_size_bytes: i64,
    pub status: ScanStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtensionBreakdown {
    pub extension: String,
    pub count: i64,
    pub total_size_bytes: i64,
    pub file_percentage: f64,
    pub size_percentage: f64,
}

/// A scan with its extension breakdown, largest share of bytes first.
#[derive(Debug, Clone, Serialize)]
pub struct ScanDetails {
    pub summary: ScanSummary,
    pub extensions: Vec<ExtensionBreakdown>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CatalogFile {
    pub id: i64,
    pub catalog_id: i64,
    pub file_name: String,
    pub directory_path: String,
    pub relative_path: String,
    pub extension: Option<String>,
    pub size_bytes: i64,
    pub created_date: Option<String>,
    pub modified_date: Option<String>,
    pub is_hidden: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CatalogDirectory {
    pub id: i64,
    pub catalog_id: i64,
    pub directory_path: String,
    pub relative_path: String,
    pub depth: i64,
    pub parent_path: Option<String>,
}

/// A directory of one catalog with its direct file count and children.
#[derive(Debug, Clone, Serialize)]
pub struct DirectoryTreeNode {
    pub directory: CatalogDirectory,
    pub file_count: i64,
    pub children: Vec<DirectoryTreeNode>,
}

impl DirectoryTreeNode {
    /// Number of nodes in this subtree, including `self`.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(|c| c.node_count()).sum::<usize>()
    }
}

/// A `files` row of the metadata catalog with its JSON columns decoded.
#[derive(Debug, Clone, Serialize)]
pub struct FileMetadataRow {
    pub file: CatalogFile,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub tags: Vec<FileTag>,
    pub patterns: Vec<String>,
    pub parsed_info: Option<ParsedName>,
    pub directory_info: Option<Value>,
}

impl FileMetadataRow {
    pub fn has_tag(&self, name: &str) -> bool {
        self.tags.iter().any(|t| t.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_reads_from_sql_text() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        let status: ScanStatus = conn
            .query_row("SELECT 'archived'", [], |row| row.get(0))
            .unwrap();
        assert_eq!(status, ScanStatus::Archived);

        let unknown = conn.query_row("SELECT 'running'", [], |row| row.get::<_, ScanStatus>(0));
        assert!(unknown.is_err());
    }
}
