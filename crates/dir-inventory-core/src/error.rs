use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid scan root {}: {reason}", path.display())]
    InvalidPath { path: PathBuf, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Migration to schema version {version} failed: {source}")]
    Migration {
        version: u32,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Insert into {table} failed in batch {batch}: {source}")]
    BatchInsert {
        table: &'static str,
        batch: usize,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Non-fatal problem scoped to a single entry. Collected during a scan
/// and reported in aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanWarning {
    AccessDenied { path: PathBuf, message: String },
    Entry { path: PathBuf, message: String },
}

impl ScanWarning {
    pub fn path(&self) -> &PathBuf {
        match self {
            ScanWarning::AccessDenied { path, .. } | ScanWarning::Entry { path, .. } => path,
        }
    }

    pub fn is_access_denied(&self) -> bool {
        matches!(self, ScanWarning::AccessDenied { .. })
    }
}

impl std::fmt::Display for ScanWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanWarning::AccessDenied { path, message } => {
                write!(f, "access denied: {} ({})", path.display(), message)
            }
            ScanWarning::Entry { path, message } => {
                write!(f, "skipped {}: {}", path.display(), message)
            }
        }
    }
}
