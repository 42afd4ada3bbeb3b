use super::{add_column, Migration, Schema};
use rusqlite::Connection;

/// File and directory level snapshot of each scan.
pub struct CatalogSchema;

impl Schema for CatalogSchema {
    const NAME: &'static str = "catalog";

    fn migrations() -> &'static [Migration] {
        &[
            Migration {
                version: 1,
                description: "catalogs, files and directories",
                apply: v001_base_tables,
            },
            Migration {
                version: 2,
                description: "catalog status and lookup indexes",
                apply: v002_status_and_indexes,
            },
        ]
    }
}

pub(super) fn v001_base_tables(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS catalogs (
            id                INTEGER PRIMARY KEY AUTOINCREMENT,
            scan_date         TEXT NOT NULL,
            root_path         TEXT NOT NULL,
            total_files       INTEGER NOT NULL DEFAULT 0,
            total_size_bytes  INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS files (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            catalog_id      INTEGER NOT NULL REFERENCES catalogs(id) ON DELETE CASCADE,
            file_name       TEXT NOT NULL,
            directory_path  TEXT NOT NULL,
            relative_path   TEXT NOT NULL,
            extension       TEXT,
            size_bytes      INTEGER NOT NULL DEFAULT 0,
            created_date    TEXT,
            modified_date   TEXT,
            is_hidden       INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS directories (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            catalog_id      INTEGER NOT NULL REFERENCES catalogs(id) ON DELETE CASCADE,
            directory_path  TEXT NOT NULL,
            relative_path   TEXT NOT NULL,
            depth           INTEGER NOT NULL DEFAULT 0,
            parent_path     TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_files_catalog ON files(catalog_id);
        CREATE INDEX IF NOT EXISTS idx_directories_catalog ON directories(catalog_id);
        ",
    )
}

pub(super) fn v002_status_and_indexes(conn: &Connection) -> rusqlite::Result<()> {
    add_column(
        conn,
        "catalogs",
        "status",
        "TEXT NOT NULL DEFAULT 'completed'",
    )?;
    conn.execute_batch(
        "
        CREATE INDEX IF NOT EXISTS idx_catalogs_root ON catalogs(root_path, status);
        CREATE UNIQUE INDEX IF NOT EXISTS idx_files_catalog_relative
            ON files(catalog_id, relative_path);
        CREATE INDEX IF NOT EXISTS idx_files_extension ON files(catalog_id, extension);
        ",
    )
}
