use super::catalog::{v001_base_tables, v002_status_and_indexes};
use super::{add_column, table_exists, Migration, Schema};
use rusqlite::{params, Connection};

/// Catalog with per-file tags, categories, patterns and parsed names.
/// Tracks applied steps in its own `version` table.
pub struct MetadataSchema;

impl Schema for MetadataSchema {
    const NAME: &'static str = "catalog-metadata";

    fn migrations() -> &'static [Migration] {
        &[
            Migration {
                version: 1,
                description: "catalog tables and version table",
                apply: v001_catalog_tables,
            },
            Migration {
                version: 2,
                description: "files.tags, files.category, files.subcategory",
                apply: v002_tags_and_category,
            },
            Migration {
                version: 3,
                description: "files.patterns, files.parsed_info",
                apply: v003_patterns_and_parsed_info,
            },
            Migration {
                version: 4,
                description: "files.directory_info and category index",
                apply: v004_directory_info,
            },
        ]
    }

    fn stored_version(conn: &Connection) -> rusqlite::Result<u32> {
        if !table_exists(conn, "version")? {
            return Ok(0);
        }
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM version", [], |row| {
            row.get(0)
        })
    }

    fn record_version(conn: &Connection, migration: &Migration) -> rusqlite::Result<()> {
        conn.execute(
            "INSERT OR REPLACE INTO version (version, description, applied_at) VALUES (?1, ?2, ?3)",
            params![
                migration.version,
                migration.description,
                chrono::Utc::now().to_rfc3339()
            ],
        )?;
        Ok(())
    }
}

fn v001_catalog_tables(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS version (
            version     INTEGER PRIMARY KEY,
            description TEXT NOT NULL,
            applied_at  TEXT NOT NULL
        );
        ",
    )?;
    v001_base_tables(conn)?;
    v002_status_and_indexes(conn)
}

fn v002_tags_and_category(conn: &Connection) -> rusqlite::Result<()> {
    add_column(conn, "files", "tags", "TEXT NOT NULL DEFAULT '[]'")?;
    add_column(conn, "files", "category", "TEXT")?;
    add_column(conn, "files", "subcategory", "TEXT")
}

fn v003_patterns_and_parsed_info(conn: &Connection) -> rusqlite::Result<()> {
    add_column(conn, "files", "patterns", "TEXT NOT NULL DEFAULT '[]'")?;
    add_column(conn, "files", "parsed_info", "TEXT")
}

fn v004_directory_info(conn: &Connection) -> rusqlite::Result<()> {
    add_column(conn, "files", "directory_info", "TEXT")?;
    conn.execute_batch(
        "CREATE INDEX IF NOT EXISTS idx_files_category ON files(catalog_id, category);",
    )
}
