use super::{add_column, Migration, Schema};
use rusqlite::Connection;

/// Lightweight scan history: one row per scan plus per-extension totals.
pub struct StatsSchema;

impl Schema for StatsSchema {
    const NAME: &'static str = "stats";

    fn migrations() -> &'static [Migration] {
        &[
            Migration {
                version: 1,
                description: "scan_results and file_types",
                apply: v001_base_tables,
            },
            Migration {
                version: 2,
                description: "scan status and root path index",
                apply: v002_scan_status,
            },
        ]
    }
}

fn v001_base_tables(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS scan_results (
            id                INTEGER PRIMARY KEY AUTOINCREMENT,
            scan_date         TEXT NOT NULL,
            root_path         TEXT NOT NULL,
            total_files       INTEGER NOT NULL DEFAULT 0,
            total_size_bytes  INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS file_types (
            id                INTEGER PRIMARY KEY AUTOINCREMENT,
            scan_id           INTEGER NOT NULL REFERENCES scan_results(id) ON DELETE CASCADE,
            extension         TEXT NOT NULL,
            count             INTEGER NOT NULL DEFAULT 0,
            total_size_bytes  INTEGER NOT NULL DEFAULT 0
        );

        CREATE INDEX IF NOT EXISTS idx_file_types_scan ON file_types(scan_id);
        ",
    )
}

fn v002_scan_status(conn: &Connection) -> rusqlite::Result<()> {
    add_column(
        conn,
        "scan_results",
        "status",
        "TEXT NOT NULL DEFAULT 'completed'",
    )?;
    conn.execute_batch(
        "CREATE INDEX IF NOT EXISTS idx_scan_results_root ON scan_results(root_path, status);",
    )
}
