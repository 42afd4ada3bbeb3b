//! Versioned, additive schema migrations.
//!
//! Each schema is a list of steps applied strictly in order from the stored
//! version to the latest one. Steps only add tables, columns and indexes.

mod catalog;
mod metadata;
mod stats;

pub use catalog::CatalogSchema;
pub use metadata::MetadataSchema;
pub use stats::StatsSchema;

use crate::error::{Error, Result};
use rusqlite::Connection;
use tracing::{debug, info, warn};

pub struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub apply: fn(&Connection) -> rusqlite::Result<()>,
}

/// A set of tables a store can create and evolve.
pub trait Schema {
    const NAME: &'static str;

    fn migrations() -> &'static [Migration];

    fn target_version() -> u32 {
        Self::migrations().last().map(|m| m.version).unwrap_or(0)
    }

    /// Version recorded in the database; 0 for a fresh file.
    fn stored_version(conn: &Connection) -> rusqlite::Result<u32> {
        conn.query_row("PRAGMA user_version", [], |row| row.get(0))
    }

    fn record_version(conn: &Connection, migration: &Migration) -> rusqlite::Result<()> {
        conn.pragma_update(None, "user_version", migration.version)
    }
}

/// Bring the schema up to date. Returns the resulting version.
pub fn migrate<S: Schema>(conn: &Connection) -> Result<u32> {
    let current = S::stored_version(conn)?;
    let target = S::target_version();

    if current > target {
        warn!(
            "{} schema version {} is newer than supported version {}",
            S::NAME,
            current,
            target
        );
        return Ok(current);
    }
    if current == target {
        debug!("{} schema is current (version {})", S::NAME, current);
        return Ok(current);
    }

    for migration in S::migrations().iter().filter(|m| m.version > current) {
        let tx = conn.unchecked_transaction()?;
        (migration.apply)(&tx)
            .and_then(|_| S::record_version(&tx, migration))
            .map_err(|source| Error::Migration {
                version: migration.version,
                source,
            })?;
        tx.commit()?;
        info!(
            "Migrated {} schema to version {}: {}",
            S::NAME,
            migration.version,
            migration.description
        );
    }

    Ok(target)
}

/// `ALTER TABLE .. ADD COLUMN` that succeeds when the column already exists.
pub fn add_column(
    conn: &Connection,
    table: &str,
    column: &str,
    definition: &str,
) -> rusqlite::Result<()> {
    let sql = format!("ALTER TABLE {} ADD COLUMN {} {}", table, column, definition);
    match conn.execute_batch(&sql) {
        Ok(()) => Ok(()),
        Err(rusqlite::Error::SqliteFailure(_, Some(msg))) if msg.contains("duplicate column name") => {
            debug!("Column {}.{} already exists", table, column);
            Ok(())
        }
        Err(e) => Err(e),
    }
}

pub fn table_exists(conn: &Connection, table: &str) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        [table],
        |row| row.get::<_, i64>(0),
    )
    .map(|count| count > 0)
}

pub fn column_names(conn: &Connection, table: &str) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", table))?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(names)
}
