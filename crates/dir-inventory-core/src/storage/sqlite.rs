use super::migrations::{self, Schema};
use crate::error::Result;
use rusqlite::{Connection, DatabaseName};
use std::path::Path;
use tracing::{debug, info};

pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) a database file and bring schema `S` up to date.
    pub fn open<S: Schema>(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        let db = Database { conn };
        db.configure_pragmas()?;
        migrations::migrate::<S>(&db.conn)?;
        Ok(db)
    }

    pub fn open_in_memory<S: Schema>() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.configure_pragmas()?;
        migrations::migrate::<S>(&db.conn)?;
        Ok(db)
    }

    fn configure_pragmas(&self) -> Result<()> {
        self.conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys = ON;
             PRAGMA cache_size = -16000;
             PRAGMA busy_timeout = 5000;",
        )?;
        debug!("SQLite pragmas configured (WAL mode, 16MB cache)");
        Ok(())
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn schema_version<S: Schema>(&self) -> Result<u32> {
        Ok(S::stored_version(&self.conn)?)
    }

    /// Copy the whole database to `path` through the online backup API,
    /// replacing any file already there.
    pub fn backup_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        self.conn.backup(DatabaseName::Main, path, None)?;
        info!("Database backed up to {}", path.display());
        Ok(())
    }

    pub fn vacuum(&self) -> Result<()> {
        self.conn.execute_batch("VACUUM;")?;
        debug!("Database vacuumed");
        Ok(())
    }
}

/// A persistent store backed by one database file and one schema.
///
/// Stores never hold a connection between operations: each call to
/// [`Store::connect`] opens the file, runs pending migrations and hands
/// back a fresh [`Database`] that is dropped when the operation ends.
pub trait Store {
    type Schema: Schema;

    fn db_path(&self) -> &Path;

    fn connect(&self) -> Result<Database> {
        Database::open::<Self::Schema>(self.db_path())
    }

    /// Create or migrate the schema. Returns the resulting version.
    fn initialize(&self) -> Result<u32> {
        let db = self.connect()?;
        db.schema_version::<Self::Schema>()
    }

    fn backup(&self, path: &Path) -> Result<()> {
        self.connect()?.backup_to(path)
    }

    /// Reclaim space left by archived and deleted rows.
    fn vacuum(&self) -> Result<()> {
        self.connect()?.vacuum()
    }
}
