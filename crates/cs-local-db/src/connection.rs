//! Database connection management.

use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::debug;

use crate::config::ConfigStore;
use crate::migrations::MigrationManager;
use crate::models::{CourseRecord, CourseStore, FileRecord, FileStore};
use crate::schema::{Table, DATABASE_FILE_NAME};

/// A schema-definition routine run once against a freshly opened connection.
pub type SchemaFn = fn(&Connection) -> crate::Result<()>;

/// Shared handle to the single store connection.
///
/// Cloning is cheap and every clone refers to the same connection. The
/// connection is only reachable through [`Database::with_connection`] and
/// [`Database::transaction`], which hold the one mutex for the duration of
/// the closure, so statements from different threads never interleave.
#[derive(Debug, Clone)]
pub struct Database {
    connection: Arc<Mutex<Connection>>,
    path: Option<PathBuf>,
}

/// Every row of every table, read under one acquisition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreState {
    pub files: Vec<FileRecord>,
    pub courses: Vec<CourseRecord>,
    pub config: BTreeMap<String, String>,
}

impl Database {
    /// Get the working directory from COURSESYNC_HOME or `$HOME/coursesync`.
    pub fn default_home() -> crate::Result<PathBuf> {
        resolve_home(
            std::env::var_os("COURSESYNC_HOME"),
            std::env::var_os("HOME").or_else(|| std::env::var_os("USERPROFILE")),
        )
    }

    /// Get the default database path inside the working directory.
    pub fn default_path() -> crate::Result<PathBuf> {
        Ok(Self::default_home()?.join(DATABASE_FILE_NAME))
    }

    /// Open the database at the default path.
    pub fn open_default() -> crate::Result<Self> {
        let path = Self::default_path()?;
        Self::open(&path)
    }
}

impl Database {
    /// Open a new database connection at the specified path.
    ///
    /// If the path doesn't exist, the database (and its parent directory)
    /// will be created.
    pub fn open<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        // Enable WAL mode for file-backed stores
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        debug!(path = %path.display(), journal_mode = %mode, "Opened store");

        let mut db = Self::open_with(conn, MigrationManager::migrate)?;
        db.path = Some(path.to_path_buf());
        Ok(db)
    }

    /// Open an in-memory database for testing.
    pub fn open_in_memory() -> crate::Result<Self> {
        let conn = Connection::open_in_memory()?;
        debug!("Opened in-memory store");
        Self::open_with(conn, MigrationManager::migrate)
    }

    /// Bootstrap an already opened connection with the given schema routine.
    pub fn open_with(conn: Connection, schema: SchemaFn) -> crate::Result<Self> {
        schema(&conn)?;
        Ok(Self {
            connection: Arc::new(Mutex::new(conn)),
            path: None,
        })
    }

    /// Location of the backing file, `None` for in-memory stores.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Run `f` with exclusive access to the connection.
    ///
    /// This is the only way to reach the connection. Statements run in
    /// autocommit mode unless `f` opens a transaction itself.
    pub fn with_connection<F, T>(&self, f: F) -> crate::Result<T>
    where
        F: FnOnce(&Connection) -> crate::Result<T>,
    {
        let conn = self.connection.lock().map_err(|e| {
            crate::Error::generic(format!("Failed to acquire database lock: {}", e))
        })?;
        f(&conn)
    }

    /// Execute a transaction with automatic rollback on error.
    pub fn transaction<F, T>(&self, f: F) -> crate::Result<T>
    where
        F: FnOnce(&Connection) -> crate::Result<T>,
    {
        self.with_connection(|conn| {
            let tx = conn.unchecked_transaction()?;
            match f(&tx) {
                Ok(result) => {
                    tx.commit()?;
                    Ok(result)
                }
                Err(e) => {
                    tx.rollback()?;
                    Err(e)
                }
            }
        })
    }

    /// Ensure the default tables exist.
    pub fn create_default_tables(&self) -> crate::Result<()> {
        self.with_connection(MigrationManager::create_default_tables)
    }

    /// Wipe one table. Drop and recreate happen under a single acquisition.
    pub fn drop_and_recreate(&self, table: Table) -> crate::Result<()> {
        self.with_connection(|conn| MigrationManager::drop_and_recreate(conn, table))
    }

    /// Empty the file cache.
    pub fn delete_file_table(&self) -> crate::Result<()> {
        self.drop_and_recreate(Table::Files)
    }

    /// Reset every setting to its default.
    pub fn delete_config(&self) -> crate::Result<()> {
        self.with_connection(|conn| ConfigStore::new(conn).delete_config())
    }

    /// Snapshot of all tables.
    pub fn state(&self) -> crate::Result<StoreState> {
        self.with_connection(|conn| {
            Ok(StoreState {
                files: FileStore::new(conn).list_all()?,
                courses: CourseStore::new(conn).list_all()?,
                config: ConfigStore::new(conn).entries()?,
            })
        })
    }
}

// Empty variables count as unset.
fn resolve_home(
    coursesync_home: Option<OsString>,
    user_home: Option<OsString>,
) -> crate::Result<PathBuf> {
    if let Some(home) = coursesync_home.filter(|home| !home.is_empty()) {
        return Ok(PathBuf::from(home));
    }

    let home = user_home
        .filter(|home| !home.is_empty())
        .ok_or_else(|| crate::Error::generic("Neither HOME nor USERPROFILE is set"))?;
    Ok(PathBuf::from(home).join("coursesync"))
}

/// Run `f` inside a transaction unless the connection already is in one, in
/// which case `f` becomes part of the caller's transaction.
pub(crate) fn in_transaction<F, T>(conn: &Connection, f: F) -> crate::Result<T>
where
    F: FnOnce(&Connection) -> crate::Result<T>,
{
    if !conn.is_autocommit() {
        return f(conn);
    }

    let tx = conn.unchecked_transaction()?;
    match f(&tx) {
        Ok(result) => {
            tx.commit()?;
            Ok(result)
        }
        Err(e) => {
            tx.rollback()?;
            Err(e)
        }
    }
}
