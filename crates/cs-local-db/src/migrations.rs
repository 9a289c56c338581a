//! Database migration management.

use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info, warn};

use crate::connection::in_transaction;
use crate::schema::{Table, TABLE_CONFIG, TABLE_SCHEMA_MIGRATIONS};

// Tables written by releases that predate versioned migrations.
const LEGACY_FILES: &str = "fileinfo";
const LEGACY_COURSES: &str = "courseinfo";
const LEGACY_CONFIG: &str = "config_legacy";

/// Database migration manager.
pub struct MigrationManager;

impl MigrationManager {
    /// Apply all pending migrations, then make sure every default table exists.
    ///
    /// Safe to run on every startup against an existing store.
    pub fn migrate(conn: &Connection) -> crate::Result<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );
            "#,
        )?;

        let current_version = Self::current_version(conn)?.unwrap_or(0);
        debug!(current_version, "Checking schema migrations");

        if current_version < 1 {
            in_transaction(conn, Self::apply_migration_1)?;
        }
        if current_version < 2 {
            in_transaction(conn, Self::apply_migration_2)?;
        }

        Self::create_default_tables(conn)
    }

    /// Create every table the store needs if it does not exist yet.
    pub fn create_default_tables(conn: &Connection) -> crate::Result<()> {
        for table in Table::ALL {
            conn.execute_batch(table.create_statement())?;
        }
        Ok(())
    }

    /// Drop a table and create it again, empty, as one atomic step.
    ///
    /// The caller must hold the connection for the whole call (see
    /// [`crate::Database::with_connection`]); when the connection is already
    /// inside a transaction the two statements join it.
    pub fn drop_and_recreate(conn: &Connection, table: Table) -> crate::Result<()> {
        in_transaction(conn, |conn| {
            conn.execute_batch(table.drop_statement())?;
            conn.execute_batch(table.create_statement())?;
            Ok(())
        })?;
        info!(table = %table, "Table dropped and recreated");
        Ok(())
    }

    /// Apply migration version 1 - per-key tables.
    ///
    /// Older stores kept the whole configuration as one JSON blob in a
    /// single-column `config` table. That table is moved out of the way so
    /// the per-key `config` table can take its name.
    fn apply_migration_1(conn: &Connection) -> crate::Result<()> {
        if Self::table_exists(conn, TABLE_CONFIG)? && !Self::has_column(conn, TABLE_CONFIG, "key")? {
            info!("Found single-blob config table, keeping it for import");
            conn.execute_batch(&format!(
                "ALTER TABLE {TABLE_CONFIG} RENAME TO {LEGACY_CONFIG}"
            ))?;
        }

        Self::create_default_tables(conn)?;
        Self::mark_applied(conn, 1)
    }

    /// Apply migration version 2 - import rows from the legacy tables.
    fn apply_migration_2(conn: &Connection) -> crate::Result<()> {
        if Self::table_exists(conn, LEGACY_FILES)? {
            let imported = conn.execute(
                r#"
                INSERT OR REPLACE INTO files (name, file_id, url, modified_time, course_id, checksum, size)
                SELECT COALESCE(name, ''), file_id, COALESCE(url, ''), COALESCE(time, 0),
                       COALESCE(course_id, 0), COALESCE(checksum, ''), COALESCE(size, 0)
                FROM fileinfo
                WHERE file_id IS NOT NULL AND file_id != ''
                "#,
                params![],
            )?;
            conn.execute_batch("DROP TABLE fileinfo")?;
            info!(imported, "Imported legacy file records");
        }

        if Self::table_exists(conn, LEGACY_COURSES)? {
            let imported = conn.execute(
                r#"
                INSERT OR IGNORE INTO courses (name, course_id)
                SELECT COALESCE(name, ''), id FROM courseinfo WHERE id IS NOT NULL
                "#,
                params![],
            )?;
            conn.execute_batch("DROP TABLE courseinfo")?;
            info!(imported, "Imported legacy courses");
        }

        if Self::table_exists(conn, LEGACY_CONFIG)? {
            let blob: Option<Option<String>> = conn
                .query_row("SELECT config FROM config_legacy LIMIT 1", params![], |row| {
                    row.get(0)
                })
                .optional()?;

            if let Some(blob) = blob.flatten() {
                Self::import_config_blob(conn, &blob)?;
            }
            conn.execute_batch("DROP TABLE config_legacy")?;
        }

        Self::mark_applied(conn, 2)
    }

    /// Split a legacy JSON configuration object into per-key rows.
    ///
    /// Strings are stored verbatim, booleans and numbers as their textual
    /// form, nulls are dropped since absence already means "default".
    fn import_config_blob(conn: &Connection, blob: &str) -> crate::Result<()> {
        let parsed: serde_json::Value = match serde_json::from_str(blob) {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "Legacy configuration is not valid JSON, discarding it");
                return Ok(());
            }
        };

        let serde_json::Value::Object(entries) = parsed else {
            warn!("Legacy configuration is not a JSON object, discarding it");
            return Ok(());
        };

        let mut stmt =
            conn.prepare("INSERT OR REPLACE INTO config (key, value) VALUES (?, ?)")?;
        let mut imported = 0usize;
        for (key, value) in entries {
            let text = match value {
                serde_json::Value::Null => continue,
                serde_json::Value::String(s) => s,
                serde_json::Value::Bool(b) => b.to_string(),
                serde_json::Value::Number(n) => n.to_string(),
                other => other.to_string(),
            };
            stmt.execute(params![key, text])?;
            imported += 1;
        }
        info!(imported, "Imported legacy configuration");
        Ok(())
    }

    fn mark_applied(conn: &Connection, version: u32) -> crate::Result<()> {
        conn.execute(
            "INSERT OR REPLACE INTO schema_migrations (version) VALUES (?)",
            params![version],
        )?;
        info!(version, "Applied schema migration");
        Ok(())
    }

    fn table_exists(conn: &Connection, name: &str) -> crate::Result<bool> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?",
            params![name],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn has_column(conn: &Connection, table: &str, column: &str) -> crate::Result<bool> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM pragma_table_info(?) WHERE name = ?",
            params![table, column],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Get the current schema version.
    pub fn current_version(conn: &Connection) -> crate::Result<Option<u32>> {
        let version: Option<u32> = conn.query_row(
            &format!("SELECT MAX(version) FROM {TABLE_SCHEMA_MIGRATIONS}"),
            params![],
            |row| row.get(0),
        )?;
        Ok(version)
    }
}
