//! Database models and persistence operations.

use rusqlite::{params, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::connection::in_transaction;

/// Database model for a remote file the crawler has seen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub name: String,
    /// Stable identifier assigned by the remote source.
    pub file_id: String,
    pub url: String,
    /// Remote modification time, epoch seconds.
    pub modified_time: i64,
    pub course_id: i64,
    /// Content fingerprint, see `cs_core::checksum`.
    pub checksum: String,
    pub size: u64,
}

impl FileRecord {
    /// Remote modification time as a UTC timestamp.
    pub fn modified_at(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        chrono::DateTime::from_timestamp(self.modified_time, 0)
    }

    fn validate(&self) -> crate::Result<()> {
        if self.file_id.is_empty() {
            return Err(crate::Error::invalid_record(format!(
                "file '{}' has an empty file_id",
                self.name
            )));
        }
        self.sql_size()?;
        Ok(())
    }

    // SQLite integers are signed.
    fn sql_size(&self) -> crate::Result<i64> {
        i64::try_from(self.size).map_err(|_| {
            crate::Error::invalid_record(format!(
                "file '{}' has an out of range size {}",
                self.file_id, self.size
            ))
        })
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            name: row.get(0)?,
            file_id: row.get(1)?,
            url: row.get(2)?,
            modified_time: row.get(3)?,
            course_id: row.get(4)?,
            checksum: row.get(5)?,
            size: size_from_sql(row.get(6)?, 6)?,
        })
    }
}

fn size_from_sql(size: i64, column: usize) -> rusqlite::Result<u64> {
    u64::try_from(size).map_err(|_| rusqlite::Error::IntegralValueOutOfRange(column, size))
}

/// Database model for courses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseRecord {
    pub name: String,
    pub course_id: i64,
}

impl CourseRecord {
    pub fn new<S: Into<String>>(name: S, course_id: i64) -> Self {
        Self {
            name: name.into(),
            course_id,
        }
    }
}

/// Which rows [`FileStore::delete`] removes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKey<'k> {
    FileId(&'k str),
    Checksum(&'k str),
}

const UPSERT_FILE: &str = r#"
    INSERT OR REPLACE INTO files (name, file_id, url, modified_time, course_id, checksum, size)
    VALUES (?, ?, ?, ?, ?, ?, ?)
"#;

const SELECT_FILE_COLUMNS: &str =
    "SELECT name, file_id, url, modified_time, course_id, checksum, size FROM files";

/// Database operations for the file cache.
pub struct FileStore<'a> {
    conn: &'a rusqlite::Connection,
}

impl<'a> FileStore<'a> {
    pub fn new(conn: &'a rusqlite::Connection) -> Self {
        Self { conn }
    }

    /// Insert a record, replacing any row with the same file_id.
    ///
    /// Returns `true` when a row with that file_id already existed.
    pub fn upsert(&self, record: &FileRecord) -> crate::Result<bool> {
        record.validate()?;

        in_transaction(self.conn, |conn| {
            let existed = conn
                .query_row(
                    "SELECT 1 FROM files WHERE file_id = ?",
                    params![record.file_id],
                    |_| Ok(()),
                )
                .optional()?
                .is_some();

            conn.execute(
                UPSERT_FILE,
                params![
                    record.name,
                    record.file_id,
                    record.url,
                    record.modified_time,
                    record.course_id,
                    record.checksum,
                    record.sql_size()?
                ],
            )?;
            Ok(existed)
        })
    }

    /// Upsert a batch of records with a single commit.
    ///
    /// Every record is validated before anything is written.
    pub fn upsert_many(&self, records: &[FileRecord]) -> crate::Result<usize> {
        for record in records {
            record.validate()?;
        }

        in_transaction(self.conn, |conn| {
            let mut stmt = conn.prepare_cached(UPSERT_FILE)?;
            for record in records {
                stmt.execute(params![
                    record.name,
                    record.file_id,
                    record.url,
                    record.modified_time,
                    record.course_id,
                    record.checksum,
                    record.sql_size()?
                ])?;
            }
            Ok(records.len())
        })
    }

    /// Name of the most recently written file carrying this checksum.
    pub fn lookup_name_by_checksum(&self, checksum: &str) -> crate::Result<Option<String>> {
        Ok(self
            .conn
            .query_row(
                "SELECT name FROM files WHERE checksum = ? ORDER BY rowid DESC LIMIT 1",
                params![checksum],
                |row| row.get(0),
            )
            .optional()?)
    }

    /// Last known size of a file, used to validate resumed transfers.
    pub fn lookup_size(&self, file_id: &str) -> crate::Result<Option<u64>> {
        Ok(self
            .conn
            .query_row(
                "SELECT size FROM files WHERE file_id = ?",
                params![file_id],
                |row| size_from_sql(row.get(0)?, 0),
            )
            .optional()?)
    }

    /// Remove the rows matching `key`, returning how many were removed.
    pub fn delete(&self, key: FileKey<'_>) -> crate::Result<usize> {
        let removed = match key {
            FileKey::FileId(file_id) => self
                .conn
                .execute("DELETE FROM files WHERE file_id = ?", params![file_id])?,
            FileKey::Checksum(checksum) => self
                .conn
                .execute("DELETE FROM files WHERE checksum = ?", params![checksum])?,
        };
        Ok(removed)
    }

    /// Course name to the checksums of that course's files.
    ///
    /// Files whose course_id is not registered are left out. Courses that
    /// share a name share an entry.
    pub fn checksums_grouped_by_course(
        &self,
    ) -> crate::Result<BTreeMap<String, BTreeSet<String>>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT courses.name, files.checksum
            FROM files INNER JOIN courses ON files.course_id = courses.course_id
            "#,
        )?;

        let rows = stmt.query_map(params![], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut grouped: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for row in rows {
            let (course, checksum) = row?;
            grouped.entry(course).or_default().insert(checksum);
        }
        Ok(grouped)
    }

    pub fn get(&self, file_id: &str) -> crate::Result<Option<FileRecord>> {
        Ok(self
            .conn
            .query_row(
                &format!("{SELECT_FILE_COLUMNS} WHERE file_id = ?"),
                params![file_id],
                FileRecord::from_row,
            )
            .optional()?)
    }

    pub fn list_all(&self) -> crate::Result<Vec<FileRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{SELECT_FILE_COLUMNS} ORDER BY course_id, name, file_id"))?;
        let records = stmt.query_map(params![], FileRecord::from_row)?;

        let mut files = Vec::new();
        for record in records {
            files.push(record?);
        }
        Ok(files)
    }

    pub fn list_by_course(&self, course_id: i64) -> crate::Result<Vec<FileRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "{SELECT_FILE_COLUMNS} WHERE course_id = ? ORDER BY name, file_id"
        ))?;
        let records = stmt.query_map(params![course_id], FileRecord::from_row)?;

        let mut files = Vec::new();
        for record in records {
            files.push(record?);
        }
        Ok(files)
    }

    pub fn count(&self) -> crate::Result<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM files", params![], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }
}

/// Database operations for the course index.
pub struct CourseStore<'a> {
    conn: &'a rusqlite::Connection,
}

impl<'a> CourseStore<'a> {
    pub fn new(conn: &'a rusqlite::Connection) -> Self {
        Self { conn }
    }

    /// Register a course. A course_id that is already known is left as is.
    ///
    /// Returns `true` when a new row was inserted.
    pub fn register(&self, name: &str, course_id: i64) -> crate::Result<bool> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO courses (name, course_id) VALUES (?, ?)",
            params![name, course_id],
        )?;
        Ok(inserted > 0)
    }

    pub fn lookup_id_by_name(&self, name: &str) -> crate::Result<Option<i64>> {
        Ok(self
            .conn
            .query_row(
                "SELECT course_id FROM courses WHERE name = ? ORDER BY course_id LIMIT 1",
                params![name],
                |row| row.get(0),
            )
            .optional()?)
    }

    pub fn lookup_name_by_id(&self, course_id: i64) -> crate::Result<Option<String>> {
        Ok(self
            .conn
            .query_row(
                "SELECT name FROM courses WHERE course_id = ?",
                params![course_id],
                |row| row.get(0),
            )
            .optional()?)
    }

    pub fn list_all(&self) -> crate::Result<Vec<CourseRecord>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name, course_id FROM courses ORDER BY course_id")?;

        let records = stmt.query_map(params![], |row| {
            Ok(CourseRecord {
                name: row.get(0)?,
                course_id: row.get(1)?,
            })
        })?;

        let mut courses = Vec::new();
        for record in records {
            courses.push(record?);
        }
        Ok(courses)
    }
}
