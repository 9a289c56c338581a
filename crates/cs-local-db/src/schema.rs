//! Database schema definitions and constants.

// Current schema version
pub const SCHEMA_VERSION: u32 = 2;

// File name of the store inside the working directory
pub const DATABASE_FILE_NAME: &str = ".state.db";

// Table names
pub const TABLE_SCHEMA_MIGRATIONS: &str = "schema_migrations";
pub const TABLE_FILES: &str = "files";
pub const TABLE_COURSES: &str = "courses";
pub const TABLE_CONFIG: &str = "config";

// Column names for files table
pub mod files {
    pub const NAME: &str = "name";
    pub const FILE_ID: &str = "file_id";
    pub const URL: &str = "url";
    pub const MODIFIED_TIME: &str = "modified_time";
    pub const COURSE_ID: &str = "course_id";
    pub const CHECKSUM: &str = "checksum";
    pub const SIZE: &str = "size";
}

// Column names for courses table
pub mod courses {
    pub const NAME: &str = "name";
    pub const COURSE_ID: &str = "course_id";
}

// Column names for config table
pub mod config {
    pub const KEY: &str = "key";
    pub const VALUE: &str = "value";
}

/// The logical tables owned by the store.
///
/// `schema_migrations` is bookkeeping and deliberately not part of this set:
/// it can never be dropped through the public API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Files,
    Courses,
    Config,
}

impl Table {
    pub const ALL: [Table; 3] = [Table::Files, Table::Courses, Table::Config];

    pub fn name(self) -> &'static str {
        match self {
            Table::Files => TABLE_FILES,
            Table::Courses => TABLE_COURSES,
            Table::Config => TABLE_CONFIG,
        }
    }

    /// Idempotent DDL for this table and its indexes.
    pub fn create_statement(self) -> &'static str {
        match self {
            Table::Files => {
                r#"
                CREATE TABLE IF NOT EXISTS files (
                    name TEXT NOT NULL,
                    file_id TEXT PRIMARY KEY NOT NULL,
                    url TEXT NOT NULL,
                    modified_time INTEGER NOT NULL,
                    course_id INTEGER NOT NULL,
                    checksum TEXT NOT NULL,
                    size INTEGER NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_files_checksum ON files(checksum);
                CREATE INDEX IF NOT EXISTS idx_files_course_id ON files(course_id);
                "#
            }
            Table::Courses => {
                r#"
                CREATE TABLE IF NOT EXISTS courses (
                    name TEXT NOT NULL,
                    course_id INTEGER PRIMARY KEY NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_courses_name ON courses(name);
                "#
            }
            Table::Config => {
                r#"
                CREATE TABLE IF NOT EXISTS config (
                    key TEXT PRIMARY KEY NOT NULL,
                    value TEXT NOT NULL
                );
                "#
            }
        }
    }

    /// Statement removing this table, its indexes go with it.
    pub fn drop_statement(self) -> &'static str {
        match self {
            Table::Files => "DROP TABLE IF EXISTS files",
            Table::Courses => "DROP TABLE IF EXISTS courses",
            Table::Config => "DROP TABLE IF EXISTS config",
        }
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
