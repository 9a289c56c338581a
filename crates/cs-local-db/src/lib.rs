//! SQLite metadata store for coursesync.
//!
//! This crate remembers which remote files have already been fetched, indexes
//! them by content fingerprint, maps course names to identifiers and holds the
//! user's settings. A single [`Database`] handle is shared by every worker
//! thread; all statements run inside [`Database::with_connection`], which
//! serializes access to the one underlying connection.

pub mod config;
pub mod connection;
pub mod migrations;
pub mod models;
pub mod schema;

/// Result type for database operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for database operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Migration error: {message}")]
    Migration { message: String },

    #[error("Invalid record: {message}")]
    InvalidRecord { message: String },

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Generic database error: {0}")]
    Generic(String),
}

impl Error {
    /// Create a new migration error.
    pub fn migration<S: Into<String>>(message: S) -> Self {
        Self::Migration {
            message: message.into(),
        }
    }

    /// Create a new invalid record error.
    pub fn invalid_record<S: Into<String>>(message: S) -> Self {
        Self::InvalidRecord {
            message: message.into(),
        }
    }

    /// Create a new generic database error.
    pub fn generic<S: Into<String>>(message: S) -> Self {
        Self::Generic(message.into())
    }
}

/// Database connection and management.
pub use connection::{Database, StoreState};

/// Settings storage and typed accessors.
pub use config::{
    ConfigKey, ConfigStore, ConfigValue, FilenameScheme, UnrelatedFilesPolicy, UpdatePolicy,
};

/// Database models and operations.
pub use models::{CourseRecord, CourseStore, FileKey, FileRecord, FileStore};

/// Schema migrations.
pub use migrations::MigrationManager;

/// Schema definitions and constants.
pub use schema::*;
