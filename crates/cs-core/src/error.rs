//! Core error types for coursesync.

/// Core error type for all coursesync operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Fingerprint error for {path}: {source}")]
    Fingerprint {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Integrity check error: {message}")]
    Integrity { message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] cs_local_db::Error),

    #[error("Generic error: {0}")]
    Generic(String),
}

impl Error {
    /// Create a new integrity-check error.
    pub fn integrity<S: Into<String>>(message: S) -> Self {
        Self::Integrity {
            message: message.into(),
        }
    }

    /// Create a new generic error.
    pub fn generic<S: Into<String>>(message: S) -> Self {
        Self::Generic(message.into())
    }
}
