//! Worker-side building blocks for coursesync.
//!
//! The crawler and downloader workers talk to the metadata store through
//! [`StateManager`]. Content fingerprints are computed here (see
//! [`checksum`]) and never inside the store, and [`IntegrityChecker`]
//! reconciles the files on disk against what the store remembers.

pub mod checksum;
pub mod db;
pub mod error;
pub mod integrity;

/// Core result type used throughout coursesync.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type that encompasses all coursesync operations.
pub use error::Error;

/// Content fingerprints.
pub use checksum::{fingerprint_file, fingerprint_reader, FingerprintConfig};

/// Database integration for persistence.
pub use db::StateManager;

/// Reconciliation of local files against the store.
pub use integrity::{IntegrityChecker, IntegrityReport};
