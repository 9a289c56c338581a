//! Database integration for the sync workers.

use cs_local_db::{
    ConfigStore, CourseRecord, CourseStore, Database, FileKey, FileRecord, FileStore, StoreState,
};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::{debug, info};

/// Store access for crawler, downloader and settings code.
///
/// Every method takes the store's serialization boundary exactly once, so a
/// multi-statement method (such as [`StateManager::record_discovered`]) is
/// never interleaved with statements from other workers.
#[derive(Debug, Clone)]
pub struct StateManager {
    db: Database,
}

impl StateManager {
    /// Create a state manager over the default store location.
    pub fn new() -> crate::Result<Self> {
        let db = Database::open_default()?;
        Ok(Self { db })
    }

    /// Create a state manager with custom database path.
    pub fn with_path<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let db = Database::open(path)?;
        Ok(Self { db })
    }

    /// Create a state manager over a throwaway in-memory store.
    pub fn in_memory() -> crate::Result<Self> {
        let db = Database::open_in_memory()?;
        Ok(Self { db })
    }

    pub fn from_database(db: Database) -> Self {
        Self { db }
    }

    /// Register a course and cache the files the crawler found in it.
    ///
    /// Returns the number of file records written.
    pub fn record_discovered(
        &self,
        course: &CourseRecord,
        files: &[FileRecord],
    ) -> crate::Result<usize> {
        let written = self.db.transaction(|conn| {
            if CourseStore::new(conn).register(&course.name, course.course_id)? {
                info!(course = %course.name, course_id = course.course_id, "Registered course");
            }
            FileStore::new(conn).upsert_many(files)
        })?;
        debug!(course_id = course.course_id, written, "Recorded discovered files");
        Ok(written)
    }

    /// Cache one file. Returns whether a record with its file_id existed.
    pub fn upsert_file(&self, record: &FileRecord) -> crate::Result<bool> {
        Ok(self
            .db
            .with_connection(|conn| FileStore::new(conn).upsert(record))?)
    }

    /// Name under which content with this checksum is already cached.
    pub fn is_cached(&self, checksum: &str) -> crate::Result<Option<String>> {
        Ok(self
            .db
            .with_connection(|conn| FileStore::new(conn).lookup_name_by_checksum(checksum))?)
    }

    /// Last known size of a file, for validating resumed transfers.
    pub fn expected_size(&self, file_id: &str) -> crate::Result<Option<u64>> {
        Ok(self
            .db
            .with_connection(|conn| FileStore::new(conn).lookup_size(file_id))?)
    }

    /// Drop cache entries for stale or corrupted content.
    pub fn invalidate(&self, key: FileKey<'_>) -> crate::Result<usize> {
        let removed = self
            .db
            .with_connection(|conn| FileStore::new(conn).delete(key))?;
        debug!(?key, removed, "Invalidated cache entries");
        Ok(removed)
    }

    pub fn checksums_grouped_by_course(
        &self,
    ) -> crate::Result<BTreeMap<String, BTreeSet<String>>> {
        Ok(self
            .db
            .with_connection(|conn| FileStore::new(conn).checksums_grouped_by_course())?)
    }

    pub fn courses(&self) -> crate::Result<Vec<CourseRecord>> {
        Ok(self
            .db
            .with_connection(|conn| CourseStore::new(conn).list_all())?)
    }

    pub fn course_id(&self, name: &str) -> crate::Result<Option<i64>> {
        Ok(self
            .db
            .with_connection(|conn| CourseStore::new(conn).lookup_id_by_name(name))?)
    }

    /// Run settings reads or writes against the config table.
    ///
    /// ```no_run
    /// # fn main() -> cs_core::Result<()> {
    /// let state = cs_core::StateManager::new()?;
    /// let policy = state.config(|config| config.update_policy())?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn config<F, T>(&self, f: F) -> crate::Result<T>
    where
        F: FnOnce(&ConfigStore<'_>) -> cs_local_db::Result<T>,
    {
        Ok(self.db.with_connection(|conn| f(&ConfigStore::new(conn)))?)
    }

    /// Forget every cached file.
    pub fn reset_files(&self) -> crate::Result<()> {
        self.db.delete_file_table()?;
        info!("File cache cleared");
        Ok(())
    }

    /// Revert every setting to its default.
    pub fn reset_config(&self) -> crate::Result<()> {
        self.db.delete_config()?;
        info!("Configuration reset");
        Ok(())
    }

    pub fn state(&self) -> crate::Result<StoreState> {
        Ok(self.db.state()?)
    }

    /// Get access to the underlying database for advanced operations.
    pub fn database(&self) -> &Database {
        &self.db
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cs_local_db::UpdatePolicy;

    fn record(file_id: &str, checksum: &str, course_id: i64) -> FileRecord {
        FileRecord {
            name: format!("{file_id}.pdf"),
            file_id: file_id.to_string(),
            url: format!("https://courses.example.org/{file_id}"),
            modified_time: 0,
            course_id,
            checksum: checksum.to_string(),
            size: 512,
        }
    }

    #[test]
    fn test_record_discovered_registers_course_once() {
        let state = StateManager::in_memory().unwrap();
        let course = CourseRecord::new("Algebra", 7);

        assert_eq!(
            state
                .record_discovered(&course, &[record("a", "c1", 7), record("b", "c2", 7)])
                .unwrap(),
            2
        );
        state
            .record_discovered(&CourseRecord::new("Algebra II", 7), &[record("a", "c3", 7)])
            .unwrap();

        assert_eq!(state.courses().unwrap(), vec![course]);
        assert_eq!(state.is_cached("c3").unwrap().as_deref(), Some("a.pdf"));
        assert_eq!(state.is_cached("c1").unwrap(), None);
        assert_eq!(state.expected_size("b").unwrap(), Some(512));
    }

    #[test]
    fn test_record_discovered_rolls_back_on_invalid_file() {
        let state = StateManager::in_memory().unwrap();
        let result = state.record_discovered(
            &CourseRecord::new("Algebra", 7),
            &[record("a", "c1", 7), record("", "c2", 7)],
        );

        assert!(result.is_err());
        assert!(state.courses().unwrap().is_empty());
        assert_eq!(state.state().unwrap().files.len(), 0);
    }

    #[test]
    fn test_config_closure_and_reset() {
        let state = StateManager::in_memory().unwrap();
        state
            .config(|config| config.set_update_policy(UpdatePolicy::Github))
            .unwrap();
        assert_eq!(
            state.config(|config| config.update_policy()).unwrap(),
            UpdatePolicy::Github
        );

        state.reset_config().unwrap();
        assert_eq!(
            state.config(|config| config.update_policy()).unwrap(),
            UpdatePolicy::Disabled
        );
    }

    #[test]
    fn test_invalidate_and_reset_files() {
        let state = StateManager::in_memory().unwrap();
        state.upsert_file(&record("a", "c1", 1)).unwrap();
        state.upsert_file(&record("b", "c2", 1)).unwrap();

        assert_eq!(state.invalidate(FileKey::Checksum("c1")).unwrap(), 1);
        assert_eq!(state.is_cached("c1").unwrap(), None);

        state.reset_files().unwrap();
        assert_eq!(state.expected_size("b").unwrap(), None);
    }
}
