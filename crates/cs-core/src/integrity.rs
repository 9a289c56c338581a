//! Reconcile downloaded files against the file cache.
//!
//! The working directory holds one folder per course, named after the course.
//! Every regular file below a course folder is fingerprinted and looked up in
//! the checksums the store has for that course.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::{DirEntry, WalkDir};

use crate::checksum::{fingerprint_file, FingerprintConfig};
use crate::db::StateManager;

/// Outcome of an integrity check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IntegrityReport {
    /// Files whose fingerprint the store knows for their course.
    pub verified: usize,
    /// Files below a known course whose fingerprint the store does not know.
    pub orphaned: Vec<PathBuf>,
    /// Course name to cached checksums with no matching file on disk.
    pub missing: BTreeMap<String, BTreeSet<String>>,
    /// Folders that do not belong to any known course.
    pub unknown_courses: Vec<PathBuf>,
}

impl IntegrityReport {
    pub fn is_clean(&self) -> bool {
        self.orphaned.is_empty() && self.missing.is_empty() && self.unknown_courses.is_empty()
    }
}

/// Walks a working directory and compares it with the store.
pub struct IntegrityChecker {
    state: StateManager,
    fingerprint: FingerprintConfig,
}

// The walk root itself is never skipped, it may well be a dot-directory.
fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .map(|name| name.starts_with('.'))
            .unwrap_or(false)
}

impl IntegrityChecker {
    pub fn new(state: StateManager) -> Self {
        Self {
            state,
            fingerprint: FingerprintConfig::default(),
        }
    }

    pub fn with_fingerprint(mut self, fingerprint: FingerprintConfig) -> Self {
        self.fingerprint = fingerprint;
        self
    }

    pub fn run(&self, root: &Path) -> crate::Result<IntegrityReport> {
        if !root.is_dir() {
            return Err(crate::Error::integrity(format!(
                "{} is not a directory",
                root.display()
            )));
        }

        let mut expected = self.state.checksums_grouped_by_course()?;
        // Registered courses without cached files still own their folder.
        for course in self.state.courses()? {
            expected.entry(course.name).or_default();
        }
        let mut seen: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        let mut report = IntegrityReport::default();

        let course_dirs = WalkDir::new(root)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !is_hidden(entry));

        for course_dir in course_dirs {
            let course_dir = course_dir.map_err(|e| crate::Error::integrity(e.to_string()))?;
            if !course_dir.file_type().is_dir() {
                continue;
            }

            let course_name = course_dir.file_name().to_string_lossy().into_owned();
            let Some(known) = expected.get(&course_name) else {
                report.unknown_courses.push(course_dir.path().to_path_buf());
                continue;
            };

            let files = WalkDir::new(course_dir.path())
                .min_depth(1)
                .sort_by_file_name()
                .into_iter()
                .filter_entry(|entry| !is_hidden(entry));

            for entry in files {
                let entry = entry.map_err(|e| crate::Error::integrity(e.to_string()))?;
                if !entry.file_type().is_file() {
                    continue;
                }

                let checksum = fingerprint_file(entry.path(), &self.fingerprint)?;
                if known.contains(&checksum) {
                    report.verified += 1;
                    seen.entry(course_name.clone()).or_default().insert(checksum);
                } else {
                    debug!(path = %entry.path().display(), "File not in cache");
                    report.orphaned.push(entry.path().to_path_buf());
                }
            }
        }

        for (course, checksums) in expected {
            let found = seen.remove(&course).unwrap_or_default();
            let missing: BTreeSet<String> = checksums.difference(&found).cloned().collect();
            if !missing.is_empty() {
                report.missing.insert(course, missing);
            }
        }

        info!(
            verified = report.verified,
            orphaned = report.orphaned.len(),
            missing = report.missing.values().map(BTreeSet::len).sum::<usize>(),
            unknown_courses = report.unknown_courses.len(),
            "Integrity check finished"
        );
        Ok(report)
    }
}
