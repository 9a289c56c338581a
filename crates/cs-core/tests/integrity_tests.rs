//! Tests for reconciling a working directory against the file cache.

use cs_core::{fingerprint_file, FingerprintConfig, IntegrityChecker, StateManager};
use cs_local_db::{CourseRecord, FileRecord};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write(path: &Path, content: &[u8]) {
    fs::create_dir_all(path.parent().unwrap()).expect("Failed to create parent directory");
    fs::write(path, content).expect("Failed to write file");
}

fn cached(path: &Path, file_id: &str, course_id: i64) -> FileRecord {
    FileRecord {
        name: path.file_name().unwrap().to_string_lossy().into_owned(),
        file_id: file_id.to_string(),
        url: format!("https://courses.example.org/{file_id}"),
        modified_time: 1_700_000_000,
        course_id,
        checksum: fingerprint_file(path, &FingerprintConfig::default())
            .expect("Failed to fingerprint file"),
        size: fs::metadata(path).unwrap().len(),
    }
}

/// Working directory with two courses, both fully cached.
fn setup_working_dir() -> (TempDir, StateManager) {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let root = temp_dir.path();

    write(&root.join("Algebra/slides.pdf"), b"slide content");
    write(&root.join("Algebra/week1/sheet.pdf"), b"exercise sheet");
    write(&root.join("Physics/lecture.mp4"), &vec![42u8; 2_000_000]);

    let state = StateManager::in_memory().expect("Failed to open store");
    state
        .record_discovered(
            &CourseRecord::new("Algebra", 1),
            &[
                cached(&root.join("Algebra/slides.pdf"), "f1", 1),
                cached(&root.join("Algebra/week1/sheet.pdf"), "f2", 1),
            ],
        )
        .expect("Failed to record Algebra");
    state
        .record_discovered(
            &CourseRecord::new("Physics", 2),
            &[cached(&root.join("Physics/lecture.mp4"), "f3", 2)],
        )
        .expect("Failed to record Physics");

    (temp_dir, state)
}

#[test]
fn test_fully_cached_directory_is_clean() {
    let (temp_dir, state) = setup_working_dir();
    let report = IntegrityChecker::new(state).run(temp_dir.path()).unwrap();

    assert!(report.is_clean(), "unexpected report: {report:?}");
    assert_eq!(report.verified, 3);
}

#[test]
fn test_unknown_files_and_folders_are_reported() {
    let (temp_dir, state) = setup_working_dir();
    let root = temp_dir.path();
    write(&root.join("Algebra/notes.txt"), b"my own notes");
    write(&root.join("Chemistry/lab.pdf"), b"lab report");
    write(&root.join(".state.db"), b"not a course");
    write(&root.join("Algebra/.hidden"), b"ignored");

    let report = IntegrityChecker::new(state).run(root).unwrap();

    assert_eq!(report.verified, 3);
    assert_eq!(report.orphaned, vec![root.join("Algebra/notes.txt")]);
    assert_eq!(report.unknown_courses, vec![root.join("Chemistry")]);
    assert!(report.missing.is_empty());
}

#[test]
fn test_deleted_and_modified_files_are_missing() {
    let (temp_dir, state) = setup_working_dir();
    let root = temp_dir.path();
    let sheet_checksum = fingerprint_file(
        &root.join("Algebra/week1/sheet.pdf"),
        &FingerprintConfig::default(),
    )
    .unwrap();

    fs::remove_file(root.join("Algebra/week1/sheet.pdf")).unwrap();
    write(&root.join("Algebra/slides.pdf"), b"slide content, revised");

    let report = IntegrityChecker::new(state).run(root).unwrap();

    assert_eq!(report.verified, 1);
    assert_eq!(report.orphaned, vec![root.join("Algebra/slides.pdf")]);
    let missing = &report.missing["Algebra"];
    assert_eq!(missing.len(), 2);
    assert!(missing.contains(&sheet_checksum));
}

#[test]
fn test_registered_course_without_files_is_not_unknown() {
    let (temp_dir, state) = setup_working_dir();
    state
        .record_discovered(&CourseRecord::new("Empty Course", 3), &[])
        .unwrap();
    fs::create_dir_all(temp_dir.path().join("Empty Course")).unwrap();

    let report = IntegrityChecker::new(state).run(temp_dir.path()).unwrap();
    assert!(report.is_clean(), "unexpected report: {report:?}");
}

#[test]
fn test_missing_root_is_an_error() {
    let state = StateManager::in_memory().unwrap();
    let result = IntegrityChecker::new(state).run(Path::new("/nonexistent/coursesync"));
    assert!(result.is_err());
}
