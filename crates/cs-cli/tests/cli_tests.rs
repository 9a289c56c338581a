use cs_cli::{
    config::ConfigCommands,
    files::{CoursesCommands, FilesCommands},
    open_state,
    verify::VerifyArgs,
    Cli, Commands, Parser,
};
use cs_local_db::{CourseRecord, FileRecord, UpdatePolicy};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

#[test]
fn test_cli_parsing_state_with_db_override() {
    let args = vec!["csync", "--db", "/tmp/coursesync/.state.db", "state"];

    let cli = Cli::try_parse_from(args).unwrap();
    assert!(matches!(cli.command, Commands::State));
    assert_eq!(cli.db, Some(PathBuf::from("/tmp/coursesync/.state.db")));
    assert_eq!(cli.log_level, "info");
}

#[test]
fn test_cli_parsing_global_options_after_subcommand() {
    let args = vec!["csync", "courses", "list", "--log-level", "debug"];

    let cli = Cli::try_parse_from(args).unwrap();
    assert!(matches!(
        cli.command,
        Commands::Courses {
            subcommand: CoursesCommands::List
        }
    ));
    assert_eq!(cli.log_level, "debug");
    assert_eq!(cli.db, None);
}

#[test]
fn test_cli_parsing_config_set() {
    let args = vec!["csync", "config", "set", "update_policy", "2"];

    let cli = Cli::try_parse_from(args).unwrap();
    match cli.command {
        Commands::Config {
            subcommand: ConfigCommands::Set { key, value },
        } => {
            assert_eq!(key, "update_policy");
            assert_eq!(value, "2");
        }
        _ => panic!("expected config set"),
    }
}

#[test]
fn test_cli_parsing_config_requires_key() {
    assert!(Cli::try_parse_from(vec!["csync", "config", "get"]).is_err());
}

#[test]
fn test_cli_parsing_files_lookup_checksum() {
    let args = vec!["csync", "files", "lookup-checksum", "c0ffee"];

    let cli = Cli::try_parse_from(args).unwrap();
    assert!(matches!(
        cli.command,
        Commands::Files {
            subcommand: FilesCommands::LookupChecksum { .. }
        }
    ));
}

#[test]
fn test_cli_parsing_files_delete_by_checksum() {
    let args = vec!["csync", "files", "delete", "--checksum", "c0ffee"];

    let cli = Cli::try_parse_from(args).unwrap();
    match cli.command {
        Commands::Files {
            subcommand: FilesCommands::Delete(args),
        } => {
            assert_eq!(args.checksum.as_deref(), Some("c0ffee"));
            assert_eq!(args.file_id, None);
        }
        _ => panic!("expected files delete"),
    }
}

#[test]
fn test_cli_parsing_files_delete_requires_exactly_one_key() {
    assert!(Cli::try_parse_from(vec!["csync", "files", "delete"]).is_err());
    assert!(Cli::try_parse_from(vec![
        "csync",
        "files",
        "delete",
        "--file-id",
        "f1",
        "--checksum",
        "c1",
    ])
    .is_err());
}

#[test]
fn test_cli_parsing_verify_root_is_optional() {
    let cli = Cli::try_parse_from(vec!["csync", "verify"]).unwrap();
    match cli.command {
        Commands::Verify(args) => assert_eq!(args.root, None),
        _ => panic!("expected verify"),
    }

    let cli = Cli::try_parse_from(vec!["csync", "verify", "/data/courses"]).unwrap();
    match cli.command {
        Commands::Verify(args) => assert_eq!(args.root, Some(PathBuf::from("/data/courses"))),
        _ => panic!("expected verify"),
    }
}

#[tokio::test]
async fn test_config_commands_against_store() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let db_path = temp_dir.path().join(".state.db");
    let state = open_state(Some(db_path.as_path())).unwrap();

    ConfigCommands::Set {
        key: "update_policy".to_string(),
        value: "1".to_string(),
    }
    .run(&state)
    .await
    .unwrap();
    assert_eq!(
        state.config(|config| config.update_policy()).unwrap(),
        UpdatePolicy::Github
    );

    let rejected = ConfigCommands::Set {
        key: "update_policy".to_string(),
        value: "nightly".to_string(),
    }
    .run(&state)
    .await;
    assert!(rejected.is_err());

    let unknown = ConfigCommands::Get {
        key: "no_such_setting".to_string(),
    }
    .run(&state)
    .await;
    assert!(unknown.is_err());

    ConfigCommands::Reset.run(&state).await.unwrap();
    assert_eq!(
        state.config(|config| config.update_policy()).unwrap(),
        UpdatePolicy::Disabled
    );
}

#[tokio::test]
async fn test_files_delete_against_store() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let state = open_state(Some(temp_dir.path().join(".state.db").as_path())).unwrap();
    state
        .record_discovered(
            &CourseRecord::new("Algebra", 1),
            &[FileRecord {
                name: "slides.pdf".to_string(),
                file_id: "f1".to_string(),
                url: "https://courses.example.org/f1".to_string(),
                modified_time: 1_700_000_000,
                course_id: 1,
                checksum: "c1".to_string(),
                size: 1024,
            }],
        )
        .unwrap();

    let cli = Cli::try_parse_from(vec!["csync", "files", "delete", "--file-id", "f1"]).unwrap();
    let Commands::Files { subcommand } = cli.command else {
        panic!("expected files command");
    };
    subcommand.run(&state).await.unwrap();

    assert_eq!(state.is_cached("c1").unwrap(), None);
    assert_eq!(state.courses().unwrap().len(), 1);
}

#[test]
fn test_verify_root_for_bare_database_file_name() {
    let args = VerifyArgs { root: None };

    let root = args.resolve_root(Some(Path::new("state.db"))).unwrap();
    assert_eq!(root, PathBuf::from("."));
    assert!(root.is_dir());
}

#[test]
fn test_verify_root_prefers_explicit_root_then_database_directory() {
    let explicit = VerifyArgs {
        root: Some(PathBuf::from("/data/courses")),
    };
    assert_eq!(
        explicit
            .resolve_root(Some(Path::new("/srv/coursesync/.state.db")))
            .unwrap(),
        PathBuf::from("/data/courses")
    );

    let implicit = VerifyArgs { root: None };
    assert_eq!(
        implicit
            .resolve_root(Some(Path::new("/srv/coursesync/.state.db")))
            .unwrap(),
        PathBuf::from("/srv/coursesync")
    );
}

#[tokio::test]
async fn test_verify_defaults_to_database_directory() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let state = open_state(Some(temp_dir.path().join(".state.db").as_path())).unwrap();

    VerifyArgs { root: None }.run(state).await.unwrap();
}
