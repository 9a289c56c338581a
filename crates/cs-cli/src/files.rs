use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use cs_core::StateManager;
use cs_local_db::FileKey;

/// File cache commands
#[derive(Subcommand)]
pub enum FilesCommands {
    /// Print the name cached under a content checksum
    LookupChecksum {
        #[arg(value_name = "CHECKSUM")]
        checksum: String,
    },
    /// Print the last known size of a remote file
    Size {
        #[arg(value_name = "FILE_ID")]
        file_id: String,
    },
    /// Delete cache entries by remote file id or by checksum
    Delete(FilesDeleteArgs),
    /// Forget every cached file
    Reset,
}

/// Selects the cache entries to delete
#[derive(Args)]
pub struct FilesDeleteArgs {
    /// Remote file identifier
    #[arg(
        long = "file-id",
        value_name = "ID",
        conflicts_with = "checksum",
        required_unless_present = "checksum"
    )]
    pub file_id: Option<String>,

    /// Content checksum
    #[arg(long = "checksum", value_name = "CHECKSUM")]
    pub checksum: Option<String>,
}

impl FilesDeleteArgs {
    fn key(&self) -> Result<FileKey<'_>> {
        match (&self.file_id, &self.checksum) {
            (Some(file_id), None) => Ok(FileKey::FileId(file_id)),
            (None, Some(checksum)) => Ok(FileKey::Checksum(checksum)),
            _ => anyhow::bail!("Error: exactly one of --file-id and --checksum is required"),
        }
    }
}

impl FilesCommands {
    /// Execute the file cache command
    pub async fn run(self, state: &StateManager) -> Result<()> {
        match self {
            FilesCommands::LookupChecksum { checksum } => {
                match state.is_cached(&checksum).context("Failed to look up checksum")? {
                    Some(name) => println!("{name}"),
                    None => println!("Not cached"),
                }
            }
            FilesCommands::Size { file_id } => {
                match state.expected_size(&file_id).context("Failed to look up size")? {
                    Some(size) => println!("{size}"),
                    None => println!("Not cached"),
                }
            }
            FilesCommands::Delete(args) => {
                let removed = state
                    .invalidate(args.key()?)
                    .context("Failed to delete cache entries")?;
                println!("Removed {removed} record(s)");
            }
            FilesCommands::Reset => {
                state.reset_files().context("Failed to reset file cache")?;
            }
        }
        Ok(())
    }
}

/// Course index commands
#[derive(Subcommand)]
pub enum CoursesCommands {
    /// Print every registered course
    List,
}

impl CoursesCommands {
    /// Execute the course index command
    pub async fn run(self, state: &StateManager) -> Result<()> {
        match self {
            CoursesCommands::List => {
                for course in state.courses().context("Failed to list courses")? {
                    println!("{}\t{}", course.course_id, course.name);
                }
            }
        }
        Ok(())
    }
}
