//! coursesync maintenance CLI library

pub mod config;
pub mod files;
pub mod verify;

use anyhow::{Context, Result};
use cs_core::StateManager;
use std::path::{Path, PathBuf};
use tracing::debug;

// Re-export CLI types for testing
pub use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "csync")]
#[command(about = "coursesync metadata store maintenance")]
#[command(version, author, long_about = None)]
pub struct Cli {
    /// Database file to operate on (defaults to $COURSESYNC_HOME/.state.db)
    #[arg(long, global = true, value_name = "PATH")]
    pub db: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print every table of the store as JSON
    State,
    /// Read and write settings
    Config {
        #[command(subcommand)]
        subcommand: config::ConfigCommands,
    },
    /// Inspect and invalidate the file cache
    Files {
        #[command(subcommand)]
        subcommand: files::FilesCommands,
    },
    /// Inspect the course index
    Courses {
        #[command(subcommand)]
        subcommand: files::CoursesCommands,
    },
    /// Compare a working directory with the file cache
    Verify(verify::VerifyArgs),
}

impl Cli {
    /// Open the store and execute the selected command
    pub async fn run(self) -> Result<()> {
        let state = open_state(self.db.as_deref())?;

        match self.command {
            Commands::State => print_state(&state),
            Commands::Config { subcommand } => subcommand.run(&state).await,
            Commands::Files { subcommand } => subcommand.run(&state).await,
            Commands::Courses { subcommand } => subcommand.run(&state).await,
            Commands::Verify(args) => args.run(state).await,
        }
    }
}

/// Open the store at `db`, or at the default location when none is given.
pub fn open_state(db: Option<&Path>) -> Result<StateManager> {
    let state = match db {
        Some(path) => StateManager::with_path(path)
            .with_context(|| format!("Failed to open database at {}", path.display()))?,
        None => StateManager::new().context("Failed to open default database")?,
    };
    debug!(path = ?state.database().path(), "Opened store");
    Ok(state)
}

fn print_state(state: &StateManager) -> Result<()> {
    let snapshot = state.state().context("Failed to read store state")?;
    let json = serde_json::to_string_pretty(&snapshot).context("Failed to serialize state")?;
    println!("{json}");
    Ok(())
}
