use anyhow::{Context, Result};
use clap::Args;
use cs_core::{IntegrityChecker, StateManager};
use cs_local_db::Database;
use std::path::{Path, PathBuf};
use tracing::info;

/// Arguments for the integrity check
#[derive(Args)]
pub struct VerifyArgs {
    /// Working directory holding one folder per course
    /// (defaults to the directory containing the database)
    #[arg(value_name = "ROOT")]
    pub root: Option<PathBuf>,
}

impl VerifyArgs {
    /// Execute the integrity check
    pub async fn run(self, state: StateManager) -> Result<()> {
        let root = self.resolve_root(state.database().path())?;
        info!(root = %root.display(), "Verifying working directory");

        // Fingerprinting is blocking file I/O.
        let report = tokio::task::spawn_blocking(move || IntegrityChecker::new(state).run(&root))
            .await
            .context("Integrity check task failed")?
            .context("Integrity check failed")?;

        let json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
        println!("{json}");

        if !report.is_clean() {
            anyhow::bail!("Working directory does not match the file cache");
        }
        Ok(())
    }

    /// Directory to check: the explicit root, else the directory holding
    /// the database, else the default working directory.
    pub fn resolve_root(&self, db_path: Option<&Path>) -> Result<PathBuf> {
        if let Some(root) = &self.root {
            return Ok(root.clone());
        }
        match db_path {
            // A bare file name has an empty parent.
            Some(path) => Ok(path
                .parent()
                .filter(|parent| !parent.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."))
                .to_path_buf()),
            None => Database::default_home().context("Failed to locate working directory"),
        }
    }
}
