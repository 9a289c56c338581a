use anyhow::{Context, Result};
use clap::Subcommand;
use cs_core::StateManager;
use cs_local_db::ConfigKey;

/// Settings commands
#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the value of a setting, or its default when unset
    Get {
        /// Setting name, e.g. update_policy
        #[arg(value_name = "KEY")]
        key: String,
    },
    /// Store a value for a setting
    Set {
        #[arg(value_name = "KEY")]
        key: String,
        #[arg(value_name = "VALUE")]
        value: String,
    },
    /// Remove a stored value so the default applies again
    Unset {
        #[arg(value_name = "KEY")]
        key: String,
    },
    /// Revert every setting to its default
    Reset,
    /// Print every known setting with its effective value
    List,
}

impl ConfigCommands {
    /// Execute the settings command
    pub async fn run(self, state: &StateManager) -> Result<()> {
        match self {
            ConfigCommands::Get { key } => {
                let key: ConfigKey = key.parse()?;
                println!("{}", effective_value(state, key)?);
            }
            ConfigCommands::Set { key, value } => {
                let key: ConfigKey = key.parse()?;
                if !key.accepts(&value) {
                    anyhow::bail!("Error: {value:?} is not a valid value for {key}");
                }
                state
                    .config(|config| config.set(key.as_str(), &value))
                    .with_context(|| format!("Failed to store {key}"))?;
            }
            ConfigCommands::Unset { key } => {
                let key: ConfigKey = key.parse()?;
                let removed = state
                    .config(|config| config.unset(key.as_str()))
                    .with_context(|| format!("Failed to unset {key}"))?;
                if !removed {
                    println!("{key} was not set");
                }
            }
            ConfigCommands::Reset => {
                state.reset_config().context("Failed to reset configuration")?;
            }
            ConfigCommands::List => {
                for key in ConfigKey::ALL {
                    println!("{key} = {}", effective_value(state, key)?);
                }
            }
        }
        Ok(())
    }
}

fn effective_value(state: &StateManager, key: ConfigKey) -> Result<String> {
    let stored = state
        .config(|config| config.get(key.as_str()))
        .with_context(|| format!("Failed to read {key}"))?;
    Ok(match stored {
        Some(value) => value,
        None => match key.default_text() {
            Some(default) => format!("{default} (default)"),
            None => "(unset)".to_string(),
        },
    })
}
