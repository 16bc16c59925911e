//! Configuration file handlers

use anyhow::Result;
use clap::Subcommand;
use timebox_core::TimeboxConfig;
use timebox_storage::Database;

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the effective configuration as TOML
    Show,
    /// Print the config file and database locations
    Path,
}

/// Handle config subcommands
///
/// # Errors
///
/// Returns an error if the configuration cannot be serialized
pub fn handle_config_command(config: &TimeboxConfig, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => print!("{}", config.to_toml()?),
        ConfigAction::Path => {
            let config_path = TimeboxConfig::config_path();
            let db_path = config
                .database_path
                .clone()
                .unwrap_or_else(Database::default_db_path);
            println!(
                "config:   {}{}",
                config_path.display(),
                if config_path.exists() { "" } else { " (not created)" }
            );
            println!("database: {}", db_path.display());
        }
    }
    Ok(())
}
