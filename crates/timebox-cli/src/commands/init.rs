//! First-time setup: config file, database and default categories

use anyhow::Result;
use timebox_core::TimeboxConfig;
use timebox_storage::Database;

use super::helpers::open_database;

/// Write a default config file if none exists and create the database
///
/// # Errors
///
/// Returns an error if the config file or the database cannot be created
pub fn init_command(config: &TimeboxConfig) -> Result<()> {
    println!("Initializing timebox...\n");

    println!("Step 1/2: Configuration");
    println!("{}", "-".repeat(40));
    let config_path = TimeboxConfig::config_path();
    if config_path.exists() {
        println!("Using existing config at {}", config_path.display());
    } else {
        config.save_to(&config_path)?;
        println!("Wrote default config to {}", config_path.display());
    }

    println!("\nStep 2/2: Database");
    println!("{}", "-".repeat(40));
    let db = open_database(config)?;
    db.ensure_default_categories()?;
    let categories = db.list_categories(true)?;
    let db_path = config
        .database_path
        .clone()
        .unwrap_or_else(Database::default_db_path);
    println!("Database ready at {}", db_path.display());
    println!("{} categories available", categories.len());

    println!("\nSetup complete. Next steps:");
    println!("  timebox task add \"Write report\" --category \"Work & Career\"");
    println!("  timebox session start <task id>");
    println!("  timebox sample-data   (optional demo data)");
    Ok(())
}
