//! Export and sample data handlers

use anyhow::{bail, Context, Result};
use chrono::Utc;
use std::path::{Path, PathBuf};
use timebox_core::export::{
    export_all_json, export_all_zip, export_entity, ALL_JSON_FILE_NAME, ALL_ZIP_FILE_NAME,
};
use timebox_core::sample::create_sample_data;
use timebox_core::{ExportEntity, ExportFormat, TimeboxConfig};

use super::helpers::open_database;

/// Write one export file into `output` (defaults to the current directory)
///
/// `what` is an entity name (sessions, tasks, ...) or `all`. With `all`,
/// `csv` produces a zip of every table and `json` a single document.
///
/// # Errors
///
/// Returns an error for an unknown entity or format, or if writing fails
pub fn handle_export(
    config: &TimeboxConfig,
    what: &str,
    format: &str,
    output: Option<PathBuf>,
) -> Result<()> {
    let db = open_database(config)?;
    let now = Utc::now();
    let format: ExportFormat = format.parse().map_err(anyhow::Error::msg)?;
    let dir = output.unwrap_or_else(|| PathBuf::from("."));
    if dir.exists() && !dir.is_dir() {
        bail!("{} is not a directory", dir.display());
    }
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;

    if what.eq_ignore_ascii_case("all") {
        let path = match format {
            ExportFormat::Json => {
                let body = export_all_json(&db, &config.profile, now)?;
                write_file(&dir.join(ALL_JSON_FILE_NAME), body.as_bytes())?
            }
            ExportFormat::Csv => {
                let body = export_all_zip(&db, now)?;
                write_file(&dir.join(ALL_ZIP_FILE_NAME), &body)?
            }
        };
        println!("Exported all data to {}", path.display());
        return Ok(());
    }

    let entity: ExportEntity = what.parse().map_err(anyhow::Error::msg)?;
    let body = export_entity(&db, entity, format, now)?;
    let path = write_file(&dir.join(entity.file_name(format)), body.as_bytes())?;
    println!("Exported {entity} to {}", path.display());
    Ok(())
}

fn write_file(path: &Path, content: &[u8]) -> Result<PathBuf> {
    std::fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
    log::info!("Wrote {} bytes to {}", content.len(), path.display());
    Ok(path.to_path_buf())
}

/// Seed demonstration data
///
/// # Errors
///
/// Returns an error if the database cannot be opened or a write fails
pub fn handle_sample_data(config: &TimeboxConfig) -> Result<()> {
    let db = open_database(config)?;
    let report = create_sample_data(&db, Utc::now())?;
    if report.is_empty() {
        println!("Sample data already present, nothing added.");
        return Ok(());
    }
    println!("Added sample data:");
    println!("  {} goal(s), {} task(s), {} session(s)", report.goals, report.tasks, report.sessions);
    println!(
        "  {} habit(s) with {} log(s), {} reflection(s)",
        report.habits, report.habit_logs, report.reflections
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_in(dir: &Path) -> TimeboxConfig {
        TimeboxConfig {
            database_path: Some(dir.join("timebox.db")),
            ..TimeboxConfig::default()
        }
    }

    #[test]
    fn test_export_writes_named_files() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        handle_sample_data(&config).unwrap();

        let out = dir.path().join("out");
        handle_export(&config, "tasks", "csv", Some(out.clone())).unwrap();
        handle_export(&config, "all", "json", Some(out.clone())).unwrap();
        handle_export(&config, "all", "csv", Some(out.clone())).unwrap();

        let csv = std::fs::read_to_string(out.join("timebox_tasks.csv")).unwrap();
        assert!(csv.contains("Draft quarterly report"));
        assert!(out.join(ALL_JSON_FILE_NAME).exists());
        assert!(out.join(ALL_ZIP_FILE_NAME).exists());
    }

    #[test]
    fn test_export_rejects_unknown_entity() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        assert!(handle_export(&config, "users", "csv", Some(dir.path().to_path_buf())).is_err());
        assert!(handle_export(&config, "tasks", "xml", Some(dir.path().to_path_buf())).is_err());
    }
}
