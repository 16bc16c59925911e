//! Maintenance job handlers and the foreground scheduler

use anyhow::Result;
use chrono::Utc;
use clap::Subcommand;
use timebox_core::notify::from_config;
use timebox_core::{Maintenance, Scheduler, TimeboxConfig};

use super::helpers::open_database;

#[derive(Subcommand, Debug)]
pub enum MaintenanceAction {
    /// Raise the priority of overdue tasks and notify about them
    Overdue,
    /// Send an urgent reminder for tasks overdue by more than a day
    Reminders,
    /// Delete completed tasks past the retention window
    Cleanup {
        /// Override the configured retention in days
        #[arg(long, value_parser = clap::value_parser!(i64).range(1..=36_500))]
        days: Option<i64>,
    },
}

/// Run one maintenance job now
///
/// # Errors
///
/// Returns an error if the database or notifier cannot be set up, or the job fails
pub async fn handle_maintenance_command(
    config: &TimeboxConfig,
    action: MaintenanceAction,
) -> Result<()> {
    let db = open_database(config)?;
    let notifier = from_config(&config.notifications)?;
    let retention = match &action {
        MaintenanceAction::Cleanup { days: Some(days) } => *days,
        _ => config.scheduler.cleanup_after_days,
    };
    let maintenance = Maintenance::new(&db, notifier.as_ref(), config.site_url.clone())
        .with_cleanup_after_days(retention);
    let now = Utc::now();

    match action {
        MaintenanceAction::Overdue => {
            let report = maintenance.update_overdue_tasks(now).await?;
            println!(
                "{} overdue task(s), {} priorities raised, {} notification(s) sent, {} failed",
                report.overdue_found,
                report.priorities_raised,
                report.notifications_sent,
                report.notifications_failed
            );
        }
        MaintenanceAction::Reminders => {
            let report = maintenance.send_overdue_reminders(now).await?;
            println!(
                "{} task(s) overdue for over a day, {} reminder(s) sent, {} failed",
                report.long_overdue, report.reminders_sent, report.reminders_failed
            );
        }
        MaintenanceAction::Cleanup { .. } => {
            let report = maintenance.cleanup_old_completed_tasks(now)?;
            println!(
                "Deleted {} completed task(s) older than {retention} days",
                report.deleted
            );
        }
    }
    Ok(())
}

/// Run the periodic jobs in the foreground until Ctrl+C
///
/// # Errors
///
/// Returns an error if the database or notifier cannot be set up
pub async fn handle_scheduler(config: &TimeboxConfig) -> Result<()> {
    let db = open_database(config)?;
    let notifier = from_config(&config.notifications)?;
    println!("Scheduler running. Press Ctrl+C to stop.");
    Scheduler::new(
        db,
        notifier,
        config.site_url.clone(),
        config.scheduler.clone(),
    )
    .run()
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(subcommand)]
        action: MaintenanceAction,
    }

    #[test]
    fn test_cleanup_days_must_be_positive() {
        for days in ["0", "-1", "36501"] {
            let parsed = TestCli::try_parse_from(["timebox", "cleanup", "--days", days]);
            assert!(parsed.is_err(), "--days {days} should be rejected");
        }

        let cli = TestCli::try_parse_from(["timebox", "cleanup", "--days", "30"]).unwrap();
        assert!(matches!(cli.action, MaintenanceAction::Cleanup { days: Some(30) }));
    }
}
