//! In-process runner for the periodic maintenance jobs.

use anyhow::Result;
use chrono::Utc;
use std::time::Duration;
use timebox_storage::Database;
use tokio::time::{interval, Interval, MissedTickBehavior};

use crate::config::SchedulerConfig;
use crate::maintenance::Maintenance;
use crate::notify::Notifier;

const MINUTE: u64 = 60;
const HOUR: u64 = 60 * MINUTE;
const DAY: u64 = 24 * HOUR;

/// The jobs the scheduler knows how to run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Job {
    UpdateOverdue,
    OverdueReminders,
    Cleanup,
}

impl Job {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::UpdateOverdue => "update_overdue_tasks",
            Self::OverdueReminders => "send_overdue_reminders",
            Self::Cleanup => "cleanup_old_completed_tasks",
        }
    }
}

/// Tick periods for each job; zero is bumped to one unit
#[must_use]
pub fn job_periods(config: &SchedulerConfig) -> [(Job, Duration); 3] {
    [
        (
            Job::UpdateOverdue,
            Duration::from_secs(config.overdue_interval_minutes.max(1).saturating_mul(MINUTE)),
        ),
        (
            Job::OverdueReminders,
            Duration::from_secs(config.reminder_interval_hours.max(1).saturating_mul(HOUR)),
        ),
        (
            Job::Cleanup,
            Duration::from_secs(config.cleanup_interval_days.max(1).saturating_mul(DAY)),
        ),
    ]
}

fn ticker(period: Duration) -> Interval {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker
}

pub struct Scheduler {
    db: Database,
    notifier: Box<dyn Notifier>,
    site_url: String,
    config: SchedulerConfig,
}

impl Scheduler {
    #[must_use]
    pub fn new(
        db: Database,
        notifier: Box<dyn Notifier>,
        site_url: impl Into<String>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            db,
            notifier,
            site_url: site_url.into(),
            config,
        }
    }

    fn maintenance(&self) -> Maintenance<'_> {
        Maintenance::new(&self.db, self.notifier.as_ref(), self.site_url.clone())
            .with_cleanup_after_days(self.config.cleanup_after_days)
    }

    /// Run one job now and log how it went
    ///
    /// # Errors
    ///
    /// Returns the job's error after logging it
    pub async fn run_job(&self, job: Job) -> Result<()> {
        let now = Utc::now();
        let maintenance = self.maintenance();
        let outcome = match job {
            Job::UpdateOverdue => maintenance
                .update_overdue_tasks(now)
                .await
                .map(|r| format!("{} overdue, {} raised", r.overdue_found, r.priorities_raised)),
            Job::OverdueReminders => maintenance
                .send_overdue_reminders(now)
                .await
                .map(|r| format!("{} long overdue, {} reminders", r.long_overdue, r.reminders_sent)),
            Job::Cleanup => maintenance
                .cleanup_old_completed_tasks(now)
                .map(|r| format!("{} deleted", r.deleted)),
        };

        match outcome {
            Ok(summary) => {
                log::info!("Job {} succeeded: {summary}", job.name());
                Ok(())
            }
            Err(e) => {
                log::error!("Job {} failed: {e:#}", job.name());
                Err(e)
            }
        }
    }

    /// Tick every job on its period until Ctrl-C
    ///
    /// Every job runs once at startup. A failed run is logged and the loop keeps going.
    ///
    /// # Errors
    ///
    /// Returns an error if the Ctrl-C handler cannot be installed
    pub async fn run(&self) -> Result<()> {
        let [(_, overdue), (_, reminders), (_, cleanup)] = job_periods(&self.config);
        let mut overdue = ticker(overdue);
        let mut reminders = ticker(reminders);
        let mut cleanup = ticker(cleanup);
        log::info!(
            "Scheduler started: overdue every {}m, reminders every {}h, cleanup every {}d",
            self.config.overdue_interval_minutes.max(1),
            self.config.reminder_interval_hours.max(1),
            self.config.cleanup_interval_days.max(1)
        );

        loop {
            let job = tokio::select! {
                _ = overdue.tick() => Job::UpdateOverdue,
                _ = reminders.tick() => Job::OverdueReminders,
                _ = cleanup.tick() => Job::Cleanup,
                signal = tokio::signal::ctrl_c() => {
                    signal?;
                    log::info!("Received Ctrl-C, shutting down scheduler...");
                    break;
                }
            };
            // failures are already logged
            let _ = self.run_job(job).await;
        }

        log::info!("Scheduler shut down gracefully.");
        Ok(())
    }
}
