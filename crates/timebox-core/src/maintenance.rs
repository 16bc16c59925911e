//! Periodic upkeep: overdue escalation, reminders and cleanup.

use anyhow::Result;
use chrono::{DateTime, Duration, TimeDelta, Utc};
use serde::Serialize;
use timebox_storage::{Database, Priority, Task, ValidationError};

use crate::notify::{Notification, Notifier};

/// Key under which the last overdue pass is recorded
pub const LAST_OVERDUE_RUN: &str = "last_overdue_run";

/// Age after which an overdue task gets an urgent reminder
pub const URGENT_AFTER_HOURS: i64 = 24;

/// Age after which completed tasks are removed
pub const DEFAULT_CLEANUP_DAYS: i64 = 90;

/// Accepted retention for completed tasks, in days
pub const CLEANUP_DAYS_RANGE: std::ops::RangeInclusive<i64> = 1..=36_500;

/// Reject a retention that would delete recently completed tasks or overflow the cutoff
///
/// # Errors
///
/// Returns `ValidationError::OutOfRange` outside `CLEANUP_DAYS_RANGE`
#[allow(clippy::cast_precision_loss)]
pub fn check_cleanup_days(days: i64) -> Result<(), ValidationError> {
    if CLEANUP_DAYS_RANGE.contains(&days) {
        Ok(())
    } else {
        Err(ValidationError::OutOfRange {
            field: "cleanup_after_days",
            min: *CLEANUP_DAYS_RANGE.start() as f64,
            max: *CLEANUP_DAYS_RANGE.end() as f64,
            value: days as f64,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OverdueReport {
    pub overdue_found: usize,
    pub priorities_raised: usize,
    pub notifications_sent: usize,
    pub notifications_failed: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReminderReport {
    pub long_overdue: usize,
    pub reminders_sent: usize,
    pub reminders_failed: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    pub deleted: usize,
}

/// Maintenance jobs bound to a database and a notification channel
pub struct Maintenance<'a> {
    db: &'a Database,
    notifier: &'a dyn Notifier,
    site_url: String,
    cleanup_after_days: i64,
}

impl<'a> Maintenance<'a> {
    #[must_use]
    pub fn new(db: &'a Database, notifier: &'a dyn Notifier, site_url: impl Into<String>) -> Self {
        Self {
            db,
            notifier,
            site_url: site_url.into(),
            cleanup_after_days: DEFAULT_CLEANUP_DAYS,
        }
    }

    #[must_use]
    pub const fn with_cleanup_after_days(mut self, days: i64) -> Self {
        self.cleanup_after_days = days;
        self
    }

    /// Escalate the priority of overdue tasks and notify about them
    ///
    /// # Errors
    ///
    /// Returns an error if a database operation fails; delivery failures are only counted
    pub async fn update_overdue_tasks(&self, now: DateTime<Utc>) -> Result<OverdueReport> {
        let tasks = self.db.overdue_tasks(now)?;
        let mut report = OverdueReport {
            overdue_found: tasks.len(),
            ..OverdueReport::default()
        };
        if tasks.is_empty() {
            log::info!("No overdue tasks found");
            self.db.set_state_time(LAST_OVERDUE_RUN, now)?;
            return Ok(report);
        }

        for task in &tasks {
            if task.priority > Priority::Critical {
                let raised = task.priority.escalated();
                self.db.set_task_priority(task.id, raised, now)?;
                report.priorities_raised += 1;
                log::info!(
                    "Raised priority of \"{}\" from {} to {}",
                    task.title,
                    task.priority,
                    raised
                );
            }
        }

        if self.notifications_enabled()? {
            let notification = Notification::overdue(&tasks, &self.site_url, false);
            if self.deliver(&notification).await {
                report.notifications_sent += 1;
            } else {
                report.notifications_failed += 1;
            }
        }

        self.db.set_state_time(LAST_OVERDUE_RUN, now)?;
        log::info!(
            "Processed {} overdue tasks and sent {} notifications",
            report.priorities_raised,
            report.notifications_sent
        );
        Ok(report)
    }

    /// Urgent reminder for tasks overdue by more than a day
    ///
    /// # Errors
    ///
    /// Returns an error if a database operation fails; delivery failures are only counted
    pub async fn send_overdue_reminders(&self, now: DateTime<Utc>) -> Result<ReminderReport> {
        let tasks: Vec<Task> = self
            .db
            .overdue_tasks(now - Duration::hours(URGENT_AFTER_HOURS))?;
        let mut report = ReminderReport {
            long_overdue: tasks.len(),
            ..ReminderReport::default()
        };
        if tasks.is_empty() {
            log::info!("No long-overdue tasks found for reminders");
            return Ok(report);
        }
        if !self.notifications_enabled()? {
            log::info!("Notifications disabled, skipping {} reminders", tasks.len());
            return Ok(report);
        }

        let notification = Notification::overdue(&tasks, &self.site_url, true);
        if self.deliver(&notification).await {
            report.reminders_sent += 1;
        } else {
            report.reminders_failed += 1;
        }
        log::info!("Sent {} urgent overdue reminders", report.reminders_sent);
        Ok(report)
    }

    /// Delete completed tasks finished before the retention window
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` for a retention outside `CLEANUP_DAYS_RANGE`, or an error if
    /// the delete fails
    pub fn cleanup_old_completed_tasks(&self, now: DateTime<Utc>) -> Result<CleanupReport> {
        check_cleanup_days(self.cleanup_after_days)?;
        let cutoff = TimeDelta::try_days(self.cleanup_after_days)
            .and_then(|age| now.checked_sub_signed(age))
            .ok_or_else(|| anyhow::anyhow!("Cleanup cutoff before {now} is out of range"))?;
        let deleted = self.db.delete_completed_tasks_before(cutoff)?;
        if deleted > 0 {
            log::info!("Cleaned up {deleted} old completed tasks");
        } else {
            log::info!("No old completed tasks to clean up");
        }
        Ok(CleanupReport { deleted })
    }

    fn notifications_enabled(&self) -> Result<bool> {
        Ok(self.db.get_preferences()?.enable_notifications)
    }

    async fn deliver(&self, notification: &Notification) -> bool {
        match self.notifier.send(notification).await {
            Ok(()) => true,
            Err(e) => {
                log::error!("Failed to send \"{}\": {e}", notification.subject);
                false
            }
        }
    }
}
