//! Outgoing notifications about overdue tasks.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::fmt::Write as _;
use std::time::Duration;
use timebox_storage::Task;

use crate::config::NotificationConfig;

/// A message for the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub subject: String,
    pub body: String,
    pub urgent: bool,
    pub task_titles: Vec<String>,
}

impl Notification {
    /// Overdue summary for `tasks`; `urgent` marks tasks late by more than a day
    #[must_use]
    pub fn overdue(tasks: &[Task], site_url: &str, urgent: bool) -> Self {
        let count = tasks.len();
        let subject = if urgent {
            format!("URGENT: {count} task(s) overdue for more than 24 hours")
        } else {
            format!("You have {count} overdue task(s)")
        };

        let mut body = String::new();
        let _ = writeln!(body, "{subject}:");
        for task in tasks {
            match task.due_date {
                Some(due) => {
                    let _ = writeln!(body, "- {} (due {})", task.title, due.format("%Y-%m-%d %H:%M"));
                }
                None => {
                    let _ = writeln!(body, "- {}", task.title);
                }
            }
        }
        let _ = write!(body, "\nOpen your tasks: {}/tasks/", site_url.trim_end_matches('/'));

        Self {
            subject,
            body,
            urgent,
            task_titles: tasks.iter().map(|t| t.title.clone()).collect(),
        }
    }
}

/// Channel that delivers notifications
#[async_trait]
pub trait Notifier: Send + Sync {
    /// # Errors
    ///
    /// Returns an error if delivery fails
    async fn send(&self, notification: &Notification) -> Result<()>;
}

/// Writes notifications to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, notification: &Notification) -> Result<()> {
        if notification.urgent {
            log::warn!("{}\n{}", notification.subject, notification.body);
        } else {
            log::info!("{}\n{}", notification.subject, notification.body);
        }
        Ok(())
    }
}

/// POSTs notifications as JSON to a webhook
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, notification: &Notification) -> Result<()> {
        let response = self
            .client
            .post(&self.url)
            .json(notification)
            .send()
            .await
            .with_context(|| format!("Failed to reach webhook {}", self.url))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Webhook error ({status}): {error_text}");
        }
        log::debug!("Delivered \"{}\" to webhook", notification.subject);
        Ok(())
    }
}

/// Webhook notifier when a URL is configured, the log otherwise
///
/// # Errors
///
/// Returns an error if the webhook client cannot be built
pub fn from_config(config: &NotificationConfig) -> Result<Box<dyn Notifier>> {
    match &config.webhook_url {
        Some(url) => Ok(Box::new(WebhookNotifier::new(
            url.clone(),
            Duration::from_secs(config.timeout_secs),
        )?)),
        None => Ok(Box::new(LogNotifier)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn task(title: &str) -> Task {
        let mut task = Task::new(title, 1);
        task.due_date = Some(Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap());
        task
    }

    #[test]
    fn test_overdue_subjects() {
        let tasks = vec![task("Write report"), task("Call bank")];
        let regular = Notification::overdue(&tasks, "http://localhost:8000", false);
        assert_eq!(regular.subject, "You have 2 overdue task(s)");
        assert!(!regular.urgent);

        let urgent = Notification::overdue(&tasks[..1], "http://localhost:8000/", true);
        assert_eq!(urgent.subject, "URGENT: 1 task(s) overdue for more than 24 hours");
        assert_eq!(urgent.task_titles, vec!["Write report"]);
    }

    #[test]
    fn test_overdue_body_lists_tasks_and_link() {
        let notification = Notification::overdue(&[task("Write report")], "https://tb.local/", false);
        assert!(notification.body.contains("- Write report (due 2024-03-01 09:30)"));
        assert!(notification.body.ends_with("https://tb.local/tasks/"));
    }

    #[tokio::test]
    async fn test_log_notifier_succeeds() {
        let notification = Notification::overdue(&[task("A")], "http://localhost:8000", true);
        assert!(LogNotifier.send(&notification).await.is_ok());
    }

    #[tokio::test]
    async fn test_webhook_unreachable_is_error() {
        let notifier =
            WebhookNotifier::new("http://127.0.0.1:9/hook", Duration::from_millis(500)).unwrap();
        let notification = Notification::overdue(&[task("A")], "http://localhost:8000", false);
        assert!(notifier.send(&notification).await.is_err());
    }
}
