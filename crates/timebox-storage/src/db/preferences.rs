use anyhow::Result;
use chrono::Utc;
use rusqlite::{params, OptionalExtension};

use crate::models::Preferences;

use super::helpers::{fmt_datetime, parse_choice, parse_datetime, to_u32};
use super::Database;

impl Database {
    /// Get or create preferences
    ///
    /// # Errors
    ///
    /// Returns an error if the database query or insert operation fails
    pub fn get_preferences(&self) -> Result<Preferences> {
        let result = self
            .conn
            .query_row(
                "SELECT default_work_duration, default_break_duration, long_break_duration,
                        sessions_before_long_break, daily_goal_sessions, weekly_goal_hours,
                        enable_notifications, notification_sound, session_reminders,
                        break_reminders, theme, show_analytics_dashboard, compact_task_view,
                        share_anonymous_stats, updated_at
                 FROM preferences WHERE id = 1",
                [],
                |row| {
                    Ok(Preferences {
                        default_work_duration: to_u32(row.get(0)?)?,
                        default_break_duration: to_u32(row.get(1)?)?,
                        long_break_duration: to_u32(row.get(2)?)?,
                        sessions_before_long_break: to_u32(row.get(3)?)?,
                        daily_goal_sessions: to_u32(row.get(4)?)?,
                        weekly_goal_hours: row.get(5)?,
                        enable_notifications: row.get::<_, i32>(6)? != 0,
                        notification_sound: row.get::<_, i32>(7)? != 0,
                        session_reminders: row.get::<_, i32>(8)? != 0,
                        break_reminders: row.get::<_, i32>(9)? != 0,
                        theme: parse_choice(&row.get::<_, String>(10)?)?,
                        show_analytics_dashboard: row.get::<_, i32>(11)? != 0,
                        compact_task_view: row.get::<_, i32>(12)? != 0,
                        share_anonymous_stats: row.get::<_, i32>(13)? != 0,
                        updated_at: parse_datetime(&row.get::<_, String>(14)?)?,
                    })
                },
            )
            .optional()?;

        if let Some(preferences) = result {
            Ok(preferences)
        } else {
            // Create default preferences
            let preferences = Preferences::default();
            self.update_preferences(&preferences)?;
            Ok(preferences)
        }
    }

    /// Update preferences
    ///
    /// # Errors
    ///
    /// Returns an error if the database upsert fails
    pub fn update_preferences(&self, preferences: &Preferences) -> Result<()> {
        self.conn.execute(
            "INSERT INTO preferences (id, default_work_duration, default_break_duration,
                                      long_break_duration, sessions_before_long_break,
                                      daily_goal_sessions, weekly_goal_hours, enable_notifications,
                                      notification_sound, session_reminders, break_reminders, theme,
                                      show_analytics_dashboard, compact_task_view,
                                      share_anonymous_stats, updated_at)
             VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
             ON CONFLICT(id) DO UPDATE SET
                default_work_duration = excluded.default_work_duration,
                default_break_duration = excluded.default_break_duration,
                long_break_duration = excluded.long_break_duration,
                sessions_before_long_break = excluded.sessions_before_long_break,
                daily_goal_sessions = excluded.daily_goal_sessions,
                weekly_goal_hours = excluded.weekly_goal_hours,
                enable_notifications = excluded.enable_notifications,
                notification_sound = excluded.notification_sound,
                session_reminders = excluded.session_reminders,
                break_reminders = excluded.break_reminders,
                theme = excluded.theme,
                show_analytics_dashboard = excluded.show_analytics_dashboard,
                compact_task_view = excluded.compact_task_view,
                share_anonymous_stats = excluded.share_anonymous_stats,
                updated_at = excluded.updated_at",
            params![
                preferences.default_work_duration,
                preferences.default_break_duration,
                preferences.long_break_duration,
                preferences.sessions_before_long_break,
                preferences.daily_goal_sessions,
                preferences.weekly_goal_hours,
                i32::from(preferences.enable_notifications),
                i32::from(preferences.notification_sound),
                i32::from(preferences.session_reminders),
                i32::from(preferences.break_reminders),
                preferences.theme.as_str(),
                i32::from(preferences.show_analytics_dashboard),
                i32::from(preferences.compact_task_view),
                i32::from(preferences.share_anonymous_stats),
                fmt_datetime(Utc::now()),
            ],
        )?;
        Ok(())
    }
}
