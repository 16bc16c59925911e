//! User preference handlers

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::Subcommand;
use std::str::FromStr;
use timebox_core::TimeboxConfig;
use timebox_storage::Preferences;

use super::helpers::{open_database, print_heading, yes_no};

#[derive(Subcommand, Debug)]
pub enum PrefsAction {
    /// Show all preferences
    Show,
    /// Change one preference, e.g. `default_work_duration 50`
    Set { key: String, value: String },
}

/// Handle preference subcommands
///
/// # Errors
///
/// Returns an error for an unknown key, a malformed value, or a database failure
pub fn handle_prefs_command(config: &TimeboxConfig, action: PrefsAction) -> Result<()> {
    let db = open_database(config)?;
    match action {
        PrefsAction::Show => {
            let prefs = db.get_preferences()?;
            print_heading("Preferences");
            println!("default_work_duration       {}", prefs.default_work_duration);
            println!("default_break_duration      {}", prefs.default_break_duration);
            println!("long_break_duration         {}", prefs.long_break_duration);
            println!("sessions_before_long_break  {}", prefs.sessions_before_long_break);
            println!("daily_goal_sessions         {}", prefs.daily_goal_sessions);
            println!("weekly_goal_hours           {:.1}", prefs.weekly_goal_hours);
            println!("enable_notifications        {}", yes_no(prefs.enable_notifications));
            println!("notification_sound          {}", yes_no(prefs.notification_sound));
            println!("session_reminders           {}", yes_no(prefs.session_reminders));
            println!("break_reminders             {}", yes_no(prefs.break_reminders));
            println!("theme                       {}", prefs.theme);
            println!("show_analytics_dashboard    {}", yes_no(prefs.show_analytics_dashboard));
            println!("compact_task_view           {}", yes_no(prefs.compact_task_view));
            println!("share_anonymous_stats       {}", yes_no(prefs.share_anonymous_stats));
        }
        PrefsAction::Set { key, value } => {
            let mut prefs = db.get_preferences()?;
            set_preference(&mut prefs, &key, &value)?;
            prefs.updated_at = Utc::now();
            db.update_preferences(&prefs)?;
            println!("Set {key} = {value}");
        }
    }
    Ok(())
}

fn parse<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse::<T>()
        .map_err(|e| anyhow::anyhow!("{e}"))
        .with_context(|| format!("Invalid value '{value}' for {key}"))
}

fn parse_flag(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => bail!("Invalid value '{value}' for {key}, expected yes or no"),
    }
}

/// Assign `value` to the preference named `key`
///
/// # Errors
///
/// Returns an error for an unknown key or a value that does not parse
pub fn set_preference(prefs: &mut Preferences, key: &str, value: &str) -> Result<()> {
    match key {
        "default_work_duration" => prefs.default_work_duration = parse(key, value)?,
        "default_break_duration" => prefs.default_break_duration = parse(key, value)?,
        "long_break_duration" => prefs.long_break_duration = parse(key, value)?,
        "sessions_before_long_break" => prefs.sessions_before_long_break = parse(key, value)?,
        "daily_goal_sessions" => prefs.daily_goal_sessions = parse(key, value)?,
        "weekly_goal_hours" => prefs.weekly_goal_hours = parse(key, value)?,
        "enable_notifications" => prefs.enable_notifications = parse_flag(key, value)?,
        "notification_sound" => prefs.notification_sound = parse_flag(key, value)?,
        "session_reminders" => prefs.session_reminders = parse_flag(key, value)?,
        "break_reminders" => prefs.break_reminders = parse_flag(key, value)?,
        "theme" => prefs.theme = parse(key, value)?,
        "show_analytics_dashboard" => prefs.show_analytics_dashboard = parse_flag(key, value)?,
        "compact_task_view" => prefs.compact_task_view = parse_flag(key, value)?,
        "share_anonymous_stats" => prefs.share_anonymous_stats = parse_flag(key, value)?,
        _ => bail!("Unknown preference: {key}. See `timebox prefs show`"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use timebox_storage::Theme;

    #[test]
    fn test_set_numeric_and_flag_preferences() {
        let mut prefs = Preferences::default();
        set_preference(&mut prefs, "default_work_duration", "50").unwrap();
        set_preference(&mut prefs, "break_reminders", "off").unwrap();
        set_preference(&mut prefs, "theme", "Dark").unwrap();
        assert_eq!(prefs.default_work_duration, 50);
        assert!(!prefs.break_reminders);
        assert_eq!(prefs.theme, Theme::Dark);
    }

    #[test]
    fn test_set_rejects_unknown_key_and_bad_value() {
        let mut prefs = Preferences::default();
        assert!(set_preference(&mut prefs, "font_size", "12").is_err());
        assert!(set_preference(&mut prefs, "daily_goal_sessions", "many").is_err());
        assert!(set_preference(&mut prefs, "notification_sound", "maybe").is_err());
        assert_eq!(prefs.daily_goal_sessions, 8);
    }
}
