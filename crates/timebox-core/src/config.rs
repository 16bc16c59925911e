//! Application configuration: `config.toml` plus `TIMEBOX_*` environment overrides.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::calendar::Language;
use crate::maintenance::check_cleanup_days;

/// Upper bound for each scheduler interval, in its own unit
const MAX_INTERVAL: u64 = 10_000;

/// Get the local data directory for timebox.
///
/// # Errors
///
/// Returns an error if the local data directory cannot be determined.
pub fn get_data_dir() -> Result<PathBuf> {
    let mut path =
        dirs::data_local_dir().ok_or_else(|| anyhow::anyhow!("Failed to get local data dir"))?;
    path.push("timebox");
    Ok(path)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeboxConfig {
    /// SQLite file; `None` means `<data_local_dir>/timebox/timebox.db`
    pub database_path: Option<PathBuf>,
    /// Name recorded as `user` in full exports
    pub profile: String,
    /// Base URL used in notification links
    pub site_url: String,
    /// `fa` shows and accepts Jalali dates
    pub language: Language,
    pub server: ServerConfig,
    pub notifications: NotificationConfig,
    pub scheduler: SchedulerConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
    /// Accepted `Host` header values; empty or `*` accepts any
    pub allowed_hosts: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// Overdue notifications are POSTed here; without it they only go to the log
    pub webhook_url: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub overdue_interval_minutes: u64,
    pub reminder_interval_hours: u64,
    pub cleanup_interval_days: u64,
    /// Completed tasks older than this are deleted by the cleanup job
    pub cleanup_after_days: i64,
}

impl Default for TimeboxConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            profile: "default".to_string(),
            site_url: "http://localhost:8000".to_string(),
            language: Language::En,
            server: ServerConfig::default(),
            notifications: NotificationConfig::default(),
            scheduler: SchedulerConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8000".to_string(),
            allowed_hosts: vec!["localhost".to_string(), "127.0.0.1".to_string()],
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            timeout_secs: 10,
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            overdue_interval_minutes: 60,
            reminder_interval_hours: 24,
            cleanup_interval_days: 7,
            cleanup_after_days: 90,
        }
    }
}

impl TimeboxConfig {
    /// Config file path: `<config_dir>/timebox/config.toml`
    #[must_use]
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("timebox")
            .join("config.toml")
    }

    /// Load the default config file (if present) and apply environment overrides
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path())?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Read a config file; a missing file yields the defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read, parsed or validated
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file (invalid TOML): {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;
        Ok(config)
    }

    /// Check values that would make the scheduled jobs destructive or unschedulable
    ///
    /// # Errors
    ///
    /// Returns an error naming the first out-of-range setting
    pub fn validate(&self) -> Result<()> {
        check_cleanup_days(self.scheduler.cleanup_after_days)?;
        for (name, value) in [
            ("overdue_interval_minutes", self.scheduler.overdue_interval_minutes),
            ("reminder_interval_hours", self.scheduler.reminder_interval_hours),
            ("cleanup_interval_days", self.scheduler.cleanup_interval_days),
        ] {
            if value > MAX_INTERVAL {
                anyhow::bail!("scheduler.{name} must be at most {MAX_INTERVAL}, got {value}");
            }
        }
        Ok(())
    }

    /// Write the config as TOML, creating the parent directory
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }
        std::fs::write(path, self.to_toml()?)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if serialization fails
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }

    /// Override fields from `TIMEBOX_*` variables supplied by `lookup`
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(path) = non_empty("TIMEBOX_DATABASE_PATH") {
            self.database_path = Some(PathBuf::from(path));
        }
        if let Some(url) = non_empty("TIMEBOX_WEBHOOK_URL") {
            self.notifications.webhook_url = Some(url);
        }
        if let Some(addr) = non_empty("TIMEBOX_BIND_ADDR") {
            self.server.bind_addr = addr;
        }
        if let Some(hosts) = non_empty("TIMEBOX_ALLOWED_HOSTS") {
            self.server.allowed_hosts = hosts
                .split(',')
                .map(|h| h.trim().to_string())
                .filter(|h| !h.is_empty())
                .collect();
        }
        if let Some(profile) = non_empty("TIMEBOX_PROFILE") {
            self.profile = profile;
        }
        if let Some(url) = non_empty("TIMEBOX_SITE_URL") {
            self.site_url = url.trim_end_matches('/').to_string();
        }
        if let Some(language) = non_empty("TIMEBOX_LANGUAGE") {
            match language.parse() {
                Ok(language) => self.language = language,
                Err(e) => log::warn!("Ignoring TIMEBOX_LANGUAGE: {e}"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = TimeboxConfig::load_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config, TimeboxConfig::default());
        assert_eq!(config.scheduler.overdue_interval_minutes, 60);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "profile = \"sam\"\n[scheduler]\ncleanup_after_days = 30\n",
        )
        .unwrap();

        let config = TimeboxConfig::load_from(&path).unwrap();
        assert_eq!(config.profile, "sam");
        assert_eq!(config.scheduler.cleanup_after_days, 30);
        assert_eq!(config.scheduler.reminder_interval_hours, 24);
        assert_eq!(config.server.bind_addr, "127.0.0.1:8000");
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "profile = [").unwrap();
        assert!(TimeboxConfig::load_from(&path).is_err());
    }

    #[test]
    fn test_unusable_retention_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        for days in ["0", "-1"] {
            std::fs::write(&path, format!("[scheduler]\ncleanup_after_days = {days}\n")).unwrap();
            let err = TimeboxConfig::load_from(&path).unwrap_err();
            assert!(format!("{err:#}").contains("cleanup_after_days"));
        }

        let mut config = TimeboxConfig::default();
        assert!(config.validate().is_ok());
        config.scheduler.cleanup_interval_days = u64::MAX;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = TimeboxConfig::default();
        config.notifications.webhook_url = Some("http://hooks.local/timebox".into());
        config.save_to(&path).unwrap();
        assert_eq!(TimeboxConfig::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("TIMEBOX_DATABASE_PATH", "/tmp/tb.db"),
            ("TIMEBOX_ALLOWED_HOSTS", "example.com, localhost ,"),
            ("TIMEBOX_SITE_URL", "https://tb.example.com/"),
            ("TIMEBOX_PROFILE", ""),
            ("TIMEBOX_LANGUAGE", "fa"),
        ]
        .into_iter()
        .collect();

        let mut config = TimeboxConfig::default();
        config.apply_env(|key| vars.get(key).map(|v| (*v).to_string()));

        assert_eq!(config.database_path, Some(PathBuf::from("/tmp/tb.db")));
        assert_eq!(config.server.allowed_hosts, vec!["example.com", "localhost"]);
        assert_eq!(config.site_url, "https://tb.example.com");
        assert_eq!(config.language, Language::Fa);
        // empty values are ignored
        assert_eq!(config.profile, "default");
    }
}
