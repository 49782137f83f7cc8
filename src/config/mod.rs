//! Configuration loading and management

mod io;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::assignment::AssignmentOptions;
use crate::notifications::DEFAULT_FEED_CAPACITY;
use crate::rules::RuleOptions;

/// Project-local config location, relative to the working directory
pub const LOCAL_CONFIG_PATH: &str = ".bubble-quest/config.toml";

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// SQLite database file; `~/.bubble-quest/bubble.db` when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_path: Option<PathBuf>,

    /// Signed-in user. Every user-scoped command fails without one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,

    /// Challenge rule tunables
    #[serde(default)]
    pub rules: RuleOptions,

    /// Batch assignment sizes
    #[serde(default)]
    pub assignment: AssignmentOptions,

    #[serde(default)]
    pub notifications: NotificationSettings,
}

fn default_capacity() -> usize {
    DEFAULT_FEED_CAPACITY
}

/// Notification feed settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationSettings {
    /// Notifications kept in the feed
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load `.bubble-quest/config.toml` under `dir`, if present
    pub fn from_dir(dir: &Path) -> Result<Option<Self>> {
        let path = dir.join(LOCAL_CONFIG_PATH);
        if path.exists() {
            return Self::from_file(&path).map(Some);
        }
        Ok(None)
    }

    /// Resolve the configuration.
    ///
    /// Order: `explicit` path (must exist), then the project-local file under
    /// `dir`, then the global `~/.bubble-quest/config.toml`, else defaults.
    /// Returns the config and the file it came from.
    pub fn discover(explicit: Option<&Path>, dir: &Path) -> Result<(Self, Option<PathBuf>)> {
        if let Some(path) = explicit {
            return Ok((Self::from_file(path)?, Some(path.to_path_buf())));
        }

        let local = dir.join(LOCAL_CONFIG_PATH);
        if let Some(config) = Self::from_dir(dir)? {
            return Ok((config, Some(local)));
        }

        let global = Self::global_config_path();
        if global.exists() {
            return Ok((Self::from_file(&global)?, Some(global)));
        }

        tracing::debug!("no config file found, using defaults");
        Ok((Self::default(), None))
    }

    /// [`Config::discover`] from the current working directory
    pub fn load(explicit: Option<&Path>) -> Result<(Self, Option<PathBuf>)> {
        let cwd = std::env::current_dir().context("Failed to resolve working directory")?;
        Self::discover(explicit, &cwd)
    }

    /// The database file to open
    pub fn database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(|| Self::global_config_dir().join("bubble.db"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
        assert!(!config.rules.weekly_counts_as_reflection);
        assert_eq!(config.rules.reflection_min_keywords, 3);
        assert_eq!(config.rules.long_message_chars, 200);
        assert_eq!(config.assignment.daily_limit, 3);
        assert_eq!(config.assignment.personalized_limit, 3);
        assert_eq!(config.notifications.capacity, 20);
        assert!(config.user_id.is_none());
        assert!(config.database_path().ends_with("bubble.db"));
    }

    #[test]
    fn test_partial_sections() {
        let config: Config = toml::from_str(
            r#"
            user_id = "6f1c2d0e-9a4b-4c7e-8f3a-2b5d6e7f8a9b"
            database_path = "/tmp/bubble-test.db"

            [rules]
            weekly_counts_as_reflection = true

            [assignment]
            daily_limit = 5
            "#,
        )
        .unwrap();

        assert!(config.rules.weekly_counts_as_reflection);
        assert_eq!(config.rules.reflection_min_keywords, 3);
        assert_eq!(config.assignment.daily_limit, 5);
        assert_eq!(config.assignment.personalized_limit, 3);
        assert_eq!(config.database_path(), PathBuf::from("/tmp/bubble-test.db"));
        assert!(config.user_id.is_some());
    }

    #[test]
    fn test_discover_prefers_explicit_then_local() {
        let dir = tempfile::tempdir().unwrap();

        let local_path = dir.path().join(LOCAL_CONFIG_PATH);
        let mut local = Config::default();
        local.assignment.daily_limit = 7;
        local.save_to_file(&local_path).unwrap();

        let (found, source) = Config::discover(None, dir.path()).unwrap();
        assert_eq!(found.assignment.daily_limit, 7);
        assert_eq!(source, Some(local_path));

        let explicit_path = dir.path().join("other.toml");
        let mut explicit = Config::default();
        explicit.assignment.daily_limit = 1;
        explicit.save_to_file(&explicit_path).unwrap();

        let (found, _) = Config::discover(Some(&explicit_path), dir.path()).unwrap();
        assert_eq!(found.assignment.daily_limit, 1);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Config::discover(Some(&dir.path().join("missing.toml")), dir.path()).is_err());
    }
}
