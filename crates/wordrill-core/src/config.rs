//! Configuration management for wordrill.
//!
//! Configuration is loaded from multiple sources with precedence:
//! 1. Environment variables (WORDRILL_*)
//! 2. Config file (~/.wordrill/config.toml)
//! 3. Default values

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::scheduling::commit_policy_for;
use crate::types::ReviewSettings;

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// SQLite database file
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// Defaults for new review sessions
    #[serde(default)]
    pub review: ReviewSettings,

    #[serde(default)]
    pub scheduling: SchedulingConfig,

    #[serde(default)]
    pub dashboard: DashboardConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulingConfig {
    /// Commit rule used when a session names no known algorithm
    #[serde(default = "default_commit_rule")]
    pub commit_rule: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// Statistics refresh interval in seconds
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,

    #[serde(default = "default_true")]
    pub auto_refresh: bool,
}

// Default value functions
fn default_data_dir() -> PathBuf {
    std::env::var("WORDRILL_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".wordrill")
        })
}

fn default_database_path() -> PathBuf {
    default_data_dir().join("wordrill.db")
}

fn default_commit_rule() -> String {
    "post_session".to_string()
}

fn default_refresh_interval() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            commit_rule: default_commit_rule(),
        }
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: default_refresh_interval(),
            auto_refresh: default_true(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            review: ReviewSettings::default(),
            scheduling: SchedulingConfig::default(),
            dashboard: DashboardConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the config file and environment.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path())?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from `path`, falling back to defaults when the
    /// file does not exist. Environment overrides are not applied.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| {
            Error::Config(format!("Failed to parse {}: {}", path.display(), e))
        })
    }

    /// Save configuration to `path`.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the config file path.
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("WORDRILL_CONFIG") {
            return PathBuf::from(path);
        }
        default_data_dir().join("config.toml")
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("WORDRILL_DATABASE_PATH") {
            self.database_path = PathBuf::from(path);
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.review
            .validate()
            .map_err(|e| Error::Config(format!("[review] {}", e)))?;
        commit_policy_for(&self.scheduling.commit_rule)
            .map_err(|e| Error::Config(format!("[scheduling] {}", e)))?;
        if self.dashboard.refresh_interval_secs == 0 {
            return Err(Error::Config(
                "[dashboard] refresh_interval_secs must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DifficultyFilter;
    use std::env;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.database_path.ends_with("wordrill.db"));
        assert_eq!(config.scheduling.commit_rule, "post_session");
        assert_eq!(config.dashboard.refresh_interval_secs, 30);
        assert!(config.dashboard.auto_refresh);
        assert_eq!(config.review, ReviewSettings::default());
        config.validate().unwrap();
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&temp_dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.dashboard, DashboardConfig::default());
    }

    #[test]
    fn test_load_partial_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
database_path = "/tmp/words.db"

[review]
wordCount = 25
difficultyFilter = "hard"

[scheduling]
commit_rule = "streak_aware"
"#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.database_path, PathBuf::from("/tmp/words.db"));
        assert_eq!(config.review.word_count, 25);
        assert_eq!(config.review.difficulty_filter, DifficultyFilter::Hard);
        assert_eq!(config.review.max_daily_reviews, ReviewSettings::default().max_daily_reviews);
        assert_eq!(config.scheduling.commit_rule, "streak_aware");
        assert_eq!(config.dashboard.refresh_interval_secs, 30);
        config.validate().unwrap();
    }

    #[test]
    fn test_review_table_accepts_snake_case() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[review]
word_count = 8
difficulty_filter = "easy"
intra_word_interval_secs = 0.5
"#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.review.word_count, 8);
        assert_eq!(config.review.difficulty_filter, DifficultyFilter::Easy);
        assert_eq!(config.review.intra_word_interval_secs, 0.5);
    }

    #[test]
    fn test_nan_review_interval_fails_validation() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[review]\ninterval_secs = nan\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert!(config.review.interval_secs.is_nan());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "database_path = [").unwrap();

        assert!(matches!(Config::load_from(&path), Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.scheduling.commit_rule = "leitner".into();
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let mut config = Config::default();
        config.dashboard.refresh_interval_secs = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.review.word_count = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_reload() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.dashboard.auto_refresh = false;
        config.save_to(&path).unwrap();

        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_config_load_with_env_overrides() {
        let temp_dir = tempfile::tempdir().unwrap();
        let custom_path = temp_dir.path().to_path_buf();
        let db_path = custom_path.join("override.db");
        std::fs::write(
            custom_path.join("config.toml"),
            "[dashboard]\nrefresh_interval_secs = 5\n",
        )
        .unwrap();

        let old_dir = env::var("WORDRILL_DIR").ok();
        let old_db = env::var("WORDRILL_DATABASE_PATH").ok();
        // SAFETY: This test runs in isolation and we restore the env vars afterward
        unsafe {
            env::set_var("WORDRILL_DIR", &custom_path);
            env::set_var("WORDRILL_DATABASE_PATH", &db_path);
        }

        let config = Config::load().unwrap();
        assert_eq!(config.dashboard.refresh_interval_secs, 5);
        assert_eq!(config.database_path, db_path);
        assert!(Config::config_path().starts_with(&custom_path));

        // SAFETY: Restoring environment to previous state
        unsafe {
            match old_dir {
                Some(val) => env::set_var("WORDRILL_DIR", val),
                None => env::remove_var("WORDRILL_DIR"),
            }
            match old_db {
                Some(val) => env::set_var("WORDRILL_DATABASE_PATH", val),
                None => env::remove_var("WORDRILL_DATABASE_PATH"),
            }
        }
    }
}
