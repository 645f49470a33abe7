/// Configuration system for history-scraper
///
/// Supports loading from multiple sources with priority:
/// Environment variables > Config file > Defaults
use crate::error::{ConfigError, ScrapeError};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Accepted layouts for minimum-inclusion dates, all read as UTC
const MIN_DATE_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Content cache configuration
    pub cache: CacheConfig,

    /// Local clone configuration
    pub checkout: CheckoutConfig,

    /// Batch behavior configuration
    pub batch: BatchConfig,

    /// Repository name -> earliest commit date worth scraping
    ///
    /// Older history of these repositories is not schema-compatible.
    pub min_dates: BTreeMap<String, String>,
}

/// Content cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Root directory of the persistent content cache
    #[serde(default = "default_cache_root")]
    pub root: PathBuf,
}

/// Local clone configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutConfig {
    /// Directory under which each repository is cloned by name
    #[serde(default = "default_checkout_root")]
    pub root: PathBuf,
}

/// Batch configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BatchConfig {
    /// What to do when one repository fails
    #[serde(default)]
    pub on_failure: FailurePolicy,
}

/// How a batch reacts to a repository that fails to scrape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Stop the batch and return the error
    #[default]
    Abort,
    /// Record a notification for the repository and continue
    Notify,
}

impl FromStr for FailurePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "abort" => Ok(FailurePolicy::Abort),
            "notify" => Ok(FailurePolicy::Notify),
            other => Err(ConfigError::InvalidValue {
                key: "batch.on_failure".to_string(),
                reason: format!("must be 'abort' or 'notify', got '{}'", other),
            }),
        }
    }
}

// Default value functions
fn default_cache_root() -> PathBuf {
    crate::paths::PlatformPaths::default_content_cache_path()
}

fn default_checkout_root() -> PathBuf {
    crate::paths::PlatformPaths::default_checkout_root()
}

fn default_min_dates() -> BTreeMap<String, String> {
    [
        ("glean", "2019-04-11 00:00:00"),
        ("fenix", "2019-03-24 00:00:00"),
        ("fenix-nightly", "2019-03-24 00:00:00"),
    ]
    .into_iter()
    .map(|(name, date)| (name.to_string(), date.to_string()))
    .collect()
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            root: default_cache_root(),
        }
    }
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            root: default_checkout_root(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            checkout: CheckoutConfig::default(),
            batch: BatchConfig::default(),
            min_dates: default_min_dates(),
        }
    }
}

/// Parse a naive ISO-8601 date-time as UTC epoch seconds
pub fn parse_min_date(value: &str) -> Option<i64> {
    MIN_DATE_FORMATS.iter().find_map(|format| {
        NaiveDateTime::parse_from_str(value.trim(), format)
            .ok()
            .map(|dt| dt.and_utc().timestamp())
    })
}

impl Config {
    /// Load configuration from file
    pub fn from_file(path: &Path) -> Result<Self, ScrapeError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()).into());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::LoadFailed(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| ConfigError::ParseFailed(format!("Invalid TOML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from default location or create default
    pub fn load_or_default() -> Result<Self, ScrapeError> {
        let config_path = crate::paths::PlatformPaths::default_config_path();

        if config_path.exists() {
            tracing::info!("Loading config from: {}", config_path.display());
            Self::from_file(&config_path)
        } else {
            tracing::info!("No config file found, using defaults");
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<(), ScrapeError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ConfigError::SaveFailed(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::SaveFailed(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| ConfigError::SaveFailed(format!("Failed to write config file: {}", e)))?;

        tracing::info!("Saved config to: {}", path.display());
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ScrapeError> {
        if self.cache.root.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "cache.root".to_string(),
                reason: "must not be empty".to_string(),
            }
            .into());
        }

        if self.checkout.root.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "checkout.root".to_string(),
                reason: "must not be empty".to_string(),
            }
            .into());
        }

        // Clone directories are deleted after every scrape, so neither root
        // may contain the other.
        if self.cache.root.starts_with(&self.checkout.root)
            || self.checkout.root.starts_with(&self.cache.root)
        {
            return Err(ConfigError::InvalidValue {
                key: "checkout.root".to_string(),
                reason: "must not equal, contain or lie inside cache.root".to_string(),
            }
            .into());
        }

        for (name, date) in &self.min_dates {
            if parse_min_date(date).is_none() {
                return Err(ConfigError::InvalidValue {
                    key: format!("min_dates.{}", name),
                    reason: format!("expected 'YYYY-MM-DD HH:MM:SS', got '{}'", date),
                }
                .into());
            }
        }

        Ok(())
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("HISTORY_SCRAPER_CACHE_DIR") {
            self.cache.root = PathBuf::from(path);
        }

        if let Ok(path) = std::env::var("HISTORY_SCRAPER_CHECKOUT_DIR") {
            self.checkout.root = PathBuf::from(path);
        }

        if let Ok(policy) = std::env::var("HISTORY_SCRAPER_ON_FAILURE") {
            match policy.parse() {
                Ok(policy) => self.batch.on_failure = policy,
                Err(e) => tracing::warn!("Ignoring HISTORY_SCRAPER_ON_FAILURE: {}", e),
            }
        }
    }

    /// Create a new Config with defaults and environment overrides
    pub fn new() -> Result<Self, ScrapeError> {
        let mut config = Self::load_or_default()?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Cutoff for a repository from the `min_dates` table, in epoch seconds
    pub fn min_inclusion_timestamp(&self, repo_name: &str) -> Option<i64> {
        self.min_dates
            .get(repo_name)
            .and_then(|date| parse_min_date(date))
    }
}
