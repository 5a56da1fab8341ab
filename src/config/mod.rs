/// Configuration system for commit-scraper
///
/// Supports loading from multiple sources with priority:
/// CLI args > Environment variables > Config file > Defaults
use crate::error::{ConfigError, ScraperError};
use crate::git::extractor::DEFAULT_STAT_WIDTH;
use crate::paths::PlatformPaths;
use crate::types::{TimeRange, parse_timestamp};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Persistence configuration
    pub store: StoreConfig,

    /// History extraction configuration
    pub extraction: ExtractionConfig,
}

/// Persistence backend, always chosen explicitly
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Single-file SQLite database, one table per store
    #[default]
    Sqlite,
    /// Versioned JSON document file
    Json,
}

impl StoreBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreBackend::Sqlite => "sqlite",
            StoreBackend::Json => "json",
        }
    }
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Ok(StoreBackend::Sqlite),
            "json" => Ok(StoreBackend::Json),
            other => Err(ConfigError::InvalidValue {
                key: "store.backend".to_string(),
                reason: format!("must be 'sqlite' or 'json', got '{}'", other),
            }),
        }
    }
}

/// Store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Store backend: "sqlite" or "json"
    #[serde(default)]
    pub backend: StoreBackend,

    /// Store file; the backend's default location when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// SQLite table or JSON collection name
    #[serde(default = "default_table")]
    pub table: String,

    /// How long to wait for another run to release the store
    #[serde(default = "default_lock_timeout")]
    pub lock_timeout_secs: u64,

    /// Directory holding store lock files
    #[serde(default = "default_lock_dir")]
    pub lock_dir: PathBuf,
}

/// History extraction configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// History tool executable
    #[serde(default = "default_git_binary")]
    pub git_binary: String,

    /// Value for `git log --stat-width`
    #[serde(default = "default_stat_width")]
    pub stat_width: usize,

    /// Replace identifying text with salted digests
    #[serde(default)]
    pub anonymize: bool,

    /// Sub-paths scraped in every source
    #[serde(default)]
    pub paths: Vec<String>,

    /// Labels attached to every record
    #[serde(default)]
    pub labels: Vec<String>,

    /// Default lower bound of the commit window
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub since: Option<String>,

    /// Default upper bound of the commit window
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub until: Option<String>,
}

// Default value functions
fn default_table() -> String {
    "commits".to_string()
}

fn default_lock_timeout() -> u64 {
    30
}

fn default_lock_dir() -> PathBuf {
    PlatformPaths::default_lock_dir()
}

fn default_git_binary() -> String {
    "git".to_string()
}

fn default_stat_width() -> usize {
    DEFAULT_STAT_WIDTH
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            path: None,
            table: default_table(),
            lock_timeout_secs: default_lock_timeout(),
            lock_dir: default_lock_dir(),
        }
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            git_binary: default_git_binary(),
            stat_width: default_stat_width(),
            anonymize: false,
            paths: Vec::new(),
            labels: Vec::new(),
            since: None,
            until: None,
        }
    }
}

impl StoreConfig {
    /// Configured store file, or the backend's default location
    pub fn resolved_path(&self) -> PathBuf {
        match (&self.path, self.backend) {
            (Some(path), _) => path.clone(),
            (None, StoreBackend::Sqlite) => PlatformPaths::default_sqlite_store_path(),
            (None, StoreBackend::Json) => PlatformPaths::default_json_store_path(),
        }
    }
}

/// SQLite identifiers are interpolated into statements, so only plain names pass
fn is_valid_table_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

impl Config {
    /// Load configuration from file
    pub fn from_file(path: &Path) -> Result<Self, ScraperError> {
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
    pub fn load_or_default() -> Result<Self, ScraperError> {
        let config_path = PlatformPaths::default_config_path();

        if config_path.exists() {
            tracing::info!("Loading config from: {}", config_path.display());
            Self::from_file(&config_path)
        } else {
            tracing::info!("No config file found, using defaults");
            Ok(Self::default())
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ScraperError> {
        if !is_valid_table_name(&self.store.table) {
            return Err(ConfigError::InvalidValue {
                key: "store.table".to_string(),
                reason: format!(
                    "must be a non-empty name of letters, digits and underscores, got '{}'",
                    self.store.table
                ),
            }
            .into());
        }

        if self.store.lock_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "store.lock_timeout_secs".to_string(),
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }

        if self.extraction.git_binary.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "extraction.git_binary".to_string(),
                reason: "must not be empty".to_string(),
            }
            .into());
        }

        if self.extraction.stat_width == 0 {
            return Err(ConfigError::InvalidValue {
                key: "extraction.stat_width".to_string(),
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }

        for (key, value) in [
            ("extraction.since", &self.extraction.since),
            ("extraction.until", &self.extraction.until),
        ] {
            if let Some(value) = value
                && let Err(e) = parse_timestamp(value)
            {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    reason: e.to_string(),
                }
                .into());
            }
        }

        Ok(())
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) -> Result<(), ScraperError> {
        // Store backend
        if let Ok(backend) = std::env::var("COMMIT_SCRAPER_STORE_BACKEND") {
            self.store.backend = backend.parse()?;
        }

        // Store path
        if let Ok(path) = std::env::var("COMMIT_SCRAPER_STORE_PATH") {
            self.store.path = Some(PathBuf::from(path));
        }

        // Table / collection
        if let Ok(table) = std::env::var("COMMIT_SCRAPER_STORE_TABLE") {
            self.store.table = table;
        }

        // History tool
        if let Ok(git) = std::env::var("COMMIT_SCRAPER_GIT") {
            self.extraction.git_binary = git;
        }

        // Anonymization
        if let Ok(anonymize) = std::env::var("COMMIT_SCRAPER_ANONYMIZE") {
            self.extraction.anonymize = match anonymize.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" | "" => false,
                other => {
                    return Err(ConfigError::InvalidValue {
                        key: "COMMIT_SCRAPER_ANONYMIZE".to_string(),
                        reason: format!("expected a boolean, got '{}'", other),
                    }
                    .into());
                }
            };
        }

        Ok(())
    }

    /// Commit window from `extraction.since` / `extraction.until`
    ///
    /// Unset bounds default to the UNIX epoch and the current time.
    pub fn time_range(&self) -> Result<TimeRange, ScraperError> {
        let since = match &self.extraction.since {
            Some(value) => parse_timestamp(value)?,
            None => DateTime::<Utc>::UNIX_EPOCH,
        };
        let until = match &self.extraction.until {
            Some(value) => parse_timestamp(value)?,
            None => Utc::now(),
        };
        Ok(TimeRange::new(since, until)?)
    }

    /// Create a Config from an explicit file (or the default location) plus environment overrides
    pub fn new(config_path: Option<&Path>) -> Result<Self, ScraperError> {
        let mut config = match config_path {
            Some(path) => {
                tracing::info!("Loading config from: {}", path.display());
                Self::from_file(path)?
            }
            None => Self::load_or_default()?,
        };
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }
}
