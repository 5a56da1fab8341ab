/// Centralized error types for commit-scraper using thiserror
///
/// Each pipeline stage owns one error enum; `ScraperError` wraps them so the run
/// driver can decide which failures skip a source and which abort the run.
use thiserror::Error;

/// Main error type for the scraper
#[derive(Error, Debug)]
pub enum ScraperError {
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

/// Invalid or unreadable repository sources
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("No such directory: {0}")]
    NotADirectory(String),

    #[error("'{0}' does not refer to a git repository")]
    NotARepository(String),

    #[error("Repository at '{0}' has no commits")]
    NoCommits(String),

    #[error("Malformed repository source string '{0}'")]
    Malformed(String),

    #[error("Failed to read source list '{path}': {reason}")]
    ListUnreadable { path: String, reason: String },
}

/// Errors from invoking the history tool
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Failed to launch '{binary}': {reason}")]
    LaunchFailed { binary: String, reason: String },

    #[error("git log exited with status {status}: {stderr}")]
    CommandFailed { status: String, stderr: String },
}

/// Errors for a single malformed commit group
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Expected {expected} commit fields, got {actual}")]
    FieldCount { expected: usize, actual: usize },

    #[error("Invalid {field} timestamp '{value}'")]
    InvalidTimestamp { field: &'static str, value: String },
}

/// Persistence failures (always run-level)
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to load store from '{location}': {reason}")]
    LoadFailed { location: String, reason: String },

    #[error("Failed to save store to '{location}': {reason}")]
    SaveFailed { location: String, reason: String },

    #[error("Store at '{location}' does not match the commit record schema: {reason}")]
    SchemaMismatch { location: String, reason: String },

    #[error("Timed out after {seconds}s waiting for the lock on '{location}'")]
    LockTimeout { location: String, seconds: u64 },

    #[error("Failed to lock store '{location}': {reason}")]
    LockFailed { location: String, reason: String },
}

/// Errors related to configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration file: {0}")]
    LoadFailed(String),

    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),

    #[error("Invalid configuration value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("Configuration file not found: {0}")]
    FileNotFound(String),
}

/// Errors related to input validation
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Invalid timestamp '{0}'")]
    InvalidTimestamp(String),

    #[error("Time range is empty: since {since} is after until {until}")]
    EmptyTimeRange { since: String, until: String },

    #[error("Must provide at least one valid repository source")]
    NoSources,
}

impl ScraperError {
    /// Check if this is a user error (bad input or configuration) vs system error
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            ScraperError::Validation(_)
                | ScraperError::Config(_)
                | ScraperError::Source(SourceError::Malformed(_))
        )
    }

    /// Whether this error ends the whole run rather than a single source
    pub fn is_run_fatal(&self) -> bool {
        matches!(
            self,
            ScraperError::Store(_) | ScraperError::Config(_) | ScraperError::Validation(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ScraperError>;
