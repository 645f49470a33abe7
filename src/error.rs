/// Centralized error types for history-scraper using thiserror
///
/// Every failure raised while scraping a repository maps onto one of the
/// domain enums below and is carried upward as a [`ScrapeError`].
use thiserror::Error;

/// Main error type for the scraper
#[derive(Error, Debug)]
pub enum ScrapeError {
    #[error("Git error: {0}")]
    Git(#[from] GitError),

    #[error("Manifest error: {0}")]
    Manifest(#[from] ManifestError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Errors raised by the repository backend
#[derive(Error, Debug)]
pub enum GitError {
    #[error("Failed to clone '{url}': {reason}")]
    CloneFailed { url: String, reason: String },

    #[error("Failed to open git repository: {0}")]
    OpenFailed(String),

    #[error("Failed to query history of '{path}': {reason}")]
    HistoryQueryFailed { path: String, reason: String },

    #[error("Failed to read '{path}' at {revision}: {reason}")]
    ContentRetrievalFailed {
        revision: String,
        path: String,
        reason: String,
    },

    #[error("Failed to materialize working tree at {revision}: {reason}")]
    MaterializationFailed { revision: String, reason: String },

    #[error("Invalid revision identifier: {0}")]
    InvalidRevision(String),

    #[error("Checkout directory is in use by another process: {0}")]
    CheckoutLocked(String),
}

/// Errors raised while turning a materialized tree into a dependency record
#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("No manifest parser registered for format '{0}'")]
    UnknownFormat(String),

    #[error("Failed to parse {format} manifest: {reason}")]
    ParseFailed { format: String, reason: String },
}

/// Errors related to the on-disk content cache
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Invalid cache key component: {0}")]
    InvalidKey(String),

    #[error("Failed to write cache entry '{path}': {reason}")]
    WriteFailed { path: String, reason: String },

    #[error("Failed to create cache directory: {0}")]
    DirectoryCreationFailed(String),
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

    #[error("Failed to save configuration: {0}")]
    SaveFailed(String),

    #[error("Configuration file not found: {0}")]
    FileNotFound(String),
}

// Conversion from anyhow::Error to ScrapeError
impl From<anyhow::Error> for ScrapeError {
    fn from(err: anyhow::Error) -> Self {
        ScrapeError::Other(format!("{:#}", err))
    }
}

impl ScrapeError {
    /// Create a new error from a string message
    pub fn other(msg: impl Into<String>) -> Self {
        ScrapeError::Other(msg.into())
    }

    /// Render the error together with every underlying cause
    ///
    /// Used as the body of failure notifications, so it keeps the full chain
    /// rather than only the outermost message. Causes whose text already
    /// appears in the report are skipped.
    pub fn report(&self) -> String {
        let mut report = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            let text = cause.to_string();
            if !report.contains(&text) {
                report.push_str("\n\nCaused by:\n    ");
                report.push_str(&text);
            }
            source = cause.source();
        }
        report
    }

    /// Check if a later attempt might succeed without any change on our side
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ScrapeError::Git(GitError::CloneFailed { .. })
                | ScrapeError::Git(GitError::CheckoutLocked(_))
                | ScrapeError::Io(_)
        )
    }
}
